//! Commit payload codec
//!
//! The filesystem wire format is line-oriented text:
//!
//! ```text
//! tree <hex>
//! parent <hex>          (zero or more)
//! author <name> <unix-seconds> <±HHMM>
//! committer <name> <unix-seconds> <±HHMM>
//!
//! <subject>
//! ```
//!
//! Historical repositories contain commits without a committer line and
//! commits with an empty subject; both are accepted (the latter with a
//! warning). Duplicate `tree`/`author`/`committer` rows are a format error.

use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::ObjectError;
use bytes::Bytes;
use chrono::{DateTime, FixedOffset};
use tracing::warn;

/// Authorship stamp: a display name (which conventionally embeds an email in
/// angle brackets, uninterpreted here), a unix timestamp and its utc offset.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Author {
    name: String,
    timestamp: DateTime<FixedOffset>,
}

impl Author {
    pub fn new(name: String, timestamp: DateTime<FixedOffset>) -> Self {
        Author { name, timestamp }
    }

    pub fn now(name: String) -> Self {
        Author {
            name,
            timestamp: chrono::Local::now().fixed_offset(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn timestamp(&self) -> DateTime<FixedOffset> {
        self.timestamp
    }

    /// Wire form: `{name} {unix_seconds} {±HHMM}`.
    pub fn display(&self) -> String {
        format!(
            "{} {} {}",
            self.name,
            self.timestamp.timestamp(),
            self.timestamp.format("%z")
        )
    }
}

impl TryFrom<&str> for Author {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        // Split from the right: the last two fields are timestamp and offset,
        // everything before them is the (possibly space-containing) name.
        let parts: Vec<&str> = value.rsplitn(3, ' ').collect();
        if parts.len() < 3 {
            return Err(anyhow::anyhow!("Invalid author format: '{value}'"));
        }

        let offset = parse_utc_offset(parts[0])?;
        let seconds = parts[1]
            .parse::<i64>()
            .map_err(|_| anyhow::anyhow!("Invalid timestamp in '{value}'"))?;
        let name = parts[2].to_string();

        let timestamp = DateTime::from_timestamp(seconds, 0)
            .ok_or_else(|| anyhow::anyhow!("Invalid timestamp in '{value}'"))?
            .with_timezone(&offset);

        Ok(Author { name, timestamp })
    }
}

fn parse_utc_offset(offset: &str) -> anyhow::Result<FixedOffset> {
    let bytes = offset.as_bytes();
    if bytes.len() != 5 || (bytes[0] != b'+' && bytes[0] != b'-') {
        return Err(anyhow::anyhow!("Invalid utc offset '{offset}'"));
    }

    let hours = offset[1..3].parse::<i32>()?;
    let minutes = offset[3..5].parse::<i32>()?;
    let seconds = (hours * 60 + minutes) * 60;
    let seconds = if bytes[0] == b'-' { -seconds } else { seconds };

    FixedOffset::east_opt(seconds).ok_or_else(|| anyhow::anyhow!("Invalid utc offset '{offset}'"))
}

/// The logical fields of a commit, shared by every backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitPayload {
    pub tree: ObjectId,
    /// Parent order is preserved as given; it is significant for the
    /// computed hash on every backend.
    pub parents: Vec<ObjectId>,
    pub author: Author,
    pub committer: Option<Author>,
    pub subject: Option<String>,
}

/// Decode the line-oriented commit text.
pub fn decode_commit(payload: &[u8], id: &ObjectId) -> anyhow::Result<CommitPayload> {
    let content = std::str::from_utf8(payload)?;
    let rows: Vec<&str> = content.split('\n').collect();
    let blank_index = rows.iter().position(|row| row.is_empty());
    let header_rows = &rows[..blank_index.unwrap_or(rows.len())];

    let tree = match single_row(header_rows, "tree")? {
        Some(row) => ObjectId::try_parse(row.to_string())?,
        None => {
            return Err(ObjectError::MissingTreeInCommit { id: id.to_string() }.into());
        }
    };

    let parents = labeled_rows(header_rows, "parent")
        .into_iter()
        .map(|row| ObjectId::try_parse(row.to_string()))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let author = single_row(header_rows, "author")?
        .ok_or(ObjectError::MissingCommitData { label: "author" })?;
    let author = Author::try_from(author)?;

    let committer = single_row(header_rows, "committer")?
        .map(Author::try_from)
        .transpose()?;

    let subject = blank_index
        .map(|index| rows[index + 1..].join("\n"))
        .map(|subject| subject.trim_end_matches('\n').to_string())
        .filter(|subject| !subject.is_empty());
    if subject.is_none() {
        warn!(commit = %id, "commit has no subject");
    }

    Ok(CommitPayload {
        tree,
        parents,
        author,
        committer,
        subject,
    })
}

/// Encode the line-oriented commit text.
pub fn encode_commit(commit: &CommitPayload) -> Bytes {
    let mut text = String::new();

    text.push_str(&format!("tree {}\n", commit.tree));
    for parent in &commit.parents {
        text.push_str(&format!("parent {parent}\n"));
    }
    text.push_str(&format!("author {}\n", commit.author.display()));
    if let Some(committer) = &commit.committer {
        text.push_str(&format!("committer {}\n", committer.display()));
    }
    text.push('\n');
    if let Some(subject) = &commit.subject {
        text.push_str(subject);
        text.push('\n');
    }

    Bytes::from(text.into_bytes())
}

fn single_row<'r>(rows: &[&'r str], label: &'static str) -> anyhow::Result<Option<&'r str>> {
    let matches = labeled_rows(rows, label);

    match matches.len() {
        0 => Ok(None),
        1 => Ok(Some(matches[0])),
        _ => Err(ObjectError::ExcessiveCommitData { label }.into()),
    }
}

fn labeled_rows<'r>(rows: &[&'r str], label: &str) -> Vec<&'r str> {
    rows.iter()
        .filter_map(|row| {
            let (row_label, rest) = row.split_once(' ')?;
            (row_label == label).then_some(rest)
        })
        .collect()
}
