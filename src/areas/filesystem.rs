//! Loose-object filesystem store
//!
//! Objects live at `objects/{id[0..2]}/{id[2..]}` as zlib-compressed frames
//! `<kind> <size>\0<payload>`; the content address is the SHA-1 of the
//! uncompressed frame (header included), never of the payload alone.
//!
//! References are plain files: `HEAD` holds either a `ref: <path>` redirect
//! or a raw hash (detached), and `refs/heads/<name>` holds the branch tip
//! followed by a newline. Pack files are out of scope, so every referenced
//! object must already exist loose.

use crate::areas::store::{ObjectStore, RawObject};
use crate::artifacts::objects::commit::{decode_commit, encode_commit};
use crate::artifacts::objects::git_object::{ObjectContent, ObjectPayload};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_kind::ObjectKind;
use crate::artifacts::objects::tree::{decode_entries, encode_entries, sorted_by_name};
use crate::errors::ObjectError;
use anyhow::Context;
use bytes::Bytes;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Regex pattern for parsing symbolic references
const SYMREF_REGEX: &str = r"^ref: (.+)$";

#[derive(Debug)]
pub struct FilesystemStore {
    git_path: Box<Path>,
}

impl FilesystemStore {
    /// Open the store of a project directory. A bare repository is its own
    /// git directory; otherwise the store lives under `.git`.
    pub fn new(project_path: &Path, bare_repository: bool) -> Self {
        let git_path = if bare_repository {
            project_path.to_path_buf()
        } else {
            project_path.join(".git")
        };

        FilesystemStore {
            git_path: git_path.into_boxed_path(),
        }
    }

    pub fn git_path(&self) -> &Path {
        &self.git_path
    }

    /// Lays down the directory skeleton and a HEAD pointing at master.
    /// Existing files are left alone, so opening after init is safe.
    pub fn init(&self) -> anyhow::Result<()> {
        std::fs::create_dir_all(self.git_path.join("objects"))?;
        std::fs::create_dir_all(self.heads_path())?;

        let head_path = self.git_path.join("HEAD");
        if !head_path.exists() {
            std::fs::write(&head_path, "ref: refs/heads/master\n")
                .context("Unable to write HEAD")?;
        }

        Ok(())
    }

    fn object_path(&self, id: &ObjectId) -> PathBuf {
        self.git_path.join("objects").join(id.to_path())
    }

    fn heads_path(&self) -> PathBuf {
        self.git_path.join("refs").join("heads")
    }

    fn read_branch(&self, name: &str) -> anyhow::Result<Option<ObjectId>> {
        let path = self.heads_path().join(name);
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path)
            .context(format!("Unable to read ref {}", path.display()))?;

        Ok(Some(ObjectId::try_parse(content.trim().to_string())?))
    }

    fn compress(data: &[u8]) -> anyhow::Result<Vec<u8>> {
        let mut encoder =
            flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder
            .write_all(data)
            .context("Unable to compress object content")?;

        encoder
            .finish()
            .context("Unable to finish compressing object content")
    }

    fn decompress(data: &[u8]) -> anyhow::Result<Vec<u8>> {
        let mut decoder = flate2::read::ZlibDecoder::new(data);
        let mut content = Vec::new();
        decoder
            .read_to_end(&mut content)
            .context("Unable to decompress object content")?;

        Ok(content)
    }

    // Atomic write: temp name in the same directory, then rename.
    fn write_object(&self, path: &Path, frame: &[u8]) -> anyhow::Result<()> {
        let object_dir = path
            .parent()
            .context(format!("Invalid object path {}", path.display()))?;
        std::fs::create_dir_all(object_dir).context(format!(
            "Unable to create object directory {}",
            object_dir.display()
        ))?;

        let temp_path = object_dir.join(format!("tmp-obj-{}", rand::random::<u32>()));
        std::fs::write(&temp_path, Self::compress(frame)?).context(format!(
            "Unable to write object file {}",
            temp_path.display()
        ))?;
        std::fs::rename(&temp_path, path).context(format!(
            "Unable to rename object file to {}",
            path.display()
        ))?;

        Ok(())
    }

    fn encode_payload(content: &ObjectContent) -> anyhow::Result<Bytes> {
        match content {
            ObjectContent::Blob(data) => Ok(data.clone()),
            ObjectContent::Tree(records) => encode_entries(&sorted_by_name(records)),
            ObjectContent::Commit(commit) => Ok(encode_commit(commit)),
        }
    }
}

impl ObjectStore for FilesystemStore {
    fn load(&self, id: &ObjectId) -> anyhow::Result<RawObject> {
        let path = self.object_path(id);
        if !path.exists() {
            return Err(ObjectError::MissingObject {
                id: path.display().to_string(),
            }
            .into());
        }

        let compressed = std::fs::read(&path)
            .context(format!("Unable to read object file {}", path.display()))?;
        let frame = Self::decompress(&compressed)?;
        let content_id = ObjectId::digest_of(&frame);

        let mut reader = Cursor::new(&frame);
        let (kind, declared_size) = ObjectKind::parse_frame_header(&mut reader)?;
        let payload = &frame[reader.position() as usize..];

        let parsed = match kind {
            ObjectKind::Blob => ObjectPayload::Blob(Some(Bytes::copy_from_slice(payload))),
            ObjectKind::Tree => ObjectPayload::Tree(decode_entries(payload, id)?),
            ObjectKind::Commit => ObjectPayload::Commit(decode_commit(payload, id)?),
        };

        Ok(RawObject {
            kind,
            declared_size,
            actual_size: payload.len() as u64,
            payload: parsed,
            content_id,
        })
    }

    fn store(&self, content: ObjectContent, _origin: Option<&ObjectId>) -> anyhow::Result<ObjectId> {
        let payload = Self::encode_payload(&content)?;

        let mut frame = format!("{} {}\0", content.kind(), payload.len()).into_bytes();
        frame.extend_from_slice(&payload);

        let id = ObjectId::digest_of(&frame);
        let path = self.object_path(&id);

        // Content-addressed: an existing file already holds identical bytes.
        if !path.exists() {
            self.write_object(&path, &frame)?;
        }

        Ok(id)
    }

    // The filesystem backend carries no cloned-object index; clones into it
    // rely on content addressing alone for idempotency.
    fn find_cloned(&self, _origin: &ObjectId) -> anyhow::Result<Option<ObjectId>> {
        Ok(None)
    }

    fn resolve_head(&self) -> anyhow::Result<Option<ObjectId>> {
        let head_path = self.git_path.join("HEAD");
        if !head_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&head_path)?;
        let content = content.trim();
        if content.is_empty() {
            return Ok(None);
        }

        if let Some(symref) = regex::Regex::new(SYMREF_REGEX)?.captures(content) {
            let ref_path = self.git_path.join(&symref[1]);
            if !ref_path.exists() {
                return Ok(None);
            }

            let tip = std::fs::read_to_string(&ref_path)?;
            return Ok(Some(ObjectId::try_parse(tip.trim().to_string())?));
        }

        // A raw hash that is not a branch name is a detached head.
        if let Ok(id) = ObjectId::try_parse(content.to_string()) {
            if !self.branch_names()?.iter().any(|name| name == content) {
                return Ok(Some(id));
            }
        }

        self.read_branch(content)
    }

    fn update_branch(&self, name: &str, id: &ObjectId) -> anyhow::Result<()> {
        let path = self.heads_path().join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(&path, format!("{id}\n"))
            .context(format!("Unable to write ref {}", path.display()))
    }

    fn branch_names(&self) -> anyhow::Result<Vec<String>> {
        let heads = self.heads_path();
        if !heads.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in WalkDir::new(&heads) {
            let entry = entry?;
            if entry.file_type().is_file() {
                let name = entry.path().strip_prefix(&heads)?;
                names.push(name.to_string_lossy().to_string());
            }
        }
        names.sort();

        Ok(names)
    }
}
