use std::io::BufRead;

/// The three stored object kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Blob,
    Tree,
    Commit,
}

impl ObjectKind {
    pub fn as_str(&self) -> &str {
        match self {
            ObjectKind::Blob => "blob",
            ObjectKind::Tree => "tree",
            ObjectKind::Commit => "commit",
        }
    }

    /// Read a `<kind> <size>\0` frame header, returning the kind and the
    /// declared payload byte length.
    pub fn parse_frame_header(data_reader: &mut impl BufRead) -> anyhow::Result<(ObjectKind, u64)> {
        let mut kind = Vec::new();
        data_reader.read_until(b' ', &mut kind)?;

        let kind = String::from_utf8(kind)?;
        let kind = ObjectKind::try_from(kind.trim())?;

        let mut size = Vec::new();
        data_reader.read_until(b'\0', &mut size)?;
        if size.pop() != Some(b'\0') {
            return Err(anyhow::anyhow!("unexpected EOF in object header"));
        }

        let size = String::from_utf8(size)?.trim().parse::<u64>()?;

        Ok((kind, size))
    }
}

impl TryFrom<&str> for ObjectKind {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> anyhow::Result<Self> {
        match value {
            "blob" => Ok(ObjectKind::Blob),
            "tree" => Ok(ObjectKind::Tree),
            "commit" => Ok(ObjectKind::Commit),
            _ => Err(anyhow::anyhow!("Invalid object kind '{value}'")),
        }
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
