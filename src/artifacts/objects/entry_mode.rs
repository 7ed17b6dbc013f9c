//! Tree entry modes
//!
//! The mode string of a tree entry decides which kind of object the entry
//! points at and how a checkout materializes it. Unrecognized modes are a
//! validation error, never a fallback.

use crate::errors::ObjectError;

/// Mode of a blob-family leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum FileMode {
    #[default]
    Regular,
    Executable,
    GroupWritable,
    SymLink,
    Submodule,
}

impl FileMode {
    /// Unix permission bits applied on checkout. Opaque leaves are never
    /// written, so they carry no permissions.
    pub fn permissions(&self) -> Option<u32> {
        match self {
            FileMode::Regular => Some(0o644),
            FileMode::Executable => Some(0o755),
            FileMode::GroupWritable => Some(0o664),
            FileMode::SymLink | FileMode::Submodule => None,
        }
    }

    /// Opaque leaves (symlinks, submodules) are carried by identity only:
    /// never loaded, never validated beyond their hash.
    pub fn is_opaque(&self) -> bool {
        matches!(self, FileMode::SymLink | FileMode::Submodule)
    }
}

/// Declared mode of a tree entry, the closed tagged-variant replacement for a
/// dynamic mode-string dispatch table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntryMode {
    Tree,
    File(FileMode),
}

impl EntryMode {
    pub fn as_str(&self) -> &str {
        match self {
            EntryMode::Tree => "40000",
            EntryMode::File(FileMode::Regular) => "100644",
            EntryMode::File(FileMode::Executable) => "100755",
            EntryMode::File(FileMode::GroupWritable) => "100664",
            EntryMode::File(FileMode::SymLink) => "120000",
            EntryMode::File(FileMode::Submodule) => "160000",
        }
    }

    /// Resolve a mode string to its variant, the entry name only naming the
    /// offender on failure.
    pub fn try_parse(mode: &str, name: &str) -> Result<Self, ObjectError> {
        match mode {
            "40000" => Ok(EntryMode::Tree),
            "100644" => Ok(EntryMode::File(FileMode::Regular)),
            "100755" => Ok(EntryMode::File(FileMode::Executable)),
            "100664" => Ok(EntryMode::File(FileMode::GroupWritable)),
            "120000" => Ok(EntryMode::File(FileMode::SymLink)),
            "160000" => Ok(EntryMode::File(FileMode::Submodule)),
            _ => Err(ObjectError::InvalidMode {
                mode: mode.to_string(),
                name: name.to_string(),
            }),
        }
    }

    pub fn is_tree(&self) -> bool {
        matches!(self, EntryMode::Tree)
    }

    pub fn is_opaque(&self) -> bool {
        matches!(self, EntryMode::File(mode) if mode.is_opaque())
    }
}

impl std::fmt::Display for EntryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
