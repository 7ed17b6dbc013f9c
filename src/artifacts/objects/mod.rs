//! Object model and codecs
//!
//! Everything in the database is one of three kinds of content-addressed
//! object:
//!
//! - **Blob**: raw file content (including the opaque symlink/submodule leaves)
//! - **Tree**: a directory listing of (mode, name, id) records
//! - **Commit**: a snapshot referencing one tree and zero-or-more parents
//!
//! The filesystem wire format frames each object as `<kind> <size>\0<payload>`;
//! the structured backends carry the same logical fields in a canonical JSON
//! form (see `canonical`).

pub mod canonical;
pub mod commit;
pub mod entry_mode;
pub mod git_object;
pub mod object_id;
pub mod object_kind;
pub mod tree;

/// Length of a SHA-1 hash in hexadecimal format
pub const OBJECT_ID_LENGTH: usize = 40;

/// Length of a SHA-1 hash in binary format
pub const OBJECT_ID_BYTES: usize = 20;
