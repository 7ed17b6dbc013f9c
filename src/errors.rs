//! Error taxonomy for object loading and validation
//!
//! Every error here is fatal to the operation in progress: an inconsistent
//! object graph cannot be safely partially processed, so validation and load
//! failures abort the whole traversal. Clone is the one exception at the
//! call-site level: re-invoking it after a partial failure is safe because
//! every create is idempotent.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ObjectError {
    #[error("invalid mode '{mode}' in entry '{name}'")]
    InvalidMode { mode: String, name: String },

    #[error("invalid SHA1 '{id}' (expected '{computed}')")]
    InvalidSha1 { id: String, computed: String },

    #[error("invalid size {declared} (expected {actual})")]
    InvalidSize { declared: u64, actual: u64 },

    #[error("invalid type '{actual}' (expected '{expected}')")]
    InvalidType { expected: String, actual: String },

    #[error("object '{id}' not found; have you unpacked all pack files?")]
    MissingObject { id: String },

    #[error("missing tree in commit {id}")]
    MissingTreeInCommit { id: String },

    #[error("missing {label} in commit")]
    MissingCommitData { label: &'static str },

    #[error("excessive {label} rows in commit")]
    ExcessiveCommitData { label: &'static str },

    #[error("the tree {id} contains invalid data")]
    InvalidTreeData { id: String },

    #[error("blob {id} cannot be materialized (blob data not loaded)")]
    BlobDataNotLoaded { id: String },
}
