//! Storage backends and the repository facade
//!
//! - `store`: the backend contract plus the raw load result
//! - `filesystem`: loose objects under `.git` (zlib text encoding)
//! - `memory`: in-process maps, canonical JSON hashing
//! - `relational`: SQLite rows, canonical JSON hashing
//! - `repository`: caching, validation and the cross-backend operations

pub mod filesystem;
pub mod memory;
pub mod relational;
pub mod repository;
pub mod store;
