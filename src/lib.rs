//! loupe, a loose-object database verifier, differ and cloner.
//!
//! The same object model and algorithms run over three interchangeable
//! backends: loose files under `.git`, an in-memory map, and SQLite. Hashes
//! are recomputed per backend from a canonical form, so clones are
//! content-equal rather than hash-equal.

pub mod areas;
pub mod artifacts;
pub mod errors;
