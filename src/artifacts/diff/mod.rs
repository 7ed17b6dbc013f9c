//! Tree-level diffing
//!
//! Detects which files a commit touched relative to its parents, including
//! the multi-parent rules merges need and rename detection over unchanged
//! content.

pub mod changes;
