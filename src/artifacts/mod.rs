//! Object model and whole-history algorithms
//!
//! - `objects`: object types, the text and canonical codecs, entry modes
//! - `traversal`: breadth-first ancestor walk shared by every operation
//! - `diff`: tree diffing with merge rules and rename detection
//! - `checkout`: materializing a tree on disk
//! - `clone`: two-phase cross-backend cloning

pub mod checkout;
pub mod clone;
pub mod diff;
pub mod objects;
pub mod traversal;
