//! Object store contract
//!
//! The same graph logic runs against three interchangeable backends: the
//! loose-object filesystem store, an in-process memory store, and a SQLite
//! store. A backend persists and retrieves objects by content address, maps
//! branch names to head hashes, and (for the cloneable backends) remembers
//! which of its objects were cloned from which origin hash.

use crate::artifacts::objects::git_object::{ObjectContent, ObjectPayload};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_kind::ObjectKind;

/// One object as a backend returns it: parsed payload plus the three facts
/// validation needs: the declared size, the measured size, and the content
/// address recomputed from the raw serialized form.
#[derive(Debug)]
pub struct RawObject {
    pub kind: ObjectKind,
    pub declared_size: u64,
    pub actual_size: u64,
    pub payload: ObjectPayload,
    pub content_id: ObjectId,
}

pub trait ObjectStore {
    /// Load one object by id. Fails with `MissingObject` when absent.
    fn load(&self, id: &ObjectId) -> anyhow::Result<RawObject>;

    /// Idempotent create: identical content always returns the existing id
    /// without side effects. When `origin` is given, the backend records it
    /// in its cloned-object index (backends without one ignore it).
    fn store(&self, content: ObjectContent, origin: Option<&ObjectId>) -> anyhow::Result<ObjectId>;

    /// Previously-cloned object for an origin hash, if any.
    fn find_cloned(&self, origin: &ObjectId) -> anyhow::Result<Option<ObjectId>>;

    /// Follow the HEAD indirection to a commit id, honoring the detached
    /// form (HEAD holding a hash that is not a branch name).
    fn resolve_head(&self) -> anyhow::Result<Option<ObjectId>>;

    fn update_branch(&self, name: &str, id: &ObjectId) -> anyhow::Result<()>;

    fn branch_names(&self) -> anyhow::Result<Vec<String>>;
}
