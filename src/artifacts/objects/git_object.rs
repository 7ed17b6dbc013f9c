//! Loaded object model
//!
//! A `GitObject` is one parsed, immutable object as returned by a store. It
//! carries both identities relevant to validation: the id it was requested
//! under and the content id recomputed from its raw serialized form. The two
//! must agree for the object to be valid.
//!
//! Objects are cached per repository session behind `Rc` and never mutated,
//! so the same subtree reachable from many commits is loaded once.

use crate::artifacts::objects::commit::CommitPayload;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_kind::ObjectKind;
use crate::artifacts::objects::tree::TreeRecord;
use crate::errors::ObjectError;
use bytes::Bytes;

/// Content to be stored: the input side of `ObjectStore::store`. Unlike
/// `ObjectPayload`, blob data is mandatory here; one cannot create a blob
/// without its bytes.
#[derive(Debug, Clone)]
pub enum ObjectContent {
    Blob(Bytes),
    Tree(Vec<TreeRecord>),
    Commit(CommitPayload),
}

impl ObjectContent {
    pub fn kind(&self) -> ObjectKind {
        match self {
            ObjectContent::Blob(_) => ObjectKind::Blob,
            ObjectContent::Tree(_) => ObjectKind::Tree,
            ObjectContent::Commit(_) => ObjectKind::Commit,
        }
    }
}

/// Parsed payload of a loaded object.
///
/// Blob data is optional: most traversals (fsck, counting) drop it right
/// after the load-time size check to keep memory flat, and only checkout,
/// clone and ancestor comparison ask for it.
#[derive(Debug, Clone)]
pub enum ObjectPayload {
    Blob(Option<Bytes>),
    Tree(Vec<TreeRecord>),
    Commit(CommitPayload),
}

#[derive(Debug)]
pub struct GitObject {
    id: ObjectId,
    kind: ObjectKind,
    declared_size: u64,
    content_id: ObjectId,
    /// Ancestry depth from the traversal root (1 = root commit), diagnostic
    /// only, never part of identity.
    level: u32,
    payload: ObjectPayload,
}

impl GitObject {
    pub fn new(
        id: ObjectId,
        kind: ObjectKind,
        declared_size: u64,
        content_id: ObjectId,
        level: u32,
        payload: ObjectPayload,
    ) -> Self {
        GitObject {
            id,
            kind,
            declared_size,
            content_id,
            level,
            payload,
        }
    }

    pub fn id(&self) -> &ObjectId {
        &self.id
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    pub fn declared_size(&self) -> u64 {
        self.declared_size
    }

    pub fn content_id(&self) -> &ObjectId {
        &self.content_id
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn payload(&self) -> &ObjectPayload {
        &self.payload
    }

    pub fn as_commit(&self) -> anyhow::Result<&CommitPayload> {
        match &self.payload {
            ObjectPayload::Commit(commit) => Ok(commit),
            _ => Err(self.type_error(ObjectKind::Commit).into()),
        }
    }

    pub fn as_tree(&self) -> anyhow::Result<&[TreeRecord]> {
        match &self.payload {
            ObjectPayload::Tree(records) => Ok(records),
            _ => Err(self.type_error(ObjectKind::Tree).into()),
        }
    }

    pub fn has_blob_data(&self) -> bool {
        matches!(&self.payload, ObjectPayload::Blob(Some(_)))
    }

    /// Blob payload bytes, failing when the object was loaded without them.
    pub fn blob_data(&self) -> anyhow::Result<&Bytes> {
        match &self.payload {
            ObjectPayload::Blob(Some(data)) => Ok(data),
            ObjectPayload::Blob(None) => Err(ObjectError::BlobDataNotLoaded {
                id: self.id.to_string(),
            }
            .into()),
            _ => Err(self.type_error(ObjectKind::Blob).into()),
        }
    }

    fn type_error(&self, expected: ObjectKind) -> ObjectError {
        ObjectError::InvalidType {
            expected: expected.to_string(),
            actual: self.kind.to_string(),
        }
    }
}
