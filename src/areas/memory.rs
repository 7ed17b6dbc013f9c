//! In-process object store
//!
//! Backs the same contract as the filesystem store with plain hash maps,
//! which makes it the fast round-trip target for clone tests. Content
//! addresses are SHA-1 over the canonical JSON form (see
//! `objects::canonical`), so they never coincide with filesystem hashes for
//! the same logical content; backends only agree on identity within
//! themselves.

use crate::areas::store::{ObjectStore, RawObject};
use crate::artifacts::objects::canonical::canonical_bytes;
use crate::artifacts::objects::git_object::{ObjectContent, ObjectPayload};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::tree::sorted_by_name;
use crate::errors::ObjectError;
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug)]
struct StoredObject {
    size: u64,
    content: ObjectContent,
}

#[derive(Debug)]
pub struct MemoryStore {
    objects: RefCell<HashMap<ObjectId, StoredObject>>,
    branches: RefCell<BTreeMap<String, ObjectId>>,
    /// Branch name, or a raw hash that is not a branch name (detached).
    head: RefCell<String>,
    cloned: RefCell<HashMap<ObjectId, ObjectId>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        MemoryStore {
            objects: RefCell::new(HashMap::new()),
            branches: RefCell::new(BTreeMap::new()),
            head: RefCell::new("master".to_string()),
            cloned: RefCell::new(HashMap::new()),
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_head(&self, head: &str) {
        *self.head.borrow_mut() = head.to_string();
    }

    pub fn object_count(&self) -> usize {
        self.objects.borrow().len()
    }
}

impl ObjectStore for MemoryStore {
    fn load(&self, id: &ObjectId) -> anyhow::Result<RawObject> {
        let objects = self.objects.borrow();
        let stored = objects
            .get(id)
            .ok_or_else(|| ObjectError::MissingObject { id: id.to_string() })?;

        let canonical = canonical_bytes(&stored.content);
        let payload = match &stored.content {
            ObjectContent::Blob(data) => ObjectPayload::Blob(Some(data.clone())),
            ObjectContent::Tree(records) => ObjectPayload::Tree(records.clone()),
            ObjectContent::Commit(commit) => ObjectPayload::Commit(commit.clone()),
        };

        Ok(RawObject {
            kind: stored.content.kind(),
            declared_size: stored.size,
            actual_size: canonical.len() as u64,
            payload,
            content_id: ObjectId::digest_of(&canonical),
        })
    }

    fn store(&self, content: ObjectContent, origin: Option<&ObjectId>) -> anyhow::Result<ObjectId> {
        let content = match content {
            ObjectContent::Tree(records) => ObjectContent::Tree(sorted_by_name(&records)),
            other => other,
        };

        let canonical = canonical_bytes(&content);
        let id = ObjectId::digest_of(&canonical);

        self.objects
            .borrow_mut()
            .entry(id.clone())
            .or_insert_with(|| StoredObject {
                size: canonical.len() as u64,
                content,
            });

        if let Some(origin) = origin {
            self.cloned.borrow_mut().insert(origin.clone(), id.clone());
        }

        Ok(id)
    }

    fn find_cloned(&self, origin: &ObjectId) -> anyhow::Result<Option<ObjectId>> {
        Ok(self.cloned.borrow().get(origin).cloned())
    }

    fn resolve_head(&self) -> anyhow::Result<Option<ObjectId>> {
        let head = self.head.borrow();
        let branches = self.branches.borrow();

        if !branches.contains_key(head.as_str()) {
            if let Ok(id) = ObjectId::try_parse(head.clone()) {
                return Ok(Some(id));
            }
        }

        Ok(branches.get(head.as_str()).cloned())
    }

    fn update_branch(&self, name: &str, id: &ObjectId) -> anyhow::Result<()> {
        self.branches
            .borrow_mut()
            .insert(name.to_string(), id.clone());
        Ok(())
    }

    fn branch_names(&self) -> anyhow::Result<Vec<String>> {
        Ok(self.branches.borrow().keys().cloned().collect())
    }
}
