use crate::areas::store::ObjectStore;
use crate::artifacts::checkout;
use crate::artifacts::clone;
use crate::artifacts::diff::changes::{self, Change};
use crate::artifacts::objects::commit::CommitPayload;
use crate::artifacts::objects::git_object::{GitObject, ObjectContent, ObjectPayload};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_kind::ObjectKind;
use crate::artifacts::objects::tree::TreeRecord;
use crate::artifacts::traversal::{visit_ancestors, AncestorIter};
use crate::errors::ObjectError;
use bytes::Bytes;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::rc::Rc;
use tracing::debug;

/// High-level operations over one object store.
///
/// The repository owns two per-session memos: a load cache mapping each hash
/// to its parsed object, and the set of hashes whose identity has already
/// been verified. Both use interior mutability so read-only operations like
/// `validate` stay `&self`.
pub struct Repository<S: ObjectStore> {
    store: S,
    cache: RefCell<HashMap<ObjectId, Rc<GitObject>>>,
    validated: RefCell<HashSet<ObjectId>>,
}

impl<S: ObjectStore> Repository<S> {
    pub fn new(store: S) -> Self {
        Repository {
            store,
            cache: RefCell::new(HashMap::new()),
            validated: RefCell::new(HashSet::new()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Loads an object, serving repeats from the cache.
    ///
    /// Blob payloads are dropped unless `keep_blob_data` is set; a cached
    /// data-less blob is reloaded when a later caller does need the bytes,
    /// and the richer copy replaces it.
    pub fn load_object(
        &self,
        id: &ObjectId,
        expected: Option<ObjectKind>,
        level: u32,
        keep_blob_data: bool,
    ) -> anyhow::Result<Rc<GitObject>> {
        let cached = self.cache.borrow().get(id).cloned();

        let object = match cached {
            Some(object)
                if !(keep_blob_data
                    && object.kind() == ObjectKind::Blob
                    && !object.has_blob_data()) =>
            {
                object
            }
            _ => {
                let raw = self.store.load(id)?;

                if raw.declared_size != raw.actual_size {
                    return Err(ObjectError::InvalidSize {
                        declared: raw.declared_size,
                        actual: raw.actual_size,
                    }
                    .into());
                }

                let payload = if keep_blob_data {
                    raw.payload
                } else {
                    match raw.payload {
                        ObjectPayload::Blob(_) => ObjectPayload::Blob(None),
                        other => other,
                    }
                };

                let object = Rc::new(GitObject::new(
                    id.clone(),
                    raw.kind,
                    raw.declared_size,
                    raw.content_id,
                    level,
                    payload,
                ));
                self.cache.borrow_mut().insert(id.clone(), object.clone());
                object
            }
        };

        if let Some(expected) = expected {
            if object.kind() != expected {
                return Err(ObjectError::InvalidType {
                    expected: expected.to_string(),
                    actual: object.kind().to_string(),
                }
                .into());
            }
        }

        Ok(object)
    }

    pub fn head_id(&self) -> anyhow::Result<ObjectId> {
        self.store
            .resolve_head()?
            .ok_or_else(|| anyhow::anyhow!("Unable to resolve HEAD to a commit"))
    }

    pub fn head_commit(&self, keep_blob_data: bool) -> anyhow::Result<Rc<GitObject>> {
        let id = self.head_id()?;
        self.load_object(&id, Some(ObjectKind::Commit), 1, keep_blob_data)
    }

    pub fn branch_names(&self) -> anyhow::Result<Vec<String>> {
        self.store.branch_names()
    }

    /// Walks every ancestor of HEAD and verifies each reachable object:
    /// stored hash matches recomputed hash, declared size matches payload
    /// size, every reference points at the declared kind. Returns the number
    /// of commits checked.
    pub fn validate(&self) -> anyhow::Result<usize> {
        let visited = visit_ancestors(self, &self.head_id()?, false, |commit, _level| {
            self.check_identity(commit)?;

            let tree_id = commit.as_commit()?.tree.clone();
            let tree = self.load_object(&tree_id, Some(ObjectKind::Tree), commit.level(), false)?;
            self.validate_tree(&tree)
        })?;

        Ok(visited.order.len())
    }

    fn check_identity(&self, object: &GitObject) -> anyhow::Result<()> {
        if self.validated.borrow().contains(object.id()) {
            return Ok(());
        }

        self.compare_identity(object)?;
        self.validated.borrow_mut().insert(object.id().clone());
        Ok(())
    }

    fn compare_identity(&self, object: &GitObject) -> anyhow::Result<()> {
        if object.id() != object.content_id() {
            return Err(ObjectError::InvalidSha1 {
                id: object.id().to_string(),
                computed: object.content_id().to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// A tree is memoized only after all of its children pass, so shared
    /// subtrees are walked once per session.
    fn validate_tree(&self, tree: &Rc<GitObject>) -> anyhow::Result<()> {
        if self.validated.borrow().contains(tree.id()) {
            return Ok(());
        }

        self.compare_identity(tree)?;

        for record in tree.as_tree()? {
            if record.mode.is_opaque() {
                debug!(name = %record.name, mode = %record.mode.as_str(), "skipping opaque entry");
                continue;
            }

            if record.mode.is_tree() {
                let child =
                    self.load_object(&record.id, Some(ObjectKind::Tree), tree.level(), false)?;
                self.validate_tree(&child)?;
            } else {
                let blob =
                    self.load_object(&record.id, Some(ObjectKind::Blob), tree.level(), false)?;
                self.check_identity(&blob)?;
            }
        }

        self.validated.borrow_mut().insert(tree.id().clone());
        Ok(())
    }

    pub fn commit_count(&self) -> anyhow::Result<usize> {
        let visited = visit_ancestors(self, &self.head_id()?, false, |_, _| Ok(()))?;
        Ok(visited.order.len())
    }

    /// The commit with the most parents, ties broken by visit order.
    pub fn max_parents(&self) -> anyhow::Result<(ObjectId, usize)> {
        let visited = visit_ancestors(self, &self.head_id()?, false, |commit, _| {
            Ok((commit.id().clone(), commit.as_commit()?.parents.len()))
        })?;

        visited
            .results
            .into_iter()
            .max_by_key(|(_, count)| *count)
            .ok_or_else(|| anyhow::anyhow!("No commits reachable from HEAD"))
    }

    pub fn changes_introduced_by(&self, id: &ObjectId) -> anyhow::Result<Vec<Change>> {
        changes::changes_introduced_by(self, id)
    }

    pub fn checkout_head_into(&self, path: &Path) -> anyhow::Result<()> {
        let commit = self.head_commit(false)?;
        checkout::checkout_tree(self, &commit.as_commit()?.tree, path)
    }

    pub fn clone_into<T: ObjectStore>(
        &self,
        target: &Repository<T>,
        branch: &str,
    ) -> anyhow::Result<ObjectId> {
        clone::clone_into(self, target, branch)
    }

    /// Compares the full ancestries of two repositories commit by commit.
    ///
    /// Hashes differ across backends, so equality is structural: author,
    /// committer, subject, parent count and the whole tree (names, modes,
    /// blob bytes) must match at each step of the lockstep walk.
    pub fn ancestors_equal<T: ObjectStore>(&self, other: &Repository<T>) -> anyhow::Result<bool> {
        let mut ours = AncestorIter::new(self, self.head_id()?);
        let mut theirs = AncestorIter::new(other, other.head_id()?);

        loop {
            match (ours.next(), theirs.next()) {
                (None, None) => return Ok(true),
                (Some(a), Some(b)) => {
                    if !commits_match(self, &a?, other, &b?)? {
                        return Ok(false);
                    }
                }
                _ => return Ok(false),
            }
        }
    }

    pub fn create_blob(&self, data: Bytes) -> anyhow::Result<ObjectId> {
        self.store.store(ObjectContent::Blob(data), None)
    }

    pub fn create_tree(&self, records: Vec<TreeRecord>) -> anyhow::Result<ObjectId> {
        self.store.store(ObjectContent::Tree(records), None)
    }

    pub fn create_commit(&self, branch: &str, commit: CommitPayload) -> anyhow::Result<ObjectId> {
        let id = self.store.store(ObjectContent::Commit(commit), None)?;
        self.store.update_branch(branch, &id)?;
        Ok(id)
    }
}

fn commits_match<A: ObjectStore, B: ObjectStore>(
    repo_a: &Repository<A>,
    a: &Rc<GitObject>,
    repo_b: &Repository<B>,
    b: &Rc<GitObject>,
) -> anyhow::Result<bool> {
    let (ca, cb) = (a.as_commit()?, b.as_commit()?);

    if ca.author.display() != cb.author.display()
        || ca.committer.as_ref().map(|c| c.display()) != cb.committer.as_ref().map(|c| c.display())
        || ca.subject != cb.subject
        || ca.parents.len() != cb.parents.len()
    {
        return Ok(false);
    }

    trees_match(repo_a, &ca.tree, repo_b, &cb.tree)
}

fn trees_match<A: ObjectStore, B: ObjectStore>(
    repo_a: &Repository<A>,
    tree_a: &ObjectId,
    repo_b: &Repository<B>,
    tree_b: &ObjectId,
) -> anyhow::Result<bool> {
    let a = repo_a.load_object(tree_a, Some(ObjectKind::Tree), 0, false)?;
    let b = repo_b.load_object(tree_b, Some(ObjectKind::Tree), 0, false)?;

    let mut entries_a = a.as_tree()?.to_vec();
    let mut entries_b = b.as_tree()?.to_vec();
    entries_a.sort_by(|x, y| x.name.cmp(&y.name));
    entries_b.sort_by(|x, y| x.name.cmp(&y.name));

    if entries_a.len() != entries_b.len() {
        return Ok(false);
    }

    for (ea, eb) in entries_a.iter().zip(&entries_b) {
        if ea.name != eb.name || ea.mode != eb.mode {
            return Ok(false);
        }

        if ea.mode.is_opaque() {
            // Opaque targets are carried across backends verbatim, so the
            // hash itself is the content.
            if ea.id != eb.id {
                return Ok(false);
            }
        } else if ea.mode.is_tree() {
            if !trees_match(repo_a, &ea.id, repo_b, &eb.id)? {
                return Ok(false);
            }
        } else {
            let blob_a = repo_a.load_object(&ea.id, Some(ObjectKind::Blob), 0, true)?;
            let blob_b = repo_b.load_object(&eb.id, Some(ObjectKind::Blob), 0, true)?;
            if blob_a.blob_data()? != blob_b.blob_data()? {
                return Ok(false);
            }
        }
    }

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::areas::memory::MemoryStore;
    use crate::artifacts::objects::commit::Author;
    use crate::artifacts::objects::entry_mode::{EntryMode, FileMode};
    use pretty_assertions::assert_eq;

    fn author() -> Author {
        Author::try_from("Alice <alice@example.com> 1700000000 +0000").unwrap()
    }

    fn seed(repo: &Repository<MemoryStore>, files: &[(&str, &[u8])], parents: Vec<ObjectId>) -> ObjectId {
        let mut records = Vec::new();
        for (name, data) in files {
            let blob = repo.create_blob(Bytes::copy_from_slice(data)).unwrap();
            records.push(TreeRecord::new(
                EntryMode::File(FileMode::Regular),
                name.to_string(),
                blob,
            ));
        }
        let tree = repo.create_tree(records).unwrap();

        repo.create_commit(
            "master",
            CommitPayload {
                tree,
                parents,
                author: author(),
                committer: Some(author()),
                subject: Some("seed".to_string()),
            },
        )
        .unwrap()
    }

    #[test]
    fn validate_counts_reachable_commits() {
        let repo = Repository::new(MemoryStore::new());
        let first = seed(&repo, &[("a.txt", b"one")], vec![]);
        seed(&repo, &[("a.txt", b"two")], vec![first]);

        assert_eq!(repo.validate().unwrap(), 2);
        assert_eq!(repo.commit_count().unwrap(), 2);
    }

    #[test]
    fn loading_a_blob_as_a_tree_is_a_type_error() {
        let repo = Repository::new(MemoryStore::new());
        let blob = repo.create_blob(Bytes::from_static(b"data")).unwrap();

        let err = repo
            .load_object(&blob, Some(ObjectKind::Tree), 0, false)
            .unwrap_err();
        let err = err.downcast::<ObjectError>().unwrap();
        assert_eq!(
            err,
            ObjectError::InvalidType {
                expected: "tree".to_string(),
                actual: "blob".to_string(),
            }
        );
    }

    #[test]
    fn cached_blob_is_reloaded_when_data_is_needed() {
        let repo = Repository::new(MemoryStore::new());
        let blob = repo.create_blob(Bytes::from_static(b"payload")).unwrap();

        let without = repo.load_object(&blob, None, 0, false).unwrap();
        assert!(!without.has_blob_data());

        let with = repo.load_object(&blob, None, 0, true).unwrap();
        assert_eq!(with.blob_data().unwrap().as_ref(), b"payload");

        // The upgraded copy replaces the data-less one in the cache.
        let again = repo.load_object(&blob, None, 0, false).unwrap();
        assert!(again.has_blob_data());
    }

    #[test]
    fn max_parents_finds_the_merge() {
        let repo = Repository::new(MemoryStore::new());
        let a = seed(&repo, &[("f", b"a")], vec![]);
        let b = seed(&repo, &[("f", b"b")], vec![a.clone()]);
        let c = seed(&repo, &[("g", b"c")], vec![a.clone()]);
        let merge = seed(&repo, &[("f", b"b"), ("g", b"c")], vec![b, c]);

        assert_eq!(repo.max_parents().unwrap(), (merge, 2));
    }

    #[test]
    fn ancestors_equal_detects_a_divergent_subject() {
        let left = Repository::new(MemoryStore::new());
        let right = Repository::new(MemoryStore::new());

        seed(&left, &[("a", b"same")], vec![]);
        seed(&right, &[("a", b"same")], vec![]);
        assert!(left.ancestors_equal(&right).unwrap());

        let other = Repository::new(MemoryStore::new());
        seed(&other, &[("a", b"different")], vec![]);
        assert!(!left.ancestors_equal(&other).unwrap());
    }
}
