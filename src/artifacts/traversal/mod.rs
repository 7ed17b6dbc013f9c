//! Breadth-first ancestor traversal
//!
//! Every whole-history operation (fsck, counting, cloning, comparison) sits
//! on the same walk: commits are visited level by level, each exactly once,
//! and parent links are followed in their stored order. Membership checks go
//! through a hash set so merge-heavy histories stay linear.

use crate::areas::repository::Repository;
use crate::areas::store::ObjectStore;
use crate::artifacts::objects::git_object::GitObject;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_kind::ObjectKind;
use std::collections::{HashSet, VecDeque};
use std::rc::Rc;
use tracing::trace;

/// Outcome of a full walk: commit ids in visit order plus one visitor
/// result per commit, index-aligned with `order`.
pub struct Visited<T> {
    pub order: Vec<ObjectId>,
    pub results: Vec<T>,
}

/// Visits every ancestor of `root` exactly once, newest first.
///
/// The visitor sees each loaded commit and its level (1 at the root). An
/// error from the visitor or a broken parent link aborts the walk.
pub fn visit_ancestors<S, T, F>(
    repo: &Repository<S>,
    root: &ObjectId,
    keep_blob_data: bool,
    mut visitor: F,
) -> anyhow::Result<Visited<T>>
where
    S: ObjectStore,
    F: FnMut(&Rc<GitObject>, u32) -> anyhow::Result<T>,
{
    let mut queue = VecDeque::new();
    let mut scheduled = HashSet::new();
    let mut order = Vec::new();
    let mut results = Vec::new();

    queue.push_back((root.clone(), 1));
    scheduled.insert(root.clone());

    while let Some((id, level)) = queue.pop_front() {
        let commit = repo.load_object(&id, Some(ObjectKind::Commit), level, keep_blob_data)?;
        trace!(id = %id, level, "visiting commit");

        results.push(visitor(&commit, level)?);
        order.push(id);

        for parent in &commit.as_commit()?.parents {
            if scheduled.insert(parent.clone()) {
                queue.push_back((parent.clone(), level + 1));
            }
        }
    }

    Ok(Visited { order, results })
}

/// Lazy form of the same walk, for lockstep comparison of two histories.
pub struct AncestorIter<'a, S: ObjectStore> {
    repo: &'a Repository<S>,
    queue: VecDeque<(ObjectId, u32)>,
    scheduled: HashSet<ObjectId>,
}

impl<'a, S: ObjectStore> AncestorIter<'a, S> {
    pub fn new(repo: &'a Repository<S>, root: ObjectId) -> Self {
        let mut queue = VecDeque::new();
        let mut scheduled = HashSet::new();
        queue.push_back((root.clone(), 1));
        scheduled.insert(root);

        AncestorIter {
            repo,
            queue,
            scheduled,
        }
    }
}

impl<S: ObjectStore> Iterator for AncestorIter<'_, S> {
    type Item = anyhow::Result<Rc<GitObject>>;

    fn next(&mut self) -> Option<Self::Item> {
        let (id, level) = self.queue.pop_front()?;

        let commit = match self
            .repo
            .load_object(&id, Some(ObjectKind::Commit), level, false)
        {
            Ok(commit) => commit,
            Err(err) => return Some(Err(err)),
        };

        let parents = match commit.as_commit() {
            Ok(payload) => &payload.parents,
            Err(err) => return Some(Err(err)),
        };
        for parent in parents {
            if self.scheduled.insert(parent.clone()) {
                self.queue.push_back((parent.clone(), level + 1));
            }
        }

        Some(Ok(commit))
    }
}
