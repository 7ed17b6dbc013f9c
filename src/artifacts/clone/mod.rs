//! Cross-backend cloning
//!
//! Clone runs in two phases over one ancestor walk. Phase one visits every
//! commit newest first and clones its full tree (blobs included) into the
//! target, leaving a tree-clone marker per commit; commits the target
//! already cloned are marked done immediately, which is what makes an
//! interrupted clone resumable. Phase two turns markers into commits oldest
//! first, so each commit's parent clones exist before the commit itself is
//! written. Hashes are recomputed by the target, so a clone is content-equal
//! but not hash-equal across encodings.
//!
//! Symlink and submodule entries are carried by hash; their targets are
//! never objects in the source database.

use crate::areas::repository::Repository;
use crate::areas::store::ObjectStore;
use crate::artifacts::objects::commit::CommitPayload;
use crate::artifacts::objects::git_object::ObjectContent;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_kind::ObjectKind;
use crate::artifacts::objects::tree::TreeRecord;
use crate::artifacts::traversal::visit_ancestors;
use std::collections::HashMap;
use tracing::{debug, info};

#[derive(Debug, Clone)]
enum CloneRecord {
    /// Tree cloned, commit still pending.
    Tree(ObjectId),
    /// Commit fully cloned under this target id.
    Commit(ObjectId),
}

/// Clones the whole history reachable from the source HEAD into `target`
/// and points `branch` there. Returns the target id of the head clone.
pub fn clone_into<S: ObjectStore, T: ObjectStore>(
    source: &Repository<S>,
    target: &Repository<T>,
    branch: &str,
) -> anyhow::Result<ObjectId> {
    let head = source.head_id()?;
    let mut memo: HashMap<ObjectId, ObjectId> = HashMap::new();

    let visited = visit_ancestors(source, &head, false, |commit, level| {
        info!(level, id = %commit.id(), "cloning commit");

        if let Some(existing) = target.store().find_cloned(commit.id())? {
            return Ok(CloneRecord::Commit(existing));
        }

        let tree_clone = clone_tree(source, target, &commit.as_commit()?.tree, &mut memo)?;
        Ok(CloneRecord::Tree(tree_clone))
    })?;

    let order = visited.order;
    let mut records: HashMap<ObjectId, CloneRecord> =
        order.iter().cloned().zip(visited.results).collect();

    // Commits are created one scan at a time, oldest pending first, and only
    // once every parent has a clone.
    loop {
        let pending: Vec<ObjectId> = order
            .iter()
            .rev()
            .filter(|id| matches!(records.get(*id), Some(CloneRecord::Tree(_))))
            .cloned()
            .collect();

        if pending.is_empty() {
            break;
        }

        let mut advanced = false;
        for id in pending {
            let commit = source.load_object(&id, Some(ObjectKind::Commit), 0, false)?;
            let payload = commit.as_commit()?;

            let parent_clones: Option<Vec<ObjectId>> = payload
                .parents
                .iter()
                .map(|parent| match records.get(parent) {
                    Some(CloneRecord::Commit(clone)) => Some(clone.clone()),
                    _ => None,
                })
                .collect();
            let Some(parents) = parent_clones else {
                continue;
            };

            let tree = match records.get(&id) {
                Some(CloneRecord::Tree(tree)) => tree.clone(),
                _ => continue,
            };

            let cloned = target.store().store(
                ObjectContent::Commit(CommitPayload {
                    tree,
                    parents,
                    author: payload.author.clone(),
                    committer: payload.committer.clone(),
                    subject: payload.subject.clone(),
                }),
                Some(&id),
            )?;

            records.insert(id, CloneRecord::Commit(cloned));
            advanced = true;
            break;
        }

        if !advanced {
            anyhow::bail!("Unable to schedule remaining commits; a parent link is outside the walked history");
        }
    }

    let head_clone = match records.get(&head) {
        Some(CloneRecord::Commit(clone)) => clone.clone(),
        _ => anyhow::bail!("Head commit {head} was never cloned"),
    };

    target.store().update_branch(branch, &head_clone)?;
    Ok(head_clone)
}

fn clone_tree<S: ObjectStore, T: ObjectStore>(
    source: &Repository<S>,
    target: &Repository<T>,
    tree_id: &ObjectId,
    memo: &mut HashMap<ObjectId, ObjectId>,
) -> anyhow::Result<ObjectId> {
    if let Some(done) = memo.get(tree_id) {
        return Ok(done.clone());
    }
    if let Some(existing) = target.store().find_cloned(tree_id)? {
        memo.insert(tree_id.clone(), existing.clone());
        return Ok(existing);
    }

    debug!(id = %tree_id, "cloning tree");
    let tree = source.load_object(tree_id, Some(ObjectKind::Tree), 0, false)?;

    let mut cloned_records = Vec::new();
    for record in tree.as_tree()? {
        let cloned_id = if record.mode.is_opaque() {
            record.id.clone()
        } else if record.mode.is_tree() {
            clone_tree(source, target, &record.id, memo)?
        } else {
            clone_blob(source, target, &record.id, memo)?
        };

        cloned_records.push(TreeRecord::new(record.mode, record.name.clone(), cloned_id));
    }

    let cloned = target
        .store()
        .store(ObjectContent::Tree(cloned_records), Some(tree_id))?;
    memo.insert(tree_id.clone(), cloned.clone());
    Ok(cloned)
}

fn clone_blob<S: ObjectStore, T: ObjectStore>(
    source: &Repository<S>,
    target: &Repository<T>,
    blob_id: &ObjectId,
    memo: &mut HashMap<ObjectId, ObjectId>,
) -> anyhow::Result<ObjectId> {
    if let Some(done) = memo.get(blob_id) {
        return Ok(done.clone());
    }
    if let Some(existing) = target.store().find_cloned(blob_id)? {
        memo.insert(blob_id.clone(), existing.clone());
        return Ok(existing);
    }

    let blob = source.load_object(blob_id, Some(ObjectKind::Blob), 0, true)?;
    let cloned = target
        .store()
        .store(ObjectContent::Blob(blob.blob_data()?.clone()), Some(blob_id))?;
    memo.insert(blob_id.clone(), cloned.clone());
    Ok(cloned)
}
