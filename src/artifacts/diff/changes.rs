//! Tree comparison and per-commit change lists
//!
//! Comparison is n-way: a tree is diffed against the same-named entries of
//! any number of counterpart trees at once, which is what merge commits
//! need. Deletions are recovered by running the comparison the other way
//! around (entries a parent has that the child lost show up as creations
//! from the parent's point of view) and intersecting across parents, so a
//! file only counts as deleted when every parent lost it. A final pass
//! collapses a created/deleted pair over identical content into a rename.

use crate::areas::repository::Repository;
use crate::areas::store::ObjectStore;
use crate::artifacts::objects::git_object::GitObject;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_kind::ObjectKind;
use crate::artifacts::objects::tree::TreeRecord;
use std::rc::Rc;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeAction {
    Created,
    Updated,
    Deleted,
    Renamed,
}

impl ChangeAction {
    pub fn status_letter(&self) -> char {
        match self {
            ChangeAction::Created => 'A',
            ChangeAction::Updated => 'M',
            ChangeAction::Deleted => 'D',
            ChangeAction::Renamed => 'R',
        }
    }
}

/// One changed path. `old` holds the distinct prior content ids in short
/// form (one per parent that disagreed, empty for creations); `new` holds
/// the resulting content id, absent for deletions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub path: String,
    pub action: ChangeAction,
    pub old: Vec<String>,
    pub new: Option<String>,
}

/// Diffs `tree` against the same-named entries of each tree in `others`.
///
/// An entry counts as created when no counterpart carries its name, and as
/// updated when counterparts exist but none share its id. Unchanged entries
/// and opaque ones (symlinks, submodules) produce nothing.
pub fn changes_between<S: ObjectStore>(
    repo: &Repository<S>,
    tree: &Rc<GitObject>,
    others: &[Rc<GitObject>],
    prefix: Option<&str>,
) -> anyhow::Result<Vec<Change>> {
    let mut changes = Vec::new();

    for record in tree.as_tree()? {
        let path = match prefix {
            Some(prefix) => format!("{prefix}/{}", record.name),
            None => record.name.clone(),
        };

        if record.mode.is_opaque() {
            debug!(path = %path, "skipping opaque entry");
            continue;
        }

        let counterparts: Vec<&TreeRecord> = others
            .iter()
            .filter_map(|other| {
                other
                    .as_tree()
                    .ok()
                    .and_then(|records| records.iter().find(|r| r.name == record.name))
            })
            .collect();

        let action = if counterparts.is_empty() {
            Some((ChangeAction::Created, Vec::new()))
        } else if !counterparts.iter().any(|c| c.id == record.id) {
            let mut old: Vec<String> = Vec::new();
            for counterpart in &counterparts {
                let short = counterpart.id.to_short_oid();
                if !old.contains(&short) {
                    old.push(short);
                }
            }
            Some((ChangeAction::Updated, old))
        } else {
            None
        };

        let Some((action, old)) = action else {
            continue;
        };

        if record.mode.is_tree() {
            let subtree = repo.load_object(&record.id, Some(ObjectKind::Tree), 0, false)?;
            let subtree_others = counterparts
                .iter()
                .filter(|c| c.mode.is_tree())
                .map(|c| repo.load_object(&c.id, Some(ObjectKind::Tree), 0, false))
                .collect::<anyhow::Result<Vec<_>>>()?;

            changes.extend(changes_between(repo, &subtree, &subtree_others, Some(&path))?);
        } else {
            changes.push(Change {
                path,
                action,
                old,
                new: Some(record.id.to_short_oid()),
            });
        }
    }

    Ok(changes)
}

/// The change list of one commit relative to all of its parents.
pub fn changes_introduced_by<S: ObjectStore>(
    repo: &Repository<S>,
    id: &ObjectId,
) -> anyhow::Result<Vec<Change>> {
    let commit = repo.load_object(id, Some(ObjectKind::Commit), 1, false)?;
    let payload = commit.as_commit()?;

    let tree = repo.load_object(&payload.tree, Some(ObjectKind::Tree), 1, false)?;
    let parent_trees = payload
        .parents
        .iter()
        .map(|parent| {
            let parent = repo.load_object(parent, Some(ObjectKind::Commit), 2, false)?;
            repo.load_object(&parent.as_commit()?.tree, Some(ObjectKind::Tree), 2, false)
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let mut changes = changes_between(repo, &tree, &parent_trees, None)?;

    let reversed = parent_trees
        .iter()
        .map(|parent_tree| {
            let created = changes_between(repo, parent_tree, std::slice::from_ref(&tree), None)?
                .into_iter()
                .filter(|change| change.action == ChangeAction::Created)
                .map(|change| Change {
                    path: change.path,
                    action: ChangeAction::Deleted,
                    old: change.new.into_iter().collect(),
                    new: None,
                })
                .collect::<Vec<_>>();
            Ok(created)
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    changes.extend(intersect(reversed));

    Ok(collapse_renames(changes))
}

/// Items present in every list, in the order of the first.
fn intersect(lists: Vec<Vec<Change>>) -> Vec<Change> {
    let mut lists = lists.into_iter();
    let mut acc = lists.next().unwrap_or_default();
    for list in lists {
        acc.retain(|change| list.contains(change));
    }
    acc
}

/// Replaces each created/deleted pair over the same content with one
/// renamed entry, `old_path -> new_path`.
fn collapse_renames(mut changes: Vec<Change>) -> Vec<Change> {
    let deleted: Vec<Change> = changes
        .iter()
        .filter(|change| change.action == ChangeAction::Deleted)
        .cloned()
        .collect();

    for deletion in deleted {
        let matched = changes.iter().position(|change| {
            change.action == ChangeAction::Created && change.new.as_deref() == deletion.old.first().map(String::as_str)
        });

        if let Some(created_at) = matched {
            let created = changes.remove(created_at);
            changes.retain(|change| *change != deletion);
            changes.push(Change {
                path: format!("{} -> {}", deletion.path, created.path),
                action: ChangeAction::Renamed,
                old: deletion.old.clone(),
                new: created.new,
            });
        }
    }

    changes
}
