//! Materializing a tree on disk
//!
//! Walks a tree recursively, writing blobs as files with the permissions
//! their entry mode declares and creating directories for subtrees. Symlinks
//! and submodules are reported and skipped; their content lives outside the
//! object database.

use crate::areas::repository::Repository;
use crate::areas::store::ObjectStore;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_kind::ObjectKind;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Writes the tree at `tree_id` into `destination`, creating it first.
pub fn checkout_tree<S: ObjectStore>(
    repo: &Repository<S>,
    tree_id: &ObjectId,
    destination: &Path,
) -> anyhow::Result<()> {
    fs::create_dir_all(destination)?;
    checkout_into(repo, tree_id, destination)
}

fn checkout_into<S: ObjectStore>(
    repo: &Repository<S>,
    tree_id: &ObjectId,
    destination: &Path,
) -> anyhow::Result<()> {
    let tree = repo.load_object(tree_id, Some(ObjectKind::Tree), 0, false)?;

    for record in tree.as_tree()? {
        let path = destination.join(&record.name);

        if record.mode.is_opaque() {
            info!(path = %path.display(), "skipping symlink or submodule");
            continue;
        }

        if record.mode.is_tree() {
            debug!(path = %path.display(), "creating folder");
            fs::create_dir_all(&path)?;
            checkout_into(repo, &record.id, &path)?;
        } else {
            let blob = repo.load_object(&record.id, Some(ObjectKind::Blob), 0, true)?;
            fs::write(&path, blob.blob_data()?)?;
            set_permissions(&path, &record.mode)?;
        }
    }

    Ok(())
}

#[cfg(unix)]
fn set_permissions(
    path: &Path,
    mode: &crate::artifacts::objects::entry_mode::EntryMode,
) -> anyhow::Result<()> {
    use crate::artifacts::objects::entry_mode::EntryMode;
    use std::os::unix::fs::PermissionsExt;

    if let EntryMode::File(file_mode) = mode {
        if let Some(permissions) = file_mode.permissions() {
            fs::set_permissions(path, fs::Permissions::from_mode(permissions))?;
        }
    }
    Ok(())
}

#[cfg(not(unix))]
fn set_permissions(
    _path: &Path,
    _mode: &crate::artifacts::objects::entry_mode::EntryMode,
) -> anyhow::Result<()> {
    Ok(())
}
