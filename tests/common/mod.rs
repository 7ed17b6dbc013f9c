#![allow(dead_code)]

use bytes::Bytes;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use loupe::areas::filesystem::FilesystemStore;
use loupe::areas::repository::Repository;
use loupe::artifacts::objects::commit::{Author, CommitPayload};
use loupe::artifacts::objects::entry_mode::{EntryMode, FileMode};
use loupe::artifacts::objects::object_id::ObjectId;
use loupe::artifacts::objects::tree::TreeRecord;
use std::io::Write;
use std::path::Path;

pub fn author() -> Author {
    Author::try_from("Test Author <test@example.com> 1700000000 +0000").unwrap()
}

/// Opens (and initializes) a filesystem repository rooted at `path`.
pub fn open_repo(path: &Path) -> Repository<FilesystemStore> {
    let store = FilesystemStore::new(path, false);
    store.init().unwrap();
    Repository::new(store)
}

/// Creates one commit holding the given files at the top level, pointing
/// `master` at it.
pub fn commit_files(
    repo: &Repository<FilesystemStore>,
    files: &[(&str, &[u8])],
    parents: Vec<ObjectId>,
    subject: &str,
) -> ObjectId {
    let records = files
        .iter()
        .map(|(name, data)| {
            let blob = repo.create_blob(Bytes::copy_from_slice(data)).unwrap();
            TreeRecord::new(EntryMode::File(FileMode::Regular), name.to_string(), blob)
        })
        .collect();
    let tree = repo.create_tree(records).unwrap();

    repo.create_commit(
        "master",
        CommitPayload {
            tree,
            parents,
            author: author(),
            committer: Some(author()),
            subject: Some(subject.to_string()),
        },
    )
    .unwrap()
}

/// Three commits on master: a.txt appears, b.txt appears, a.txt changes.
pub fn linear_history(repo: &Repository<FilesystemStore>) -> Vec<ObjectId> {
    let first = commit_files(repo, &[("a.txt", b"first\n")], vec![], "add a");
    let second = commit_files(
        repo,
        &[("a.txt", b"first\n"), ("b.txt", b"second\n")],
        vec![first.clone()],
        "add b",
    );
    let third = commit_files(
        repo,
        &[("a.txt", b"changed\n"), ("b.txt", b"second\n")],
        vec![second.clone()],
        "change a",
    );
    vec![first, second, third]
}

/// Plants a loose object whose file name does not match its content, the
/// shape of on-disk corruption fsck must catch. Returns the planted id.
pub fn plant_corrupt_object(git_path: &Path, frame: &[u8], lying_id: &str) -> ObjectId {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(frame).unwrap();
    let compressed = encoder.finish().unwrap();

    let (dir, file) = lying_id.split_at(2);
    let object_dir = git_path.join("objects").join(dir);
    std::fs::create_dir_all(&object_dir).unwrap();
    std::fs::write(object_dir.join(file), compressed).unwrap();

    ObjectId::try_parse(lying_id.to_string()).unwrap()
}

/// Deletes the loose object file backing `id`.
pub fn remove_object(git_path: &Path, id: &ObjectId) {
    let path = git_path.join("objects").join(id.to_path());
    std::fs::remove_file(path).unwrap();
}
