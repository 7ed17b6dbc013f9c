use loupe::areas::memory::MemoryStore;
use loupe::areas::relational::RelationalStore;
use loupe::areas::repository::Repository;
use loupe::areas::store::ObjectStore;
use pretty_assertions::assert_eq;

mod common;

#[test]
fn filesystem_history_round_trips_through_memory_and_sqlite() {
    let dir = assert_fs::TempDir::new().unwrap();
    let source = common::open_repo(dir.path());
    common::linear_history(&source);

    let memory = Repository::new(MemoryStore::new());
    source.clone_into(&memory, "master").unwrap();

    assert_eq!(memory.commit_count().unwrap(), 3);
    assert_eq!(memory.validate().unwrap(), 3);
    assert!(source.ancestors_equal(&memory).unwrap());

    // Hashes are recomputed per encoding, so ids differ across backends.
    assert_ne!(source.head_id().unwrap(), memory.head_id().unwrap());

    let relational = Repository::new(RelationalStore::open_in_memory().unwrap());
    memory.clone_into(&relational, "master").unwrap();

    assert_eq!(relational.validate().unwrap(), 3);
    assert!(memory.ancestors_equal(&relational).unwrap());
    assert!(source.ancestors_equal(&relational).unwrap());
}

#[test]
fn cloning_into_the_same_target_twice_adds_nothing() {
    let dir = assert_fs::TempDir::new().unwrap();
    let source = common::open_repo(dir.path());
    common::linear_history(&source);

    let target = Repository::new(MemoryStore::new());
    let first = source.clone_into(&target, "master").unwrap();
    let objects = target.store().object_count();

    let second = source.clone_into(&target, "master").unwrap();
    assert_eq!(first, second);
    assert_eq!(target.store().object_count(), objects);
}

#[test]
fn identical_content_across_backends_shares_objects() {
    // Both commits carry a.txt@"first\n"; the clone must reuse the blob.
    let dir = assert_fs::TempDir::new().unwrap();
    let source = common::open_repo(dir.path());
    let first = common::commit_files(&source, &[("a.txt", b"first\n")], vec![], "one");
    common::commit_files(
        &source,
        &[("a.txt", b"first\n"), ("b.txt", b"two\n")],
        vec![first],
        "two",
    );

    let target = Repository::new(MemoryStore::new());
    source.clone_into(&target, "master").unwrap();

    // 2 commits, 2 distinct trees, 2 distinct blobs.
    assert_eq!(target.store().object_count(), 6);
}

#[test]
fn clone_updates_the_requested_branch() {
    let dir = assert_fs::TempDir::new().unwrap();
    let source = common::open_repo(dir.path());
    common::linear_history(&source);

    let target = Repository::new(MemoryStore::new());
    let head_clone = source.clone_into(&target, "mirror").unwrap();

    assert_eq!(target.branch_names().unwrap(), vec!["mirror".to_string()]);
    assert_eq!(
        target.store().resolve_head().unwrap(),
        None,
        "HEAD still points at master, which the clone did not create"
    );

    target.store().set_head("mirror");
    assert_eq!(target.head_id().unwrap(), head_clone);
}

#[test]
fn clone_into_a_fresh_filesystem_repository() {
    let source_dir = assert_fs::TempDir::new().unwrap();
    let source = common::open_repo(source_dir.path());
    common::linear_history(&source);

    let target_dir = assert_fs::TempDir::new().unwrap();
    let target = common::open_repo(target_dir.path());
    source.clone_into(&target, "master").unwrap();

    // Same text encoding on both sides, so ids survive unchanged.
    assert_eq!(source.head_id().unwrap(), target.head_id().unwrap());
    assert_eq!(target.validate().unwrap(), 3);
}
