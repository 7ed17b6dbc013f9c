use loupe::artifacts::diff::changes::ChangeAction;
use pretty_assertions::assert_eq;

mod common;

#[test]
fn linear_history_reports_each_step() {
    let dir = assert_fs::TempDir::new().unwrap();
    let repo = common::open_repo(dir.path());
    let commits = common::linear_history(&repo);

    let first = repo.changes_introduced_by(&commits[0]).unwrap();
    assert_eq!(
        first
            .iter()
            .map(|c| (c.path.as_str(), c.action))
            .collect::<Vec<_>>(),
        vec![("a.txt", ChangeAction::Created)]
    );

    let second = repo.changes_introduced_by(&commits[1]).unwrap();
    assert_eq!(
        second
            .iter()
            .map(|c| (c.path.as_str(), c.action))
            .collect::<Vec<_>>(),
        vec![("b.txt", ChangeAction::Created)]
    );

    let third = repo.changes_introduced_by(&commits[2]).unwrap();
    assert_eq!(
        third
            .iter()
            .map(|c| (c.path.as_str(), c.action))
            .collect::<Vec<_>>(),
        vec![("a.txt", ChangeAction::Updated)]
    );
    assert_eq!(third[0].old.len(), 1);
    assert_ne!(third[0].old.first(), third[0].new.as_ref());
}

#[test]
fn moving_content_between_names_is_one_rename() {
    let dir = assert_fs::TempDir::new().unwrap();
    let repo = common::open_repo(dir.path());

    let base = common::commit_files(
        &repo,
        &[("before.txt", b"stable content\n"), ("other", b"o")],
        vec![],
        "base",
    );
    let moved = common::commit_files(
        &repo,
        &[("after.txt", b"stable content\n"), ("other", b"o")],
        vec![base],
        "move",
    );

    let changes = repo.changes_introduced_by(&moved).unwrap();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].action, ChangeAction::Renamed);
    assert_eq!(changes[0].path, "before.txt -> after.txt");
}

#[test]
fn merge_that_only_combines_parents_introduces_nothing() {
    let dir = assert_fs::TempDir::new().unwrap();
    let repo = common::open_repo(dir.path());

    let base = common::commit_files(&repo, &[("shared", b"base")], vec![], "base");
    let left = common::commit_files(
        &repo,
        &[("shared", b"base"), ("left", b"l")],
        vec![base.clone()],
        "left",
    );
    let right = common::commit_files(
        &repo,
        &[("shared", b"base"), ("right", b"r")],
        vec![base],
        "right",
    );
    let merge = common::commit_files(
        &repo,
        &[("shared", b"base"), ("left", b"l"), ("right", b"r")],
        vec![left, right],
        "merge",
    );

    assert_eq!(repo.changes_introduced_by(&merge).unwrap(), vec![]);
}

#[test]
fn content_changed_against_every_parent_is_an_update() {
    let dir = assert_fs::TempDir::new().unwrap();
    let repo = common::open_repo(dir.path());

    let left = common::commit_files(&repo, &[("f", b"left")], vec![], "left");
    let right = common::commit_files(&repo, &[("f", b"right")], vec![], "right");
    let merge = common::commit_files(&repo, &[("f", b"resolved")], vec![left, right], "merge");

    let changes = repo.changes_introduced_by(&merge).unwrap();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].action, ChangeAction::Updated);
    // One prior id per disagreeing parent.
    assert_eq!(changes[0].old.len(), 2);
}
