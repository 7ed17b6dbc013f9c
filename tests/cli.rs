use assert_cmd::Command;
use assert_fs::prelude::*;
use predicates::prelude::predicate;

mod common;

#[test]
fn fsck_reports_the_commit_count() -> Result<(), Box<dyn std::error::Error>> {
    let dir = assert_fs::TempDir::new()?;
    let repo = common::open_repo(dir.path());
    common::linear_history(&repo);

    let mut sut = Command::cargo_bin("loupe")?;
    sut.arg("--path").arg(dir.path()).arg("fsck");

    sut.assert()
        .success()
        .stdout(predicate::str::contains("3 commits validated"));

    Ok(())
}

#[test]
fn fsck_fails_loudly_on_a_missing_object() -> Result<(), Box<dyn std::error::Error>> {
    let dir = assert_fs::TempDir::new()?;
    let repo = common::open_repo(dir.path());
    common::linear_history(&repo);

    let gone = loupe::artifacts::objects::object_id::ObjectId::digest_of(b"blob 8\0changed\n");
    common::remove_object(repo.store().git_path(), &gone);

    let mut sut = Command::cargo_bin("loupe")?;
    sut.arg("--path").arg(dir.path()).arg("fsck");

    sut.assert()
        .failure()
        .stderr(predicate::str::contains("not found"));

    Ok(())
}

#[test]
fn count_and_branches_print_plain_values() -> Result<(), Box<dyn std::error::Error>> {
    let dir = assert_fs::TempDir::new()?;
    let repo = common::open_repo(dir.path());
    common::linear_history(&repo);

    Command::cargo_bin("loupe")?
        .arg("--path")
        .arg(dir.path())
        .arg("count")
        .assert()
        .success()
        .stdout(predicate::str::diff("3\n"));

    Command::cargo_bin("loupe")?
        .arg("--path")
        .arg(dir.path())
        .arg("branches")
        .assert()
        .success()
        .stdout(predicate::str::diff("master\n"));

    Ok(())
}

#[test]
fn changes_defaults_to_head() -> Result<(), Box<dyn std::error::Error>> {
    let dir = assert_fs::TempDir::new()?;
    let repo = common::open_repo(dir.path());
    common::linear_history(&repo);

    let mut sut = Command::cargo_bin("loupe")?;
    sut.arg("--path").arg(dir.path()).arg("changes");

    sut.assert()
        .success()
        .stdout(predicate::str::starts_with("M\ta.txt"));

    Ok(())
}

#[test]
fn checkout_writes_the_snapshot() -> Result<(), Box<dyn std::error::Error>> {
    let dir = assert_fs::TempDir::new()?;
    let repo = common::open_repo(dir.path());
    common::linear_history(&repo);

    let out = assert_fs::TempDir::new()?;
    let mut sut = Command::cargo_bin("loupe")?;
    sut.arg("--path")
        .arg(dir.path())
        .arg("checkout")
        .arg(out.path());

    sut.assert().success();
    out.child("a.txt").assert("changed\n");
    out.child("b.txt").assert("second\n");

    Ok(())
}

#[test]
fn clone_to_sqlite_and_fsck_the_clone() -> Result<(), Box<dyn std::error::Error>> {
    let dir = assert_fs::TempDir::new()?;
    let repo = common::open_repo(dir.path());
    common::linear_history(&repo);

    let db_dir = assert_fs::TempDir::new()?;
    let db_path = db_dir.path().join("clone.db");

    Command::cargo_bin("loupe")?
        .arg("--path")
        .arg(dir.path())
        .arg("clone")
        .arg(&db_path)
        .arg("--to")
        .arg("sqlite")
        .assert()
        .success()
        .stdout(predicate::str::contains("Cloned HEAD as "));

    // The sqlite clone seeds HEAD at master, which the clone created.
    Command::cargo_bin("loupe")?
        .arg("--backend")
        .arg("sqlite")
        .arg("--path")
        .arg(&db_path)
        .arg("fsck")
        .assert()
        .success()
        .stdout(predicate::str::contains("3 commits validated"));

    Ok(())
}

#[test]
fn clone_to_a_bare_git_directory() -> Result<(), Box<dyn std::error::Error>> {
    let dir = assert_fs::TempDir::new()?;
    let repo = common::open_repo(dir.path());
    common::linear_history(&repo);

    let target = assert_fs::TempDir::new()?;
    Command::cargo_bin("loupe")?
        .arg("--path")
        .arg(dir.path())
        .arg("clone")
        .arg(target.path())
        .assert()
        .success();

    Command::cargo_bin("loupe")?
        .arg("--path")
        .arg(target.path())
        .arg("--bare")
        .arg("count")
        .assert()
        .success()
        .stdout(predicate::str::diff("3\n"));

    Ok(())
}
