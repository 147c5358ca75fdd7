use std::fs;

use emx_core::EmxError;
use emx_plat::WorkspaceLock;

#[test]
fn the_lock_is_scoped_to_the_guard() {
    let temp = tempfile::tempdir().expect("temp dir");
    fs::create_dir(temp.path().join(".git")).expect("git dir");
    let lock_path = temp.path().join(".git/emx-workspace.lock");

    let guard = WorkspaceLock::acquire(temp.path()).expect("first acquisition");
    assert!(lock_path.is_file());

    let contended = WorkspaceLock::acquire(temp.path());
    assert!(matches!(contended, Err(EmxError::Precondition(_))));

    drop(guard);
    assert!(!lock_path.exists());
    let _again = WorkspaceLock::acquire(temp.path()).expect("re-acquisition after drop");
}

#[test]
fn a_missing_git_directory_is_an_io_error() {
    let temp = tempfile::tempdir().expect("temp dir");
    let err = WorkspaceLock::acquire(temp.path()).expect_err("no .git directory");
    assert!(matches!(err, EmxError::Io(_)));
}

#[test]
fn the_lock_file_names_its_owner() {
    let temp = tempfile::tempdir().expect("temp dir");
    fs::create_dir(temp.path().join(".git")).expect("git dir");

    let _guard = WorkspaceLock::acquire(temp.path()).expect("acquisition");
    let payload =
        fs::read_to_string(temp.path().join(".git/emx-workspace.lock")).expect("lock payload");
    assert!(payload.contains(&std::process::id().to_string()));
}
