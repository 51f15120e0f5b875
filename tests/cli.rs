use assert_cmd::prelude::*;
use flashread::ingest::book_id_for;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

const TEXT: &str = "The Quick Fox Runs Far. It was a fine day.";

fn flashread(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("flashread").unwrap();
    cmd.env("XDG_CONFIG_HOME", home)
        .env("HOME", home)
        .env_remove("RUST_LOG");
    cmd
}

fn write_book(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("fox.txt");
    fs::write(&path, TEXT).unwrap();
    path
}

#[test]
fn test_dump_prints_one_word_per_line() {
    let home = TempDir::new().unwrap();
    let book = write_book(&home);
    flashread(home.path())
        .arg("--dump")
        .arg(&book)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("The\nQuick\nFox\nRuns\nFar.\n"));
}

#[test]
fn test_add_then_history() {
    let home = TempDir::new().unwrap();
    let book = write_book(&home);
    let id = book_id_for("fox", TEXT);

    flashread(home.path())
        .arg("--add")
        .arg(&book)
        .assert()
        .success()
        .stdout(predicate::str::contains(format!(
            "Imported \"fox\" (10 words) as {id}"
        )));

    flashread(home.path())
        .arg("--add")
        .arg(&book)
        .assert()
        .success()
        .stdout(predicate::str::contains("already in the library"));

    flashread(home.path())
        .arg("-r")
        .assert()
        .success()
        .stdout(predicate::str::contains(id.as_str()))
        .stdout(predicate::str::contains("0%"))
        .stdout(predicate::str::contains("never"))
        .stdout(predicate::str::contains("fox"));

    assert!(home.path().join("flashread").join("states.db").exists());
    assert!(home.path().join("flashread").join("configuration.json").exists());
}

#[test]
fn test_delete_book() {
    let home = TempDir::new().unwrap();
    let book = write_book(&home);
    let id = book_id_for("fox", TEXT);
    flashread(home.path()).arg("--add").arg(&book).assert().success();

    flashread(home.path())
        .args(["--delete", id.as_str()])
        .assert()
        .success()
        .stdout(predicate::str::contains(format!("Deleted {id}")));
    flashread(home.path())
        .arg("--history")
        .assert()
        .success()
        .stdout(predicate::str::contains("No books in the library."));
    flashread(home.path())
        .args(["--delete", id.as_str()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No book with id"));
}

#[test]
fn test_stats_on_fresh_library() {
    let home = TempDir::new().unwrap();
    flashread(home.path())
        .arg("--stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("Last 7 days: 0 words in 0m 00s"));
}

#[test]
fn test_empty_library_hint() {
    let home = TempDir::new().unwrap();
    flashread(home.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Your library is empty."));
    assert!(home.path().join("flashread").join("flashread.log").exists());
}

#[test]
fn test_empty_file_is_rejected() {
    let home = TempDir::new().unwrap();
    let path = home.path().join("blank.txt");
    fs::write(&path, "  \n 12 \n").unwrap();
    flashread(home.path())
        .arg("--add")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("contains no readable words"));
}

#[test]
fn test_dump_requires_file() {
    let home = TempDir::new().unwrap();
    flashread(home.path()).arg("--dump").assert().failure();
}
