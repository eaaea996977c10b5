//! Tests for recovery from corrupted or unreadable archive files.
//!
//! A damaged archive must never prevent a session from starting: the
//! store falls back to an empty archive and the next save rewrites a
//! valid file.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn cli() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("resq"))
}

fn write_archive(dir: &TempDir, contents: &str) {
    fs::write(dir.path().join("archive.json"), contents).expect("Failed to write archive");
}

#[test]
fn test_log_survives_corrupted_archive() {
    let temp_dir = tempfile::tempdir().unwrap();
    write_archive(&temp_dir, "{ this is not json");

    cli()
        .arg("log")
        .arg("--data-dir")
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("No archived sessions"));
}

#[test]
fn test_log_survives_wrong_shape() {
    let temp_dir = tempfile::tempdir().unwrap();
    // Valid JSON, but not a session array
    write_archive(&temp_dir, r#"{"sessions": 42}"#);

    cli()
        .arg("log")
        .arg("--data-dir")
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("No archived sessions"));
}

#[test]
fn test_log_survives_empty_file() {
    let temp_dir = tempfile::tempdir().unwrap();
    write_archive(&temp_dir, "");

    cli()
        .arg("log")
        .arg("--data-dir")
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("No archived sessions"));
}

#[test]
fn test_demo_rewrites_corrupted_archive() {
    let temp_dir = tempfile::tempdir().unwrap();
    write_archive(&temp_dir, "garbage\x00data");

    cli()
        .arg("demo")
        .arg("--data-dir")
        .arg(temp_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Session archived"));

    // The archive is valid again and holds exactly the new session
    let archive: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(temp_dir.path().join("archive.json")).unwrap(),
    )
    .expect("archive rewritten as valid JSON");
    assert_eq!(archive.as_array().unwrap().len(), 1);
}

#[test]
fn test_archive_truncated_mid_write() {
    let temp_dir = tempfile::tempdir().unwrap();

    // Produce a valid archive, then truncate it as a crash would
    cli()
        .arg("demo")
        .arg("--data-dir")
        .arg(temp_dir.path())
        .assert()
        .success();

    let path = temp_dir.path().join("archive.json");
    let full = fs::read_to_string(&path).unwrap();
    fs::write(&path, &full[..full.len() / 2]).unwrap();

    // The truncated half is dropped; a fresh session still archives
    cli()
        .arg("demo")
        .arg("--data-dir")
        .arg(temp_dir.path())
        .assert()
        .success();

    let archive: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(archive.as_array().unwrap().len(), 1);
}

#[test]
fn test_no_temp_files_left_behind() {
    let temp_dir = tempfile::tempdir().unwrap();

    cli()
        .arg("demo")
        .arg("--data-dir")
        .arg(temp_dir.path())
        .assert()
        .success();

    let entries: Vec<_> = fs::read_dir(temp_dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(entries, vec!["archive.json"]);
}
