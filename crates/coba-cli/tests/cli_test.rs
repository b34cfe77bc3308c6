//! End-to-end tests driving the `coba` binary directly, bypassing
//! `watch` (which requires real filesystem events) and exercising the
//! store through the `versions`/`restore` subcommands instead.

use std::fs;
use std::process::Command;

use assert_cmd::cargo::cargo_bin;
use chrono::{Duration, Utc};
use tempfile::TempDir;

fn coba(store: &std::path::Path) -> Command {
    let mut cmd = Command::new(cargo_bin("coba"));
    cmd.env("COBA_STORE", store);
    cmd
}

fn seed_version(store_root: &std::path::Path, path: &std::path::Path, content: &[u8], stored_at: chrono::DateTime<Utc>) {
    let store = coba_store::Store::open(store_root).unwrap();
    let source = path.with_extension("src");
    fs::write(&source, content).unwrap();
    let hash = store.cas().put(&source).unwrap();
    let normalized = coba_path::normalize(path).unwrap();
    store
        .index()
        .lock()
        .unwrap()
        .append(&normalized, &hash.to_string(), stored_at)
        .unwrap();
}

#[test]
fn versions_lists_nothing_for_an_unknown_path() {
    let dir = TempDir::new().unwrap();
    let store = dir.path().join("store");
    let target = dir.path().join("ghost.txt");
    fs::write(&target, b"irrelevant").unwrap();

    let output = coba(&store).args(["versions", target.to_str().unwrap()]).output().unwrap();
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("No versions"));
}

#[test]
fn versions_then_restore_round_trips_content() {
    let dir = TempDir::new().unwrap();
    let store = dir.path().join("store");
    let target = dir.path().join("a.txt");
    fs::write(&target, b"placeholder").unwrap();

    let t1 = Utc::now() - Duration::hours(2);
    let t2 = Utc::now() - Duration::hours(1);
    seed_version(&store, &target, b"first", t1);
    seed_version(&store, &target, b"second", t2);

    let output = coba(&store).args(["versions", target.to_str().unwrap()]).output().unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.lines().count(), 2);

    let restore_at = (t1 + Duration::minutes(1)).format("%Y-%m-%d %H:%M:%S").to_string();
    let out_path = dir.path().join("restored.txt");
    let output = coba(&store)
        .args([
            "restore",
            &restore_at,
            target.to_str().unwrap(),
            "--to",
            out_path.to_str().unwrap(),
        ])
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert_eq!(fs::read(&out_path).unwrap(), b"first");
}

#[test]
fn restore_refuses_existing_target_without_force() {
    let dir = TempDir::new().unwrap();
    let store = dir.path().join("store");
    let target = dir.path().join("a.txt");
    fs::write(&target, b"placeholder").unwrap();

    let t1 = Utc::now() - Duration::hours(1);
    seed_version(&store, &target, b"content", t1);

    let out_path = dir.path().join("existing.txt");
    fs::write(&out_path, b"already here").unwrap();

    let restore_at = (t1 + Duration::minutes(1)).format("%Y-%m-%d %H:%M:%S").to_string();
    let output = coba(&store)
        .args([
            "restore",
            &restore_at,
            target.to_str().unwrap(),
            "--to",
            out_path.to_str().unwrap(),
        ])
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert_eq!(fs::read(&out_path).unwrap(), b"already here");
}

#[test]
fn watch_rejects_a_nonexistent_directory() {
    let dir = TempDir::new().unwrap();
    let store = dir.path().join("store");
    let missing = dir.path().join("does-not-exist");

    let output = coba(&store).args(["watch", missing.to_str().unwrap()]).output().unwrap();
    assert!(!output.status.success());
}
