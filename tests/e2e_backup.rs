mod common;
use common::cli::{FbWorkspace, run_backup, run_raw};
use predicates::prelude::*;
use std::fs;

fn read_json(path: &std::path::Path) -> serde_json::Value {
    serde_json::from_str(&fs::read_to_string(path).expect("read backup")).expect("parse backup")
}

#[test]
fn test_full_backup_writes_timestamped_file() {
    let workspace = FbWorkspace::seeded();
    let output = run_backup(&workspace, std::iter::empty::<&str>(), "backup");
    assert!(output.status.success(), "backup failed: {}", output.stderr);
    assert!(output.stdout.contains("Backup completed successfully!"));
    assert!(output.stdout.contains("Collections: 2"));
    assert!(output.stdout.contains("Total documents: 3 (4 including subcollections)"));
    assert!(output.stdout.contains(" MB"));

    let files = workspace.backup_files();
    assert_eq!(files.len(), 1);
    let name = files[0].file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("firestore_backup_"), "unexpected name {name}");

    let json = read_json(&files[0]);
    assert_eq!(json["metadata"]["project_id"], "demo-project");
    assert_eq!(json["metadata"]["backup_version"], "1.0");
    assert_eq!(json["metadata"]["total_collections"], 2);
    assert_eq!(json["metadata"]["total_documents"], 3);
    assert_eq!(json["collections"]["users"]["u1"]["data"]["name"], "Ann");
    assert_eq!(
        json["collections"]["users"]["u2"]["subcollections"]["orders"]["o1"]["id"],
        "o1"
    );
}

#[test]
fn test_backup_is_pretty_printed() {
    let workspace = FbWorkspace::seeded();
    let output = run_backup(&workspace, ["--output", "pretty.json"], "backup_pretty");
    assert!(output.status.success(), "backup failed: {}", output.stderr);

    let text = fs::read_to_string(workspace.backups_dir().join("pretty.json")).unwrap();
    assert!(text.starts_with("{\n  \""));
}

#[test]
fn test_backup_without_metadata() {
    let workspace = FbWorkspace::seeded();
    let output = run_backup(
        &workspace,
        ["--no-metadata", "--output", "bare.json"],
        "backup_no_metadata",
    );
    assert!(output.status.success(), "backup failed: {}", output.stderr);
    assert!(output.stdout.contains("Total documents: N/A"));

    let json = read_json(&workspace.backups_dir().join("bare.json"));
    assert!(json.get("metadata").is_none());
    assert!(json["collections"]["teams"]["t1"].is_object());
}

#[test]
fn test_single_collection_backup() {
    let workspace = FbWorkspace::seeded();
    let output = run_backup(&workspace, ["--collection", "users"], "backup_collection");
    assert!(output.status.success(), "backup failed: {}", output.stderr);
    assert!(output.stdout.contains("Collection backup completed"));

    let files = workspace.backup_files();
    assert_eq!(files.len(), 1);
    let name = files[0].file_name().unwrap().to_string_lossy().into_owned();
    assert!(name.starts_with("firestore_users_backup_"), "unexpected name {name}");

    let json = read_json(&files[0]);
    assert_eq!(json["collection_name"], "users");
    assert!(json["backup_time"].is_string());
    assert_eq!(json["data"]["u1"]["data"]["name"], "Ann");
}

#[test]
fn test_list_collections() {
    let workspace = FbWorkspace::seeded();
    let output = run_backup(&workspace, ["--list-collections"], "list");
    assert!(output.status.success(), "list failed: {}", output.stderr);
    assert!(output.stdout.contains("Collections in database:"));
    assert!(output.stdout.contains("  - teams"));
    assert!(output.stdout.contains("  - users"));
    assert!(workspace.backup_files().is_empty());
}

#[test]
fn test_custom_backup_dir() {
    let workspace = FbWorkspace::seeded();
    let output = run_backup(
        &workspace,
        ["--backup-dir", "snapshots", "--output", "x.json"],
        "backup_dir",
    );
    assert!(output.status.success(), "backup failed: {}", output.stderr);
    assert!(workspace.root.join("snapshots").join("x.json").is_file());
}

#[test]
fn test_config_file_supplies_defaults() {
    let workspace = FbWorkspace::seeded();
    workspace.write_file(
        "backup.yaml",
        "service_account_path: service-account.json\nbackup_dir: from-config\n",
    );
    let output = run_raw(
        &workspace,
        "firestore-backup",
        ["--config", "backup.yaml", "--output", "cfg.json"],
        "backup_config",
    );
    assert!(output.status.success(), "backup failed: {}", output.stderr);
    assert!(workspace.root.join("from-config").join("cfg.json").is_file());
}

#[test]
fn test_missing_service_account_fails() {
    let workspace = FbWorkspace::seeded();
    let output = run_raw(&workspace, "firestore-backup", ["--list-collections"], "no_key");
    assert!(!output.status.success());
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stderr.contains("Service account path must be provided"));
}

#[test]
fn test_service_account_from_env() {
    let workspace = FbWorkspace::seeded();
    assert_cmd::Command::cargo_bin("firestore-backup")
        .unwrap()
        .current_dir(&workspace.root)
        .env("FIREBASE_SERVICE_ACCOUNT_PATH", "service-account.json")
        .env_remove("FIREBASE_PROJECT_ID")
        .env_remove("FIRESTORE_DATASTORE_PATH")
        .arg("--list-collections")
        .assert()
        .success()
        .stdout(predicate::str::contains("  - users"));
}

#[test]
fn test_quick_backup() {
    let workspace = FbWorkspace::seeded();
    let output = run_raw(
        &workspace,
        "firestore-quick-backup",
        ["--service-account", "service-account.json"],
        "quick",
    );
    assert!(output.status.success(), "quick backup failed: {}", output.stderr);
    assert!(output.stdout.contains("Backup saved to:"));
    assert!(output.stdout.contains("Collections in your database:"));
    assert!(output.stdout.contains("  - users"));
    assert_eq!(workspace.backup_files().len(), 1);
}

#[test]
fn test_quick_backup_missing_key_prints_help() {
    let workspace = FbWorkspace::seeded();
    let output = run_raw(
        &workspace,
        "firestore-quick-backup",
        ["--service-account", "nope.json"],
        "quick_missing",
    );
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.contains("Service account file not found"));
    assert!(output.stdout.contains("Generate new private key"));
    assert!(workspace.backup_files().is_empty());
}
