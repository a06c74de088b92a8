//! Temporary workspaces and binary runners for end-to-end tests.

use assert_cmd::Command;
use firestore_tree::InMemoryStore;
use firestore_tree::model::{Fields, fields};
use std::ffi::OsStr;
use std::fs;
use std::path::PathBuf;
use std::process::ExitStatus;
use tempfile::TempDir;

pub const PROJECT_ID: &str = "demo-project";
pub const SERVICE_ACCOUNT: &str = "service-account.json";
pub const DATASTORE: &str = "firestore-datastore.json";

/// A temp directory holding a service-account key and a datastore file.
pub struct FbWorkspace {
    pub temp_dir: TempDir,
    pub root: PathBuf,
}

impl FbWorkspace {
    /// Workspace with a credential file and an empty datastore.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let root = temp_dir.path().to_path_buf();
        fs::write(
            root.join(SERVICE_ACCOUNT),
            format!(
                r#"{{"type": "service_account", "project_id": "{PROJECT_ID}", "client_email": "backup@{PROJECT_ID}.iam.gserviceaccount.com"}}"#
            ),
        )
        .expect("write service account");
        Self { temp_dir, root }
    }

    /// Workspace whose datastore holds `users/u1`, `users/u2/orders/o1`, and `teams/t1`.
    pub fn seeded() -> Self {
        let workspace = Self::new();
        let mut store = workspace.store();
        store
            .set_document("users/u1", fields([("name", "Ann")]))
            .expect("seed u1");
        store.set_document("users/u2", Fields::new()).expect("seed u2");
        store
            .set_document("users/u2/orders/o1", fields([("total", 9_i64)]))
            .expect("seed o1");
        store
            .set_document("teams/t1", fields([("size", 4_i64)]))
            .expect("seed t1");
        workspace
    }

    /// Open the workspace datastore; commits are saved back to the file.
    pub fn store(&self) -> InMemoryStore {
        InMemoryStore::open(self.root.join(DATASTORE), PROJECT_ID).expect("open datastore")
    }

    pub fn backups_dir(&self) -> PathBuf {
        self.root.join("backups")
    }

    /// Backup files written so far, sorted by name.
    pub fn backup_files(&self) -> Vec<PathBuf> {
        let Ok(entries) = fs::read_dir(self.backups_dir()) else {
            return Vec::new();
        };
        let mut files: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .collect();
        files.sort();
        files
    }

    pub fn write_file(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.root.join(name);
        fs::write(&path, contents).expect("write file");
        path
    }
}

pub struct RunOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

fn command(workspace: &FbWorkspace, bin: &str) -> Command {
    let mut cmd = Command::cargo_bin(bin).expect(bin);
    cmd.current_dir(&workspace.root)
        .env_remove("FIREBASE_SERVICE_ACCOUNT_PATH")
        .env_remove("FIREBASE_PROJECT_ID")
        .env_remove("FIRESTORE_DATASTORE_PATH")
        .env("RUST_LOG", "warn");
    cmd
}

fn run<I, S>(workspace: &FbWorkspace, bin: &str, args: I, input: Option<&str>, label: &str) -> RunOutput
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut cmd = command(workspace, bin);
    cmd.args(args);
    if let Some(input) = input {
        cmd.write_stdin(input);
    }
    let output = cmd.output().expect(label);
    RunOutput {
        status: output.status,
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    }
}

/// Run `firestore-backup` with the workspace credential file.
pub fn run_backup<I, S>(workspace: &FbWorkspace, args: I, label: &str) -> RunOutput
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut all: Vec<std::ffi::OsString> = vec!["--service-account".into(), SERVICE_ACCOUNT.into()];
    all.extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
    run(workspace, "firestore-backup", all, None, label)
}

/// Run `firestore-restore` with the workspace credential file, feeding `input` on stdin.
pub fn run_restore<I, S>(workspace: &FbWorkspace, args: I, input: &str, label: &str) -> RunOutput
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut all: Vec<std::ffi::OsString> = vec!["--service-account".into(), SERVICE_ACCOUNT.into()];
    all.extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
    run(workspace, "firestore-restore", all, Some(input), label)
}

/// Run any binary with exactly the given arguments.
pub fn run_raw<I, S>(workspace: &FbWorkspace, bin: &str, args: I, label: &str) -> RunOutput
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    run(workspace, bin, args, Some(""), label)
}
