#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::TempDir;

/// A throwaway data directory for one test.
pub struct TestData {
    dir: TempDir,
}

impl TestData {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write_file(&self, name: &str, contents: &str) -> std::io::Result<PathBuf> {
        let path = self.dir.path().join(name);
        fs::write(&path, contents)?;
        Ok(path)
    }

    pub fn write_config(&self, contents: &str) -> std::io::Result<PathBuf> {
        self.write_file("tasky.toml", contents)
    }

    pub fn read_tasks(&self) -> serde_json::Value {
        let raw = fs::read_to_string(self.dir.path().join("tasky_tasks.json"))
            .expect("read stored tasks");
        serde_json::from_str(&raw).expect("stored tasks are JSON")
    }

    /// `tasky` pointed at this directory, run from inside it.
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("tasky").expect("tasky binary");
        cmd.current_dir(self.path())
            .env_remove("RUST_LOG")
            .env("TASKY_DIR", self.path());
        cmd
    }
}
