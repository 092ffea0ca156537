//! Persistence boundary: a small key-value store holding the task list and
//! the theme and language preferences.
//!
//! The task list lives under [`TASKS_KEY`] as a JSON array. Loading never fails:
//! absent or unreadable data yields an empty list. Saving reports every failure,
//! including writes that would exceed the configured quota.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Result, StorageError};
use crate::fields::{Language, Theme};
use crate::task::Task;

pub const TASKS_KEY: &str = "tasky_tasks";
pub const THEME_KEY: &str = "tasky_theme";
pub const LANGUAGE_KEY: &str = "tasky_language";

/// Every key the store owns starts with this; other files in the data
/// directory (exports, backups) are not counted against the quota.
pub const KEY_PREFIX: &str = "tasky_";

/// Default quota, in bytes, across all keys.
pub const DEFAULT_QUOTA: u64 = 5 * 1024 * 1024;

/// String key-value storage.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

fn check_quota(key: &str, value: &str, others: u64, quota: u64) -> Result<()> {
    let needed = others + (key.len() + value.len()) as u64;
    if needed > quota {
        return Err(StorageError::QuotaExceeded { needed, quota }.into());
    }
    Ok(())
}

/// Keys stored as files in one directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
    quota: u64,
}

impl FileStore {
    pub fn open(dir: impl Into<PathBuf>, quota: u64) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| {
            StorageError::Unavailable(format!("cannot create {}: {e}", dir.display()))
        })?;
        Ok(FileStore { dir, quota })
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Bytes used by every stored key except `key`.
    fn used_except(&self, key: &str) -> u64 {
        let skip = self.path(key);
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return 0;
        };
        entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| *p != skip && is_key_file(p))
            .filter_map(|p| fs::metadata(p).ok())
            .map(|m| m.len())
            .sum()
    }
}

fn is_key_file(path: &Path) -> bool {
    path.extension().is_some_and(|x| x == "json")
        && path
            .file_stem()
            .and_then(|s| s.to_str())
            .is_some_and(|s| s.starts_with(KEY_PREFIX))
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        check_quota(key, value, self.used_except(key), self.quota)?;
        let path = self.path(key);
        // Atomic-ish write via temp + rename.
        let tmp = path.with_extension("json.tmp");
        let write = || -> std::io::Result<()> {
            let mut f = fs::File::create(&tmp)?;
            f.write_all(value.as_bytes())?;
            f.flush()?;
            fs::rename(&tmp, &path)
        };
        write().map_err(|source| StorageError::Write {
            key: key.to_string(),
            source,
        })?;
        debug!(key, bytes = value.len(), "stored key");
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let path = self.path(key);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

/// Keys held in memory, with the same quota rule as the file store.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
    quota: u64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::with_quota(DEFAULT_QUOTA)
    }
}

impl MemoryStore {
    pub fn with_quota(quota: u64) -> Self {
        MemoryStore {
            entries: HashMap::new(),
            quota,
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let others: u64 = self
            .entries
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| (k.len() + v.len()) as u64)
            .sum();
        check_quota(key, value, others, self.quota)?;
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Load the task list, falling back to an empty list when absent or corrupt.
pub fn load_tasks(store: &dyn KeyValueStore) -> Vec<Task> {
    let raw = match store.get(TASKS_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(e) => {
            warn!("error reading tasks, starting fresh: {e}");
            return Vec::new();
        }
    };
    match serde_json::from_str::<Vec<Task>>(&raw) {
        Ok(mut tasks) => {
            tasks.iter_mut().for_each(Task::normalize_completion);
            tasks
        }
        Err(e) => {
            warn!("error parsing tasks, starting fresh: {e}");
            Vec::new()
        }
    }
}

/// Persist the whole task list.
pub fn save_tasks(store: &mut dyn KeyValueStore, tasks: &[Task]) -> Result<()> {
    let data = serde_json::to_string(tasks)?;
    store.set(TASKS_KEY, &data)
}

/// Remove the stored task list entirely.
pub fn clear_tasks(store: &mut dyn KeyValueStore) -> Result<()> {
    store.remove(TASKS_KEY)
}

/// Stored theme, dark when unset or unrecognised.
pub fn load_theme(store: &dyn KeyValueStore) -> Theme {
    store
        .get(THEME_KEY)
        .ok()
        .flatten()
        .and_then(|s| Theme::parse(&s))
        .unwrap_or_default()
}

pub fn save_theme(store: &mut dyn KeyValueStore, theme: Theme) -> Result<()> {
    store.set(THEME_KEY, theme.as_str())
}

/// Stored language, or `fallback` when unset or unsupported.
pub fn load_language(store: &dyn KeyValueStore, fallback: Language) -> Language {
    store
        .get(LANGUAGE_KEY)
        .ok()
        .flatten()
        .and_then(|s| Language::from_code(&s))
        .unwrap_or(fallback)
}

pub fn save_language(store: &mut dyn KeyValueStore, language: Language) -> Result<()> {
    store.set(LANGUAGE_KEY, language.code())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::task::NewTask;
    use chrono::Utc;

    fn sample() -> Vec<Task> {
        vec![Task::create("1".into(), NewTask::new("Buy milk"), Utc::now()).unwrap()]
    }

    #[test]
    fn missing_and_corrupt_data_load_empty() {
        let mut store = MemoryStore::default();
        assert!(load_tasks(&store).is_empty());
        store.set(TASKS_KEY, "{not json").unwrap();
        assert!(load_tasks(&store).is_empty());
    }

    #[test]
    fn tasks_round_trip_through_file_store() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = FileStore::open(dir.path(), DEFAULT_QUOTA).unwrap();
        let tasks = sample();
        save_tasks(&mut store, &tasks).unwrap();
        assert_eq!(load_tasks(&store), tasks);
        assert!(dir.path().join("tasky_tasks.json").exists());
        clear_tasks(&mut store).unwrap();
        assert!(load_tasks(&store).is_empty());
    }

    #[test]
    fn quota_overflow_is_reported() {
        let mut store = MemoryStore::with_quota(32);
        let err = save_tasks(&mut store, &sample()).unwrap_err();
        assert!(matches!(
            err,
            Error::Storage(StorageError::QuotaExceeded { quota: 32, .. })
        ));
        assert_eq!(store.get(TASKS_KEY).unwrap(), None);
    }

    #[test]
    fn file_store_quota_counts_other_keys() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut store = FileStore::open(dir.path(), 96).unwrap();
        store.set("tasky_a", &"x".repeat(40)).unwrap();
        // Rewriting the same key does not count its old value.
        store.set("tasky_a", &"y".repeat(40)).unwrap();
        assert!(store.set("tasky_b", &"z".repeat(50)).is_err());
    }

    #[test]
    fn file_store_quota_ignores_backups_and_exports() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("tasky-backup-2024-03-01.json"), "b".repeat(200)).unwrap();
        fs::write(dir.path().join("tasky-tasks.json"), "e".repeat(200)).unwrap();
        let mut store = FileStore::open(dir.path(), 256).unwrap();
        let tasks = sample();
        save_tasks(&mut store, &tasks).unwrap();
        assert_eq!(load_tasks(&store), tasks);
    }

    #[test]
    fn completion_timestamp_is_repaired_on_load() {
        let mut store = MemoryStore::default();
        let raw = r#"[
            {"id":"1","text":"Done","completed":true,"createdAt":"2024-03-01T10:00:00Z"},
            {"id":"2","text":"Open","completed":false,"createdAt":"2024-03-01T10:00:00Z",
             "completedAt":"2024-03-02T10:00:00Z"}
        ]"#;
        store.set(TASKS_KEY, raw).unwrap();
        let tasks = load_tasks(&store);
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].completed_at, Some(tasks[0].created_at));
        assert_eq!(tasks[1].completed_at, None);
        assert!(tasks.iter().all(|t| t.completed == t.completed_at.is_some()));
    }

    #[test]
    fn preferences_default_and_persist() {
        let mut store = MemoryStore::default();
        assert_eq!(load_theme(&store), Theme::Dark);
        assert_eq!(load_language(&store, Language::En), Language::En);
        save_theme(&mut store, Theme::Light).unwrap();
        save_language(&mut store, Language::Uk).unwrap();
        assert_eq!(load_theme(&store), Theme::Light);
        assert_eq!(load_language(&store, Language::En), Language::Uk);
        assert_eq!(store.get(THEME_KEY).unwrap().as_deref(), Some("light"));
    }
}
