//! A working session: the task collection bound to its storage backend.
//!
//! Every mutation is applied in memory first and then written through. When the
//! write fails the in-memory state is kept and the storage error is returned, so
//! the caller can report it without losing the change it just made.

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::config::Config;
use crate::error::Result;
use crate::fields::{FileFormat, Language, Theme};
use crate::storage::{self, KeyValueStore};
use crate::store::{IdSource, TaskStore, UuidIds};
use crate::task::{NewTask, Subtask, Task, TaskEdit};
use crate::transfer::{self, ExportFile, ImportLimits, Rejection};

/// What an import or restore did to the collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub added: usize,
    pub rejected: Vec<Rejection>,
    pub reassigned: usize,
}

pub struct Session<S: KeyValueStore> {
    backend: S,
    store: TaskStore,
    config: Config,
    ids: Box<dyn IdSource>,
}

impl<S: KeyValueStore> Session<S> {
    /// Load the stored collection. Unreadable data starts an empty session.
    pub fn open(backend: S, config: Config) -> Self {
        let store = TaskStore::from_tasks(storage::load_tasks(&backend));
        Session {
            backend,
            store,
            config,
            ids: Box::new(UuidIds),
        }
    }

    /// Replace the id generator.
    pub fn with_ids(mut self, ids: impl IdSource + 'static) -> Self {
        self.ids = Box::new(ids);
        self
    }

    pub fn tasks(&self) -> &[Task] {
        self.store.tasks()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    fn persist(&mut self) -> Result<()> {
        if let Err(e) = storage::save_tasks(&mut self.backend, self.store.tasks()) {
            warn!("could not save tasks: {e}");
            return Err(e);
        }
        Ok(())
    }

    /// Id of the task matching `ident` (id, id prefix or text).
    pub fn resolve(&self, ident: &str) -> Result<String> {
        Ok(self.store.resolve(ident)?.id.clone())
    }

    pub fn get(&self, ident: &str) -> Result<&Task> {
        self.store.resolve(ident)
    }

    pub fn add(&mut self, new: NewTask, now: DateTime<Utc>) -> Result<Task> {
        let task = self.store.add(new, self.ids.as_mut(), now)?.clone();
        self.persist()?;
        Ok(task)
    }

    pub fn toggle(&mut self, ident: &str, now: DateTime<Utc>) -> Result<Task> {
        let id = self.resolve(ident)?;
        let task = self.store.toggle(&id, now)?.clone();
        self.persist()?;
        Ok(task)
    }

    pub fn edit(&mut self, ident: &str, edit: TaskEdit, now: DateTime<Utc>) -> Result<Task> {
        let id = self.resolve(ident)?;
        let task = self.store.edit(&id, edit, now)?.clone();
        self.persist()?;
        Ok(task)
    }

    pub fn set_notes(&mut self, ident: &str, notes: &str, now: DateTime<Utc>) -> Result<Task> {
        let id = self.resolve(ident)?;
        let task = self.store.set_notes(&id, notes, now)?.clone();
        self.persist()?;
        Ok(task)
    }

    pub fn delete(&mut self, ident: &str) -> Result<Task> {
        let id = self.resolve(ident)?;
        let task = self.store.delete(&id)?;
        self.persist()?;
        Ok(task)
    }

    pub fn clear_completed(&mut self) -> Result<usize> {
        let removed = self.store.clear_completed();
        if removed > 0 {
            self.persist()?;
        }
        Ok(removed)
    }

    /// Remove every task and the stored list itself.
    pub fn clear_all(&mut self) -> Result<usize> {
        let removed = self.store.clear_all();
        storage::clear_tasks(&mut self.backend)?;
        info!(removed, "cleared all tasks");
        Ok(removed)
    }

    pub fn add_subtask(&mut self, ident: &str, text: &str, now: DateTime<Utc>) -> Result<Task> {
        let id = self.resolve(ident)?;
        let task = self.store.add_subtask(&id, text, now)?.clone();
        self.persist()?;
        Ok(task)
    }

    pub fn toggle_subtask(&mut self, ident: &str, index: usize, now: DateTime<Utc>) -> Result<Task> {
        let id = self.resolve(ident)?;
        let task = self.store.toggle_subtask(&id, index, now)?.clone();
        self.persist()?;
        Ok(task)
    }

    pub fn remove_subtask(&mut self, ident: &str, index: usize, now: DateTime<Utc>) -> Result<Subtask> {
        let id = self.resolve(ident)?;
        let sub = self.store.remove_subtask(&id, index, now)?;
        self.persist()?;
        Ok(sub)
    }

    pub fn swap(&mut self, a: &str, b: &str) -> Result<()> {
        let (a, b) = (self.resolve(a)?, self.resolve(b)?);
        self.store.swap(&a, &b)?;
        self.persist()
    }

    pub fn move_to(&mut self, ident: &str, index: usize) -> Result<()> {
        let id = self.resolve(ident)?;
        self.store.move_to(&id, index)?;
        self.persist()
    }

    fn limits(&self) -> ImportLimits {
        ImportLimits {
            max_bytes: self.config.max_import_bytes,
        }
    }

    /// Validate an import file and append its tasks. Nothing is added when the
    /// file fails as a whole.
    pub fn import(&mut self, content: &str, format: FileFormat, now: DateTime<Utc>) -> Result<ImportReport> {
        let outcome = transfer::import_tasks(content, format, self.limits(), self.ids.as_mut(), now)?;
        let merged = self.store.merge_imported(outcome.tasks, self.ids.as_mut());
        self.persist()?;
        Ok(ImportReport {
            added: merged.added,
            rejected: outcome.rejected,
            reassigned: merged.reassigned.len(),
        })
    }

    pub fn export(&self, format: FileFormat, now: DateTime<Utc>) -> Result<ExportFile> {
        transfer::export_tasks(self.store.tasks(), format, self.language(), now)
    }

    pub fn backup(&self, now: DateTime<Utc>) -> Result<ExportFile> {
        transfer::create_backup(self.store.tasks(), self.theme(), now)
    }

    /// Replace the collection with a backup's tasks, and its theme when present.
    pub fn restore(&mut self, content: &str, now: DateTime<Utc>) -> Result<ImportReport> {
        let restored = transfer::parse_backup(content, self.limits(), now)?;
        self.store.replace_all(Vec::new());
        let merged = self
            .store
            .merge_imported(restored.outcome.tasks, self.ids.as_mut());
        self.persist()?;
        if let Some(theme) = restored.theme {
            self.set_theme(theme)?;
        }
        Ok(ImportReport {
            added: merged.added,
            rejected: restored.outcome.rejected,
            reassigned: merged.reassigned.len(),
        })
    }

    pub fn theme(&self) -> Theme {
        storage::load_theme(&self.backend)
    }

    pub fn set_theme(&mut self, theme: Theme) -> Result<()> {
        storage::save_theme(&mut self.backend, theme)
    }

    pub fn toggle_theme(&mut self) -> Result<Theme> {
        let theme = self.theme().toggled();
        self.set_theme(theme)?;
        Ok(theme)
    }

    pub fn language(&self) -> Language {
        storage::load_language(&self.backend, self.config.language)
    }

    pub fn set_language(&mut self, language: Language) -> Result<()> {
        storage::save_language(&mut self.backend, language)
    }
}
