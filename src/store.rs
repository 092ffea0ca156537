//! The task collection and every mutation allowed on it.
//!
//! `TaskStore` owns the authoritative list of tasks. Readers take a snapshot via
//! [`TaskStore::tasks`]; writers go through the methods here, each of which either
//! completes fully or leaves the collection unchanged.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::task::{validate_text, NewTask, Subtask, Task, TaskEdit};

/// Source of fresh task ids.
pub trait IdSource {
    fn next_id(&mut self) -> String;
}

/// Random v4 UUIDs.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIds;

impl IdSource for UuidIds {
    fn next_id(&mut self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Outcome of merging imported tasks into the store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub added: usize,
    /// `(imported id, id actually stored)` for every colliding record.
    pub reassigned: Vec<(String, String)>,
}

/// In-memory task collection.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TaskStore {
    tasks: Vec<Task>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an already loaded collection.
    pub fn from_tasks(tasks: Vec<Task>) -> Self {
        TaskStore { tasks }
    }

    /// Read-only view of the collection in stored order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Get a task by ID.
    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Find a task by full id, unique id prefix, or exact text (case-insensitive).
    pub fn resolve(&self, ident: &str) -> Result<&Task> {
        let ident = ident.trim();
        if let Some(t) = self.get(ident) {
            return Ok(t);
        }
        let by_prefix: Vec<&Task> = if ident.is_empty() {
            Vec::new()
        } else {
            self.tasks.iter().filter(|t| t.id.starts_with(ident)).collect()
        };
        let matches = if by_prefix.is_empty() {
            let lower = ident.to_lowercase();
            self.tasks
                .iter()
                .filter(|t| t.text.to_lowercase() == lower)
                .collect()
        } else {
            by_prefix
        };
        match matches.as_slice() {
            [] => Err(Error::not_found(ident)),
            [one] => Ok(*one),
            many => {
                let mut msg = format!("'{ident}' matches {} tasks:", many.len());
                for t in many {
                    msg.push_str(&format!("\n  {}: {}", t.id, t.text));
                }
                msg.push_str("\nPlease use a longer id.");
                Err(Error::Validation(msg))
            }
        }
    }

    fn position(&self, id: &str) -> Result<usize> {
        self.tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| Error::not_found(id))
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut Task> {
        let idx = self.position(id)?;
        Ok(&mut self.tasks[idx])
    }

    fn fresh_id(&self, ids: &mut dyn IdSource) -> String {
        loop {
            let id = ids.next_id();
            if !id.is_empty() && self.get(&id).is_none() {
                return id;
            }
        }
    }

    /// Append a new task. Fails if the text is empty after trimming.
    pub fn add(&mut self, new: NewTask, ids: &mut dyn IdSource, now: DateTime<Utc>) -> Result<&Task> {
        let id = self.fresh_id(ids);
        let task = Task::create(id, new, now)?;
        debug!(id = %task.id, "task added");
        self.tasks.push(task);
        Ok(&self.tasks[self.tasks.len() - 1])
    }

    /// Flip a task between active and completed.
    pub fn toggle(&mut self, id: &str, now: DateTime<Utc>) -> Result<&Task> {
        let task = self.get_mut(id)?;
        let completed = !task.completed;
        task.set_completed(completed, now);
        debug!(id, completed, "task toggled");
        Ok(&*task)
    }

    /// Apply field changes to a task.
    pub fn edit(&mut self, id: &str, edit: TaskEdit, now: DateTime<Utc>) -> Result<&Task> {
        let task = self.get_mut(id)?;
        task.apply(edit, now)?;
        Ok(&*task)
    }

    /// Replace a task's notes.
    pub fn set_notes(&mut self, id: &str, notes: &str, now: DateTime<Utc>) -> Result<&Task> {
        self.edit(
            id,
            TaskEdit {
                notes: Some(notes.to_string()),
                ..Default::default()
            },
            now,
        )
    }

    /// Remove a task, returning it.
    pub fn delete(&mut self, id: &str) -> Result<Task> {
        let idx = self.position(id)?;
        debug!(id, "task deleted");
        Ok(self.tasks.remove(idx))
    }

    /// Drop every completed task. Returns how many were removed.
    pub fn clear_completed(&mut self) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|t| !t.completed);
        let removed = before - self.tasks.len();
        if removed > 0 {
            info!(removed, "cleared completed tasks");
        }
        removed
    }

    /// Drop every task. Returns how many were removed.
    pub fn clear_all(&mut self) -> usize {
        let removed = self.tasks.len();
        self.tasks.clear();
        removed
    }

    /// Replace the whole collection (backup restore).
    pub fn replace_all(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks;
    }

    /// Append a checklist item to a task.
    pub fn add_subtask(&mut self, id: &str, text: &str, now: DateTime<Utc>) -> Result<&Task> {
        let text = validate_text(text)?;
        let task = self.get_mut(id)?;
        task.subtasks.push(Subtask {
            text,
            completed: false,
        });
        task.updated_at = Some(now);
        Ok(&*task)
    }

    /// Flip a checklist item.
    pub fn toggle_subtask(&mut self, id: &str, index: usize, now: DateTime<Utc>) -> Result<&Task> {
        let task = self.get_mut(id)?;
        let sub = task.subtasks.get_mut(index).ok_or_else(|| {
            Error::Validation(format!("task {id} has no subtask #{}", index + 1))
        })?;
        sub.completed = !sub.completed;
        task.updated_at = Some(now);
        Ok(&*task)
    }

    /// Remove a checklist item.
    pub fn remove_subtask(&mut self, id: &str, index: usize, now: DateTime<Utc>) -> Result<Subtask> {
        let task = self.get_mut(id)?;
        if index >= task.subtasks.len() {
            return Err(Error::Validation(format!(
                "task {id} has no subtask #{}",
                index + 1
            )));
        }
        task.updated_at = Some(now);
        Ok(task.subtasks.remove(index))
    }

    /// Exchange the positions of two tasks.
    pub fn swap(&mut self, a: &str, b: &str) -> Result<()> {
        let ia = self.position(a)?;
        let ib = self.position(b)?;
        self.tasks.swap(ia, ib);
        Ok(())
    }

    /// Move a task to `index`, shifting the others. Indexes past the end append.
    pub fn move_to(&mut self, id: &str, index: usize) -> Result<()> {
        let from = self.position(id)?;
        let task = self.tasks.remove(from);
        let to = index.min(self.tasks.len());
        self.tasks.insert(to, task);
        Ok(())
    }

    /// Append validated imported tasks. Ids that collide with stored tasks, or
    /// with earlier records of the same batch, get a fresh id.
    pub fn merge_imported(&mut self, imported: Vec<Task>, ids: &mut dyn IdSource) -> MergeReport {
        let mut taken: HashSet<String> = self.tasks.iter().map(|t| t.id.clone()).collect();
        let mut report = MergeReport::default();
        for mut task in imported {
            if taken.contains(&task.id) {
                let fresh = loop {
                    let id = ids.next_id();
                    if !id.is_empty() && !taken.contains(&id) {
                        break id;
                    }
                };
                debug!(old = %task.id, new = %fresh, "imported id collided, reassigned");
                report.reassigned.push((task.id.clone(), fresh.clone()));
                task.id = fresh;
            }
            taken.insert(task.id.clone());
            self.tasks.push(task);
            report.added += 1;
        }
        info!(added = report.added, reassigned = report.reassigned.len(), "merged imported tasks");
        report
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::TimeZone;

    /// Predictable ids for tests: "t1", "t2", ...
    #[derive(Default)]
    pub(crate) struct SeqIds(pub u32);

    impl IdSource for SeqIds {
        fn next_id(&mut self) -> String {
            self.0 += 1;
            format!("t{}", self.0)
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn store_with(texts: &[&str]) -> (TaskStore, SeqIds) {
        let mut store = TaskStore::new();
        let mut ids = SeqIds::default();
        for t in texts {
            store.add(NewTask::new(*t), &mut ids, now()).unwrap();
        }
        (store, ids)
    }

    fn order(store: &TaskStore) -> Vec<&str> {
        store.tasks().iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn add_rejects_empty_text_without_changing_store() {
        let (mut store, mut ids) = store_with(&["a"]);
        assert!(store.add(NewTask::new("  "), &mut ids, now()).is_err());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn missing_ids_are_explicit_misses() {
        let (mut store, _) = store_with(&["a"]);
        assert!(matches!(store.toggle("nope", now()), Err(Error::NotFound { .. })));
        assert!(matches!(store.delete("nope"), Err(Error::NotFound { .. })));
        assert!(store.swap("t1", "nope").is_err());
        assert_eq!(order(&store), vec!["t1"]);
    }

    #[test]
    fn toggle_twice_restores_active_state() {
        let (mut store, _) = store_with(&["a"]);
        assert!(store.toggle("t1", now()).unwrap().completed_at.is_some());
        let t = store.toggle("t1", now()).unwrap();
        assert!(!t.completed);
        assert!(t.completed_at.is_none());
    }

    #[test]
    fn clear_completed_keeps_active() {
        let (mut store, _) = store_with(&["a", "b", "c"]);
        store.toggle("t2", now()).unwrap();
        assert_eq!(store.clear_completed(), 1);
        assert_eq!(order(&store), vec!["t1", "t3"]);
        assert_eq!(store.clear_completed(), 0);
        assert_eq!(store.clear_all(), 2);
        assert!(store.is_empty());
    }

    #[test]
    fn subtasks_keep_insertion_order() {
        let (mut store, _) = store_with(&["a"]);
        store.add_subtask("t1", "one", now()).unwrap();
        store.add_subtask("t1", "two", now()).unwrap();
        store.toggle_subtask("t1", 1, now()).unwrap();
        let t = store.get("t1").unwrap();
        assert_eq!(t.subtasks[0].text, "one");
        assert!(t.subtasks[1].completed);
        assert_eq!(t.subtask_progress(), (1, 2));
        assert!(store.toggle_subtask("t1", 5, now()).is_err());
        assert_eq!(store.remove_subtask("t1", 0, now()).unwrap().text, "one");
    }

    #[test]
    fn reorder_by_swap_and_move() {
        let (mut store, _) = store_with(&["a", "b", "c"]);
        store.swap("t1", "t3").unwrap();
        assert_eq!(order(&store), vec!["t3", "t2", "t1"]);
        store.move_to("t3", 99).unwrap();
        assert_eq!(order(&store), vec!["t2", "t1", "t3"]);
        store.move_to("t3", 0).unwrap();
        assert_eq!(order(&store), vec!["t3", "t2", "t1"]);
    }

    #[test]
    fn resolve_by_id_prefix_or_text() {
        let (mut store, mut ids) = store_with(&["Buy milk", "Call mom"]);
        assert_eq!(store.resolve("t2").unwrap().text, "Call mom");
        assert_eq!(store.resolve("buy MILK").unwrap().id, "t1");
        assert!(matches!(store.resolve("t"), Err(Error::Validation(_))));
        assert!(matches!(store.resolve("nothing"), Err(Error::NotFound { .. })));
        store.add(NewTask::new("Call mom"), &mut ids, now()).unwrap();
        assert!(store.resolve("call mom").is_err());
    }

    #[test]
    fn merge_reassigns_colliding_ids() {
        let (mut store, mut ids) = store_with(&["a"]);
        let mut incoming = store.get("t1").unwrap().clone();
        incoming.text = "imported".into();
        let mut twin = incoming.clone();
        twin.id = "x".into();
        let dup = twin.clone();
        let report = store.merge_imported(vec![incoming, twin, dup], &mut ids);
        assert_eq!(report.added, 3);
        assert_eq!(report.reassigned.len(), 2);
        assert_eq!(store.get("t1").unwrap().text, "a");
        let unique: HashSet<_> = store.tasks().iter().map(|t| &t.id).collect();
        assert_eq!(unique.len(), 4);
    }
}
