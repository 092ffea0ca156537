//! Task data structure and related functionality.
//!
//! This module defines the `Task` record persisted by the store, its checklist
//! items, and the input shapes used to create and edit tasks.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::fields::*;

/// Longest task text accepted, in characters.
pub const MAX_TEXT_LEN: usize = 200;

/// A single to-do item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub deadline: Option<NaiveDate>,
    #[serde(default, with = "category_or_empty")]
    pub category: Option<Category>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Checklist item inside a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtask {
    pub text: String,
    #[serde(default)]
    pub completed: bool,
}

/// Values for a task about to be added.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub text: String,
    pub priority: Priority,
    pub deadline: Option<NaiveDate>,
    pub category: Option<Category>,
    pub notes: String,
}

impl NewTask {
    pub fn new(text: impl Into<String>) -> Self {
        NewTask {
            text: text.into(),
            ..Default::default()
        }
    }
}

/// Field changes for an existing task. `None` leaves a field untouched;
/// `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default)]
pub struct TaskEdit {
    pub text: Option<String>,
    pub priority: Option<Priority>,
    pub deadline: Option<Option<NaiveDate>>,
    pub category: Option<Option<Category>>,
    pub notes: Option<String>,
}

impl TaskEdit {
    pub fn is_empty(&self) -> bool {
        self.text.is_none()
            && self.priority.is_none()
            && self.deadline.is_none()
            && self.category.is_none()
            && self.notes.is_none()
    }
}

impl Task {
    /// Build a fresh, active task. Text is trimmed and validated.
    pub fn create(id: String, new: NewTask, now: DateTime<Utc>) -> Result<Self> {
        Ok(Task {
            id,
            text: validate_text(&new.text)?,
            completed: false,
            priority: new.priority,
            deadline: new.deadline,
            category: new.category,
            notes: new.notes.trim().to_string(),
            subtasks: Vec::new(),
            created_at: now,
            completed_at: None,
            updated_at: None,
        })
    }

    /// Flip completion, keeping `completed_at` in step with `completed`.
    pub fn set_completed(&mut self, completed: bool, now: DateTime<Utc>) {
        if self.completed == completed {
            return;
        }
        self.completed = completed;
        self.completed_at = if completed { Some(now) } else { None };
    }

    /// Restore the `completed` / `completed_at` pairing on records read back
    /// from storage. A finished task without a timestamp takes its last
    /// known change time.
    pub fn normalize_completion(&mut self) {
        if !self.completed {
            self.completed_at = None;
        } else if self.completed_at.is_none() {
            self.completed_at = Some(self.updated_at.unwrap_or(self.created_at));
        }
    }

    /// Apply an edit. Nothing changes if the new text is invalid.
    pub fn apply(&mut self, edit: TaskEdit, now: DateTime<Utc>) -> Result<()> {
        let text = match edit.text {
            Some(t) => Some(validate_text(&t)?),
            None => None,
        };
        if let Some(t) = text {
            self.text = t;
        }
        if let Some(p) = edit.priority {
            self.priority = p;
        }
        if let Some(d) = edit.deadline {
            self.deadline = d;
        }
        if let Some(c) = edit.category {
            self.category = c;
        }
        if let Some(n) = edit.notes {
            self.notes = n.trim().to_string();
        }
        self.updated_at = Some(now);
        Ok(())
    }

    /// Number of finished checklist items, and the total.
    pub fn subtask_progress(&self) -> (usize, usize) {
        let done = self.subtasks.iter().filter(|s| s.completed).count();
        (done, self.subtasks.len())
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.completed && self.deadline.is_some_and(|d| d < today)
    }
}

/// Trim task text and enforce the non-empty and length rules.
pub fn validate_text(raw: &str) -> Result<String> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(Error::Validation("task text cannot be empty".into()));
    }
    let len = text.chars().count();
    if len > MAX_TEXT_LEN {
        return Err(Error::Validation(format!(
            "task text is {len} characters, limit is {MAX_TEXT_LEN}"
        )));
    }
    Ok(text.to_string())
}

/// Categories persist as `""` when unset, matching files written by older
/// versions of the app.
mod category_or_empty {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::fields::{parse_category, Category};

    pub fn serialize<S: Serializer>(value: &Option<Category>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(value.map(Category::as_str).unwrap_or(""))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Category>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        Ok(raw.as_deref().and_then(parse_category))
    }
}
