//! Import and export of task files.
//!
//! Imports pass through one validation entry point, [`validate_record`], which
//! turns a loosely shaped JSON object into a [`Task`] or a [`RejectReason`]. JSON
//! files feed it directly; CSV rows are first mapped onto the same object shape.
//! Bad records are skipped and counted; a file with no usable record fails as a
//! whole so the store is never touched.
//!
//! Exports write JSON, CSV, or a plain-text listing grouped by category, plus a
//! full backup snapshot.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::dates::{parse_date_value, parse_timestamp};
use crate::error::{Error, FormatError, Result};
use crate::fields::*;
use crate::store::IdSource;
use crate::task::{Subtask, Task, MAX_TEXT_LEN};

/// Version written into backups.
pub const BACKUP_VERSION: &str = "2.0";

/// Why an imported record was skipped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    #[error("record is not an object")]
    NotAnObject,
    #[error("missing id")]
    MissingId,
    #[error("missing text")]
    MissingText,
    #[error("text longer than 200 characters")]
    TextTooLong,
    #[error("'completed' is not a boolean")]
    CompletedNotBoolean,
}

/// A skipped record and its position in the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub index: usize,
    pub reason: RejectReason,
}

/// Validated tasks plus every record that was dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportOutcome {
    pub tasks: Vec<Task>,
    pub rejected: Vec<Rejection>,
}

impl ImportOutcome {
    pub fn rejected_count(&self) -> usize {
        self.rejected.len()
    }
}

/// A file ready to hand to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub file_name: String,
    pub mime: &'static str,
    pub content: String,
}

/// Size guard for incoming files.
#[derive(Debug, Clone, Copy)]
pub struct ImportLimits {
    pub max_bytes: usize,
}

impl Default for ImportLimits {
    fn default() -> Self {
        ImportLimits {
            max_bytes: 5 * 1024 * 1024,
        }
    }
}

fn str_field<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    obj.get(key).and_then(Value::as_str)
}

/// Turn one external record into a task.
///
/// Required: a non-empty `id` (string or number), a non-empty `text` and a boolean
/// `completed`. Everything else is optional and falls back to defaults when
/// missing or unreadable. `now` fills in missing timestamps.
pub fn validate_record(value: &Value, now: DateTime<Utc>) -> std::result::Result<Task, RejectReason> {
    let obj = value.as_object().ok_or(RejectReason::NotAnObject)?;

    let id = match obj.get("id") {
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => return Err(RejectReason::MissingId),
    };
    let text = str_field(obj, "text")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(RejectReason::MissingText)?;
    if text.chars().count() > MAX_TEXT_LEN {
        return Err(RejectReason::TextTooLong);
    }
    let completed = obj
        .get("completed")
        .and_then(Value::as_bool)
        .ok_or(RejectReason::CompletedNotBoolean)?;

    let subtasks = obj
        .get("subtasks")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let text = item.get("text")?.as_str()?.trim();
                    (!text.is_empty()).then(|| Subtask {
                        text: text.to_string(),
                        completed: item.get("completed").and_then(Value::as_bool).unwrap_or(false),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    let timestamp = |key: &str| str_field(obj, key).and_then(parse_timestamp);
    let completed_at = if completed {
        Some(timestamp("completedAt").unwrap_or(now))
    } else {
        None
    };

    Ok(Task {
        id,
        text: text.to_string(),
        completed,
        priority: str_field(obj, "priority")
            .and_then(parse_priority)
            .unwrap_or_default(),
        deadline: str_field(obj, "deadline").and_then(parse_date_value),
        category: str_field(obj, "category").and_then(parse_category),
        notes: str_field(obj, "notes").unwrap_or_default().to_string(),
        subtasks,
        created_at: timestamp("createdAt").unwrap_or(now),
        completed_at,
        updated_at: timestamp("updatedAt"),
    })
}

/// Validate a batch of records. Never fails; see [`ImportOutcome`].
pub fn validate_imported(records: &[Value], now: DateTime<Utc>) -> ImportOutcome {
    let mut outcome = ImportOutcome::default();
    for (index, record) in records.iter().enumerate() {
        match validate_record(record, now) {
            Ok(task) => outcome.tasks.push(task),
            Err(reason) => {
                warn!(index, %reason, "skipping imported record");
                outcome.rejected.push(Rejection { index, reason });
            }
        }
    }
    outcome
}

fn check_size(content: &str, limits: ImportLimits) -> std::result::Result<(), FormatError> {
    if content.trim().is_empty() {
        return Err(FormatError::EmptyInput);
    }
    if content.len() > limits.max_bytes {
        return Err(FormatError::TooLarge {
            size: content.len(),
            limit: limits.max_bytes,
        });
    }
    Ok(())
}

/// Parse a JSON file into raw records. The root must be a non-empty array.
pub fn parse_json_records(content: &str) -> std::result::Result<Vec<Value>, FormatError> {
    if content.trim().is_empty() {
        return Err(FormatError::EmptyInput);
    }
    let root: Value =
        serde_json::from_str(content).map_err(|e| FormatError::InvalidJson(e.to_string()))?;
    let Value::Array(records) = root else {
        return Err(FormatError::NotAnArray);
    };
    if records.is_empty() {
        return Err(FormatError::NoRecords);
    }
    Ok(records)
}

/// Split CSV text into rows of fields. Quoted fields may hold commas, newlines
/// and doubled quotes. Blank lines are dropped.
pub fn split_csv(content: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = content.trim_start_matches('\u{feff}').chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                field.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => row.push(std::mem::take(&mut field)),
            '\r' if !in_quotes => {}
            '\n' if !in_quotes => {
                row.push(std::mem::take(&mut field));
                rows.push(std::mem::take(&mut row));
            }
            _ => field.push(ch),
        }
    }
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }
    rows.retain(|r| !(r.len() == 1 && r[0].trim().is_empty()));
    rows
}

/// Parse a CSV file (header row first) into raw records shaped like JSON tasks.
///
/// Columns: id, text, completed (localized yes/no), priority, category, deadline,
/// createdAt. Rows without an id get one from `ids`.
pub fn parse_csv_records(
    content: &str,
    ids: &mut dyn IdSource,
) -> std::result::Result<Vec<Value>, FormatError> {
    if content.trim().is_empty() {
        return Err(FormatError::EmptyInput);
    }
    let rows = split_csv(content);
    if rows.len() < 2 {
        return Err(FormatError::NoRecords);
    }

    let records = rows
        .into_iter()
        .skip(1)
        .map(|fields| {
            let cell = |i: usize| fields.get(i).map(|s| s.trim()).unwrap_or("");
            let mut obj = Map::new();
            let id = match cell(0) {
                "" => ids.next_id(),
                id => id.to_string(),
            };
            obj.insert("id".into(), json!(id));
            if fields.len() > 1 {
                obj.insert("text".into(), json!(cell(1)));
            }
            obj.insert("completed".into(), json!(parse_yes(cell(2))));
            for (i, key) in [(3, "priority"), (4, "category"), (5, "deadline"), (6, "createdAt")] {
                if !cell(i).is_empty() {
                    obj.insert(key.into(), json!(cell(i)));
                }
            }
            Value::Object(obj)
        })
        .collect();
    Ok(records)
}

/// Parse and validate an import file of the given format.
///
/// Fails if the file is empty, too large, malformed, or yields no valid task.
pub fn import_tasks(
    content: &str,
    format: FileFormat,
    limits: ImportLimits,
    ids: &mut dyn IdSource,
    now: DateTime<Utc>,
) -> Result<ImportOutcome> {
    check_size(content, limits)?;
    let records = match format {
        FileFormat::Json => parse_json_records(content)?,
        FileFormat::Csv => parse_csv_records(content, ids)?,
        FileFormat::Txt => return Err(FormatError::ExportOnly("txt".into()).into()),
    };
    let outcome = validate_imported(&records, now);
    if outcome.tasks.is_empty() {
        return Err(FormatError::NoValidRecords {
            rejected: outcome.rejected_count(),
        }
        .into());
    }
    debug!(
        valid = outcome.tasks.len(),
        rejected = outcome.rejected_count(),
        "validated import"
    );
    Ok(outcome)
}

/// Serialize tasks in one of the export formats.
pub fn export_tasks(
    tasks: &[Task],
    format: FileFormat,
    language: Language,
    now: DateTime<Utc>,
) -> Result<ExportFile> {
    if tasks.is_empty() {
        return Err(Error::NothingToExport);
    }
    let content = match format {
        FileFormat::Json => serde_json::to_string_pretty(tasks)?,
        FileFormat::Csv => export_csv(tasks, language),
        FileFormat::Txt => export_txt(tasks, language, now),
    };
    Ok(ExportFile {
        file_name: format!("tasky-tasks.{}", format.extension()),
        mime: format.mime(),
        content,
    })
}

fn csv_header(language: Language) -> &'static str {
    match language {
        Language::En => "ID,Text,Completed,Priority,Category,Deadline,Created",
        Language::Uk => "ID,Текст,Виконано,Пріоритет,Категорія,Дедлайн,Створено",
    }
}

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// CSV with a localized header; every field quoted.
pub fn export_csv(tasks: &[Task], language: Language) -> String {
    let mut csv = String::from(csv_header(language));
    csv.push('\n');
    for t in tasks {
        let row = [
            quote(&t.id),
            quote(&t.text),
            quote(if t.completed { language.yes() } else { language.no() }),
            quote(t.priority.as_str()),
            quote(t.category.map(Category::as_str).unwrap_or("")),
            quote(&t.deadline.map(|d| d.to_string()).unwrap_or_default()),
            quote(&t.created_at.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        ];
        csv.push_str(&row.join(","));
        csv.push('\n');
    }
    csv
}

struct TxtLabels {
    title: &'static str,
    no_category: &'static str,
    deadline: &'static str,
    exported: &'static str,
    total: &'static str,
    date_format: &'static str,
    timestamp_format: &'static str,
}

fn txt_labels(language: Language) -> TxtLabels {
    match language {
        Language::En => TxtLabels {
            title: "📝 TASKY - TASK LIST",
            no_category: "NO CATEGORY",
            deadline: "Deadline",
            exported: "Exported",
            total: "Total tasks",
            date_format: "%m/%d/%Y",
            timestamp_format: "%m/%d/%Y, %H:%M:%S",
        },
        Language::Uk => TxtLabels {
            title: "📝 TASKY - СПИСОК ЗАДАЧ",
            no_category: "БЕЗ КАТЕГОРІЇ",
            deadline: "Дедлайн",
            exported: "Експортовано",
            total: "Всього задач",
            date_format: "%d.%m.%Y",
            timestamp_format: "%d.%m.%Y, %H:%M:%S",
        },
    }
}

/// Heading for a category group in the text listing.
pub fn category_heading(category: Category, language: Language) -> &'static str {
    match (language, category) {
        (Language::En, Category::Work) => "💼 WORK",
        (Language::En, Category::Personal) => "👤 PERSONAL",
        (Language::En, Category::Shopping) => "🛒 SHOPPING",
        (Language::En, Category::Health) => "💪 HEALTH",
        (Language::En, Category::Study) => "📚 STUDY",
        (Language::En, Category::Home) => "🏠 HOME",
        (Language::Uk, Category::Work) => "💼 РОБОТА",
        (Language::Uk, Category::Personal) => "👤 ОСОБИСТЕ",
        (Language::Uk, Category::Shopping) => "🛒 ПОКУПКИ",
        (Language::Uk, Category::Health) => "💪 ЗДОРОВ'Я",
        (Language::Uk, Category::Study) => "📚 НАВЧАННЯ",
        (Language::Uk, Category::Home) => "🏠 ДІМ",
    }
}

/// Group tasks by category in order of first appearance, keeping collection
/// order inside each group.
pub fn group_by_category(tasks: &[Task]) -> Vec<(Option<Category>, Vec<&Task>)> {
    let mut groups: Vec<(Option<Category>, Vec<&Task>)> = Vec::new();
    for t in tasks {
        match groups.iter_mut().find(|(c, _)| *c == t.category) {
            Some((_, members)) => members.push(t),
            None => groups.push((t.category, vec![t])),
        }
    }
    groups
}

/// Human-readable listing grouped by category.
pub fn export_txt(tasks: &[Task], language: Language, now: DateTime<Utc>) -> String {
    let labels = txt_labels(language);
    let heavy = "═".repeat(50);
    let light = "─".repeat(50);

    let mut txt = format!("{heavy}\n          {}\n{heavy}\n\n", labels.title);
    for (category, members) in group_by_category(tasks) {
        let heading = category
            .map(|c| category_heading(c, language))
            .unwrap_or(labels.no_category);
        txt.push_str(&format!("\n{heading}\n{light}\n"));
        for (i, t) in members.iter().enumerate() {
            let status = if t.completed { "✅" } else { "⬜" };
            txt.push_str(&format!("{}. {status} {} {}\n", i + 1, t.priority.mark(), t.text));
            if let Some(d) = t.deadline {
                txt.push_str(&format!(
                    "   📅 {}: {}\n",
                    labels.deadline,
                    d.format(labels.date_format)
                ));
            }
            if !t.notes.is_empty() {
                txt.push_str(&format!("   📝 {}\n", t.notes));
            }
            txt.push('\n');
        }
    }
    txt.push_str(&format!("\n{heavy}\n"));
    txt.push_str(&format!(
        "{}: {}\n",
        labels.exported,
        now.format(labels.timestamp_format)
    ));
    txt.push_str(&format!("{}: {}\n", labels.total, tasks.len()));
    txt
}

/// Full snapshot of the app state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Backup {
    pub tasks: Vec<Task>,
    pub theme: Theme,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub tasks_count: usize,
}

/// Serialize a backup of the current state.
pub fn create_backup(tasks: &[Task], theme: Theme, now: DateTime<Utc>) -> Result<ExportFile> {
    if tasks.is_empty() {
        return Err(Error::NothingToExport);
    }
    let backup = Backup {
        tasks: tasks.to_vec(),
        theme,
        timestamp: now,
        version: BACKUP_VERSION.to_string(),
        tasks_count: tasks.len(),
    };
    Ok(ExportFile {
        file_name: format!("tasky-backup-{}.json", now.format("%Y-%m-%d")),
        mime: FileFormat::Json.mime(),
        content: serde_json::to_string_pretty(&backup)?,
    })
}

/// A backup read back from disk, validated but not yet applied.
#[derive(Debug, Clone, PartialEq)]
pub struct RestoredBackup {
    pub outcome: ImportOutcome,
    pub theme: Option<Theme>,
}

/// Read a backup file. Its task list is validated like an import.
pub fn parse_backup(content: &str, limits: ImportLimits, now: DateTime<Utc>) -> Result<RestoredBackup> {
    check_size(content, limits)?;
    let root: Value =
        serde_json::from_str(content).map_err(|e| FormatError::InvalidJson(e.to_string()))?;
    let records = root
        .get("tasks")
        .and_then(Value::as_array)
        .ok_or(FormatError::MissingTaskList)?;
    if records.is_empty() {
        return Err(FormatError::NoRecords.into());
    }
    if let Some(version) = root.get("version").and_then(Value::as_str) {
        if version != BACKUP_VERSION {
            warn!(version, expected = BACKUP_VERSION, "backup version differs");
        }
    }
    let outcome = validate_imported(records, now);
    if outcome.tasks.is_empty() {
        return Err(FormatError::NoValidRecords {
            rejected: outcome.rejected_count(),
        }
        .into());
    }
    let theme = root.get("theme").and_then(Value::as_str).and_then(Theme::parse);
    Ok(RestoredBackup { outcome, theme })
}
