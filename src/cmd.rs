//! Command implementations for the CLI interface.
//!
//! Each handler works on an open [`Session`] and prints a human-readable result.
//! Errors are handed back to `main`, which maps them to exit codes.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use clap::Subcommand;
use clap_complete::{generate, Shell};

use crate::app::{ImportReport, Session};
use crate::calendar::{bucket_by_month, CalendarIndex, DayCell};
use crate::dates::{format_deadline_relative, parse_deadline_input, ReferenceDay};
use crate::error::{Error, FormatError, Result};
use crate::fields::*;
use crate::query::{derive, Filters};
use crate::stats::{category_counts, summarize};
use crate::storage::KeyValueStore;
use crate::task::{NewTask, Task, TaskEdit};
use crate::transfer::ExportFile;

const DUE_HELP: &str = "YYYY-MM-DD, today, tomorrow, eow, eom, in Nd/Nw/Nm, or a weekday";

#[derive(Subcommand)]
pub enum Commands {
    /// Add a new task.
    Add {
        /// What needs doing (up to 200 characters).
        text: String,
        /// Priority level: low | medium | high.
        #[arg(long, value_enum, default_value_t = Priority::Medium)]
        priority: Priority,
        /// Category: work | personal | shopping | health | study | home.
        #[arg(long, value_enum)]
        category: Option<Category>,
        /// Due date: YYYY-MM-DD, "today", "tomorrow", "in Nd", or a weekday.
        #[arg(long)]
        due: Option<String>,
        /// Free-form notes.
        #[arg(long)]
        notes: Option<String>,
    },

    /// List tasks with optional filters.
    List {
        /// Case-insensitive text search.
        #[arg(long, short)]
        search: Option<String>,
        /// Category, or "all".
        #[arg(long)]
        category: Option<CategoryFilter>,
        /// Status filter: all | active | completed.
        #[arg(long, value_enum, default_value_t = StatusFilter::All)]
        status: StatusFilter,
        /// Sort key: created-at | priority | deadline | alphabetical.
        #[arg(long, value_enum)]
        sort: Option<SortKey>,
        /// Limit number of rows printed.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// View a single task by ID or text.
    View {
        /// Task ID, ID prefix or text
        id: String,
    },

    /// Change fields on a task.
    Edit {
        /// Task ID, ID prefix or text
        id: String,
        #[arg(long)]
        text: Option<String>,
        #[arg(long, value_enum)]
        priority: Option<Priority>,
        #[arg(long, value_enum, conflicts_with = "clear_category")]
        category: Option<Category>,
        #[arg(long, conflicts_with = "clear_due")]
        due: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        /// Remove the category.
        #[arg(long)]
        clear_category: bool,
        /// Remove the due date.
        #[arg(long)]
        clear_due: bool,
    },

    /// Mark a task done, or reopen it.
    Toggle {
        /// Task ID, ID prefix or text
        id: String,
    },

    /// Delete a task.
    Delete {
        /// Task ID, ID prefix or text
        id: String,
    },

    /// Delete every completed task.
    ClearCompleted,

    /// Delete every task.
    ClearAll {
        /// Confirm deletion.
        #[arg(long)]
        yes: bool,
    },

    /// Manage a task's checklist.
    Subtask {
        #[command(subcommand)]
        action: SubtaskAction,
    },

    /// Replace a task's notes. Pass an empty string to clear them.
    Notes {
        /// Task ID, ID prefix or text
        id: String,
        notes: String,
    },

    /// Move a task to a position in the stored order (1 = first).
    Move {
        /// Task ID, ID prefix or text
        id: String,
        #[arg(value_parser = clap::value_parser!(u64).range(1..))]
        position: u64,
    },

    /// Swap two tasks in the stored order.
    Swap { a: String, b: String },

    /// Show progress and counters.
    Stats {
        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show tasks by deadline.
    Calendar {
        #[command(subcommand)]
        view: CalendarView,
    },

    /// Export tasks to JSON, CSV or TXT.
    Export {
        /// Output format; guessed from --output when omitted, else json.
        #[arg(long, short, value_enum)]
        format: Option<FileFormat>,
        /// Output file path, or "-" for stdout (default: tasky-tasks.<ext>)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Import tasks from a JSON or CSV file.
    Import {
        /// Input file path
        input: PathBuf,
        /// Input format; guessed from the file extension when omitted.
        #[arg(long, short, value_enum)]
        format: Option<FileFormat>,
    },

    /// Write a full backup of tasks and theme.
    Backup {
        /// Output file path (default: tasky-backup-YYYY-MM-DD.json)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Replace all tasks with the contents of a backup.
    Restore {
        /// Backup file path
        input: PathBuf,
    },

    /// Show or set the colour theme.
    Theme {
        #[arg(value_enum, conflicts_with = "toggle")]
        theme: Option<Theme>,
        /// Switch between dark and light.
        #[arg(long)]
        toggle: bool,
    },

    /// Show or set the language used for exports.
    Lang {
        #[arg(value_enum)]
        language: Option<Language>,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum SubtaskAction {
    /// Append a checklist item.
    Add {
        /// Task ID, ID prefix or text
        id: String,
        text: String,
    },
    /// Tick or untick a checklist item.
    Toggle {
        /// Task ID, ID prefix or text
        id: String,
        /// Item number as shown by `view` (1 = first)
        #[arg(value_parser = clap::value_parser!(u64).range(1..))]
        number: u64,
    },
    /// Remove a checklist item.
    Remove {
        /// Task ID, ID prefix or text
        id: String,
        /// Item number as shown by `view` (1 = first)
        #[arg(value_parser = clap::value_parser!(u64).range(1..))]
        number: u64,
    },
}

#[derive(Subcommand)]
pub enum CalendarView {
    /// Six-week grid for a month.
    Month {
        /// Month as YYYY-MM (default: current month)
        month: Option<String>,
    },
    /// Monday-to-Sunday strip around a date.
    Week {
        /// Any day of the week (default: today)
        date: Option<String>,
    },
    /// Tasks due on one day.
    Day {
        /// The day (default: today)
        date: Option<String>,
    },
}

/// Run a command against an open session.
pub fn run<S: KeyValueStore>(
    session: &mut Session<S>,
    command: Commands,
    day: &ReferenceDay,
    now: DateTime<Utc>,
) -> Result<()> {
    match command {
        Commands::Add {
            text,
            priority,
            category,
            due,
            notes,
        } => cmd_add(session, text, priority, category, due, notes, day, now),
        Commands::List {
            search,
            category,
            status,
            sort,
            limit,
        } => {
            let filters = Filters {
                search: search.unwrap_or_default(),
                category: category.unwrap_or_default(),
                status,
                sort: sort.unwrap_or(session.config().default_sort),
            };
            cmd_list(session, &filters, limit, day);
            Ok(())
        }
        Commands::View { id } => cmd_view(session, &id, day),
        Commands::Edit {
            id,
            text,
            priority,
            category,
            due,
            notes,
            clear_category,
            clear_due,
        } => {
            let deadline = match due {
                Some(d) => Some(Some(parse_due(&d, day.date)?)),
                None if clear_due => Some(None),
                None => None,
            };
            let category = match category {
                Some(c) => Some(Some(c)),
                None if clear_category => Some(None),
                None => None,
            };
            let edit = TaskEdit {
                text,
                priority,
                deadline,
                category,
                notes,
            };
            cmd_edit(session, &id, edit, now)
        }
        Commands::Toggle { id } => {
            let task = session.toggle(&id, now)?;
            let state = if task.completed { "completed" } else { "reopened" };
            println!("Task {} {}: {}", short_id(&task.id), state, task.text);
            Ok(())
        }
        Commands::Delete { id } => {
            let task = session.delete(&id)?;
            println!("Deleted task {}: {}", short_id(&task.id), task.text);
            Ok(())
        }
        Commands::ClearCompleted => {
            let removed = session.clear_completed()?;
            println!("Removed {removed} completed task(s).");
            Ok(())
        }
        Commands::ClearAll { yes } => {
            if !yes {
                return Err(Error::Validation(
                    "refusing to delete every task without --yes".to_string(),
                ));
            }
            let removed = session.clear_all()?;
            println!("Removed {removed} task(s).");
            Ok(())
        }
        Commands::Subtask { action } => cmd_subtask(session, action, now),
        Commands::Notes { id, notes } => {
            let task = session.set_notes(&id, &notes, now)?;
            if task.notes.is_empty() {
                println!("Cleared notes on task {}.", short_id(&task.id));
            } else {
                println!("Updated notes on task {}.", short_id(&task.id));
            }
            Ok(())
        }
        Commands::Move { id, position } => {
            session.move_to(&id, (position - 1) as usize)?;
            println!("Moved task to position {position}.");
            Ok(())
        }
        Commands::Swap { a, b } => {
            session.swap(&a, &b)?;
            println!("Swapped tasks.");
            Ok(())
        }
        Commands::Stats { json } => cmd_stats(session, json, day),
        Commands::Calendar { view } => cmd_calendar(session, view, day),
        Commands::Export { format, output } => {
            let format = format
                .or_else(|| output.as_deref().and_then(FileFormat::from_path))
                .unwrap_or(FileFormat::Json);
            let file = session.export(format, now)?;
            write_export(&file, output.as_deref(), session.tasks().len())
        }
        Commands::Import { input, format } => cmd_import(session, &input, format, now),
        Commands::Backup { output } => {
            let file = session.backup(now)?;
            write_export(&file, output.as_deref(), session.tasks().len())
        }
        Commands::Restore { input } => {
            let content = read_import_file(&input, session.config().max_import_bytes)?;
            let report = session.restore(&content, now)?;
            println!("Restored {} task(s) from {}", report.added, input.display());
            print_rejections(&report);
            Ok(())
        }
        Commands::Theme { theme, toggle } => {
            let theme = match (theme, toggle) {
                (Some(t), _) => {
                    session.set_theme(t)?;
                    t
                }
                (None, true) => session.toggle_theme()?,
                (None, false) => session.theme(),
            };
            println!("Theme: {}", theme.as_str());
            Ok(())
        }
        Commands::Lang { language } => {
            if let Some(l) = language {
                session.set_language(l)?;
            }
            println!("Language: {}", session.language().code());
            Ok(())
        }
        Commands::Completions { shell } => {
            cmd_completions(shell);
            Ok(())
        }
    }
}

/// Parse a due date argument relative to `today`.
pub fn parse_due(s: &str, today: NaiveDate) -> Result<NaiveDate> {
    parse_deadline_input(s, today)
        .ok_or_else(|| Error::Validation(format!("invalid due date '{s}'. Use {DUE_HELP}")))
}

/// Add a new task.
#[allow(clippy::too_many_arguments)]
pub fn cmd_add<S: KeyValueStore>(
    session: &mut Session<S>,
    text: String,
    priority: Priority,
    category: Option<Category>,
    due: Option<String>,
    notes: Option<String>,
    day: &ReferenceDay,
    now: DateTime<Utc>,
) -> Result<()> {
    let deadline = due.map(|d| parse_due(&d, day.date)).transpose()?;
    let new = NewTask {
        text,
        priority,
        deadline,
        category,
        notes: notes.unwrap_or_default(),
    };
    let task = session.add(new, now)?;
    println!("Added task {}: {}", short_id(&task.id), task.text);
    Ok(())
}

/// Print the filtered, sorted task list.
pub fn cmd_list<S: KeyValueStore>(
    session: &Session<S>,
    filters: &Filters,
    limit: Option<usize>,
    day: &ReferenceDay,
) {
    let mut shown = derive(session.tasks(), filters);
    if let Some(n) = limit {
        shown.truncate(n);
    }
    if shown.is_empty() {
        println!("No tasks.");
        return;
    }
    print_table(&shown, day.date);
}

/// View detailed information about a specific task.
pub fn cmd_view<S: KeyValueStore>(session: &Session<S>, id: &str, day: &ReferenceDay) -> Result<()> {
    let task = session.get(id)?;
    let (done, total) = task.subtask_progress();
    println!("ID:           {}", task.id);
    println!("Text:         {}", task.text);
    let status = if task.completed {
        "completed"
    } else if task.is_overdue(day.date) {
        "active (overdue)"
    } else {
        "active"
    };
    println!("Status:       {status}");
    println!("Priority:     {}", task.priority.as_str());
    println!("Category:     {}", task.category.map(Category::as_str).unwrap_or("-"));
    println!(
        "Due:          {}",
        match task.deadline {
            Some(d) => format!("{d} ({})", format_deadline_relative(Some(d), day.date)),
            None => "-".into(),
        }
    );
    println!("Created UTC:  {}", task.created_at.to_rfc3339());
    if let Some(ts) = task.completed_at {
        println!("Done UTC:     {}", ts.to_rfc3339());
    }
    if let Some(ts) = task.updated_at {
        println!("Updated UTC:  {}", ts.to_rfc3339());
    }
    println!(
        "Notes:\n{}\n",
        if task.notes.is_empty() { "-" } else { task.notes.as_str() }
    );
    if total > 0 {
        println!("Subtasks ({done}/{total}):");
        for (i, s) in task.subtasks.iter().enumerate() {
            println!("  {}. [{}] {}", i + 1, if s.completed { "x" } else { " " }, s.text);
        }
    }
    Ok(())
}

/// Update an existing task's fields.
pub fn cmd_edit<S: KeyValueStore>(
    session: &mut Session<S>,
    id: &str,
    edit: TaskEdit,
    now: DateTime<Utc>,
) -> Result<()> {
    if edit.is_empty() {
        return Err(Error::Validation("nothing to change".to_string()));
    }
    let task = session.edit(id, edit, now)?;
    println!("Updated task {}: {}", short_id(&task.id), task.text);
    Ok(())
}

fn cmd_subtask<S: KeyValueStore>(
    session: &mut Session<S>,
    action: SubtaskAction,
    now: DateTime<Utc>,
) -> Result<()> {
    match action {
        SubtaskAction::Add { id, text } => {
            let task = session.add_subtask(&id, &text, now)?;
            println!("Added subtask #{} to {}", task.subtasks.len(), short_id(&task.id));
        }
        SubtaskAction::Toggle { id, number } => {
            let task = session.toggle_subtask(&id, (number - 1) as usize, now)?;
            let (done, total) = task.subtask_progress();
            println!("Subtask #{number} toggled ({done}/{total} done)");
        }
        SubtaskAction::Remove { id, number } => {
            let sub = session.remove_subtask(&id, (number - 1) as usize, now)?;
            println!("Removed subtask #{number}: {}", sub.text);
        }
    }
    Ok(())
}

/// Print dashboard counters and per-category totals.
pub fn cmd_stats<S: KeyValueStore>(session: &Session<S>, json: bool, day: &ReferenceDay) -> Result<()> {
    let stats = summarize(session.tasks(), day);
    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }
    println!("Total:            {}", stats.total);
    println!("Active:           {}", stats.active);
    println!("Completed:        {}", stats.completed);
    println!("Progress:         {}%", stats.progress);
    println!("High priority:    {}", stats.high_priority);
    println!("Overdue:          {}", stats.overdue);
    println!("Completed today:  {}", stats.completed_today);
    println!("Due this week:    {}", stats.this_week);
    println!();
    println!("{:<12} {}", "Category", "Tasks");
    for (category, count) in category_counts(session.tasks()) {
        println!("{:<12} {}", category.map(Category::as_str).unwrap_or("-"), count);
    }
    Ok(())
}

fn parse_month(s: &str) -> Result<(i32, u32)> {
    let invalid = || Error::Validation(format!("invalid month '{s}'. Use YYYY-MM"));
    let (y, m) = s.trim().split_once('-').ok_or_else(invalid)?;
    let year = y.parse().map_err(|_| invalid())?;
    let month = m.parse().map_err(|_| invalid())?;
    if !(1..=12).contains(&month) {
        return Err(invalid());
    }
    Ok((year, month))
}

fn cmd_calendar<S: KeyValueStore>(
    session: &Session<S>,
    view: CalendarView,
    day: &ReferenceDay,
) -> Result<()> {
    let index = CalendarIndex::build(session.tasks());
    match view {
        CalendarView::Month { month } => {
            let (year, month) = match month {
                Some(m) => parse_month(&m)?,
                None => (day.date.year(), day.date.month()),
            };
            let grid = index.month_grid(year, month, day.date)?;
            print_month(&grid, year, month);
            let stats = index.month_stats(year, month, day)?;
            println!();
            println!(
                "This month: {} due, {} done ({}%). Upcoming: {}",
                stats.tasks_this_month,
                stats.completed_this_month,
                stats.completion_rate,
                stats.upcoming
            );
            for (d, tasks) in bucket_by_month(session.tasks(), year, month)? {
                for t in tasks {
                    println!("  {:>2}  {} {}", d, status_box(t), t.text);
                }
            }
        }
        CalendarView::Week { date } => {
            let date = match date {
                Some(d) => parse_due(&d, day.date)?,
                None => day.date,
            };
            for cell in index.week_strip(date, day.date) {
                let marker = if cell.is_today { " (today)" } else { "" };
                println!("{}{}", cell.date.format("%a %Y-%m-%d"), marker);
                for t in cell.tasks {
                    println!("    {} {} {}", status_box(t), t.priority.mark(), t.text);
                }
            }
        }
        CalendarView::Day { date } => {
            let date = match date {
                Some(d) => parse_due(&d, day.date)?,
                None => day.date,
            };
            let tasks = index.tasks_on(date);
            if tasks.is_empty() {
                println!("No tasks due on {date}.");
            } else {
                print_table(tasks, day.date);
            }
        }
    }
    Ok(())
}

fn print_month(grid: &[DayCell<'_>], year: i32, month: u32) {
    let title = NaiveDate::from_ymd_opt(year, month, 1)
        .map(|d| d.format("%B %Y").to_string())
        .unwrap_or_default();
    println!("{title:^28}");
    println!(" Mo  Tu  We  Th  Fr  Sa  Su");
    for week in grid.chunks(7) {
        let row: String = week
            .iter()
            .map(|c| {
                if !c.in_month {
                    return "   .".to_string();
                }
                let mark = if c.is_today {
                    '<'
                } else if c.tasks.is_empty() {
                    ' '
                } else {
                    '*'
                };
                format!("{:>3}{}", c.date.day(), mark)
            })
            .collect();
        println!("{}", row.trim_end());
    }
}

fn cmd_import<S: KeyValueStore>(
    session: &mut Session<S>,
    input: &Path,
    format: Option<FileFormat>,
    now: DateTime<Utc>,
) -> Result<()> {
    let format = format.or_else(|| FileFormat::from_path(input)).ok_or_else(|| {
        Error::Validation(format!(
            "cannot tell the format of {}; pass --format",
            input.display()
        ))
    })?;
    let content = read_import_file(input, session.config().max_import_bytes)?;
    let report = session.import(&content, format, now)?;
    println!("Imported {} task(s) from {}", report.added, input.display());
    if report.reassigned > 0 {
        println!("{} task(s) got new ids to avoid clashes.", report.reassigned);
    }
    print_rejections(&report);
    Ok(())
}

/// Read an import or restore file, refusing oversized files before loading
/// them and non-text content as a malformed file.
fn read_import_file(path: &Path, limit: usize) -> Result<String> {
    let size = fs::metadata(path)?.len();
    if size > limit as u64 {
        return Err(FormatError::TooLarge {
            size: usize::try_from(size).unwrap_or(usize::MAX),
            limit,
        }
        .into());
    }
    let bytes = fs::read(path)?;
    String::from_utf8(bytes).map_err(|_| FormatError::NotUtf8.into())
}

fn print_rejections(report: &ImportReport) {
    if report.rejected.is_empty() {
        return;
    }
    println!("Skipped {} invalid record(s):", report.rejected.len());
    for r in &report.rejected {
        println!("  record #{}: {}", r.index + 1, r.reason);
    }
}

fn write_export(file: &ExportFile, output: Option<&Path>, count: usize) -> Result<()> {
    match output {
        Some(p) if p == Path::new("-") => {
            print!("{}", file.content);
        }
        _ => {
            let path = output
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(&file.file_name));
            fs::write(&path, &file.content)?;
            println!("Exported {} task(s) to {}", count, path.display());
        }
    }
    Ok(())
}

/// Generate shell completions on stdout.
pub fn cmd_completions(shell: Shell) {
    use crate::cli::Cli;
    use clap::CommandFactory;

    let mut app = Cli::command();
    let app_name = app.get_name().to_string();
    generate(shell, &mut app, app_name, &mut std::io::stdout());
}

/// First eight characters of an id, enough to address it from the CLI.
pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(8) {
        Some((i, _)) => &id[..i],
        None => id,
    }
}

fn status_box(t: &Task) -> &'static str {
    if t.completed {
        "[x]"
    } else {
        "[ ]"
    }
}

/// Print tasks as an aligned table.
pub fn print_table(tasks: &[&Task], today: NaiveDate) {
    println!(
        "{:<8} {:<4} {:<6} {:<9} {:<10} {}",
        "ID", "Done", "Pri", "Category", "Due", "Text"
    );
    for t in tasks {
        let (done, total) = t.subtask_progress();
        let progress = if total > 0 {
            format!(" ({done}/{total})")
        } else {
            String::new()
        };
        println!(
            "{:<8} {:<4} {:<6} {:<9} {:<10} {}{}",
            short_id(&t.id),
            status_box(t),
            t.priority.as_str(),
            t.category.map(Category::as_str).unwrap_or("-"),
            format_deadline_relative(t.deadline, today),
            truncate(&t.text, 60),
            progress
        );
    }
}

/// Truncate a string to a maximum width, adding ellipsis if needed.
pub fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(width.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_id_keeps_short_ids_whole() {
        assert_eq!(short_id("t1"), "t1");
        assert_eq!(short_id("0f1e2d3c-aaaa-bbbb"), "0f1e2d3c");
    }

    #[test]
    fn truncate_adds_ellipsis() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 5), "abcd…");
    }

    #[test]
    fn month_argument_is_checked() {
        assert_eq!(parse_month("2024-03").unwrap(), (2024, 3));
        assert!(parse_month("2024-13").is_err());
        assert!(parse_month("March").is_err());
    }

    #[test]
    fn import_file_rejects_binary_and_oversized_content() {
        let dir = tempfile::tempdir().expect("tempdir");
        let binary = dir.path().join("tasks.csv");
        fs::write(&binary, [0xC0, 0xFF, 0xFE, 0x00]).unwrap();
        let err = read_import_file(&binary, 1024).unwrap_err();
        assert!(matches!(err, Error::Format(FormatError::NotUtf8)));
        assert_eq!(err.exit_code(), 2);

        let big = dir.path().join("tasks.json");
        fs::write(&big, "x".repeat(100)).unwrap();
        let err = read_import_file(&big, 10).unwrap_err();
        assert!(matches!(
            err,
            Error::Format(FormatError::TooLarge { size: 100, limit: 10 })
        ));
        assert_eq!(read_import_file(&big, 100).unwrap().len(), 100);
    }

    #[test]
    fn due_argument_errors_name_the_input() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        assert_eq!(
            parse_due("tomorrow", today).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 16).unwrap()
        );
        let err = parse_due("someday", today).unwrap_err();
        assert!(err.to_string().contains("someday"));
    }
}
