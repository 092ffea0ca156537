//! Derive the displayed task list from the collection and the filter state.
//!
//! Stages run in a fixed order: search, category, status, then sort. Filters
//! intersect. Sorting is stable and works on a list of references, so the
//! caller's collection is never reordered.

use std::cmp::Ordering;

use crate::fields::{CategoryFilter, SortKey, StatusFilter};
use crate::task::Task;

/// Everything that decides which tasks are shown, and in what order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filters {
    /// Case-insensitive substring of the task text. Empty disables searching.
    pub search: String,
    pub category: CategoryFilter,
    pub status: StatusFilter,
    pub sort: SortKey,
}

impl Filters {
    fn matches(&self, task: &Task, needle: Option<&str>) -> bool {
        if let Some(n) = needle {
            if !task.text.to_lowercase().contains(n) {
                return false;
            }
        }
        self.category.matches(task.category) && self.status.matches(task.completed)
    }
}

/// Filter and order `tasks` for display.
pub fn derive<'a>(tasks: &'a [Task], filters: &Filters) -> Vec<&'a Task> {
    let needle = filters.search.trim().to_lowercase();
    let needle = (!needle.is_empty()).then_some(needle.as_str());

    let mut shown: Vec<&Task> = tasks.iter().filter(|t| filters.matches(t, needle)).collect();
    sort_tasks(&mut shown, filters.sort);
    shown
}

/// Stable in-place sort of a list of task references.
pub fn sort_tasks(tasks: &mut [&Task], key: SortKey) {
    match key {
        SortKey::CreatedAt => tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
        SortKey::Priority => tasks.sort_by_key(|t| t.priority.rank()),
        SortKey::Deadline => tasks.sort_by(|a, b| match (a.deadline, b.deadline) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }),
        SortKey::Alphabetical => tasks.sort_by(|a, b| locale_cmp(&a.text, &b.text)),
    }
}

/// Human ordering of task texts: case-insensitive first, raw text as tiebreak.
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}
