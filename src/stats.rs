//! Aggregate counters over the task collection.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::dates::ReferenceDay;
use crate::fields::{Category, Priority};
use crate::task::Task;

/// Dashboard counters. All date comparisons are at day granularity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total: usize,
    pub completed: usize,
    pub active: usize,
    /// Whole percent of completed tasks; 0 for an empty collection.
    pub progress: u32,
    /// Open tasks marked high priority.
    pub high_priority: usize,
    /// Open tasks whose deadline is before the reference day.
    pub overdue: usize,
    /// Tasks completed on the reference day.
    pub completed_today: usize,
    /// Open tasks due between this week's Monday and the reference day.
    pub this_week: usize,
}

/// Compute [`Stats`] for `tasks` as seen on `day`.
pub fn summarize(tasks: &[Task], day: &ReferenceDay) -> Stats {
    let today = day.date;
    let week_start = day.week_start();

    let total = tasks.len();
    let completed = tasks.iter().filter(|t| t.completed).count();
    let open = || tasks.iter().filter(|t| !t.completed);

    Stats {
        total,
        completed,
        active: total - completed,
        progress: percent(completed, total),
        high_priority: open().filter(|t| t.priority == Priority::High).count(),
        overdue: open().filter(|t| t.deadline.is_some_and(|d| d < today)).count(),
        completed_today: tasks
            .iter()
            .filter(|t| t.completed_at.is_some_and(|ts| day.day_of(ts) == today))
            .count(),
        this_week: open()
            .filter(|t| t.deadline.is_some_and(|d| d >= week_start && d <= today))
            .count(),
    }
}

/// Rounded share of `part` in `whole`, 0 when `whole` is 0.
pub fn percent(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    ((part as f64 / whole as f64) * 100.0).round() as u32
}

/// Number of tasks per category. Tasks without a category are counted under
/// `None`. Every category is present, with zero when unused.
pub fn category_counts(tasks: &[Task]) -> BTreeMap<Option<Category>, usize> {
    let mut counts: BTreeMap<Option<Category>, usize> = BTreeMap::new();
    counts.insert(None, 0);
    for c in Category::ALL {
        counts.insert(Some(c), 0);
    }
    for t in tasks {
        *counts.entry(t.category).or_default() += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn task(text: &str) -> Task {
        Task {
            id: text.into(),
            text: text.into(),
            completed: false,
            priority: Priority::Medium,
            deadline: None,
            category: None,
            notes: String::new(),
            subtasks: vec![],
            created_at: Utc.with_ymd_and_hms(2023, 12, 1, 0, 0, 0).unwrap(),
            completed_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn empty_collection_has_zero_progress() {
        let stats = summarize(&[], &ReferenceDay::utc(d(2024, 1, 2)));
        assert_eq!(stats, Stats::default());
    }

    #[test]
    fn mixed_collection_scenario() {
        let mut a = task("A");
        a.priority = Priority::High;
        a.deadline = Some(d(2024, 1, 1));
        let mut b = task("B");
        b.priority = Priority::Low;
        b.completed = true;
        b.completed_at = Some(Utc.with_ymd_and_hms(2023, 12, 30, 8, 0, 0).unwrap());

        let stats = summarize(&[a, b], &ReferenceDay::utc(d(2024, 1, 2)));
        assert_eq!(stats.total, 2);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.active, 1);
        assert_eq!(stats.overdue, 1);
        assert_eq!(stats.high_priority, 1);
        assert_eq!(stats.progress, 50);
        assert_eq!(stats.completed_today, 0);
    }

    #[test]
    fn this_week_runs_from_monday_to_today() {
        // 2024-03-17 is a Sunday; the week started on Monday 2024-03-11.
        let day = ReferenceDay::utc(d(2024, 3, 17));
        let mut before = task("before");
        before.deadline = Some(d(2024, 3, 10));
        let mut monday = task("monday");
        monday.deadline = Some(d(2024, 3, 11));
        let mut sunday = task("sunday");
        sunday.deadline = Some(d(2024, 3, 17));
        let mut later = task("later");
        later.deadline = Some(d(2024, 3, 18));
        let mut done = task("done");
        done.deadline = Some(d(2024, 3, 12));
        done.completed = true;

        let stats = summarize(&[before, monday, sunday, later, done], &day);
        assert_eq!(stats.this_week, 2);
        assert_eq!(stats.overdue, 2);
    }

    #[test]
    fn completed_today_uses_date_only() {
        let day = ReferenceDay::utc(d(2024, 3, 15));
        let mut early = task("early");
        early.completed = true;
        early.completed_at = Some(Utc.with_ymd_and_hms(2024, 3, 15, 0, 1, 0).unwrap());
        let mut late = task("late");
        late.completed = true;
        late.completed_at = Some(Utc.with_ymd_and_hms(2024, 3, 15, 23, 59, 0).unwrap());
        assert_eq!(summarize(&[early, late], &day).completed_today, 2);
    }

    #[test]
    fn percent_rounds() {
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(0, 0), 0);
    }

    #[test]
    fn category_counts_include_uncategorized() {
        let mut w = task("w");
        w.category = Some(Category::Work);
        let counts = category_counts(&[w, task("x"), task("y")]);
        assert_eq!(counts[&Some(Category::Work)], 1);
        assert_eq!(counts[&None], 2);
        assert_eq!(counts[&Some(Category::Home)], 0);
        assert_eq!(counts.len(), 7);
    }
}
