//! Calendar views over task deadlines.
//!
//! A task sits on the day of its deadline, whether or not it is completed. The
//! month grid always spans six full weeks starting on the Monday on or before the
//! first of the month.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

use crate::dates::{start_end_of_week, ReferenceDay};
use crate::error::{Error, Result};
use crate::stats::percent;
use crate::task::Task;

/// Cells in a month grid: six weeks of seven days.
pub const GRID_CELLS: usize = 42;

/// Tasks due on `date`, in collection order.
pub fn tasks_on_date(tasks: &[Task], date: NaiveDate) -> Vec<&Task> {
    tasks.iter().filter(|t| t.deadline == Some(date)).collect()
}

/// Tasks due in the given month, keyed by day of month.
pub fn bucket_by_month(tasks: &[Task], year: i32, month: u32) -> Result<BTreeMap<u32, Vec<&Task>>> {
    first_of_month(year, month)?;
    let mut buckets: BTreeMap<u32, Vec<&Task>> = BTreeMap::new();
    for t in tasks {
        if let Some(d) = t.deadline {
            if d.year() == year && d.month() == month {
                buckets.entry(d.day()).or_default().push(t);
            }
        }
    }
    Ok(buckets)
}

fn first_of_month(year: i32, month: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| Error::Validation(format!("invalid month {year}-{month}")))
}

/// The 42 dates shown for a month, Monday first.
pub fn month_grid_dates(year: i32, month: u32) -> Result<Vec<NaiveDate>> {
    let start = start_end_of_week(first_of_month(year, month)?).0;
    Ok((0..GRID_CELLS as i64).map(|i| start + Duration::days(i)).collect())
}

/// Monday through Sunday of the week containing `date`.
pub fn week_dates(date: NaiveDate) -> Vec<NaiveDate> {
    let start = start_end_of_week(date).0;
    (0..7).map(|i| start + Duration::days(i)).collect()
}

/// One rendered day.
#[derive(Debug, Clone, PartialEq)]
pub struct DayCell<'a> {
    pub date: NaiveDate,
    /// False for the leading and trailing days borrowed from adjacent months.
    pub in_month: bool,
    pub is_today: bool,
    pub tasks: &'a [&'a Task],
}

/// Per-month deadline counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthStats {
    pub tasks_this_month: usize,
    pub completed_this_month: usize,
    /// Open tasks due on or after the reference day, across the whole collection.
    pub upcoming: usize,
    pub completion_rate: u32,
}

/// Deadline index built once from a snapshot, answering per-cell lookups.
#[derive(Debug, Default)]
pub struct CalendarIndex<'a> {
    by_date: BTreeMap<NaiveDate, Vec<&'a Task>>,
    all: &'a [Task],
}

impl<'a> CalendarIndex<'a> {
    pub fn build(tasks: &'a [Task]) -> Self {
        let mut by_date: BTreeMap<NaiveDate, Vec<&'a Task>> = BTreeMap::new();
        for t in tasks {
            if let Some(d) = t.deadline {
                by_date.entry(d).or_default().push(t);
            }
        }
        CalendarIndex { by_date, all: tasks }
    }

    /// Tasks due on `date`, in collection order.
    pub fn tasks_on(&self, date: NaiveDate) -> &[&'a Task] {
        self.by_date.get(&date).map(Vec::as_slice).unwrap_or(&[])
    }

    fn cell(&self, date: NaiveDate, month: Option<(i32, u32)>, today: NaiveDate) -> DayCell<'_> {
        DayCell {
            date,
            in_month: month.map_or(true, |(y, m)| date.year() == y && date.month() == m),
            is_today: date == today,
            tasks: self.tasks_on(date),
        }
    }

    /// Six-week grid for a month.
    pub fn month_grid(&self, year: i32, month: u32, today: NaiveDate) -> Result<Vec<DayCell<'_>>> {
        Ok(month_grid_dates(year, month)?
            .into_iter()
            .map(|d| self.cell(d, Some((year, month)), today))
            .collect())
    }

    /// Seven days, Monday first, around `date`.
    pub fn week_strip(&self, date: NaiveDate, today: NaiveDate) -> Vec<DayCell<'_>> {
        week_dates(date)
            .into_iter()
            .map(|d| self.cell(d, None, today))
            .collect()
    }

    /// Counters for the month `(year, month)`, with "upcoming" measured from `day`.
    pub fn month_stats(&self, year: i32, month: u32, day: &ReferenceDay) -> Result<MonthStats> {
        let first = first_of_month(year, month)?;
        let in_month: Vec<&Task> = self
            .by_date
            .range(first..)
            .take_while(|(d, _)| d.year() == year && d.month() == month)
            .flat_map(|(_, ts)| ts.iter().copied())
            .collect();
        let completed = in_month.iter().filter(|t| t.completed).count();
        let upcoming = self
            .all
            .iter()
            .filter(|t| !t.completed && t.deadline.is_some_and(|d| d >= day.date))
            .count();
        Ok(MonthStats {
            tasks_this_month: in_month.len(),
            completed_this_month: completed,
            upcoming,
            completion_rate: percent(completed, in_month.len()),
        })
    }
}
