//! Date-only helpers shared by statistics, calendar and the CLI.
//!
//! Every timestamp is reduced to a calendar date through a [`ReferenceDay`], which
//! carries the UTC offset used for the reduction, so no component depends on the
//! process's local clock implicitly.

use chrono::{DateTime, Datelike, Duration, FixedOffset, Local, NaiveDate, Offset, Utc};

/// "Today" at date granularity, with the offset used to read timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceDay {
    pub date: NaiveDate,
    pub offset: FixedOffset,
}

impl ReferenceDay {
    /// A reference day in UTC.
    pub fn utc(date: NaiveDate) -> Self {
        ReferenceDay {
            date,
            offset: Utc.fix(),
        }
    }

    /// The current day on the local clock, pinning the local offset.
    pub fn local_now() -> Self {
        let now = Local::now();
        ReferenceDay {
            date: now.date_naive(),
            offset: *now.offset(),
        }
    }

    /// Calendar date of a timestamp under this day's offset.
    pub fn day_of(&self, ts: DateTime<Utc>) -> NaiveDate {
        ts.with_timezone(&self.offset).date_naive()
    }

    /// Monday of the week containing this day.
    pub fn week_start(&self) -> NaiveDate {
        start_end_of_week(self.date).0
    }
}

/// Start (Monday) and end (Sunday) of the week containing `day`.
pub fn start_end_of_week(day: NaiveDate) -> (NaiveDate, NaiveDate) {
    let weekday = day.weekday().num_days_from_monday() as i64;
    let start = day - Duration::days(weekday);
    let end = start + Duration::days(6);
    (start, end)
}

/// Last day of the given month, or `None` for an invalid month.
pub fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    let first_of_next = NaiveDate::from_ymd_opt(next_year, next_month, 1)?;
    Some(first_of_next - Duration::days(1))
}

/// Read a deadline from stored or imported data: `YYYY-MM-DD`, or the date part
/// of an RFC 3339 timestamp.
pub fn parse_date_value(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.date_naive())
        .or_else(|| s.get(..10).and_then(|p| NaiveDate::parse_from_str(p, "%Y-%m-%d").ok()))
}

/// Parse an RFC 3339 timestamp into UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse human-readable deadline input relative to `today`.
///
/// Supports:
/// - "today", "tomorrow", "yesterday"
/// - "monday".."sunday" (and "mon".."sun"), optionally prefixed by "this" or "next"
/// - "end of week" / "eow", "end of month" / "eom", "weekend"
/// - "in 3d", "in 2w", "in 1m"
/// - "YYYY-MM-DD"
pub fn parse_deadline_input(s: &str, today: NaiveDate) -> Option<NaiveDate> {
    let s = s.trim().to_lowercase();

    match s.as_str() {
        "today" => return Some(today),
        "tomorrow" => return Some(today + Duration::days(1)),
        "yesterday" => return Some(today - Duration::days(1)),
        "end of week" | "eow" => return Some(start_end_of_week(today).1),
        "end of month" | "eom" => return last_day_of_month(today.year(), today.month()),
        "this weekend" | "weekend" => {
            let days_until_saturday = (5 + 7 - today.weekday().num_days_from_monday()) % 7;
            return Some(today + Duration::days(days_until_saturday as i64));
        }
        _ => {}
    }

    if let Some(rest) = s.strip_prefix("in ") {
        let rest = rest.trim();
        let split = rest.char_indices().last().map(|(i, _)| i).unwrap_or(0);
        let (amount, unit) = rest.split_at(split);
        if let Ok(n) = amount.trim().parse::<i64>() {
            let offset = match unit {
                "d" => Some(Duration::try_days(n)),
                "w" => Some(Duration::try_weeks(n)),
                // Approximate: 30 days per month
                "m" => Some(n.checked_mul(30).and_then(Duration::try_days)),
                _ => None,
            };
            // Out-of-range offsets are not a date
            if let Some(offset) = offset {
                return offset.and_then(|o| today.checked_add_signed(o));
            }
        }
    }

    let weekdays = [
        ("monday", 0),
        ("tuesday", 1),
        ("wednesday", 2),
        ("thursday", 3),
        ("friday", 4),
        ("saturday", 5),
        ("sunday", 6),
        ("mon", 0),
        ("tue", 1),
        ("wed", 2),
        ("thu", 3),
        ("fri", 4),
        ("sat", 5),
        ("sun", 6),
    ];
    let current = today.weekday().num_days_from_monday() as i64;
    for (name, target) in weekdays {
        let ahead = (target + 7 - current) % 7;
        if s == name || s == format!("this {name}") {
            return Some(today + Duration::days(ahead));
        }
        if s == format!("next {name}") {
            return Some(today + Duration::days(ahead + 7));
        }
    }

    NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()
}

/// Format a deadline relative to today ("today", "tomorrow", "in 3d", "2d late").
pub fn format_deadline_relative(deadline: Option<NaiveDate>, today: NaiveDate) -> String {
    match deadline {
        None => "-".into(),
        Some(d) => {
            let days = (d - today).num_days();
            match days {
                0 => "today".into(),
                1 => "tomorrow".into(),
                n if n > 1 => format!("in {n}d"),
                n => format!("{}d late", -n),
            }
        }
    }
}
