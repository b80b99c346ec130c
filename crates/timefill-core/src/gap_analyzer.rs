//! Gap Analyzer
//!
//! Sums logged time per business day by wall-clock overlap with the UTC day
//! `[00:00, next 00:00)` and reports the days that fall short.

use std::collections::BTreeMap;

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use timefill_integrations::TimeEntry;

use crate::date_range::BusinessDay;

/// Business day missing logged time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Gap {
    pub day: BusinessDay,
    pub logged_seconds: i64,
}

/// Logged time attributed to one day
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DayLog {
    /// At least one entry intersects the day (zero-length entries included)
    pub touched: bool,
    pub seconds: i64,
}

pub struct GapAnalyzer {
    min_expected_seconds: i64,
}

impl GapAnalyzer {
    #[must_use]
    pub fn new(min_expected_seconds: i64) -> Self {
        Self {
            min_expected_seconds,
        }
    }

    /// Per-day logged time for `days`
    #[must_use]
    pub fn logged_per_day(
        &self,
        days: &[BusinessDay],
        entries: &[TimeEntry],
    ) -> BTreeMap<NaiveDate, DayLog> {
        days.iter()
            .map(|day| {
                let (day_start, day_end) = day_window(day.date);
                let log = entries.iter().fold(DayLog::default(), |mut log, entry| {
                    if let Some(seconds) = overlap_seconds(entry, day_start, day_end) {
                        log.touched = true;
                        log.seconds += seconds;
                    }
                    log
                });
                (day.date, log)
            })
            .collect()
    }

    /// Gaps among `days`, earliest first
    ///
    /// A day is a gap when no entry touches it, or when it logs fewer
    /// seconds than the configured minimum.
    #[must_use]
    pub fn find_gaps(&self, days: &[BusinessDay], entries: &[TimeEntry]) -> Vec<Gap> {
        let logged = self.logged_per_day(days, entries);

        let mut gaps: Vec<Gap> = days
            .iter()
            .filter_map(|day| {
                let log = logged.get(&day.date).copied().unwrap_or_default();
                let short = !log.touched || log.seconds < self.min_expected_seconds;
                short.then_some(Gap {
                    day: *day,
                    logged_seconds: log.seconds,
                })
            })
            .collect();
        gaps.sort_by_key(|gap| gap.day.date);

        log::debug!(
            "{} of {} business days are gaps (minimum {}s)",
            gaps.len(),
            days.len(),
            self.min_expected_seconds
        );
        gaps
    }
}

fn day_window(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = date.and_time(NaiveTime::default()).and_utc();
    let end = date
        .checked_add_days(Days::new(1))
        .map_or(DateTime::<Utc>::MAX_UTC, |next| {
            next.and_time(NaiveTime::default()).and_utc()
        });
    (start, end)
}

/// Seconds of `entry` inside `[day_start, day_end)`; `None` when it does not touch the day
fn overlap_seconds(
    entry: &TimeEntry,
    day_start: DateTime<Utc>,
    day_end: DateTime<Utc>,
) -> Option<i64> {
    if entry.start == entry.end {
        return (entry.start >= day_start && entry.start < day_end).then_some(0);
    }

    let from = entry.start.max(day_start);
    let to = entry.end.min(day_end);
    (from < to).then(|| (to - from).num_seconds())
}
