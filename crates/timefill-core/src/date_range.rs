//! Date-Range Resolver
//!
//! Turns a short natural-language phrase into a closed date interval and the
//! business days inside it. `today` is always injected by the caller.
//!
//! Vocabulary (case-insensitive, whitespace-tolerant):
//! - `today`, `yesterday`
//! - `this week`, `this month`
//! - `last|past|previous week|month` (full previous calendar period)
//! - `last|past|previous N day(s)|week(s)|month(s)`
//! - `since <weekday>`, `last|previous <weekday>`
//! - `YYYY-MM-DD`, `YYYY-MM-DD to YYYY-MM-DD`, `YYYY-MM-DD..YYYY-MM-DD`

use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, NaiveTime, Utc, Weekday};
use serde::Serialize;

use crate::config::CalendarSettings;
use crate::error::{Result, TimefillError};

/// A date expected to carry logged work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BusinessDay {
    pub date: NaiveDate,
    pub weekday: Weekday,
}

impl BusinessDay {
    #[must_use]
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            weekday: date.weekday(),
        }
    }
}

/// Which dates count as business days
#[derive(Debug, Clone, Default)]
pub struct WorkCalendar {
    holidays: BTreeSet<NaiveDate>,
    days_off: Vec<Weekday>,
}

impl WorkCalendar {
    #[must_use]
    pub fn new(settings: &CalendarSettings) -> Self {
        Self {
            holidays: settings.holidays.iter().copied().collect(),
            days_off: settings.days_off.clone(),
        }
    }

    #[must_use]
    pub fn is_business_day(&self, date: NaiveDate) -> bool {
        let weekday = date.weekday();
        !matches!(weekday, Weekday::Sat | Weekday::Sun)
            && !self.days_off.contains(&weekday)
            && !self.holidays.contains(&date)
    }

    /// Business days in `[start, end]`, ascending
    #[must_use]
    pub fn business_days(&self, start: NaiveDate, end: NaiveDate) -> Vec<BusinessDay> {
        start
            .iter_days()
            .take_while(|date| *date <= end)
            .filter(|date| self.is_business_day(*date))
            .map(BusinessDay::new)
            .collect()
    }
}

/// Resolved closed interval with its business days
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub business_days: Vec<BusinessDay>,
}

impl DateRange {
    /// Midnight of `start` to the last second of `end`, in UTC
    #[must_use]
    pub fn utc_bounds(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = self.start.and_time(NaiveTime::default()).and_utc();
        let end = self
            .end
            .and_hms_opt(23, 59, 59)
            .map_or(start, |end| end.and_utc());
        (start, end)
    }

    #[must_use]
    pub fn label(&self) -> String {
        format!("{}..{}", self.start, self.end)
    }
}

/// Parses date phrases against a work calendar
pub struct DateRangeResolver<'a> {
    calendar: &'a WorkCalendar,
}

/// Longest window a relative phrase may reach back, in days
const MAX_LOOKBACK_DAYS: u64 = 3660;
const MAX_LOOKBACK_MONTHS: u32 = 120;

enum Failure {
    /// Index of the first token that could not be matched
    At(usize),
    Inverted(NaiveDate, NaiveDate),
}

type Parsed = std::result::Result<(NaiveDate, NaiveDate), Failure>;

impl<'a> DateRangeResolver<'a> {
    #[must_use]
    pub fn new(calendar: &'a WorkCalendar) -> Self {
        Self { calendar }
    }

    /// Resolve `phrase` relative to `today`
    ///
    /// # Errors
    ///
    /// Returns `UnrecognizedPhrase` carrying the unparsed remainder, or
    /// `InvalidRange` for an explicit range whose start is after its end
    pub fn resolve(&self, phrase: &str, today: NaiveDate) -> Result<DateRange> {
        let lowered = phrase.to_lowercase();
        let tokens: Vec<&str> = lowered.split_whitespace().collect();

        let (start, end) = parse_tokens(&tokens, today).map_err(|failure| match failure {
            Failure::At(idx) => TimefillError::UnrecognizedPhrase {
                phrase: phrase.trim().to_string(),
                remainder: tokens[idx.min(tokens.len())..].join(" "),
            },
            Failure::Inverted(start, end) => TimefillError::InvalidRange { start, end },
        })?;

        let range = DateRange {
            start,
            end,
            business_days: self.calendar.business_days(start, end),
        };
        log::debug!(
            "Resolved '{}' to {} ({} business days)",
            phrase.trim(),
            range.label(),
            range.business_days.len()
        );
        Ok(range)
    }
}

// ============================================================================
// Phrase parsing
// ============================================================================

fn parse_tokens(tokens: &[&str], today: NaiveDate) -> Parsed {
    match tokens {
        [] => Err(Failure::At(0)),
        ["today", ..] => complete(tokens, 1, (today, today)),
        ["yesterday", ..] => {
            let day = days_before(today, 1);
            complete(tokens, 1, (day, day))
        }
        ["this", "week", ..] => complete(tokens, 2, week_of(today)),
        ["this", "month", ..] => complete(tokens, 2, month_of(today)),
        ["this", ..] => Err(Failure::At(1)),
        ["since", day, ..] => {
            let weekday = parse_weekday(day).ok_or(Failure::At(1))?;
            let start = days_before(today, days_since(today.weekday(), weekday));
            complete(tokens, 2, (start, today))
        }
        ["since"] => Err(Failure::At(0)),
        [quantifier, ..] if is_quantifier(quantifier) => parse_relative(tokens, today),
        [first, ..] => parse_explicit(tokens, first),
    }
}

/// `last|past|previous ...`
fn parse_relative(tokens: &[&str], today: NaiveDate) -> Parsed {
    let Some(&unit_or_count) = tokens.get(1) else {
        return Err(Failure::At(0));
    };

    match unit_or_count {
        "week" => {
            let (monday, _) = week_of(today);
            let previous = days_before(monday, 7);
            return complete(tokens, 2, (previous, days_before(monday, 1)));
        }
        "month" => {
            return previous_months(today, 1).and_then(|range| complete(tokens, 2, range));
        }
        _ => {}
    }

    if let Some(weekday) = parse_weekday(unit_or_count) {
        if tokens[0] == "past" {
            return Err(Failure::At(1));
        }
        let back = match days_since(today.weekday(), weekday) {
            0 => 7,
            n => n,
        };
        let day = days_before(today, back);
        return complete(tokens, 2, (day, day));
    }

    let count = unit_or_count
        .parse::<u32>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or(Failure::At(1))?;
    let unit = tokens.get(2).ok_or(Failure::At(1))?;

    let range = match *unit {
        "day" | "days" => lookback(today, u64::from(count))?,
        "week" | "weeks" => lookback(today, u64::from(count) * 7)?,
        "month" | "months" => previous_months(today, count)?,
        _ => return Err(Failure::At(2)),
    };
    complete(tokens, 3, range)
}

/// `YYYY-MM-DD`, `A to B`, `A .. B`, `A..B`
fn parse_explicit(tokens: &[&str], first: &str) -> Parsed {
    if let Some((left, right)) = first.split_once("..") {
        let start = parse_date(left).ok_or(Failure::At(0))?;
        let end = parse_date(right).ok_or(Failure::At(0))?;
        return ordered(start, end).and_then(|range| complete(tokens, 1, range));
    }

    let start = parse_date(first).ok_or(Failure::At(0))?;
    match tokens.get(1) {
        None => Ok((start, start)),
        Some(&("to" | "..")) => {
            let end = tokens
                .get(2)
                .and_then(|t| parse_date(t))
                .ok_or(Failure::At(2.min(tokens.len() - 1)))?;
            ordered(start, end).and_then(|range| complete(tokens, 3, range))
        }
        Some(_) => Err(Failure::At(1)),
    }
}

fn complete(tokens: &[&str], consumed: usize, range: (NaiveDate, NaiveDate)) -> Parsed {
    if tokens.len() > consumed {
        Err(Failure::At(consumed))
    } else {
        Ok(range)
    }
}

fn ordered(start: NaiveDate, end: NaiveDate) -> Parsed {
    if start > end {
        Err(Failure::Inverted(start, end))
    } else {
        Ok((start, end))
    }
}

fn is_quantifier(token: &str) -> bool {
    matches!(token, "last" | "past" | "previous")
}

fn parse_date(token: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(token, "%Y-%m-%d").ok()
}

fn parse_weekday(token: &str) -> Option<Weekday> {
    token.parse::<Weekday>().ok()
}

fn days_before(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_sub_days(Days::new(days)).unwrap_or(NaiveDate::MIN)
}

/// Days from the most recent `target` (inclusive of today) back to `today`
fn days_since(today: Weekday, target: Weekday) -> u64 {
    u64::from((today.num_days_from_monday() + 7 - target.num_days_from_monday()) % 7)
}

/// Monday..Sunday containing `date`
fn week_of(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let monday = days_before(date, u64::from(date.weekday().num_days_from_monday()));
    let sunday = monday.checked_add_days(Days::new(6)).unwrap_or(NaiveDate::MAX);
    (monday, sunday)
}

/// First..last day of the month containing `date`
fn month_of(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first = date.with_day(1).unwrap_or(date);
    let last = first
        .checked_add_months(Months::new(1))
        .map_or(NaiveDate::MAX, |next| days_before(next, 1));
    (first, last)
}

/// `[today - days, today]`; an out-of-range count fails on the count token
fn lookback(today: NaiveDate, days: u64) -> Parsed {
    if days > MAX_LOOKBACK_DAYS {
        return Err(Failure::At(1));
    }
    today
        .checked_sub_days(Days::new(days))
        .map(|start| (start, today))
        .ok_or(Failure::At(1))
}

/// The `count` full calendar months preceding the month of `today`
fn previous_months(today: NaiveDate, count: u32) -> Parsed {
    if count > MAX_LOOKBACK_MONTHS {
        return Err(Failure::At(1));
    }
    let (this_month, _) = month_of(today);
    let start = this_month
        .checked_sub_months(Months::new(count))
        .ok_or(Failure::At(1))?;
    Ok((start, days_before(this_month, 1)))
}
