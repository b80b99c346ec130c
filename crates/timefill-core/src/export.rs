//! Report Exporter
//!
//! Two-step pipeline: the server-aggregated report first, then (exactly once,
//! on any primary failure) the raw entry listing aggregated locally. Both
//! paths normalize entry durations and aggregate the same way, so the caller
//! only sees which path ran through [`ReportSource`].

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use timefill_integrations::{TimeEntry, TimeTracking};

use crate::date_range::DateRange;
use crate::error::{Result, TimefillError};

const NO_DESCRIPTION: &str = "(no description)";

/// Which query surface produced a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportSource {
    Primary,
    Fallback,
}

impl ReportSource {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Fallback => "fallback",
        }
    }
}

/// One normalized entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    pub date: NaiveDate,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub description: String,
    pub seconds: i64,
    pub project_id: Option<String>,
    pub billable: bool,
}

/// Normalized report handed to the writers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkReport {
    pub source: ReportSource,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub total_seconds: i64,
    pub entry_count: usize,
    pub daily_totals: BTreeMap<NaiveDate, i64>,
    pub description_totals: BTreeMap<String, i64>,
    pub rows: Vec<ReportRow>,
}

impl WorkReport {
    /// Aggregate entries into rows and totals
    #[must_use]
    pub fn aggregate(
        source: ReportSource,
        range: &DateRange,
        entries: &[TimeEntry],
        tolerance_seconds: i64,
    ) -> Self {
        let mut rows: Vec<ReportRow> = entries
            .iter()
            .map(|entry| ReportRow {
                date: entry.start.date_naive(),
                start: entry.start,
                end: entry.end,
                description: entry.description.trim().to_string(),
                seconds: normalize_duration(entry, tolerance_seconds),
                project_id: entry.project_id.clone(),
                billable: entry.billable,
            })
            .collect();
        rows.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.description.cmp(&b.description)));

        let mut daily_totals = BTreeMap::new();
        let mut description_totals = BTreeMap::new();
        for row in &rows {
            *daily_totals.entry(row.date).or_insert(0) += row.seconds;
            let key = if row.description.is_empty() {
                NO_DESCRIPTION.to_string()
            } else {
                row.description.clone()
            };
            *description_totals.entry(key).or_insert(0) += row.seconds;
        }

        Self {
            source,
            start: range.start,
            end: range.end,
            total_seconds: rows.iter().map(|r| r.seconds).sum(),
            entry_count: rows.len(),
            daily_totals,
            description_totals,
            rows,
        }
    }
}

/// Result of an export, tagged with the path that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOutcome {
    pub report: WorkReport,
    /// Why the primary path was abandoned, when it was
    pub primary_error: Option<String>,
}

impl ExportOutcome {
    #[must_use]
    pub fn source(&self) -> ReportSource {
        self.report.source
    }
}

/// Entry duration in seconds, preferring the computed interval
///
/// The reported duration is used only when it agrees with `end - start`
/// within `tolerance_seconds`; a larger disagreement is logged as a data
/// inconsistency.
#[must_use]
pub fn normalize_duration(entry: &TimeEntry, tolerance_seconds: i64) -> i64 {
    let computed = entry.interval_seconds();
    match entry.reported_seconds {
        Some(reported) if (reported - computed).abs() <= tolerance_seconds => reported,
        Some(reported) => {
            let inconsistency = TimefillError::DataInconsistency {
                entry_id: entry.id.clone(),
                reported,
                computed,
            };
            log::warn!("{inconsistency}; using {computed}s");
            computed
        }
        None => computed,
    }
}

pub struct ReportExporter<'a> {
    tracker: &'a dyn TimeTracking,
    tolerance_seconds: i64,
}

impl<'a> ReportExporter<'a> {
    #[must_use]
    pub fn new(tracker: &'a dyn TimeTracking, tolerance_seconds: i64) -> Self {
        Self {
            tracker,
            tolerance_seconds,
        }
    }

    /// Export `range`, falling back to the raw listing once if the reports API fails
    ///
    /// # Errors
    ///
    /// Returns `Upstream` naming the interval when both paths fail
    pub async fn export(&self, range: &DateRange) -> Result<ExportOutcome> {
        let (start, end) = range.utc_bounds();

        let primary_error = match self.tracker.detailed_report(start, end).await {
            Ok(report) => {
                let work = WorkReport::aggregate(
                    ReportSource::Primary,
                    range,
                    &report.entries,
                    self.tolerance_seconds,
                );
                if work.total_seconds != report.total_seconds {
                    log::debug!(
                        "Server total {}s differs from normalized total {}s",
                        report.total_seconds,
                        work.total_seconds
                    );
                }
                log::info!(
                    "Exported {} entries for {} from the reports API",
                    work.entry_count,
                    range.label()
                );
                return Ok(ExportOutcome {
                    report: work,
                    primary_error: None,
                });
            }
            Err(e) => format!("{e:#}"),
        };

        log::warn!("Reports API failed ({primary_error}), aggregating raw entries");

        let entries = self.tracker.list_entries(start, end).await.map_err(|e| {
            TimefillError::upstream(
                "export report",
                format!("{} (reports API: {primary_error})", range.label()),
                e,
            )
        })?;

        let work = WorkReport::aggregate(
            ReportSource::Fallback,
            range,
            &entries,
            self.tolerance_seconds,
        );
        log::info!(
            "Exported {} entries for {} from the entry listing",
            work.entry_count,
            range.label()
        );
        Ok(ExportOutcome {
            report: work,
            primary_error: Some(primary_error),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::date_range::{DateRangeResolver, WorkCalendar};
    use anyhow::Result as AnyResult;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use timefill_integrations::{
        convert_entries, convert_report, ClockifyTimeEntry, DetailedReport, NewTimeEntry,
        ReportResponse,
    };

    /// Serves the same entries through both surfaces
    struct FakeTracker {
        entries: Vec<TimeEntry>,
        report_fails: bool,
        listing_fails: bool,
        report_calls: AtomicUsize,
        list_calls: AtomicUsize,
    }

    impl FakeTracker {
        fn new(entries: Vec<TimeEntry>) -> Self {
            Self {
                entries,
                report_fails: false,
                listing_fails: false,
                report_calls: AtomicUsize::new(0),
                list_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl TimeTracking for FakeTracker {
        async fn list_entries(&self, _: DateTime<Utc>, _: DateTime<Utc>) -> AnyResult<Vec<TimeEntry>> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            if self.listing_fails {
                anyhow::bail!("Clockify API error (503 Service Unavailable)");
            }
            // The basic listing sends ISO 8601 durations, dropped here to force recomputation
            Ok(self
                .entries
                .iter()
                .map(|e| {
                    let mut e = e.clone();
                    e.reported_seconds = None;
                    e
                })
                .collect())
        }

        async fn create_entry(&self, _: &NewTimeEntry) -> AnyResult<()> {
            Ok(())
        }

        async fn detailed_report(&self, _: DateTime<Utc>, _: DateTime<Utc>) -> AnyResult<DetailedReport> {
            self.report_calls.fetch_add(1, Ordering::SeqCst);
            if self.report_fails {
                anyhow::bail!("Clockify reports API error (400 Bad Request): invalid filter");
            }
            Ok(DetailedReport {
                total_seconds: self.entries.iter().filter_map(|e| e.reported_seconds).sum(),
                entries_count: self.entries.len(),
                entries: self.entries.clone(),
            })
        }

        async fn validate_credentials(&self) -> AnyResult<bool> {
            Ok(true)
        }

        fn system_name(&self) -> &'static str {
            "fake"
        }
    }

    fn march_week() -> DateRange {
        let calendar = WorkCalendar::default();
        DateRangeResolver::new(&calendar)
            .resolve("2025-03-03 to 2025-03-07", NaiveDate::from_ymd_opt(2025, 3, 15).unwrap())
            .unwrap()
    }

    fn entry(id: &str, description: &str, day: u32, from: u32, to: u32) -> TimeEntry {
        let start = Utc.with_ymd_and_hms(2025, 3, day, from, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 3, day, to, 0, 0).unwrap();
        TimeEntry::new(id.to_string(), description.to_string(), start, end)
            .unwrap()
            .with_reported_seconds(i64::from(to - from) * 3600)
    }

    fn sample() -> Vec<TimeEntry> {
        vec![
            entry("e1", "Feature work", 3, 9, 12),
            entry("e2", "Code review", 3, 13, 14),
            entry("e3", "Feature work", 4, 9, 11),
        ]
    }

    #[test]
    fn test_normalize_duration() {
        let base = entry("e1", "Work", 3, 9, 10);
        assert_eq!(normalize_duration(&base, 60), 3600);

        let within = base.clone().with_reported_seconds(3630);
        assert_eq!(normalize_duration(&within, 60), 3630);

        let beyond = base.clone().with_reported_seconds(7200);
        assert_eq!(normalize_duration(&beyond, 60), 3600);

        let mut absent = base;
        absent.reported_seconds = None;
        assert_eq!(normalize_duration(&absent, 60), 3600);
    }

    #[test]
    fn test_aggregate_totals() {
        let report = WorkReport::aggregate(ReportSource::Primary, &march_week(), &sample(), 60);

        assert_eq!(report.total_seconds, 6 * 3600);
        assert_eq!(report.entry_count, 3);
        assert_eq!(
            report.daily_totals[&NaiveDate::from_ymd_opt(2025, 3, 3).unwrap()],
            4 * 3600
        );
        assert_eq!(report.description_totals["Feature work"], 5 * 3600);
        assert_eq!(report.description_totals["Code review"], 3600);
    }

    #[tokio::test]
    async fn test_primary_success() {
        let tracker = FakeTracker::new(sample());
        let outcome = ReportExporter::new(&tracker, 60).export(&march_week()).await.unwrap();

        assert_eq!(outcome.source(), ReportSource::Primary);
        assert!(outcome.primary_error.is_none());
        assert_eq!(tracker.list_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_http_400_falls_back_exactly_once() {
        let mut tracker = FakeTracker::new(sample());
        tracker.report_fails = true;

        let outcome = ReportExporter::new(&tracker, 60).export(&march_week()).await.unwrap();

        assert_eq!(outcome.source(), ReportSource::Fallback);
        assert!(outcome.primary_error.as_deref().unwrap().contains("400"));
        assert_eq!(tracker.report_calls.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.list_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_both_paths_produce_identical_totals() {
        let primary = FakeTracker::new(sample());
        let mut fallback = FakeTracker::new(sample());
        fallback.report_fails = true;

        let a = ReportExporter::new(&primary, 60).export(&march_week()).await.unwrap();
        let b = ReportExporter::new(&fallback, 60).export(&march_week()).await.unwrap();

        assert_eq!(a.report.total_seconds, b.report.total_seconds);
        assert_eq!(a.report.daily_totals, b.report.daily_totals);
        assert_eq!(a.report.description_totals, b.report.description_totals);
        assert_eq!(a.report.rows, b.report.rows);
        assert_ne!(a.source(), b.source());
    }

    #[tokio::test]
    async fn test_both_paths_failing_is_upstream_error() {
        let mut tracker = FakeTracker::new(sample());
        tracker.report_fails = true;
        tracker.listing_fails = true;

        let err = ReportExporter::new(&tracker, 60)
            .export(&march_week())
            .await
            .unwrap_err();

        assert_eq!(err.kind(), crate::error::ErrorKind::Upstream);
        let message = err.to_string();
        assert!(message.contains("export report"));
        assert!(message.contains("2025-03-03..2025-03-07"));
        assert!(message.contains("400"));
        assert_eq!(tracker.list_calls.load(Ordering::SeqCst), 1);
    }

    /// Decodes the two Clockify wire bodies instead of sharing domain values
    struct WireTracker {
        report_body: &'static str,
        listing_body: &'static str,
        report_fails: bool,
    }

    #[async_trait]
    impl TimeTracking for WireTracker {
        async fn list_entries(&self, _: DateTime<Utc>, _: DateTime<Utc>) -> AnyResult<Vec<TimeEntry>> {
            let page: Vec<ClockifyTimeEntry> = serde_json::from_str(self.listing_body)?;
            convert_entries(page)
        }

        async fn create_entry(&self, _: &NewTimeEntry) -> AnyResult<()> {
            Ok(())
        }

        async fn detailed_report(&self, _: DateTime<Utc>, _: DateTime<Utc>) -> AnyResult<DetailedReport> {
            if self.report_fails {
                anyhow::bail!("Clockify reports API error (400 Bad Request)");
            }
            let body: ReportResponse = serde_json::from_str(self.report_body)?;
            convert_report(body)
        }

        async fn validate_credentials(&self) -> AnyResult<bool> {
            Ok(true)
        }

        fn system_name(&self) -> &'static str {
            "wire"
        }
    }

    // Durations in seconds, one entry sent with an offset timestamp
    const REPORT_BODY: &str = r#"{
        "totals": [{ "_id": "", "totalTime": 21600, "entriesCount": 3 }],
        "timeentries": [
            {
                "_id": "e1", "description": "Feature work", "projectId": "p1", "billable": true,
                "timeInterval": { "start": "2025-03-03T09:00:00Z", "end": "2025-03-03T12:00:00Z", "duration": 10800 }
            },
            {
                "_id": "e2", "description": "Code review", "projectId": "p1", "billable": false,
                "timeInterval": { "start": "2025-03-03T13:00:00Z", "end": "2025-03-03T14:00:00Z", "duration": 3600 }
            },
            {
                "_id": "e3", "description": "Feature work", "projectId": "p1", "billable": true,
                "timeInterval": { "start": "2025-03-04T10:00:00+01:00", "end": "2025-03-04T12:00:00+01:00", "duration": 7200 }
            }
        ]
    }"#;

    // ISO 8601 durations plus a running timer that must be skipped
    const LISTING_BODY: &str = r#"[
        {
            "id": "e1", "description": "Feature work", "projectId": "p1", "billable": true,
            "timeInterval": { "start": "2025-03-03T09:00:00Z", "end": "2025-03-03T12:00:00Z", "duration": "PT3H" }
        },
        {
            "id": "e2", "description": "Code review", "projectId": "p1", "billable": false,
            "timeInterval": { "start": "2025-03-03T13:00:00Z", "end": "2025-03-03T14:00:00Z", "duration": "PT1H" }
        },
        {
            "id": "e3", "description": "Feature work", "projectId": "p1", "billable": true,
            "timeInterval": { "start": "2025-03-04T09:00:00Z", "end": "2025-03-04T11:00:00Z", "duration": "PT2H" }
        },
        {
            "id": "e4", "description": "Still running", "projectId": "p1", "billable": true,
            "timeInterval": { "start": "2025-03-07T09:00:00Z", "end": null, "duration": null }
        }
    ]"#;

    #[tokio::test]
    async fn test_wire_bodies_aggregate_identically() {
        let primary = WireTracker {
            report_body: REPORT_BODY,
            listing_body: LISTING_BODY,
            report_fails: false,
        };
        let fallback = WireTracker {
            report_body: REPORT_BODY,
            listing_body: LISTING_BODY,
            report_fails: true,
        };

        let a = ReportExporter::new(&primary, 60).export(&march_week()).await.unwrap();
        let b = ReportExporter::new(&fallback, 60).export(&march_week()).await.unwrap();

        assert_eq!(a.source(), ReportSource::Primary);
        assert_eq!(b.source(), ReportSource::Fallback);
        assert_eq!(a.report.total_seconds, 6 * 3600);
        assert_eq!(a.report.total_seconds, b.report.total_seconds);
        assert_eq!(a.report.entry_count, b.report.entry_count);
        assert_eq!(a.report.daily_totals, b.report.daily_totals);
        assert_eq!(a.report.description_totals, b.report.description_totals);
        assert_eq!(a.report.rows, b.report.rows);
    }
}
