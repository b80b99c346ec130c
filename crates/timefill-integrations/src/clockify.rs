//! Clockify API client
//!
//! Implements `TimeTracking` on top of two Clockify surfaces:
//! - the basic REST API (`/workspaces/{id}/...`) for listing and creating entries
//! - the reports API (`/reports/detailed`) for server-side aggregation
//!
//! The two surfaces disagree on duration encoding: the basic listing sends an
//! ISO 8601 duration string (`PT1H30M`), the reports API sends seconds.

use std::sync::OnceLock;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use reqwest::header;
use serde::{Deserialize, Serialize};

use crate::http::{build_client, format_timestamp, parse_timestamp, ResponseExt};
use crate::traits::{DetailedReport, NewTimeEntry, TimeEntry, TimeTracking};

const DEFAULT_BASE_URL: &str = "https://api.clockify.me/api/v1";
const DEFAULT_REPORTS_URL: &str = "https://reports.api.clockify.me/v1";
const PAGE_SIZE: usize = 200;
const REPORT_PAGE_SIZE: usize = 1000;

// ============================================================================
// API Types
// ============================================================================

/// Authenticated Clockify user
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClockifyUser {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Entry as sent by the basic listing
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClockifyTimeEntry {
    id: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    project_id: Option<String>,
    #[serde(default)]
    billable: bool,
    time_interval: ClockifyInterval,
}

#[derive(Debug, Deserialize)]
struct ClockifyInterval {
    start: String,
    end: Option<String>,
    /// ISO 8601 duration, absent while the timer is running
    duration: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateTimeEntryRequest<'a> {
    start: String,
    end: String,
    description: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    project_id: Option<&'a str>,
    billable: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DetailedReportRequest {
    date_range_start: String,
    date_range_end: String,
    detailed_filter: DetailedFilter,
    export_type: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DetailedFilter {
    page: usize,
    page_size: usize,
}

/// Body of the detailed reports API
#[derive(Debug, Deserialize)]
pub struct ReportResponse {
    totals: Vec<Option<ReportTotals>>,
    timeentries: Vec<ReportTimeEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportTotals {
    total_time: i64,
    entries_count: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReportTimeEntry {
    #[serde(rename = "_id")]
    id: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    project_id: Option<String>,
    #[serde(default)]
    billable: bool,
    time_interval: ReportInterval,
}

#[derive(Debug, Deserialize)]
struct ReportInterval {
    start: String,
    end: Option<String>,
    /// Seconds
    duration: Option<i64>,
}

// ============================================================================
// Clockify Client
// ============================================================================

/// Clockify API client
pub struct ClockifyClient {
    workspace_id: String,
    base_url: String,
    reports_url: String,
    client: reqwest::Client,
}

impl ClockifyClient {
    /// Create a new Clockify client
    ///
    /// # Arguments
    /// * `api_key` - Clockify API key (Profile Settings > API)
    /// * `workspace_id` - Workspace the entries live in
    /// * `base_url` - Optional base URL override (tests, regional instances)
    ///
    /// # Errors
    ///
    /// Returns an error if the key is not a valid header value or the HTTP
    /// client cannot be created
    pub fn new(api_key: &str, workspace_id: String, base_url: Option<String>) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            "X-Api-Key",
            header::HeaderValue::from_str(api_key).context("Invalid Clockify API key format")?,
        );
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let base_url = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(Self {
            workspace_id,
            base_url: base_url.trim_end_matches('/').to_string(),
            reports_url: DEFAULT_REPORTS_URL.to_string(),
            client: build_client(headers)?,
        })
    }

    /// Override the reports API base URL
    #[must_use]
    pub fn with_reports_url(mut self, reports_url: &str) -> Self {
        self.reports_url = reports_url.trim_end_matches('/').to_string();
        self
    }

    /// Build API URL for workspace-scoped endpoints
    fn build_url(&self, path: &str) -> String {
        format!(
            "{}/workspaces/{}/{}",
            self.base_url, self.workspace_id, path
        )
    }

    fn report_url(&self) -> String {
        format!(
            "{}/workspaces/{}/reports/detailed",
            self.reports_url, self.workspace_id
        )
    }

    /// Get the user owning the API key
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails
    pub async fn current_user(&self) -> Result<ClockifyUser> {
        let url = format!("{}/user", self.base_url);
        log::debug!("GET {url}");

        self.client
            .get(&url)
            .send()
            .await
            .context("Failed to send request to Clockify API")?
            .ensure_success("Clockify", "get user")
            .await?
            .json()
            .await
            .context("Failed to parse Clockify user response")
    }

    async fn fetch_entry_page(
        &self,
        url: &str,
        start: &str,
        end: &str,
        page: usize,
    ) -> Result<Vec<ClockifyTimeEntry>> {
        log::debug!("GET {url} (page {page})");

        self.client
            .get(url)
            .query(&[
                ("start", start.to_string()),
                ("end", end.to_string()),
                ("page", page.to_string()),
                ("page-size", PAGE_SIZE.to_string()),
            ])
            .send()
            .await
            .context("Failed to send request to Clockify API")?
            .ensure_success("Clockify", "list time entries")
            .await?
            .json()
            .await
            .context("Failed to parse Clockify time entries")
    }
}

#[async_trait]
impl TimeTracking for ClockifyClient {
    async fn list_entries(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TimeEntry>> {
        let user = self.current_user().await?;
        let url = self.build_url(&format!("user/{}/time-entries", user.id));
        let (start, end) = (format_timestamp(start), format_timestamp(end));

        let mut entries = Vec::new();
        let mut page = 1;
        loop {
            let batch = self.fetch_entry_page(&url, &start, &end, page).await?;
            let batch_len = batch.len();
            entries.extend(convert_entries(batch)?);

            if batch_len < PAGE_SIZE {
                break;
            }
            page += 1;
        }

        log::debug!("Fetched {} Clockify entries", entries.len());
        Ok(entries)
    }

    async fn create_entry(&self, entry: &NewTimeEntry) -> Result<()> {
        let url = self.build_url("time-entries");
        let body = CreateTimeEntryRequest {
            start: format_timestamp(entry.start),
            end: format_timestamp(entry.end),
            description: &entry.description,
            project_id: entry.project_id.as_deref(),
            billable: entry.billable,
        };

        log::debug!("POST {url}");

        self.client
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("Failed to send request to Clockify API")?
            .ensure_success("Clockify", "create time entry")
            .await?;

        log::info!("Time entry created in Clockify: {}", entry.description);
        Ok(())
    }

    async fn detailed_report(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<DetailedReport> {
        let url = self.report_url();
        let body = DetailedReportRequest {
            date_range_start: format_timestamp(start),
            date_range_end: format_timestamp(end),
            detailed_filter: DetailedFilter {
                page: 1,
                page_size: REPORT_PAGE_SIZE,
            },
            export_type: "JSON",
        };

        log::debug!("POST {url}");

        let response: ReportResponse = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("Failed to send request to Clockify reports API")?
            .ensure_success("Clockify reports", "detailed report")
            .await?
            .json()
            .await
            .context("Failed to parse Clockify detailed report")?;

        convert_report(response)
    }

    async fn validate_credentials(&self) -> Result<bool> {
        let url = format!("{}/user", self.base_url);

        log::debug!("Validating Clockify credentials: {url}");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to connect to Clockify API")?;

        Ok(response.status().is_success())
    }

    fn system_name(&self) -> &'static str {
        "clockify"
    }
}

// ============================================================================
// Conversion
// ============================================================================

/// Parse an ISO 8601 duration such as `PT1H30M` or `P1DT2H` into seconds
#[must_use]
pub fn parse_iso8601_duration(value: &str) -> Option<i64> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(r"^P(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)(?:\.\d+)?S)?)?$")
            .expect("duration pattern is valid")
    });

    if value == "P" || value.ends_with('T') {
        return None;
    }

    let caps = pattern.captures(value)?;
    let part = |idx: usize| -> i64 {
        caps.get(idx)
            .and_then(|m| m.as_str().parse::<i64>().ok())
            .unwrap_or(0)
    };

    Some(part(1) * 86_400 + part(2) * 3600 + part(3) * 60 + part(4))
}

/// Convert a basic-listing entry; running entries (no end) yield `None`
fn convert_entry(wire: ClockifyTimeEntry) -> Result<Option<TimeEntry>> {
    let Some(end) = wire.time_interval.end.as_deref() else {
        log::debug!("Skipping running Clockify entry {}", wire.id);
        return Ok(None);
    };

    let start = parse_timestamp(&wire.time_interval.start, "timeInterval.start")?;
    let end = parse_timestamp(end, "timeInterval.end")?;

    let mut entry = TimeEntry::new(wire.id, wire.description.unwrap_or_default(), start, end)?
        .with_billable(wire.billable);
    if let Some(seconds) = wire
        .time_interval
        .duration
        .as_deref()
        .and_then(parse_iso8601_duration)
    {
        entry = entry.with_reported_seconds(seconds);
    }
    if let Some(project_id) = wire.project_id {
        entry = entry.with_project(project_id);
    }

    Ok(Some(entry))
}

/// Convert a listing page, dropping running timers
///
/// # Errors
///
/// Returns an error if any finished entry has malformed timestamps
pub fn convert_entries(page: Vec<ClockifyTimeEntry>) -> Result<Vec<TimeEntry>> {
    let mut entries = Vec::with_capacity(page.len());
    for wire in page {
        if let Some(entry) = convert_entry(wire)? {
            entries.push(entry);
        }
    }
    Ok(entries)
}

/// Validate and convert a reports API body
///
/// # Errors
///
/// Returns an error if totals are missing or disagree with the entries,
/// or if an entry has malformed timestamps
pub fn convert_report(response: ReportResponse) -> Result<DetailedReport> {
    let totals = response.totals.into_iter().flatten().next();

    let (total_seconds, entries_count) = match totals {
        Some(totals) => (totals.total_time, totals.entries_count),
        None if response.timeentries.is_empty() => (0, 0),
        None => anyhow::bail!(
            "Malformed Clockify report: {} entries but no totals",
            response.timeentries.len()
        ),
    };

    if entries_count != response.timeentries.len() {
        anyhow::bail!(
            "Malformed Clockify report: totals count {entries_count} entries, body has {}",
            response.timeentries.len()
        );
    }

    let mut entries = Vec::with_capacity(response.timeentries.len());
    for wire in response.timeentries {
        let Some(end) = wire.time_interval.end.as_deref() else {
            log::debug!("Skipping running Clockify report entry {}", wire.id);
            continue;
        };
        let start = parse_timestamp(&wire.time_interval.start, "timeInterval.start")?;
        let end = parse_timestamp(end, "timeInterval.end")?;

        let mut entry = TimeEntry::new(wire.id, wire.description.unwrap_or_default(), start, end)?
            .with_billable(wire.billable);
        if let Some(seconds) = wire.time_interval.duration {
            entry = entry.with_reported_seconds(seconds);
        }
        if let Some(project_id) = wire.project_id {
            entry = entry.with_project(project_id);
        }
        entries.push(entry);
    }

    Ok(DetailedReport {
        total_seconds,
        entries_count,
        entries,
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_iso8601_duration() {
        assert_eq!(parse_iso8601_duration("PT1H30M"), Some(5400));
        assert_eq!(parse_iso8601_duration("PT45S"), Some(45));
        assert_eq!(parse_iso8601_duration("PT2H"), Some(7200));
        assert_eq!(parse_iso8601_duration("P1DT1H"), Some(90_000));
        assert_eq!(parse_iso8601_duration("PT0S"), Some(0));
    }

    #[test]
    fn test_parse_iso8601_duration_rejects_garbage() {
        assert_eq!(parse_iso8601_duration("1h30m"), None);
        assert_eq!(parse_iso8601_duration("P"), None);
        assert_eq!(parse_iso8601_duration("PT"), None);
        assert_eq!(parse_iso8601_duration(""), None);
    }

    #[test]
    fn test_build_url() {
        let client = ClockifyClient::new(
            "test-key",
            "ws-123".to_string(),
            Some("https://clockify.example.com/api/v1/".to_string()),
        )
        .unwrap();

        assert_eq!(
            client.build_url("time-entries"),
            "https://clockify.example.com/api/v1/workspaces/ws-123/time-entries"
        );
        assert_eq!(client.system_name(), "clockify");
    }

    #[test]
    fn test_report_url_override() {
        let client = ClockifyClient::new("test-key", "ws-123".to_string(), None)
            .unwrap()
            .with_reports_url("http://localhost:9000/");

        assert_eq!(
            client.report_url(),
            "http://localhost:9000/workspaces/ws-123/reports/detailed"
        );
    }

    #[test]
    fn test_convert_listing_entry() {
        let wire: ClockifyTimeEntry = serde_json::from_str(
            r#"{
                "id": "e1",
                "description": "Review PR",
                "projectId": "p1",
                "billable": true,
                "timeInterval": {
                    "start": "2025-03-03T09:00:00Z",
                    "end": "2025-03-03T10:30:00Z",
                    "duration": "PT1H30M"
                }
            }"#,
        )
        .unwrap();

        let entry = convert_entry(wire).unwrap().unwrap();
        assert_eq!(entry.id, "e1");
        assert_eq!(entry.description, "Review PR");
        assert_eq!(entry.reported_seconds, Some(5400));
        assert_eq!(entry.project_id.as_deref(), Some("p1"));
        assert!(entry.billable);
        assert_eq!(
            entry.start,
            Utc.with_ymd_and_hms(2025, 3, 3, 9, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_convert_listing_entry_skips_running_timer() {
        let wire: ClockifyTimeEntry = serde_json::from_str(
            r#"{
                "id": "e2",
                "timeInterval": { "start": "2025-03-03T09:00:00Z", "end": null, "duration": null }
            }"#,
        )
        .unwrap();

        assert!(convert_entry(wire).unwrap().is_none());
    }

    #[test]
    fn test_convert_report() {
        let response: ReportResponse = serde_json::from_str(
            r#"{
                "totals": [{ "_id": "", "totalTime": 7200, "entriesCount": 2 }],
                "timeentries": [
                    {
                        "_id": "r1",
                        "description": "Coding",
                        "timeInterval": {
                            "start": "2025-03-03T09:00:00+00:00",
                            "end": "2025-03-03T10:00:00+00:00",
                            "duration": 3600
                        }
                    },
                    {
                        "_id": "r2",
                        "description": "Coding",
                        "timeInterval": {
                            "start": "2025-03-04T09:00:00+00:00",
                            "end": "2025-03-04T10:00:00+00:00",
                            "duration": 3600
                        }
                    }
                ]
            }"#,
        )
        .unwrap();

        let report = convert_report(response).unwrap();
        assert_eq!(report.total_seconds, 7200);
        assert_eq!(report.entries_count, 2);
        assert_eq!(report.entries.len(), 2);
        assert_eq!(report.entries[0].reported_seconds, Some(3600));
    }

    #[test]
    fn test_convert_empty_report() {
        let response: ReportResponse =
            serde_json::from_str(r#"{ "totals": [], "timeentries": [] }"#).unwrap();

        let report = convert_report(response).unwrap();
        assert_eq!(report.total_seconds, 0);
        assert!(report.entries.is_empty());
    }

    #[test]
    fn test_convert_report_without_totals_is_malformed() {
        let response: ReportResponse = serde_json::from_str(
            r#"{
                "totals": [null],
                "timeentries": [{
                    "_id": "r1",
                    "timeInterval": {
                        "start": "2025-03-03T09:00:00Z",
                        "end": "2025-03-03T10:00:00Z",
                        "duration": 3600
                    }
                }]
            }"#,
        )
        .unwrap();

        assert!(convert_report(response).is_err());
    }

    #[test]
    fn test_convert_truncated_report_is_malformed() {
        let response: ReportResponse = serde_json::from_str(
            r#"{
                "totals": [{ "totalTime": 7200, "entriesCount": 5 }],
                "timeentries": []
            }"#,
        )
        .unwrap();

        assert!(convert_report(response).is_err());
    }
}
