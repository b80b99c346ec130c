use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Time entry as recorded by the time-tracking service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeEntry {
    pub id: String,
    pub description: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Duration field as sent by the service, when it sent one
    pub reported_seconds: Option<i64>,
    pub project_id: Option<String>,
    pub billable: bool,
}

/// Payload for creating a new entry in the time-tracking service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTimeEntry {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub description: String,
    pub project_id: Option<String>,
    pub billable: bool,
}

/// Server-side aggregated report for an interval
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailedReport {
    pub total_seconds: i64,
    pub entries_count: usize,
    pub entries: Vec<TimeEntry>,
}

/// Commit fetched from the source-control service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub sha: String,
    pub message: String,
    pub author: String,
    pub timestamp: DateTime<Utc>,
    pub repository: String,
}

/// Time-tracking service (list, create, aggregated report)
#[async_trait]
pub trait TimeTracking: Send + Sync {
    /// List entries whose start falls inside `[start, end]`
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the service answers non-2xx
    async fn list_entries(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<TimeEntry>>;

    /// Create a single entry
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the service answers non-2xx
    async fn create_entry(&self, entry: &NewTimeEntry) -> Result<()>;

    /// Fetch the server-aggregated report for `[start, end]`
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, non-2xx status or a malformed body
    async fn detailed_report(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<DetailedReport>;

    /// Validate API credentials and connectivity
    ///
    /// # Errors
    ///
    /// Returns an error if the service is unreachable
    async fn validate_credentials(&self) -> Result<bool>;

    /// Get the system name
    #[must_use]
    fn system_name(&self) -> &'static str;
}

/// Source-control history provider
#[async_trait]
pub trait CommitSource: Send + Sync {
    /// List commits of `repository` authored inside `[since, until]`
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the service answers non-2xx
    async fn list_commits(
        &self,
        repository: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Commit>>;

    /// Validate API credentials and connectivity
    ///
    /// # Errors
    ///
    /// Returns an error if the service is unreachable
    async fn validate_credentials(&self) -> Result<bool>;

    #[must_use]
    fn system_name(&self) -> &'static str;
}

impl TimeEntry {
    /// Create a new time entry
    ///
    /// # Errors
    ///
    /// Returns an error if `end` is before `start`
    pub fn new(
        id: String,
        description: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Self> {
        if end < start {
            anyhow::bail!("Time entry {id} ends ({end}) before it starts ({start})");
        }
        Ok(Self {
            id,
            description,
            start,
            end,
            reported_seconds: None,
            project_id: None,
            billable: false,
        })
    }

    #[must_use]
    pub fn with_reported_seconds(mut self, seconds: i64) -> Self {
        self.reported_seconds = Some(seconds);
        self
    }

    #[must_use]
    pub fn with_project(mut self, project_id: String) -> Self {
        self.project_id = Some(project_id);
        self
    }

    #[must_use]
    pub fn with_billable(mut self, billable: bool) -> Self {
        self.billable = billable;
        self
    }

    /// Wall-clock length of the entry's interval in seconds
    #[must_use]
    pub fn interval_seconds(&self) -> i64 {
        (self.end - self.start).num_seconds()
    }
}

impl Commit {
    /// First line of the commit message
    #[must_use]
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or_default().trim()
    }
}
