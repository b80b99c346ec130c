//! HTTP utilities shared by the Clockify and GitHub clients.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};

/// Timeout applied to every outgoing request
pub const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Extension trait for `reqwest::Response` to handle common error patterns.
#[async_trait::async_trait]
pub trait ResponseExt {
    /// Ensure the response status is successful, returning an error with details if not.
    ///
    /// # Errors
    ///
    /// Returns an error if the response status is not 2xx, naming the API and
    /// the operation along with the status code and response body.
    async fn ensure_success(self, api_name: &str, operation: &str) -> Result<Self>
    where
        Self: Sized;
}

#[async_trait::async_trait]
impl ResponseExt for reqwest::Response {
    async fn ensure_success(self, api_name: &str, operation: &str) -> Result<Self> {
        if !self.status().is_success() {
            let status = self.status();
            let error_text = self.text().await.unwrap_or_default();
            anyhow::bail!("{api_name} API error during {operation} ({status}): {error_text}");
        }
        Ok(self)
    }
}

/// Build a `reqwest::Client` with the shared timeout
///
/// # Errors
///
/// Returns an error if the HTTP client cannot be created
pub fn build_client(default_headers: reqwest::header::HeaderMap) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .default_headers(default_headers)
        .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()
        .context("Failed to create HTTP client")
}

/// Parse an RFC 3339 timestamp into UTC
///
/// # Errors
///
/// Returns an error naming `field` if the value is not RFC 3339
pub fn parse_timestamp(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("Failed to parse {field}: '{value}'"))
}

/// Format a timestamp the way the upstream APIs expect (`2025-03-03T09:00:00Z`)
#[must_use]
pub fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Secs, true)
}
