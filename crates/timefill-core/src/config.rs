//! Configuration
//!
//! Two sources, both loaded once at process entry and passed by reference:
//! - the credentials file (`KEY=value` lines, default `_API_KEYS`)
//! - the optional settings file (TOML, default `<config dir>/timefill/settings.toml`)

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Deserializer};

use crate::error::{Result, TimefillError};

/// Default credentials file, relative to the working directory
pub const CREDENTIALS_FILE: &str = "_API_KEYS";

// ============================================================================
// Credentials
// ============================================================================

/// API credentials and defaults read from the credentials file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub clockify_api_key: String,
    pub clockify_workspace_id: String,
    pub clockify_project_id: String,
    pub gemini_api_key: String,
    pub github_token: Option<String>,
    pub default_github_repo: Option<String>,
}

impl Credentials {
    /// Load credentials from `path`
    ///
    /// # Errors
    ///
    /// Returns an input error if the file cannot be read or a required key is missing
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| TimefillError::UnreadableConfig {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let credentials = Self::parse(&contents, path)?;
        log::debug!("Loaded credentials from {}", path.display());
        Ok(credentials)
    }

    /// Parse credentials file contents; `path` is only used in error messages
    ///
    /// # Errors
    ///
    /// Returns `MissingConfigKey` naming the first required key that is absent or empty
    pub fn parse(contents: &str, path: &Path) -> Result<Self> {
        let mut values = parse_key_values(contents);

        let mut require = |key: &str| {
            values
                .remove(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| TimefillError::MissingConfigKey {
                    key: key.to_string(),
                    path: path.to_path_buf(),
                })
        };

        let clockify_api_key = require("CLOCKIFY_API_KEY")?;
        let clockify_workspace_id = require("CLOCKIFY_WORKSPACE_ID")?;
        let clockify_project_id = require("CLOCKIFY_PROJECT_ID")?;
        let gemini_api_key = require("GEMINI_API_KEY")?;

        let mut optional = |key: &str| values.remove(key).filter(|v| !v.is_empty());

        Ok(Self {
            clockify_api_key,
            clockify_workspace_id,
            clockify_project_id,
            gemini_api_key,
            github_token: optional("GITHUB_API_KEY"),
            default_github_repo: optional("DEFAULT_GITHUB_REPO"),
        })
    }
}

/// `KEY=value` lines; `#` comments and blank lines ignored, quotes stripped
fn parse_key_values(contents: &str) -> HashMap<String, String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| {
            let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
            (key.trim().to_string(), value.to_string())
        })
        .collect()
}

// ============================================================================
// Settings
// ============================================================================

/// Optional tuning read from the settings file
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub calendar: CalendarSettings,
    pub gaps: GapSettings,
    pub schedule: ScheduleSettings,
    pub report: ReportSettings,
}

/// Non-working days beyond weekends
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CalendarSettings {
    pub holidays: Vec<NaiveDate>,
    /// Extra weekdays never expected to carry logged time
    pub days_off: Vec<Weekday>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GapSettings {
    /// A touched day is still a gap when it logs fewer seconds than this
    pub min_expected_seconds: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ScheduleSettings {
    pub daily_hours: u32,
    #[serde(deserialize_with = "deserialize_time")]
    pub day_start: NaiveTime,
    #[serde(deserialize_with = "deserialize_time")]
    pub day_end: NaiveTime,
    pub meetings_per_week: u32,
    pub meetings: Vec<MeetingSettings>,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        Self {
            daily_hours: 8,
            day_start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            day_end: NaiveTime::from_hms_opt(18, 0, 0).unwrap_or_default(),
            meetings_per_week: 2,
            meetings: Vec::new(),
        }
    }
}

/// Recurring weekly meeting
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MeetingSettings {
    pub weekday: Weekday,
    #[serde(deserialize_with = "deserialize_time")]
    pub start: NaiveTime,
    #[serde(default = "default_meeting_minutes")]
    pub duration_minutes: u32,
    pub title: String,
}

fn default_meeting_minutes() -> u32 {
    40
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    /// Allowed difference between reported and computed entry durations
    pub duration_tolerance_seconds: i64,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            duration_tolerance_seconds: 60,
        }
    }
}

/// Accepts `HH:MM` and `HH:MM:SS`
fn deserialize_time<'de, D>(deserializer: D) -> std::result::Result<NaiveTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    NaiveTime::parse_from_str(&raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(&raw, "%H:%M:%S"))
        .map_err(|e| serde::de::Error::custom(format!("invalid time '{raw}': {e}")))
}

impl Settings {
    /// Load settings from `path`; a missing file yields the defaults
    ///
    /// # Errors
    ///
    /// Returns `UnreadableConfig` if the file exists but cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|e| TimefillError::UnreadableConfig {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let settings: Self = toml::from_str(&contents).map_err(|e| TimefillError::UnreadableConfig {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        if settings.schedule.day_end <= settings.schedule.day_start {
            return Err(TimefillError::UnreadableConfig {
                path: path.to_path_buf(),
                reason: "schedule.day_end must be after schedule.day_start".to_string(),
            });
        }

        log::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }
}

/// Default settings path: `<config dir>/timefill/settings.toml`
///
/// # Errors
///
/// Returns an error if the platform config directory cannot be determined
pub fn default_settings_path() -> Result<PathBuf> {
    let mut path = dirs::config_dir().ok_or_else(|| TimefillError::UnreadableConfig {
        path: PathBuf::from("settings.toml"),
        reason: "Failed to get config dir".to_string(),
    })?;
    path.push("timefill");
    path.push("settings.toml");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const FULL: &str = r#"
# Clockify
CLOCKIFY_API_KEY="clockify-key"
CLOCKIFY_WORKSPACE_ID = ws-1
CLOCKIFY_PROJECT_ID='proj-1'

GEMINI_API_KEY=gemini-key
GITHUB_API_KEY=ghp_token
DEFAULT_GITHUB_REPO=owner/repo
"#;

    #[test]
    fn test_parse_credentials_strips_quotes() {
        let creds = Credentials::parse(FULL, Path::new("_API_KEYS")).unwrap();
        assert_eq!(creds.clockify_api_key, "clockify-key");
        assert_eq!(creds.clockify_workspace_id, "ws-1");
        assert_eq!(creds.clockify_project_id, "proj-1");
        assert_eq!(creds.gemini_api_key, "gemini-key");
        assert_eq!(creds.github_token.as_deref(), Some("ghp_token"));
        assert_eq!(creds.default_github_repo.as_deref(), Some("owner/repo"));
    }

    #[test]
    fn test_parse_credentials_optional_keys() {
        let contents = "CLOCKIFY_API_KEY=a\nCLOCKIFY_WORKSPACE_ID=b\nCLOCKIFY_PROJECT_ID=c\nGEMINI_API_KEY=d\n";
        let creds = Credentials::parse(contents, Path::new("_API_KEYS")).unwrap();
        assert!(creds.github_token.is_none());
        assert!(creds.default_github_repo.is_none());
    }

    #[test]
    fn test_parse_credentials_names_missing_key() {
        let contents = "CLOCKIFY_API_KEY=a\nCLOCKIFY_WORKSPACE_ID=b\nGEMINI_API_KEY=d\n";
        let err = Credentials::parse(contents, Path::new("_API_KEYS")).unwrap_err();
        match err {
            TimefillError::MissingConfigKey { key, .. } => assert_eq!(key, "CLOCKIFY_PROJECT_ID"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_parse_credentials_empty_value_is_missing() {
        let contents = "CLOCKIFY_API_KEY=\"\"\nCLOCKIFY_WORKSPACE_ID=b\nCLOCKIFY_PROJECT_ID=c\nGEMINI_API_KEY=d\n";
        let err = Credentials::parse(contents, Path::new("_API_KEYS")).unwrap_err();
        assert!(err.to_string().contains("CLOCKIFY_API_KEY"));
    }

    #[test]
    fn test_load_credentials_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("_API_KEYS");

        let err = Credentials::load(&path).unwrap_err();
        assert!(matches!(err, TimefillError::UnreadableConfig { .. }));
        assert!(err.to_string().contains("_API_KEYS"));
    }

    #[test]
    fn test_load_credentials_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FULL.as_bytes()).unwrap();

        let creds = Credentials::load(file.path()).unwrap();
        assert_eq!(creds.gemini_api_key, "gemini-key");
    }

    #[test]
    fn test_settings_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(&dir.path().join("settings.toml")).unwrap();

        assert_eq!(settings, Settings::default());
        assert_eq!(settings.gaps.min_expected_seconds, 0);
        assert_eq!(settings.schedule.daily_hours, 8);
        assert_eq!(settings.schedule.day_start, NaiveTime::from_hms_opt(9, 0, 0).unwrap());
        assert_eq!(settings.schedule.day_end, NaiveTime::from_hms_opt(18, 0, 0).unwrap());
        assert_eq!(settings.report.duration_tolerance_seconds, 60);
    }

    #[test]
    fn test_settings_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[calendar]
holidays = ["2025-12-25"]
days_off = ["Fri"]

[gaps]
min_expected_seconds = 3600

[[schedule.meetings]]
weekday = "Tue"
start = "10:00"
title = "Weekly Team Standup"
"#
        )
        .unwrap();

        let settings = Settings::load(file.path()).unwrap();
        assert_eq!(
            settings.calendar.holidays,
            vec![NaiveDate::from_ymd_opt(2025, 12, 25).unwrap()]
        );
        assert_eq!(settings.calendar.days_off, vec![Weekday::Fri]);
        assert_eq!(settings.gaps.min_expected_seconds, 3600);
        assert_eq!(settings.schedule.daily_hours, 8);

        let meeting = &settings.schedule.meetings[0];
        assert_eq!(meeting.weekday, Weekday::Tue);
        assert_eq!(meeting.start, NaiveTime::from_hms_opt(10, 0, 0).unwrap());
        assert_eq!(meeting.duration_minutes, 40);
    }

    #[test]
    fn test_settings_rejects_inverted_day() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[schedule]\nday_start = \"18:00\"\nday_end = \"09:00\"\n").unwrap();

        let err = Settings::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("day_end"));
    }
}
