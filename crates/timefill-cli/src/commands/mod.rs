pub mod check;
pub mod export;
pub mod gaps;
pub mod generate;
pub mod helpers;
pub mod import;
pub mod models;
pub mod repos;
pub mod report_writer;
pub mod status;

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use timefill_ai::GoogleGenAiProvider;
use timefill_core::config::default_settings_path;
use timefill_core::{Credentials, Settings};
use timefill_integrations::{ClockifyClient, GitHubClient};

/// Configuration shared by all command handlers
pub struct AppContext {
    pub credentials: Credentials,
    pub settings: Settings,
}

impl AppContext {
    /// Load credentials and settings once at startup
    pub fn load(credentials_path: &Path, settings_path: Option<&Path>) -> Result<Self> {
        let credentials = Credentials::load(credentials_path)?;

        let settings_path = match settings_path {
            Some(path) => path.to_path_buf(),
            None => default_settings_path()?,
        };
        let settings = Settings::load(&settings_path)?;

        Ok(Self {
            credentials,
            settings,
        })
    }

    pub fn clockify(&self) -> Result<ClockifyClient> {
        ClockifyClient::new(
            &self.credentials.clockify_api_key,
            self.credentials.clockify_workspace_id.clone(),
            None,
        )
        .context("Failed to create Clockify client")
    }

    pub fn github(&self) -> Result<GitHubClient> {
        GitHubClient::new(self.credentials.github_token.as_deref())
            .context("Failed to create GitHub client")
    }

    pub fn gemini(&self) -> Result<GoogleGenAiProvider> {
        GoogleGenAiProvider::new(&self.credentials.gemini_api_key, None)
            .context("Failed to create Gemini client")
    }

    /// Reference day for date phrases (UTC)
    pub fn today() -> NaiveDate {
        Utc::now().date_naive()
    }
}
