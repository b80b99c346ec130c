//! GitHub commits API client
//!
//! Implements the `CommitSource` trait for GitHub repositories.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{header, Client};
use serde::Deserialize;

use crate::http::{build_client, format_timestamp, parse_timestamp, ResponseExt};
use crate::traits::{Commit, CommitSource};

const PER_PAGE: usize = 100;
const SHORT_SHA_LEN: usize = 7;

/// GitHub API client for commit history
pub struct GitHubClient {
    client: Client,
    /// API base URL (for GitHub Enterprise support)
    api_base: String,
}

/// GitHub API commit response
#[derive(Debug, Deserialize)]
struct GitHubCommit {
    sha: String,
    commit: GitHubCommitDetail,
}

#[derive(Debug, Deserialize)]
struct GitHubCommitDetail {
    message: String,
    author: Option<GitHubSignature>,
}

#[derive(Debug, Deserialize)]
struct GitHubSignature {
    name: String,
    date: String,
}

#[derive(Debug, Deserialize)]
struct GitHubUser {
    login: String,
}

/// Repository visible to the authenticated user
#[derive(Debug, Clone, Deserialize)]
pub struct Repository {
    pub name: String,
    pub full_name: String,
    pub private: bool,
    #[serde(default)]
    pub description: Option<String>,
}

impl GitHubClient {
    /// Create a new GitHub client
    ///
    /// # Arguments
    /// * `token` - GitHub Personal Access Token; `None` limits access to public repositories
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created
    pub fn new(token: Option<&str>) -> Result<Self> {
        Self::with_base_url(token, "https://api.github.com")
    }

    /// Create a new GitHub client with custom API base URL (for GitHub Enterprise)
    ///
    /// # Errors
    /// Returns an error if the token is not a valid header value or the HTTP
    /// client cannot be created
    pub fn with_base_url(token: Option<&str>, api_base: &str) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        if let Some(token) = token {
            headers.insert(
                header::AUTHORIZATION,
                header::HeaderValue::from_str(&format!("Bearer {token}"))
                    .context("Invalid token format")?,
            );
        }
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            header::HeaderValue::from_static("2022-11-28"),
        );
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_static("timefill"),
        );

        Ok(Self {
            client: build_client(headers)?,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    /// Get the commits API URL
    fn commits_url(&self, repository: &str) -> String {
        format!("{}/repos/{repository}/commits", self.api_base)
    }

    /// Login of the token owner
    ///
    /// # Errors
    /// Returns an error if the request fails or the token is rejected
    pub async fn current_login(&self) -> Result<String> {
        let url = format!("{}/user", self.api_base);

        let user: GitHubUser = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send get user request")?
            .ensure_success("GitHub", "get user")
            .await?
            .json()
            .await
            .context("Failed to parse user response")?;

        Ok(user.login)
    }

    /// List repositories the token can see, most recently updated first
    ///
    /// # Errors
    /// Returns an error if the request fails
    pub async fn list_repositories(&self) -> Result<Vec<Repository>> {
        let url = format!(
            "{}/user/repos?type=all&sort=updated&per_page={PER_PAGE}",
            self.api_base
        );

        self.client
            .get(&url)
            .send()
            .await
            .context("Failed to send list repositories request")?
            .ensure_success("GitHub", "list repositories")
            .await?
            .json()
            .await
            .context("Failed to parse repositories response")
    }

    /// Convert GitHub commit to `Commit`
    fn to_commit(commit: GitHubCommit, repository: &str) -> Result<Commit> {
        let (author, date) = match commit.commit.author {
            Some(signature) => (signature.name, signature.date),
            None => anyhow::bail!("Commit {} has no author signature", commit.sha),
        };

        Ok(Commit {
            sha: commit.sha.chars().take(SHORT_SHA_LEN).collect(),
            message: commit.commit.message,
            author,
            timestamp: parse_timestamp(&date, "commit.author.date")?,
            repository: repository.to_string(),
        })
    }
}

#[async_trait]
impl CommitSource for GitHubClient {
    async fn list_commits(
        &self,
        repository: &str,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Commit>> {
        let url = self.commits_url(repository);
        let (since, until) = (format_timestamp(since), format_timestamp(until));

        let mut commits = Vec::new();
        let mut page = 1;
        loop {
            log::debug!("GET {url} (page {page})");

            let batch: Vec<GitHubCommit> = self
                .client
                .get(&url)
                .query(&[
                    ("since", since.clone()),
                    ("until", until.clone()),
                    ("per_page", PER_PAGE.to_string()),
                    ("page", page.to_string()),
                ])
                .send()
                .await
                .context("Failed to send list commits request")?
                .ensure_success("GitHub", "list commits")
                .await?
                .json()
                .await
                .context("Failed to parse commits response")?;

            let batch_len = batch.len();
            for commit in batch {
                commits.push(Self::to_commit(commit, repository)?);
            }

            if batch_len < PER_PAGE {
                break;
            }
            page += 1;
        }

        log::debug!("Fetched {} commits from {repository}", commits.len());
        Ok(commits)
    }

    async fn validate_credentials(&self) -> Result<bool> {
        let url = format!("{}/user", self.api_base);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send validation request")?;

        Ok(response.status().is_success())
    }

    fn system_name(&self) -> &'static str {
        "github"
    }
}
