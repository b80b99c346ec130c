use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::ai_provider::TextGenerator;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const GENERATE_METHOD: &str = "generateContent";
/// Generation over a full commit listing can take well over the usual 30 s
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Google GenAI (Gemini) Provider
pub struct GoogleGenAiProvider {
    client: Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    models: Vec<ModelInfo>,
    #[serde(default, rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelInfo {
    name: String,
    #[serde(default)]
    supported_generation_methods: Vec<String>,
}

impl GoogleGenAiProvider {
    /// # Errors
    /// Returns an error if the HTTP client cannot be created
    pub fn new(api_key: &str, base_url: Option<&str>) -> Result<Self> {
        Ok(Self {
            client: build_client(DEFAULT_TIMEOUT)?,
            api_key: api_key.to_string(),
            base_url: base_url
                .unwrap_or(DEFAULT_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
        })
    }

    /// Replace the request timeout
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.client = build_client(timeout)?;
        Ok(self)
    }

    fn generate_url(&self, model: &str) -> String {
        format!(
            "{}/models/{}:{GENERATE_METHOD}?key={}",
            self.base_url,
            strip_model_prefix(model),
            self.api_key
        )
    }
}

fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .context("Failed to create Google AI HTTP client")
}

/// `models/gemini-1.5-pro` -> `gemini-1.5-pro`
fn strip_model_prefix(name: &str) -> &str {
    name.strip_prefix("models/").unwrap_or(name)
}

/// Concatenate the text parts of the first candidate
fn extract_text(json: &serde_json::Value) -> Option<String> {
    let parts = json["candidates"][0]["content"]["parts"].as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|part| part["text"].as_str())
        .collect();
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

#[async_trait]
impl TextGenerator for GoogleGenAiProvider {
    async fn list_models(&self) -> Result<Vec<String>> {
        let mut models = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = format!("{}/models?key={}&pageSize=1000", self.base_url, self.api_key);
            if let Some(token) = &page_token {
                url.push_str("&pageToken=");
                url.push_str(token);
            }

            let response = self
                .client
                .get(&url)
                .send()
                .await
                .context("Failed to send model list request to Google AI")?;

            if !response.status().is_success() {
                let status = response.status();
                let error_text = response.text().await.unwrap_or_default();
                anyhow::bail!("Google AI API error listing models ({status}): {error_text}");
            }

            let page: ModelList = response
                .json()
                .await
                .context("Failed to parse Google AI model list")?;

            models.extend(
                page.models
                    .into_iter()
                    .filter(|m| m.supported_generation_methods.iter().any(|g| g == GENERATE_METHOD))
                    .map(|m| strip_model_prefix(&m.name).to_string()),
            );

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        log::debug!("Google AI offers {} generation models", models.len());
        Ok(models)
    }

    async fn generate(&self, model: &str, prompt: &str) -> Result<String> {
        let body = json!({
            "contents": [{
                "parts": [{
                    "text": prompt
                }]
            }]
        });

        let response = self
            .client
            .post(self.generate_url(model))
            .json(&body)
            .send()
            .await
            .context("Failed to send request to Google AI")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("Google AI API error ({status}): {error_text}");
        }

        let json: serde_json::Value = response
            .json()
            .await
            .context("Failed to parse Google AI response")?;

        // candidates[0].content.parts[*].text
        extract_text(&json).context("Failed to extract text from Google AI response")
    }

    fn provider_name(&self) -> &'static str {
        "google"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_url_strips_model_prefix() {
        let provider = GoogleGenAiProvider::new("k", Some("http://localhost:8080/v1beta/")).unwrap();
        assert_eq!(
            provider.generate_url("models/gemini-1.5-pro"),
            "http://localhost:8080/v1beta/models/gemini-1.5-pro:generateContent?key=k"
        );
    }

    #[tokio::test]
    async fn test_generate_times_out_on_silent_server() {
        // Accepts connections into the backlog but never answers
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let base_url = format!("http://{}/v1beta", listener.local_addr().unwrap());
        let provider = GoogleGenAiProvider::new("k", Some(&base_url))
            .unwrap()
            .with_timeout(Duration::from_millis(200))
            .unwrap();

        let err = provider.generate("gemini-1.5-pro", "hello").await.unwrap_err();
        let cause = err.downcast_ref::<reqwest::Error>().unwrap();
        assert!(cause.is_timeout(), "unexpected error: {err:#}");
        drop(listener);
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let json = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "date,start" }, { "text": ",end" }] }
            }]
        });
        assert_eq!(extract_text(&json).as_deref(), Some("date,start,end"));
    }

    #[test]
    fn test_extract_text_empty_response() {
        let json = json!({ "candidates": [] });
        assert!(extract_text(&json).is_none());
    }

    #[test]
    fn test_model_list_filters_generation_models() {
        let page: ModelList = serde_json::from_str(
            r#"{
                "models": [
                    { "name": "models/gemini-1.5-pro", "supportedGenerationMethods": ["generateContent"] },
                    { "name": "models/embedding-001", "supportedGenerationMethods": ["embedContent"] }
                ]
            }"#,
        )
        .unwrap();

        let names: Vec<&str> = page
            .models
            .iter()
            .filter(|m| m.supported_generation_methods.iter().any(|g| g == GENERATE_METHOD))
            .map(|m| strip_model_prefix(&m.name))
            .collect();
        assert_eq!(names, vec!["gemini-1.5-pro"]);
        assert!(page.next_page_token.is_none());
    }
}
