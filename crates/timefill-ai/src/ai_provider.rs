use anyhow::Result;
use async_trait::async_trait;

/// Trait for generative-text providers
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// List model identifiers that support text generation
    async fn list_models(&self) -> Result<Vec<String>>;

    /// Generate a text response for `prompt` using `model`
    async fn generate(&self, model: &str, prompt: &str) -> Result<String>;

    /// Get the provider name
    fn provider_name(&self) -> &'static str;
}
