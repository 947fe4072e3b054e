//! LLM Provider trait for abstracting different backends
//!
//! The conversation engine only ever talks to a backend through this trait.

use async_trait::async_trait;

use crate::core::Result;

/// Response from an LLM provider
#[derive(Debug, Clone)]
pub struct LLMResponse {
    /// Generated text
    pub content: String,
    /// Token usage information
    pub usage: Option<TokenUsage>,
    /// Model that generated the response
    pub model: String,
}

impl LLMResponse {
    /// Response with text only
    pub fn text(model: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            usage: None,
            model: model.into(),
        }
    }
}

/// Token usage information
#[derive(Debug, Clone, Default)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Options for one generation call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerateOptions {
    /// Temperature for sampling
    pub temperature: f32,
    /// Maximum tokens to generate
    pub max_tokens: u32,
    /// Context window size
    pub context_size: u32,
    /// Stop sequences
    pub stop: Vec<String>,
}

/// Model name with its tag, defaulting to `latest`
pub fn full_model_name(model: &str) -> String {
    let tagged = model
        .rsplit_once(':')
        .is_some_and(|(_, tag)| !tag.is_empty() && !tag.contains('/'));
    if tagged {
        model.to_string()
    } else {
        format!("{}:latest", model.trim_end_matches(':'))
    }
}

/// Trait for LLM providers
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Complete a raw prompt
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<LLMResponse>;

    /// Check if a model is installed; an untagged name means `:latest`
    async fn is_model_available(&self, model: &str) -> Result<bool> {
        let wanted = full_model_name(model);
        let models = self.list_models().await?;
        Ok(models.iter().any(|m| full_model_name(m) == wanted))
    }

    /// List available models
    async fn list_models(&self) -> Result<Vec<String>>;

    /// Get the provider name
    fn name(&self) -> &str;
}
