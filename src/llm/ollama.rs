//! Ollama client implementation
//!
//! Async HTTP client for the Ollama completion API.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::core::{Config, DuetError, Result};
use crate::llm::traits::{GenerateOptions, LLMProvider, LLMResponse, TokenUsage};

/// Ollama API client
#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    base_url: String,
}

/// Ollama generate request
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    options: OllamaOptions<'a>,
    stream: bool,
}

/// Ollama generation options
#[derive(Debug, Serialize)]
struct OllamaOptions<'a> {
    num_predict: u32,
    temperature: f32,
    num_ctx: u32,
    stop: &'a [String],
}

/// Ollama generate response (non-streaming)
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
    model: String,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

/// Ollama models list response
#[derive(Debug, Deserialize)]
struct ModelsResponse {
    models: Vec<ModelInfo>,
}

/// Model information
#[derive(Debug, Deserialize)]
struct ModelInfo {
    name: String,
}

impl OllamaClient {
    /// Create a new Ollama client from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.ollama.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.ollama_url(),
        })
    }

    /// Create a client with custom base URL
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn connect_error(&self, e: reqwest::Error) -> DuetError {
        if e.is_connect() {
            DuetError::ollama(format!(
                "Cannot connect to Ollama at {}. Is it running?",
                self.base_url
            ))
        } else {
            DuetError::from(e)
        }
    }

    /// Map a non-success status to an error
    async fn check_status(response: Response, model: &str) -> Result<Response> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let error_text = response.text().await.unwrap_or_default();

        if status.as_u16() == 404 && error_text.contains("not found") {
            return Err(DuetError::ModelNotFound(model.to_string()));
        }

        Err(DuetError::ollama(format!(
            "Ollama API error ({}): {}",
            status, error_text
        )))
    }

    fn to_llm_response(response: GenerateResponse) -> LLMResponse {
        let usage = match (response.prompt_eval_count, response.eval_count) {
            (Some(prompt), Some(completion)) => Some(TokenUsage {
                prompt_tokens: prompt,
                completion_tokens: completion,
                total_tokens: prompt + completion,
            }),
            _ => None,
        };

        LLMResponse {
            content: response.response,
            usage,
            model: response.model,
        }
    }
}

/// First 500 characters of a payload, for the debug log
fn preview(content: &str) -> String {
    const LIMIT: usize = 500;
    match content.char_indices().nth(LIMIT) {
        Some((idx, _)) => format!("{}...", &content[..idx]),
        None => content.to_string(),
    }
}

#[async_trait]
impl LLMProvider for OllamaClient {
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        options: &GenerateOptions,
    ) -> Result<LLMResponse> {
        let request = GenerateRequest {
            model,
            prompt,
            options: OllamaOptions {
                num_predict: options.max_tokens,
                temperature: options.temperature,
                num_ctx: options.context_size,
                stop: &options.stop,
            },
            stream: false,
        };

        let request_json = serde_json::to_string(&request)?;
        debug!(request = %preview(&request_json), "ollama generate");

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| self.connect_error(e))?;

        let response = Self::check_status(response, model).await?;

        let response_text = response.text().await?;
        debug!(response = %preview(&response_text), "ollama response");

        let generated: GenerateResponse = serde_json::from_str(&response_text)
            .map_err(|e| DuetError::ollama(format!("Failed to parse response: {}", e)))?;

        Ok(Self::to_llm_response(generated))
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
            .map_err(|e| self.connect_error(e))?;

        if !response.status().is_success() {
            return Err(DuetError::ollama("Failed to list models"));
        }

        let models_response: ModelsResponse = response.json().await?;
        Ok(models_response.models.into_iter().map(|m| m.name).collect())
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
