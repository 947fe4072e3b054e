//! LLM module - Language Model integrations
//!
//! Provides the backend abstraction the conversation engine calls, with Ollama
//! as the implementation.

pub mod ollama;
pub mod traits;

pub use ollama::OllamaClient;
pub use traits::{GenerateOptions, LLMProvider, LLMResponse, TokenUsage};
