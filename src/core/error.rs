//! Custom error types for Duet
//!
//! Provides a unified error handling system across all modules.

use thiserror::Error;

/// Main error type for Duet operations
#[derive(Error, Debug)]
pub enum DuetError {
    /// Invalid agent pair or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Prompt template could not be parsed
    #[error("Template error: {0}")]
    Template(String),

    /// The backend returned nothing but whitespace
    #[error("{agent} produced an empty response")]
    EmptyGeneration { agent: String },

    /// Every retry of a turn came back empty
    #[error("{agent} produced no output after {attempts} attempts")]
    GenerationExhausted { agent: String, attempts: u32 },

    /// A turn was requested after the conversation concluded
    #[error("Conversation has already terminated")]
    SessionTerminated,

    /// Ollama connection or API errors
    #[error("Ollama error: {0}")]
    Ollama(String),

    /// Model not available
    #[error("Model '{0}' not available in Ollama. Run: ollama pull {0}")]
    ModelNotFound(String),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type for Duet operations
pub type Result<T> = std::result::Result<T, DuetError>;

impl DuetError {
    /// Create an Ollama error
    pub fn ollama(msg: impl Into<String>) -> Self {
        Self::Ollama(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a template error
    pub fn template(msg: impl Into<String>) -> Self {
        Self::Template(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exhausted_message() {
        let err = DuetError::GenerationExhausted {
            agent: "critic".to_string(),
            attempts: 3,
        };
        assert_eq!(
            err.to_string(),
            "critic produced no output after 3 attempts"
        );
    }
}
