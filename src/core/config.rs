//! Configuration management for Duet
//!
//! Supports environment variables, config files, and runtime overrides.
//!
//! Config file location: ~/.config/duet/config.toml

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::error::{DuetError, Result};
use crate::core::types::AgentConfig;

/// Default model for both agents unless overridden
pub const DEFAULT_MODEL: &str = "adrienbrault/nous-hermes2pro:Q4_0-json";

/// Default sentinel that signals an agent considers the task finished
pub const DEFAULT_EXIT_TOKEN: &str = "<DONE!>";

/// Default prompt template
pub const DEFAULT_PROMPT_TEMPLATE: &str = r#"You are an AI agent named {actor_name}.
You are working together with another AI agent named {reactor_name}.
Follow these instructions: {instructions}.
Help with the following user query: {task}.
Reply with a json object that matches this json schema:
<schema> {schema} </schema>
Set the status to "<DONE!>" once the suggestions have been implemented and the actions are valid."#;

const DEFAULT_TASK: &str =
    "Formulate a plan to contact alien civilizations elsewhere in the universe.";

const ACTOR_SCHEMA: &str = r#"{"thought": {"description": "scratchpad for step-by-step reasoning", "type": "string"}, "action": {"description": "actions to be executed to accomplish the task", "type": "string"}, "status": {"description": "status of task; '<IN PROGRESS>' or '<DONE!>'", "type": "string"}}"#;

const CRITIC_SCHEMA: &str = r#"{"evaluation": {"description": "evaluation of the actor's actions", "type": "string"}, "feedback": {"description": "constructive feedback to revise actions", "type": "string"}, "status": {"description": "status of task; '<IN PROGRESS>' or '<DONE!>'", "type": "string"}}"#;

/// Main configuration for Duet
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Ollama configuration
    #[serde(default)]
    pub ollama: OllamaConfig,
    /// Sampling and model configuration
    #[serde(default)]
    pub generation: GenerationConfig,
    /// Turn loop configuration
    #[serde(default)]
    pub conversation: ConversationConfig,
    /// The two participants, in speaking order
    #[serde(default = "default_agents")]
    pub agents: Vec<AgentConfig>,
}

/// Ollama server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Host address (default: localhost)
    pub host: String,
    /// Port number (default: 11434)
    pub port: u16,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

/// Parameters passed to the backend on every turn
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Session default model
    pub model: String,
    /// Maximum tokens to generate per turn
    pub max_tokens: u32,
    /// Context window size requested from the backend
    pub context_size: u32,
    /// Sampling temperature
    pub temperature: f32,
    /// Stop sequences appended after the built-in ones
    pub extra_stops: Vec<String>,
}

/// Turn loop and termination configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationConfig {
    /// The task both agents work on
    pub task: String,
    /// Prompt template with `{actor_name}`, `{reactor_name}`, `{instructions}`,
    /// `{task}` and `{schema}` placeholders
    pub prompt_template: String,
    /// Sentinel substring counted after every turn
    pub exit_token: String,
    /// Number of turns that must contain the exit token before stopping
    pub exit_threshold: usize,
    /// JSONL file finished transcripts are appended to
    pub transcript_path: PathBuf,
    /// Debug log file
    pub log_file: PathBuf,
    /// Handling of empty backend responses
    pub retry: RetryPolicy,
}

/// Bounded retry of a turn whose response came back empty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts per turn, including the first
    pub max_attempts: u32,
    /// Delay before retry `n` is `n * backoff_ms`
    pub backoff_ms: u64,
}

impl RetryPolicy {
    /// A policy that retries immediately
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            backoff_ms: 0,
        }
    }

    /// Delay to wait before the given retry (1-based)
    pub fn delay_for(&self, retry: u32) -> Duration {
        Duration::from_millis(self.backoff_ms.saturating_mul(u64::from(retry)))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_ms: 500,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ollama: OllamaConfig::default(),
            generation: GenerationConfig::default(),
            conversation: ConversationConfig::default(),
            agents: default_agents(),
        }
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: env::var("OLLAMA_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: env::var("OLLAMA_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(11434),
            timeout_secs: 300,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: env::var("DUET_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            max_tokens: 4094,
            context_size: 4094,
            temperature: 0.7,
            extra_stops: Vec::new(),
        }
    }
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            task: DEFAULT_TASK.to_string(),
            prompt_template: DEFAULT_PROMPT_TEMPLATE.to_string(),
            exit_token: DEFAULT_EXIT_TOKEN.to_string(),
            exit_threshold: 2,
            transcript_path: env::var("DUET_TRANSCRIPT")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("conversation_logs.jsonl")),
            log_file: PathBuf::from("duet.log"),
            retry: RetryPolicy::default(),
        }
    }
}

/// The stock actor/critic pair
pub fn default_agents() -> Vec<AgentConfig> {
    vec![
        AgentConfig::new(
            "actor",
            "You are a research assistant. You will plan your research step-by-step. \
             Return a json object with thought and action.",
        )
        .with_schema(ACTOR_SCHEMA),
        AgentConfig::new(
            "critic",
            "You are a critic. Evaluate the other agent's plan and actions, \
             and give constructive feedback until the plan is sound.",
        )
        .with_schema(CRITIC_SCHEMA),
    ]
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("duet")
    }

    /// Get the config file path
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load configuration from file, environment, and defaults
    /// Priority: CLI args > config file > env vars > defaults
    pub fn load() -> Result<Self> {
        // Try to load .env file if it exists
        let _ = dotenvy::dotenv();

        Self::load_or_default(&Self::config_file())
    }

    /// Load a config file, or the defaults (which respect env vars) when it
    /// does not exist. A file that exists but cannot be read or parsed is an
    /// error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from_path(path)
    }

    /// Load configuration from a specific file
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DuetError::config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        let content = fs::read_to_string(path)
            .map_err(|e| DuetError::config(format!("Failed to read config: {}", e)))?;

        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| DuetError::config(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to a file, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                fs::create_dir_all(dir).map_err(|e| {
                    DuetError::config(format!("Failed to create config dir: {}", e))
                })?;
            }
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| DuetError::config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, content)
            .map_err(|e| DuetError::config(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    /// Get the full Ollama API URL
    pub fn ollama_url(&self) -> String {
        format!("http://{}:{}", self.ollama.host, self.ollama.port)
    }

    /// Apply a task to the session and to every agent that has none of its own
    pub fn set_task(&mut self, task: impl Into<String>) {
        let task = task.into();
        for agent in &mut self.agents {
            if agent.task.is_empty() || agent.task == self.conversation.task {
                agent.task = task.clone();
            }
        }
        self.conversation.task = task;
    }

    /// Generate a default config file content for display
    pub fn default_config_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config)
            .unwrap_or_else(|_| String::from("# Error generating config"))
    }
}
