//! Shared types used across Duet modules
//!
//! Contains the agent definition and transcript message structures.

use serde::{Deserialize, Serialize};

/// Sender label for the seeded system message
pub const SYSTEM_SENDER: &str = "system";

/// Sender label for the seeded task message
pub const USER_SENDER: &str = "user";

/// One participant in the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Name the agent speaks under; unique within a session
    pub name: String,
    /// Role instructions (config files may call this `objective`)
    #[serde(alias = "objective")]
    pub instructions: String,
    /// Task this agent works on; empty means the session task
    #[serde(default)]
    pub task: String,
    /// Advisory description of the response body the agent should emit
    #[serde(default)]
    pub schema: String,
    /// Model override; the session default is used when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl AgentConfig {
    /// Create an agent with instructions and no task, schema or model override
    pub fn new(name: impl Into<String>, instructions: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instructions: instructions.into(),
            task: String::new(),
            schema: String::new(),
            model: None,
        }
    }

    /// Set the task
    pub fn with_task(mut self, task: impl Into<String>) -> Self {
        self.task = task.into();
        self
    }

    /// Set the schema hint
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    /// Set a per-agent model override
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// The model this agent runs on, given the session default
    pub fn resolve_model<'a>(&'a self, default_model: &'a str) -> &'a str {
        self.model.as_deref().unwrap_or(default_model)
    }

    /// The speaker label that prefixes every message from this agent
    pub fn speaker_label(&self) -> String {
        format!("{}: ", self.name)
    }
}

/// A message in the conversation transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Agent name, or "system" / "user" for the seed messages
    pub sender: String,
    /// Content of the message
    pub content: String,
}

impl Message {
    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            sender: SYSTEM_SENDER.to_string(),
            content: content.into(),
        }
    }

    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            sender: USER_SENDER.to_string(),
            content: content.into(),
        }
    }

    /// Create a message spoken by an agent
    pub fn agent(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            sender: name.into(),
            content: content.into(),
        }
    }
}
