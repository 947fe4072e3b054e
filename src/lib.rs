//! Duet - Two-Agent Conversation Engine
//!
//! Drives a turn-taking exchange between two LLM agents (by default an
//! "actor" and a "critic") running on a local Ollama server, until the agents
//! have emitted an exit token a configured number of times.
//!
//! # Architecture
//!
//! - **Core**: Shared types, configuration, and error handling
//! - **LLM**: Generation backend abstraction with Ollama implementation
//! - **Agent**: Agent registry, prompt templates, turn engine and session loop
//! - **CLI**: Argument parsing and console output
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use duet::agent::{ConversationEngine, JsonlTranscriptStore, Session};
//! use duet::llm::OllamaClient;
//! use duet::Config;
//!
//! #[tokio::main]
//! async fn main() -> duet::Result<()> {
//!     let config = Config::load()?;
//!     let llm = Arc::new(OllamaClient::from_config(&config)?);
//!     let engine = ConversationEngine::from_config(llm, &config)?;
//!     let store = JsonlTranscriptStore::new(&config.conversation.transcript_path);
//!
//!     let mut session = Session::from_config(engine, &config, Box::new(store))?;
//!     println!("{:?}", session.run().await?);
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod cli;
pub mod core;
pub mod llm;

// Re-export commonly used items
pub use agent::{ConversationEngine, RunOutcome, Session};
pub use core::{AgentConfig, Config, DuetError, Message, Result};
