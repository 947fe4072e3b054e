//! Command-line arguments

use std::path::PathBuf;

use clap::Parser;

use crate::core::{Config, Result};

/// Duet - two local LLM agents working a task until both say they are done
#[derive(Parser, Debug, Default)]
#[command(name = "duet")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Task for the agents to work on
    #[arg(long, short = 't')]
    pub task: Option<String>,

    /// Default model for agents without an override
    #[arg(long, short = 'm')]
    pub model: Option<String>,

    /// Config file to use instead of ~/.config/duet/config.toml
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Exit token the agents emit when finished
    #[arg(long)]
    pub exit_token: Option<String>,

    /// Number of turns carrying the exit token needed to stop
    #[arg(long)]
    pub threshold: Option<usize>,

    /// JSONL file the finished transcript is appended to
    #[arg(long)]
    pub transcript: Option<PathBuf>,

    /// Sampling temperature
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Maximum tokens per turn
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Enable debug logging
    #[arg(long, short = 'd')]
    pub debug: bool,

    /// Do not check that the models are pulled before starting
    #[arg(long)]
    pub skip_model_check: bool,

    /// Print the default configuration and exit
    #[arg(long)]
    pub print_config: bool,
}

impl Args {
    /// Load the base configuration this invocation refers to
    pub fn load_config(&self) -> Result<Config> {
        match self.config {
            Some(ref path) => {
                let _ = dotenvy::dotenv();
                Config::load_from_path(path)
            }
            None => Config::load(),
        }
    }

    /// Apply CLI overrides on top of a loaded configuration
    pub fn apply(&self, config: &mut Config) {
        if let Some(ref task) = self.task {
            config.set_task(task.clone());
        }
        if let Some(ref model) = self.model {
            config.generation.model = model.clone();
        }
        if let Some(ref token) = self.exit_token {
            config.conversation.exit_token = token.clone();
        }
        if let Some(threshold) = self.threshold {
            config.conversation.exit_threshold = threshold;
        }
        if let Some(ref path) = self.transcript {
            config.conversation.transcript_path = path.clone();
        }
        if let Some(temperature) = self.temperature {
            config.generation.temperature = temperature;
        }
        if let Some(max_tokens) = self.max_tokens {
            config.generation.max_tokens = max_tokens;
        }
    }
}
