//! Conversation session
//!
//! The driving loop around [`ConversationEngine`]: takes turns until the exit
//! token has been seen `threshold` times, then persists the transcript once.
//! Cancellation is checked between turns only.

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::agent::engine::ConversationEngine;
use crate::agent::store::TranscriptStore;
use crate::agent::termination::TerminationState;
use crate::core::{Config, Result};

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Exit threshold reached and transcript persisted
    Concluded { turns: usize, messages: usize },
    /// Cancelled between turns; nothing persisted
    Interrupted { turns: usize },
}

/// One conversation from seed to conclusion
pub struct Session {
    engine: ConversationEngine,
    termination: TerminationState,
    store: Box<dyn TranscriptStore>,
    cancel: CancellationToken,
}

impl Session {
    /// Create a session
    pub fn new(
        engine: ConversationEngine,
        termination: TerminationState,
        store: Box<dyn TranscriptStore>,
    ) -> Self {
        Self {
            engine,
            termination,
            store,
            cancel: CancellationToken::new(),
        }
    }

    /// Create a session using the configured exit token and threshold
    pub fn from_config(
        engine: ConversationEngine,
        config: &Config,
        store: Box<dyn TranscriptStore>,
    ) -> Result<Self> {
        let termination = TerminationState::new(
            config.conversation.exit_token.clone(),
            config.conversation.exit_threshold,
        )?;
        Ok(Self::new(engine, termination, store))
    }

    /// Stop the run when this token is cancelled
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn engine(&self) -> &ConversationEngine {
        &self.engine
    }

    pub fn termination(&self) -> &TerminationState {
        &self.termination
    }

    /// Run turns until the conversation concludes or is cancelled
    pub async fn run(&mut self) -> Result<RunOutcome> {
        loop {
            if self.cancel.is_cancelled() {
                let turns = self.engine.turns();
                info!(turns, "conversation interrupted");
                self.engine.terminate();
                self.engine.observer().on_interrupted();
                return Ok(RunOutcome::Interrupted { turns });
            }

            let text = self.engine.next_turn().await?;

            if self.termination.observe(&text) {
                info!(
                    occurrences = self.termination.occurrences(),
                    threshold = self.termination.threshold(),
                    "exit token seen"
                );
            }

            if self.termination.is_reached() {
                self.engine.terminate();
                let transcript = self.engine.transcript();
                self.store.append(transcript.messages())?;

                info!(
                    turns = transcript.turn_count(),
                    messages = transcript.len(),
                    "conversation concluded"
                );
                self.engine.observer().on_concluded(transcript);

                return Ok(RunOutcome::Concluded {
                    turns: transcript.turn_count(),
                    messages: transcript.len(),
                });
            }
        }
    }
}
