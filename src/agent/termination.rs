//! Exit-token counting
//!
//! Occurrences are counted across all turns regardless of which agent spoke,
//! and at most once per turn.

use crate::core::{DuetError, Result};

/// Tracks how many turns have carried the exit token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminationState {
    exit_token: String,
    occurrences: usize,
    threshold: usize,
}

impl TerminationState {
    /// Create a counter; the token must be non-empty and the threshold positive
    pub fn new(exit_token: impl Into<String>, threshold: usize) -> Result<Self> {
        let exit_token = exit_token.into();
        if exit_token.is_empty() {
            return Err(DuetError::config("exit token must not be empty"));
        }
        if threshold == 0 {
            return Err(DuetError::config("exit threshold must be at least 1"));
        }

        Ok(Self {
            exit_token,
            occurrences: 0,
            threshold,
        })
    }

    /// Inspect one turn's output; returns whether it carried the token
    pub fn observe(&mut self, text: &str) -> bool {
        if self.is_reached() || !text.contains(&self.exit_token) {
            return false;
        }
        self.occurrences += 1;
        true
    }

    /// Whether the conversation should stop
    pub fn is_reached(&self) -> bool {
        self.occurrences == self.threshold
    }

    pub fn occurrences(&self) -> usize {
        self.occurrences
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }
}
