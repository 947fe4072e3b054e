//! Conversation transcript
//!
//! Keeps the authoritative message list alongside the running text that is fed
//! back into every prompt. Both only ever grow.

use crate::core::Message;

/// Messages seeded before the first agent turn
pub const SEED_MESSAGES: usize = 2;

/// Append-only record of one conversation
#[derive(Debug, Clone)]
pub struct Transcript {
    /// System and user seed followed by every agent turn
    messages: Vec<Message>,
    /// Agent turns only, newline terminated
    running_text: String,
}

impl Transcript {
    /// Start a transcript with the system instructions and the task
    pub fn new(system_instructions: impl Into<String>, task: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(system_instructions), Message::user(task)],
            running_text: String::new(),
        }
    }

    /// Record an agent's (already normalized) turn
    pub fn record(&mut self, agent: &str, text: &str) {
        self.messages.push(Message::agent(agent, text));
        self.running_text.push_str(text);
        self.running_text.push('\n');
    }

    /// All messages, seed included
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Agent turns joined as prompt context
    pub fn running_text(&self) -> &str {
        &self.running_text
    }

    /// Number of agent turns recorded
    pub fn turn_count(&self) -> usize {
        self.messages.len() - SEED_MESSAGES
    }

    /// Get message count
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// A transcript always holds its seed messages
    pub fn is_empty(&self) -> bool {
        false
    }
}
