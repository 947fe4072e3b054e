//! Turn observers
//!
//! The engine reports progress through a `TurnObserver` handed to it at
//! construction. Console rendering lives in the CLI; the library only knows
//! the trait.

use crate::agent::transcript::Transcript;

/// Receives conversation events as they happen
pub trait TurnObserver: Send + Sync {
    /// An agent is about to be asked for a response
    fn on_thinking(&self, _agent: &str, _seat: usize) {}

    /// An agent's turn was recorded
    fn on_message(&self, agent: &str, seat: usize, text: &str);

    /// The backend returned nothing for this attempt
    fn on_empty_response(&self, _agent: &str, _attempt: u32) {}

    /// The exit threshold was reached and the transcript persisted
    fn on_concluded(&self, _transcript: &Transcript) {}

    /// The run was cancelled between turns
    fn on_interrupted(&self) {}
}

/// Observer that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl TurnObserver for NoopObserver {
    fn on_message(&self, _agent: &str, _seat: usize, _text: &str) {}
}

/// Adapts a closure over (agent name, text) into an observer
pub struct CallbackObserver<F> {
    callback: F,
}

impl<F> CallbackObserver<F>
where
    F: Fn(&str, &str) + Send + Sync,
{
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> TurnObserver for CallbackObserver<F>
where
    F: Fn(&str, &str) + Send + Sync,
{
    fn on_message(&self, agent: &str, _seat: usize, text: &str) {
        (self.callback)(agent, text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_callback_observer() {
        let seen = Mutex::new(Vec::new());
        let observer = CallbackObserver::new(|agent: &str, text: &str| {
            seen.lock().unwrap().push(format!("{agent}|{text}"));
        });

        observer.on_thinking("actor", 0);
        observer.on_message("actor", 0, "actor: hello");

        assert_eq!(*seen.lock().unwrap(), vec!["actor|actor: hello"]);
    }
}
