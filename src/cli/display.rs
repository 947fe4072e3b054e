//! Console rendering of a running conversation

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use crate::agent::{Transcript, TurnObserver};

const TICK_CHARS: &str = "⠁⠂⠄⡀⢀⠠⠐⠈ ";

/// Prints each turn in the agent's color, with a spinner while an agent thinks
///
/// The opening agent is green and its peer blue.
#[derive(Default)]
pub struct ConsoleObserver {
    spinner: Mutex<Option<ProgressBar>>,
    hidden: bool,
}

impl ConsoleObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// An observer whose spinner never draws
    pub fn hidden() -> Self {
        Self {
            spinner: Mutex::new(None),
            hidden: true,
        }
    }

    /// Render a message line for the given seat
    pub fn format_message(seat: usize, text: &str) -> String {
        let text = format!("{}\t\t", text.trim());
        if seat == 0 {
            text.bright_green().to_string()
        } else {
            text.blue().to_string()
        }
    }

    /// Whether a thinking spinner is currently shown
    pub fn is_thinking(&self) -> bool {
        self.slot().is_some()
    }

    fn slot(&self) -> MutexGuard<'_, Option<ProgressBar>> {
        self.spinner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn start_spinner(&self, message: String) {
        let spinner = if self.hidden {
            ProgressBar::hidden()
        } else {
            ProgressBar::new_spinner()
        };
        let style = ProgressStyle::default_spinner()
            .tick_chars(TICK_CHARS)
            .template("{spinner:.yellow} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        spinner.set_style(style);
        spinner.set_message(message);
        spinner.enable_steady_tick(Duration::from_millis(100));

        if let Some(previous) = self.slot().replace(spinner) {
            previous.finish_and_clear();
        }
    }

    fn clear_spinner(&self) {
        if let Some(spinner) = self.slot().take() {
            spinner.finish_and_clear();
        }
    }
}

impl Drop for ConsoleObserver {
    fn drop(&mut self) {
        self.clear_spinner();
    }
}

impl TurnObserver for ConsoleObserver {
    fn on_thinking(&self, agent: &str, _seat: usize) {
        self.start_spinner(format!("{} is thinking...", agent).yellow().to_string());
    }

    fn on_message(&self, _agent: &str, seat: usize, text: &str) {
        self.clear_spinner();
        println!("{}", Self::format_message(seat, text));
    }

    fn on_empty_response(&self, agent: &str, attempt: u32) {
        let message = format!(
            "{} returned nothing (attempt {}), asking again...",
            agent, attempt
        );
        match self.slot().as_ref() {
            Some(spinner) => spinner.set_message(message.yellow().to_string()),
            None => eprintln!("{}", message.yellow()),
        }
    }

    fn on_concluded(&self, _transcript: &Transcript) {
        self.clear_spinner();
        println!("{}", "The conversation was concluded...".red());
    }

    fn on_interrupted(&self) {
        self.clear_spinner();
        println!("{}", "Closing conversation...".red());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_message_keeps_text() {
        colored::control::set_override(false);
        assert_eq!(
            ConsoleObserver::format_message(0, "  actor: hi \n"),
            "actor: hi\t\t"
        );
        assert_eq!(ConsoleObserver::format_message(1, "critic: ok"), "critic: ok\t\t");
    }

    #[test]
    fn test_spinner_spans_the_turn() {
        let observer = ConsoleObserver::hidden();
        assert!(!observer.is_thinking());

        observer.on_thinking("actor", 0);
        assert!(observer.is_thinking());

        observer.on_empty_response("actor", 1);
        assert!(observer.is_thinking());

        observer.on_message("actor", 0, "actor: done");
        assert!(!observer.is_thinking());
    }

    #[test]
    fn test_interrupt_clears_spinner() {
        let observer = ConsoleObserver::hidden();
        observer.on_thinking("critic", 1);
        observer.on_interrupted();
        assert!(!observer.is_thinking());
    }
}
