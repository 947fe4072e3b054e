//! CLI module - command-line interface
//!
//! Contains argument parsing and console output.

pub mod args;
pub mod display;
pub mod interrupt;

pub use args::Args;
pub use display::ConsoleObserver;
pub use interrupt::watch_interrupts;
