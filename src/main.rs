//! Duet - Two-Agent Conversation Engine
//!
//! Main entry point for the CLI application.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::{Arc, Mutex};

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use duet::agent::{ConversationEngine, JsonlTranscriptStore, RunOutcome, Session};
use duet::cli::{watch_interrupts, Args, ConsoleObserver};
use duet::llm::OllamaClient;
use duet::Config;

/// Send logs to the append-only debug log so the console only shows the conversation
fn init_logging(log_file: &Path, debug: bool) -> anyhow::Result<()> {
    let level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("duet={}", level)));

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.print_config {
        println!("{}", Config::default_config_toml());
        return Ok(());
    }

    // Build configuration
    let mut config = args.load_config()?;
    args.apply(&mut config);

    init_logging(&config.conversation.log_file, args.debug)?;

    let llm = Arc::new(OllamaClient::from_config(&config)?);
    let engine = ConversationEngine::from_config(llm, &config)?
        .with_observer(Arc::new(ConsoleObserver::new()));

    if !args.skip_model_check {
        engine.check_models().await?;
    }

    let store = JsonlTranscriptStore::new(config.conversation.transcript_path.clone());

    // Ctrl-C stops the loop before the next turn; a second one exits now
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if watch_interrupts(tokio::signal::ctrl_c, on_interrupt).await {
            std::process::exit(130);
        }
    });

    let mut session =
        Session::from_config(engine, &config, Box::new(store))?.with_cancellation(cancel);

    match session.run().await? {
        RunOutcome::Concluded { turns, messages } => {
            println!(
                "{} turns, {} messages saved to {}",
                turns,
                messages,
                config.conversation.transcript_path.display()
            );
        }
        RunOutcome::Interrupted { turns } => {
            println!("Stopped after {} turns; transcript not saved.", turns);
        }
    }

    Ok(())
}
