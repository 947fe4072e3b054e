//! Transcript persistence
//!
//! A finished conversation is appended as one JSON array per line.

use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::core::{Message, Result};

/// Destination for finished transcripts
pub trait TranscriptStore: Send + Sync {
    /// Append one finished conversation
    fn append(&self, messages: &[Message]) -> Result<()>;
}

/// Appends transcripts to a JSON Lines file
#[derive(Debug, Clone)]
pub struct JsonlTranscriptStore {
    path: PathBuf,
}

impl JsonlTranscriptStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read back every stored conversation, oldest first
    pub fn read_all(&self) -> Result<Vec<Vec<Message>>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = fs::File::open(&self.path)?;
        let mut conversations = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            conversations.push(serde_json::from_str(&line)?);
        }
        Ok(conversations)
    }
}

impl TranscriptStore for JsonlTranscriptStore {
    fn append(&self, messages: &[Message]) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                fs::create_dir_all(dir)?;
            }
        }

        let mut line = serde_json::to_string(messages)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        file.flush()?;

        info!(
            path = %self.path.display(),
            messages = messages.len(),
            "transcript persisted"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conversation(tag: &str) -> Vec<Message> {
        vec![
            Message::system("sys"),
            Message::user("task"),
            Message::agent("actor", format!("actor: {tag}")),
        ]
    }

    #[test]
    fn test_append_one_line_per_session() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlTranscriptStore::new(dir.path().join("logs").join("runs.jsonl"));

        store.append(&conversation("one")).unwrap();
        store.append(&conversation("two")).unwrap();

        let raw = fs::read_to_string(store.path()).unwrap();
        assert_eq!(raw.lines().count(), 2);
        assert!(raw.ends_with('\n'));

        let stored = store.read_all().unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[1][2].content, "actor: two");
    }

    #[test]
    fn test_read_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlTranscriptStore::new(dir.path().join("absent.jsonl"));
        assert!(store.read_all().unwrap().is_empty());
    }

    #[test]
    fn test_record_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlTranscriptStore::new(dir.path().join("runs.jsonl"));
        store.append(&conversation("x")).unwrap();

        let raw = fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(raw.trim()).unwrap();
        assert_eq!(value[0]["sender"], "system");
        assert_eq!(value[1]["sender"], "user");
        assert_eq!(value[2]["content"], "actor: x");
    }
}
