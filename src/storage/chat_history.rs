//! Chat history persisted as a flat JSON array, read and written wholesale.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::types::{ChatMessage, Result, ResultExt};

#[derive(Debug, Clone)]
pub struct ChatHistory {
    path: PathBuf,
    max_history: usize,
}

impl ChatHistory {
    pub fn new(path: impl Into<PathBuf>, max_history: usize) -> Self {
        Self {
            path: path.into(),
            max_history: max_history.max(1),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored turns; a missing or unreadable file is an empty history
    pub fn load(&self) -> Vec<ChatMessage> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!("Failed to read chat history {}: {}", self.path.display(), e);
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<ChatMessage>>(&content) {
            Ok(messages) => messages,
            Err(e) => {
                warn!(
                    "Chat history {} is corrupted, starting fresh: {}",
                    self.path.display(),
                    e
                );
                Vec::new()
            }
        }
    }

    /// Write the newest `max_history` turns, replacing the file
    pub fn save(&self, messages: &[ChatMessage]) -> Result<()> {
        let start = messages.len().saturating_sub(self.max_history);
        let kept = &messages[start..];

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(kept)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).with_context("Failed to write chat history")?;
        std::fs::rename(&tmp, &self.path).with_context("Failed to replace chat history")?;

        debug!("Saved {} chat turns to {}", kept.len(), self.path.display());
        Ok(())
    }

    /// Load, append, trim and save in one step; returns the saved turns
    pub fn append(&self, new_messages: &[ChatMessage]) -> Result<Vec<ChatMessage>> {
        let mut messages = self.load();
        messages.extend_from_slice(new_messages);
        let start = messages.len().saturating_sub(self.max_history);
        messages.drain(..start);
        self.save(&messages)?;
        Ok(messages)
    }

    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChatRole;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let history = ChatHistory::new(temp.path().join("chat.json"), 50);
        assert!(history.load().is_empty());
    }

    #[test]
    fn test_corrupt_file_is_empty() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("chat.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(ChatHistory::new(&path, 50).load().is_empty());
    }

    #[test]
    fn test_append_and_reload() {
        let temp = TempDir::new().unwrap();
        let history = ChatHistory::new(temp.path().join("nested").join("chat.json"), 50);

        history
            .append(&[
                ChatMessage::user("What are the top risks?"),
                ChatMessage::assistant("Budget overrun and vendor delays."),
            ])
            .unwrap();

        let loaded = history.load();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].role, ChatRole::User);
        assert_eq!(loaded[1].content, "Budget overrun and vendor delays.");
    }

    #[test]
    fn test_trims_to_newest() {
        let temp = TempDir::new().unwrap();
        let history = ChatHistory::new(temp.path().join("chat.json"), 3);

        let turns: Vec<ChatMessage> = (0..5).map(|i| ChatMessage::user(format!("q{i}"))).collect();
        let saved = history.append(&turns).unwrap();

        let contents: Vec<&str> = saved.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["q2", "q3", "q4"]);
        assert_eq!(history.load().len(), 3);
    }

    #[test]
    fn test_clear() {
        let temp = TempDir::new().unwrap();
        let history = ChatHistory::new(temp.path().join("chat.json"), 10);
        history.append(&[ChatMessage::user("hi")]).unwrap();
        history.clear().unwrap();
        assert!(history.load().is_empty());
        // clearing twice is fine
        history.clear().unwrap();
    }
}
