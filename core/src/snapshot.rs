/// Loading conversation snapshots and event logs from disk
use crate::error::{ChatViewError, Result};
use crate::messenger_types::{Conversation, ConversationEvent};
use std::fs;
use std::path::Path;

/// Read a conversation snapshot stored as a single JSON document
pub fn load_conversation(path: &Path) -> Result<Conversation> {
    let raw = fs::read_to_string(path).map_err(ChatViewError::Io)?;
    let conversation = serde_json::from_str(&raw).map_err(ChatViewError::Serialization)?;
    Ok(conversation)
}

/// Read an event log: one JSON event per line, blank lines ignored
pub fn load_events(path: &Path) -> Result<Vec<ConversationEvent>> {
    let raw = fs::read_to_string(path).map_err(ChatViewError::Io)?;
    parse_events(&raw)
}

pub fn parse_events(raw: &str) -> Result<Vec<ConversationEvent>> {
    let mut out = Vec::new();
    for (n, line) in raw.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let event = serde_json::from_str(line).map_err(|e| {
            ChatViewError::InvalidSnapshot(format!("event log line {}: {}", n + 1, e))
        })?;
        out.push(event);
    }
    Ok(out)
}
