/// Error types for the conversation engine
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatViewError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("Invalid event: {0}")]
    InvalidEvent(#[from] EventRejection),
}

/// Why an incoming event was refused. The view it targeted is left untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventRejection {
    #[error("unknown conversation {0}")]
    UnknownConversation(String),

    #[error("event for conversation {event} applied to view of {view}")]
    ConversationMismatch { view: String, event: String },

    #[error("unknown message {0}")]
    UnknownMessage(String),

    #[error("{0} is not a participant")]
    NotParticipant(String),

    #[error("receipt from {user} on their own message {message}")]
    ReceiptFromSender { user: String, message: String },

    #[error("message {0} already exists with different content")]
    ConflictingMessage(String),
}

pub type Result<T> = std::result::Result<T, ChatViewError>;
