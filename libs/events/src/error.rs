//! Error types for message handling.

use thiserror::Error;

/// Errors that can occur when encoding or decoding messages.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EventError {
    /// The message type does not match what the decoder expects.
    #[error("unexpected message type: expected {expected}, got {actual}")]
    UnexpectedType {
        expected: &'static str,
        actual: String,
    },

    /// The message version is not supported.
    #[error("unsupported message version: {message_type} v{version}")]
    UnsupportedVersion { message_type: String, version: i32 },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for EventError {
    fn from(err: serde_json::Error) -> Self {
        EventError::Serialization(err.to_string())
    }
}
