//! Message envelope - the common wrapper for everything published to the bus.

use chrono::{DateTime, Utc};
use matchforge_id::MessageId;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::{EventError, Match};

/// All message type names as constants.
pub mod message_types {
    pub const MATCH_CREATED: &str = "match.created";
}

/// Current schema version of `match.created`.
pub const MATCH_CREATED_VERSION: i32 = 1;

/// The message envelope - common metadata for all messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEnvelope<P> {
    pub message_id: MessageId,

    pub occurred_at: DateTime<Utc>,

    /// The message type (e.g., "match.created").
    pub message_type: String,

    /// Schema version for this message type.
    pub message_version: i32,

    /// Name of the service that produced the message.
    pub producer: String,

    /// Grouping ID for related messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,

    pub payload: P,
}

impl<P: Serialize> MessageEnvelope<P> {
    /// Serializes the envelope to JSON bytes for publishing.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, EventError> {
        Ok(serde_json::to_vec(self)?)
    }
}

impl<P: DeserializeOwned> MessageEnvelope<P> {
    /// Decodes an envelope, checking it carries the expected type and a
    /// version no newer than `max_version`.
    pub fn decode(
        bytes: &[u8],
        expected_type: &'static str,
        max_version: i32,
    ) -> Result<Self, EventError> {
        let envelope: Self = serde_json::from_slice(bytes)?;
        if envelope.message_type != expected_type {
            return Err(EventError::UnexpectedType {
                expected: expected_type,
                actual: envelope.message_type,
            });
        }
        if envelope.message_version > max_version {
            return Err(EventError::UnsupportedVersion {
                message_type: envelope.message_type,
                version: envelope.message_version,
            });
        }
        Ok(envelope)
    }
}

/// A `match.created` message.
pub type MatchCreated = MessageEnvelope<Match>;

impl MessageEnvelope<Match> {
    /// Wraps an allocated match in a `match.created` envelope.
    ///
    /// The match ID doubles as the correlation ID so consumers can tie the
    /// announcement back to matchmaker logs.
    pub fn match_created(producer: impl Into<String>, m: Match) -> Self {
        MessageEnvelope {
            message_id: MessageId::new(),
            occurred_at: Utc::now(),
            message_type: message_types::MATCH_CREATED.to_string(),
            message_version: MATCH_CREATED_VERSION,
            producer: producer.into(),
            correlation_id: Some(m.id.to_string()),
            payload: m,
        }
    }
}
