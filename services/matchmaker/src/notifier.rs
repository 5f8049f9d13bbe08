//! Match announcements.
//!
//! Once a match has a server, the scheduler announces it so the proxy layer
//! can move players. Delivery is fire-and-forget from the scheduler's point
//! of view: failures are logged by the caller and never retried.

use std::time::Duration;

use async_trait::async_trait;
use matchforge_events::{EventError, Match, MatchCreated};
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, info};

/// Producer name stamped on published messages.
pub const PRODUCER: &str = "matchmaker";

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("failed to encode message: {0}")]
    Encode(#[from] EventError),

    #[error("message bus request failed: {0}")]
    Transport(String),
}

/// Notifier capability consumed by the scheduler.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Announces that a match has been allocated a server.
    async fn match_created(&self, m: &Match) -> Result<(), NotifyError>;
}

/// Notifier that only logs. Used when no message bus is configured.
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn match_created(&self, m: &Match) -> Result<(), NotifyError> {
        let (server_id, address, port) = m
            .assignment
            .as_ref()
            .map(|a| (a.server_id.as_str(), a.server_address.as_str(), a.server_port))
            .unwrap_or_default();

        info!(
            match_id = %m.id,
            game_mode_id = %m.game_mode_id,
            players = m.ticket_count(),
            server_id,
            address,
            port,
            "Match created"
        );
        Ok(())
    }
}

/// Publishes `match.created` envelopes to a message-bus HTTP ingress.
pub struct HttpNotifier {
    client: reqwest::Client,
    url: String,
}

impl HttpNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn match_created(&self, m: &Match) -> Result<(), NotifyError> {
        let message = MatchCreated::match_created(PRODUCER, m.clone());
        let body = message.to_json_bytes()?;

        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Transport(format!(
                "message bus returned {}: {}",
                status, body
            )));
        }

        debug!(
            match_id = %m.id,
            message_id = %message.message_id,
            "Published match.created"
        );
        Ok(())
    }
}
