//! Game server allocation.
//!
//! The matchmaker never talks to game servers directly. Each match is turned
//! into an [`AllocationRequest`] and handed to an [`Allocator`], which asks
//! the fleet for a server with room for the match's players.
//!
//! - [`AllocationFanOut`] runs one allocation per match concurrently and
//!   collects per-match results
//! - [`HttpAllocator`] talks to an allocator service over HTTP
//! - [`StaticAllocator`] answers every request locally, for development

mod fan_out;
mod http;
mod static_alloc;

use std::collections::HashMap;

use async_trait::async_trait;
use matchforge_events::{Assignment, Match};
use matchforge_id::MatchId;
use serde::{Deserialize, Serialize};

pub use fan_out::{AllocationFanOut, FanOutOutcome, PendingMatch};
pub use http::HttpAllocator;
pub use static_alloc::StaticAllocator;

/// Annotation carrying the protocol version a game server speaks.
pub const PROTOCOL_VERSION_ANNOTATION: &str = "agones.dev/sdk-emc-protocol-version";

/// Annotation carrying the human-readable build name of a game server.
pub const VERSION_NAME_ANNOTATION: &str = "agones.dev/sdk-emc-version-name";

/// Errors from allocating a server for a single match.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AllocationError {
    #[error("allocator request failed: {0}")]
    Transport(String),

    #[error("allocation was not successful: {0}")]
    NotAllocated(AllocationState),

    #[error("malformed allocator response: {0}")]
    Malformed(String),

    #[error("allocation task failed: {0}")]
    TaskFailed(String),
}

/// Allocator capability consumed by the scheduler.
#[async_trait]
pub trait Allocator: Send + Sync {
    /// Requests a game server for one match.
    ///
    /// An `Ok` response may still report a non-allocated state; callers use
    /// [`AllocationResponse::into_assignment`] to interpret it.
    async fn allocate(
        &self,
        request: &AllocationRequest,
    ) -> Result<AllocationResponse, AllocationError>;
}

/// What the allocator is asked for: capacity for `player_count` players on
/// the given fleet, tagged with the match it is for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllocationRequest {
    pub fleet_name: String,
    pub match_id: MatchId,
    pub player_count: u32,
}

impl AllocationRequest {
    /// Builds the request for a match, sized to its ticket count.
    pub fn for_match(fleet_name: impl Into<String>, m: &Match) -> Self {
        Self {
            fleet_name: fleet_name.into(),
            match_id: m.id,
            player_count: u32::try_from(m.ticket_count()).unwrap_or(u32::MAX),
        }
    }
}

/// Outcome state reported by the allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AllocationState {
    Allocated,
    UnAllocated,
    Contention,
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for AllocationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AllocationState::Allocated => "Allocated",
            AllocationState::UnAllocated => "UnAllocated",
            AllocationState::Contention => "Contention",
            AllocationState::Unknown => "Unknown",
        };
        write!(f, "{}", s)
    }
}

/// A named port exposed by a game server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameServerPort {
    #[serde(default)]
    pub name: String,
    pub port: i32,
}

/// The allocator's answer for one request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AllocationResponse {
    pub state: Option<AllocationState>,
    pub game_server_name: String,
    pub address: String,
    pub ports: Vec<GameServerPort>,
    pub annotations: HashMap<String, String>,
}

impl AllocationResponse {
    /// Interprets the response as an assignment.
    ///
    /// Anything but the `Allocated` state is a failure, as is a response
    /// without an address or a usable first port. Version annotations are
    /// optional and surfaced as-is; an unparseable protocol version is
    /// treated as absent.
    pub fn into_assignment(self) -> Result<Assignment, AllocationError> {
        match self.state {
            Some(AllocationState::Allocated) => {}
            Some(other) => return Err(AllocationError::NotAllocated(other)),
            None => return Err(AllocationError::Malformed("missing state".to_string())),
        }

        if self.address.is_empty() {
            return Err(AllocationError::Malformed("missing address".to_string()));
        }

        let port = self
            .ports
            .first()
            .ok_or_else(|| AllocationError::Malformed("missing port".to_string()))?;
        let server_port = u16::try_from(port.port)
            .ok()
            .filter(|p| *p != 0)
            .ok_or_else(|| AllocationError::Malformed(format!("invalid port {}", port.port)))?;

        let protocol_version = self
            .annotations
            .get(PROTOCOL_VERSION_ANNOTATION)
            .and_then(|v| v.trim().parse::<i64>().ok());
        let version_name = self.annotations.get(VERSION_NAME_ANNOTATION).cloned();

        Ok(Assignment {
            server_id: self.game_server_name,
            server_address: self.address,
            server_port,
            protocol_version,
            version_name,
        })
    }
}
