//! Match model.
//!
//! A [`Match`] lives for a single scheduling tick: it is assembled from
//! drained tickets, gets an [`Assignment`] if the allocator finds it a
//! server, and is then announced or dropped.

use chrono::{DateTime, Utc};
use matchforge_id::{MatchId, PlayerId};
use serde::{Deserialize, Serialize};

/// A single matchmaking request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Players covered by this ticket. Always exactly one for queued intents.
    pub player_ids: Vec<PlayerId>,

    pub created_at: DateTime<Utc>,

    pub game_mode_id: String,

    /// Whether the player should be moved to the server as soon as the match
    /// is announced.
    pub auto_teleport: bool,

    /// Reserved. Always false.
    pub dequeue_on_disconnect: bool,

    /// Reserved. Always false.
    pub in_pending_match: bool,
}

impl Ticket {
    /// Creates a single-player ticket.
    pub fn for_player(
        player_id: PlayerId,
        game_mode_id: impl Into<String>,
        auto_teleport: bool,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            player_ids: vec![player_id],
            created_at,
            game_mode_id: game_mode_id.into(),
            auto_teleport,
            dequeue_on_disconnect: false,
            in_pending_match: false,
        }
    }
}

/// The game server a match was placed on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub server_id: String,
    pub server_address: String,
    pub server_port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol_version: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_name: Option<String>,
}

/// A batch of tickets that will share a game server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub game_mode_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_id: Option<String>,
    pub tickets: Vec<Ticket>,
    /// Set if and only if allocation succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignment: Option<Assignment>,
}

impl Match {
    /// Creates an empty, unassigned match with a fresh ID.
    pub fn new(game_mode_id: impl Into<String>) -> Self {
        Self {
            id: MatchId::new(),
            game_mode_id: game_mode_id.into(),
            map_id: None,
            tickets: Vec::new(),
            assignment: None,
        }
    }

    pub fn ticket_count(&self) -> usize {
        self.tickets.len()
    }

    pub fn is_assigned(&self) -> bool {
        self.assignment.is_some()
    }

    /// Iterates over every player across all tickets.
    pub fn player_ids(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.tickets.iter().flat_map(|t| t.player_ids.iter().copied())
    }
}
