//! # matchforge-events
//!
//! The match model and the messages the matchmaker publishes about it.
//!
//! ## Model
//!
//! - [`Ticket`]: one player's request to be matched, derived from a queued intent
//! - [`Match`]: a batch of tickets sharing a game mode and, once allocated, a server
//! - [`Assignment`]: the game server a match was placed on
//!
//! ## Message Envelope
//!
//! Messages put on the bus share a common envelope with:
//! - Identity (`message_id`)
//! - Schema (`message_type`, `message_version`)
//! - Audit context (`producer`, `occurred_at`)
//!
//! ## Message Types
//!
//! - `match.created`: a match was allocated a server and players may be sent to it

mod envelope;
mod error;
mod model;

pub use envelope::*;
pub use error::EventError;
pub use model::*;
