//! Matchmaking scheduler.
//!
//! The scheduler is responsible for:
//! - Draining queued players once per tick
//! - Batching them into matches of a fixed size
//! - Allocating a game server per match, concurrently
//! - Announcing matches that received a server
//!
//! Matches whose allocation fails are logged with their players and, unless
//! the requeue policy is configured, dropped.

mod assembler;
mod worker;

pub use assembler::MatchAssembler;
pub use worker::{idle_time, FailurePolicy, MatchScheduler, TickStats};
