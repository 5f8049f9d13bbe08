//! # matchforge-id
//!
//! Identifier types shared by the matchmaker and the messages it publishes.
//!
//! ## ID Format
//!
//! Identifiers minted by the matchmaker use a prefixed format: `{prefix}_{ulid}`
//!
//! Examples:
//! - `match_01HV4Z2WQXKJNM8GPQY6VBKC3D`
//! - `msg_01HV4Z3MXNKPQR9HSTZ7WCLD4E`
//!
//! The ULID half makes every match id globally unique and time-sortable, so
//! log lines for consecutive ticks order naturally.
//!
//! Player identities are owned by the account system and arrive as plain
//! UUIDs; [`PlayerId`] wraps them without adding a prefix.

mod error;
mod macros;
mod types;

pub use error::IdError;
#[doc(hidden)]
pub use macros::parse_prefixed;
pub use types::*;

/// Re-export ulid for consumers that need raw ULID operations
pub use ulid::Ulid;

/// Re-export uuid so callers can build [`PlayerId`] values without a direct dependency.
pub use uuid::Uuid;
