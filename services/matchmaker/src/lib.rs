//! matchforge matchmaker library.
//!
//! This crate primarily ships a `matchmaker` binary, but exposes its parts
//! as a library for integration testing and embedding the scheduler in
//! another service.

pub mod allocation;
pub mod api;
pub mod config;
pub mod notifier;
pub mod queue;
pub mod scheduler;
pub mod state;
