//! Application state shared across request handlers.

use std::sync::Arc;

use tokio::sync::watch;

use crate::queue::TicketQueue;
use crate::scheduler::{MatchScheduler, TickStats};

/// Shared application state.
///
/// This is passed to all request handlers via Axum's state extractor.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    queue: TicketQueue,
    game_mode_id: String,
    last_tick: watch::Receiver<Option<TickStats>>,
}

impl AppState {
    /// Create state wired to a scheduler's queue and tick stats.
    pub fn new(scheduler: &MatchScheduler) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                queue: scheduler.queue(),
                game_mode_id: scheduler.game_mode_id().to_string(),
                last_tick: scheduler.subscribe_stats(),
            }),
        }
    }

    pub fn queue(&self) -> &TicketQueue {
        &self.inner.queue
    }

    pub fn game_mode_id(&self) -> &str {
        &self.inner.game_mode_id
    }

    /// Stats of the most recently completed tick.
    pub fn last_tick(&self) -> Option<TickStats> {
        self.inner.last_tick.borrow().clone()
    }
}
