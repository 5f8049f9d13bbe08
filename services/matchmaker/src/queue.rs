//! Ticket queue.
//!
//! Holds the latest matchmaking intent per player between scheduler ticks.
//! Submissions and drains are serialized by a single lock that is only held
//! for a map insert or a swap, never across an await point, so intake is
//! never blocked behind allocation.
//!
//! Players are drained in the order they first joined since the previous
//! drain. Re-submitting overwrites the intent but keeps the player's place.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use matchforge_id::PlayerId;
use tracing::debug;

/// A player's request to be matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Intent {
    pub player_id: PlayerId,
    pub auto_teleport: bool,
}

#[derive(Debug, Default)]
struct Pending {
    order: Vec<PlayerId>,
    intents: HashMap<PlayerId, bool>,
}

impl Pending {
    fn into_intents(self) -> Vec<Intent> {
        let Pending { order, intents } = self;
        order
            .into_iter()
            .filter_map(|player_id| {
                intents.get(&player_id).map(|&auto_teleport| Intent {
                    player_id,
                    auto_teleport,
                })
            })
            .collect()
    }
}

/// Shared handle to the matchmaking queue.
///
/// Cloning is cheap; every clone refers to the same queue. The scheduler owns
/// one handle and gives clones to intake code.
#[derive(Debug, Clone, Default)]
pub struct TicketQueue {
    inner: Arc<Mutex<Pending>>,
}

impl TicketQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a player for the next tick. Last write wins.
    pub fn queue_player(&self, player_id: PlayerId, auto_teleport: bool) {
        let mut pending = self.lock();
        if pending.intents.insert(player_id, auto_teleport).is_none() {
            pending.order.push(player_id);
        }
    }

    /// Empties the queue and returns its contents in submission order.
    pub fn drain_all(&self) -> Vec<Intent> {
        let pending = std::mem::take(&mut *self.lock());
        pending.into_intents()
    }

    /// Puts intents back at the front of the queue.
    ///
    /// A player who submitted again since the intents were drained keeps
    /// their newer intent and position. Returns how many intents were
    /// actually restored.
    pub fn requeue(&self, intents: impl IntoIterator<Item = Intent>) -> usize {
        let mut pending = self.lock();
        let mut restored = Vec::new();
        for intent in intents {
            if pending.intents.contains_key(&intent.player_id) {
                continue;
            }
            pending.intents.insert(intent.player_id, intent.auto_teleport);
            restored.push(intent.player_id);
        }

        let count = restored.len();
        if count > 0 {
            restored.append(&mut pending.order);
            pending.order = restored;
            debug!(restored = count, queued = pending.order.len(), "Requeued players");
        }
        count
    }

    pub fn len(&self) -> usize {
        self.lock().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // A panic while holding the lock can't leave `Pending` half-updated in a
    // way later callers can't cope with, so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, Pending> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
