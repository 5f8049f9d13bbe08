//! Concurrent per-match allocation.

use std::collections::HashMap;
use std::sync::Arc;

use matchforge_events::Match;
use matchforge_id::MatchId;
use tokio::task::JoinSet;
use tracing::{debug, info_span, Instrument};

use super::{AllocationError, AllocationRequest, Allocator};

/// A freshly assembled match paired with the request that will place it.
#[derive(Debug, Clone)]
pub struct PendingMatch {
    pub r#match: Match,
    pub request: AllocationRequest,
}

/// Result of allocating a batch of matches.
#[derive(Debug, Default)]
pub struct FanOutOutcome {
    /// Matches that received an assignment, in the order the allocator
    /// resolved them.
    pub allocated: Vec<Match>,

    /// Matches that did not, in resolution order. Their assignment is unset.
    pub failed: Vec<Match>,

    /// Why each failed match failed. Keys are exactly the IDs in `failed`.
    pub errors: HashMap<MatchId, AllocationError>,
}

/// Runs one allocation per match, all at once.
///
/// Failures are isolated: one match failing never cancels or delays the
/// others, and [`allocate_all`](Self::allocate_all) only returns once every
/// match has been resolved.
#[derive(Clone)]
pub struct AllocationFanOut {
    allocator: Arc<dyn Allocator>,
}

impl AllocationFanOut {
    pub fn new(allocator: Arc<dyn Allocator>) -> Self {
        Self { allocator }
    }

    pub async fn allocate_all(&self, pending: Vec<PendingMatch>) -> FanOutOutcome {
        let mut outcome = FanOutOutcome::default();
        let mut matches: HashMap<MatchId, Match> = HashMap::with_capacity(pending.len());
        let mut task_matches = HashMap::with_capacity(pending.len());
        let mut tasks = JoinSet::new();

        for PendingMatch { r#match, request } in pending {
            let match_id = r#match.id;
            let allocator = Arc::clone(&self.allocator);
            let span = info_span!("allocate", match_id = %match_id, players = request.player_count);

            let handle = tasks.spawn(
                async move {
                    let result = match allocator.allocate(&request).await {
                        Ok(response) => response.into_assignment(),
                        Err(e) => Err(e),
                    };
                    (match_id, result)
                }
                .instrument(span),
            );
            task_matches.insert(handle.id(), match_id);
            matches.insert(match_id, r#match);
        }

        while let Some(joined) = tasks.join_next().await {
            let (match_id, result) = match joined {
                Ok(resolved) => resolved,
                Err(e) => {
                    let Some(match_id) = task_matches.get(&e.id()).copied() else {
                        continue;
                    };
                    (match_id, Err(AllocationError::TaskFailed(e.to_string())))
                }
            };

            let Some(mut m) = matches.remove(&match_id) else {
                continue;
            };

            match result {
                Ok(assignment) => {
                    debug!(
                        match_id = %match_id,
                        server_id = %assignment.server_id,
                        address = %assignment.server_address,
                        port = assignment.server_port,
                        "Allocated server for match"
                    );
                    m.assignment = Some(assignment);
                    outcome.allocated.push(m);
                }
                Err(e) => {
                    outcome.errors.insert(match_id, e);
                    outcome.failed.push(m);
                }
            }
        }

        outcome
    }
}
