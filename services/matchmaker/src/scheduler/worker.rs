//! Matchmaking scheduler worker.
//!
//! Runs `drain → assemble → allocate → notify` at a fixed target rate. The
//! rate is a floor on the gap between tick starts: a tick that finishes
//! early is followed by a sleep for the remainder, a tick that overruns is
//! followed immediately by the next one. Ticks never overlap.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use matchforge_events::Match;
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};

use super::assembler::MatchAssembler;
use crate::allocation::{AllocationFanOut, Allocator};
use crate::config::MatchmakingConfig;
use crate::notifier::Notifier;
use crate::queue::{Intent, TicketQueue};

/// What happens to players whose match could not be allocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Discard the match and its tickets. Players must queue again.
    #[default]
    Drop,
    /// Put the players back in the queue for the next tick.
    Requeue,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "drop" => Ok(FailurePolicy::Drop),
            "requeue" => Ok(FailurePolicy::Requeue),
            other => Err(format!(
                "unknown failure policy '{other}', expected 'drop' or 'requeue'"
            )),
        }
    }
}

impl std::fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailurePolicy::Drop => write!(f, "drop"),
            FailurePolicy::Requeue => write!(f, "requeue"),
        }
    }
}

/// Statistics from one tick.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct TickStats {
    pub players_drained: usize,
    pub matches_created: usize,
    pub matches_allocated: usize,
    pub matches_failed: usize,
    pub notifications_failed: usize,
    pub players_requeued: usize,
    pub duration_ms: u64,
    pub completed_at: DateTime<Utc>,
}

/// The matchmaking scheduler.
pub struct MatchScheduler {
    queue: TicketQueue,
    assembler: MatchAssembler,
    fan_out: AllocationFanOut,
    notifier: Arc<dyn Notifier>,
    tick_rate: Duration,
    failure_policy: FailurePolicy,
    stats_tx: watch::Sender<Option<TickStats>>,
}

impl MatchScheduler {
    /// Create a new scheduler with an empty queue.
    pub fn new(
        config: &MatchmakingConfig,
        allocator: Arc<dyn Allocator>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let (stats_tx, _) = watch::channel(None);
        Self {
            queue: TicketQueue::new(),
            assembler: MatchAssembler::new(
                config.fleet_name.as_str(),
                config.game_mode_id.as_str(),
                config.players_per_match,
            ),
            fan_out: AllocationFanOut::new(allocator),
            notifier,
            tick_rate: config.tick_rate,
            failure_policy: config.failure_policy,
            stats_tx,
        }
    }

    /// Handle for submitting players. All clones feed this scheduler.
    pub fn queue(&self) -> TicketQueue {
        self.queue.clone()
    }

    /// Stats of the most recent tick, `None` until one completes.
    pub fn subscribe_stats(&self) -> watch::Receiver<Option<TickStats>> {
        self.stats_tx.subscribe()
    }

    pub fn game_mode_id(&self) -> &str {
        self.assembler.game_mode_id()
    }

    /// Run the scheduler until shutdown is signaled.
    ///
    /// Shutdown is honored between ticks. A tick already in progress runs to
    /// completion, including its pending allocations.
    #[instrument(skip(self, shutdown), fields(game_mode_id = %self.assembler.game_mode_id()))]
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            fleet = %self.assembler.fleet_name(),
            tick_rate_ms = self.tick_rate.as_millis() as u64,
            players_per_match = self.assembler.players_per_match(),
            failure_policy = %self.failure_policy,
            "Starting matchmaking scheduler"
        );

        loop {
            // A dropped sender counts as shutdown.
            if *shutdown.borrow() || shutdown.has_changed().is_err() {
                break;
            }

            let started = Instant::now();
            self.tick().await;
            let elapsed = started.elapsed();

            match idle_time(elapsed, self.tick_rate) {
                Some(idle) => {
                    if wait_or_shutdown(&mut shutdown, idle).await {
                        break;
                    }
                }
                None => {
                    debug!(
                        elapsed_ms = elapsed.as_millis() as u64,
                        tick_rate_ms = self.tick_rate.as_millis() as u64,
                        "Tick overran matchmaking rate, starting next tick immediately"
                    );
                    tokio::task::yield_now().await;
                }
            }
        }

        info!("Matchmaking scheduler shutting down");
    }

    /// Run a single tick: drain the queue, build matches, allocate servers
    /// and announce the ones that got one.
    #[instrument(skip(self))]
    pub async fn tick(&self) -> TickStats {
        let started = Instant::now();
        let intents = self.queue.drain_all();
        let mut stats = TickStats {
            players_drained: intents.len(),
            ..TickStats::default()
        };

        if !intents.is_empty() {
            self.process(&intents, &mut stats).await;
        }

        stats.duration_ms = started.elapsed().as_millis() as u64;
        stats.completed_at = Utc::now();
        if stats.matches_created > 0 {
            info!(
                players_drained = stats.players_drained,
                matches_created = stats.matches_created,
                matches_allocated = stats.matches_allocated,
                matches_failed = stats.matches_failed,
                notifications_failed = stats.notifications_failed,
                players_requeued = stats.players_requeued,
                duration_ms = stats.duration_ms,
                "Matchmaking tick complete"
            );
        }

        self.stats_tx.send_replace(Some(stats.clone()));
        stats
    }

    async fn process(&self, intents: &[Intent], stats: &mut TickStats) {
        let pending = self.assembler.assemble(intents);
        stats.matches_created = pending.len();

        let outcome = self.fan_out.allocate_all(pending).await;
        stats.matches_allocated = outcome.allocated.len();
        stats.matches_failed = outcome.failed.len();

        for m in &outcome.failed {
            let reason = outcome
                .errors
                .get(&m.id)
                .map(ToString::to_string)
                .unwrap_or_default();
            error!(
                match_id = %m.id,
                players = ?m.player_ids().collect::<Vec<_>>(),
                error = %reason,
                "Failed to allocate server for match"
            );
        }

        if self.failure_policy == FailurePolicy::Requeue && !outcome.failed.is_empty() {
            stats.players_requeued = self.queue.requeue(intents_of(&outcome.failed));
            if stats.players_requeued > 0 {
                warn!(
                    players_requeued = stats.players_requeued,
                    "Requeued players from failed matches"
                );
            }
        }

        for m in &outcome.allocated {
            if let Err(e) = self.notifier.match_created(m).await {
                error!(match_id = %m.id, error = %e, "Failed to send match created message");
                stats.notifications_failed += 1;
            }
        }
    }
}

/// How long to wait before the next tick, or `None` to start it right away.
pub fn idle_time(elapsed: Duration, tick_rate: Duration) -> Option<Duration> {
    if elapsed < tick_rate {
        Some(tick_rate - elapsed)
    } else {
        None
    }
}

/// Sleeps for `duration` unless shutdown arrives first. Returns true on
/// shutdown, including when the shutdown sender has been dropped.
async fn wait_or_shutdown(shutdown: &mut watch::Receiver<bool>, duration: Duration) -> bool {
    let sleep = tokio::time::sleep(duration);
    tokio::pin!(sleep);

    loop {
        tokio::select! {
            _ = &mut sleep => return false,
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    return true;
                }
            }
        }
    }
}

fn intents_of(matches: &[Match]) -> Vec<Intent> {
    matches
        .iter()
        .flat_map(|m| &m.tickets)
        .flat_map(|t| {
            t.player_ids.iter().map(move |&player_id| Intent {
                player_id,
                auto_teleport: t.auto_teleport,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(200, 1000, Some(800))]
    #[case(1400, 1000, None)]
    #[case(1000, 1000, None)]
    #[case(0, 1000, Some(1000))]
    fn test_idle_time(
        #[case] elapsed_ms: u64,
        #[case] rate_ms: u64,
        #[case] expected_ms: Option<u64>,
    ) {
        let idle = idle_time(
            Duration::from_millis(elapsed_ms),
            Duration::from_millis(rate_ms),
        );
        assert_eq!(idle, expected_ms.map(Duration::from_millis));
    }

    #[rstest]
    #[case("drop", FailurePolicy::Drop)]
    #[case("REQUEUE", FailurePolicy::Requeue)]
    #[case(" requeue ", FailurePolicy::Requeue)]
    fn test_failure_policy_parse(#[case] input: &str, #[case] expected: FailurePolicy) {
        assert_eq!(input.parse::<FailurePolicy>().unwrap(), expected);
    }

    #[test]
    fn test_failure_policy_rejects_unknown() {
        assert!("retry".parse::<FailurePolicy>().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_returns_on_shutdown() {
        let (tx, mut rx) = watch::channel(false);
        let waiter =
            tokio::spawn(async move { wait_or_shutdown(&mut rx, Duration::from_secs(60)).await });
        tokio::time::sleep(Duration::from_secs(1)).await;
        tx.send(true).unwrap();
        assert!(waiter.await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_completes_without_shutdown() {
        let (_tx, mut rx) = watch::channel(false);
        assert!(!wait_or_shutdown(&mut rx, Duration::from_millis(500)).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_treats_dropped_sender_as_shutdown() {
        let (tx, mut rx) = watch::channel(false);
        drop(tx);
        assert!(wait_or_shutdown(&mut rx, Duration::from_secs(60)).await);
    }
}
