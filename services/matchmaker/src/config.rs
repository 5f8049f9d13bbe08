//! Configuration for the matchmaker.
//!
//! Everything is read once at startup; nothing is hot-reloadable.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::scheduler::FailurePolicy;

/// Matchmaker configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub matchmaking: MatchmakingConfig,

    pub allocator: AllocatorConfig,

    /// Message-bus ingress for `match.created`. Unset means log only.
    pub notifier_url: Option<String>,
}

/// Scheduler parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchmakingConfig {
    /// Fleet that game servers are allocated from.
    pub fleet_name: String,

    /// Game mode stamped on every ticket and match.
    pub game_mode_id: String,

    /// Target interval between tick starts.
    pub tick_rate: Duration,

    pub players_per_match: usize,

    pub failure_policy: FailurePolicy,
}

impl Default for MatchmakingConfig {
    fn default() -> Self {
        Self {
            fleet_name: "lobby".to_string(),
            game_mode_id: "lobby".to_string(),
            tick_rate: Duration::from_millis(1000),
            players_per_match: 50,
            failure_policy: FailurePolicy::Drop,
        }
    }
}

/// Allocator connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocatorConfig {
    /// Allocator service base URL. Unset means the in-process static allocator.
    pub url: Option<String>,

    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout: Duration::from_secs(5),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let listen_addr = var("MATCHMAKER_LISTEN_ADDR")
            .unwrap_or_else(|| "127.0.0.1:8080".to_string())
            .parse()
            .context("MATCHMAKER_LISTEN_ADDR is not a socket address")?;

        let log_level = var("MATCHMAKER_LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        let defaults = MatchmakingConfig::default();
        let matchmaking = MatchmakingConfig {
            fleet_name: var("MATCHMAKER_FLEET_NAME").unwrap_or(defaults.fleet_name),
            game_mode_id: var("MATCHMAKER_GAME_MODE_ID").unwrap_or(defaults.game_mode_id),
            tick_rate: match var("MATCHMAKER_TICK_RATE_MS") {
                Some(v) => Duration::from_millis(
                    v.trim()
                        .parse()
                        .context("MATCHMAKER_TICK_RATE_MS is not a number")?,
                ),
                None => defaults.tick_rate,
            },
            players_per_match: match var("MATCHMAKER_PLAYERS_PER_MATCH") {
                Some(v) => v
                    .trim()
                    .parse()
                    .context("MATCHMAKER_PLAYERS_PER_MATCH is not a number")?,
                None => defaults.players_per_match,
            },
            failure_policy: match var("MATCHMAKER_FAILURE_POLICY") {
                Some(v) => v.parse().map_err(anyhow::Error::msg)?,
                None => defaults.failure_policy,
            },
        };
        matchmaking.validate()?;

        let allocator = AllocatorConfig {
            url: var("MATCHMAKER_ALLOCATOR_URL"),
            timeout: match var("MATCHMAKER_ALLOCATOR_TIMEOUT_MS") {
                Some(v) => Duration::from_millis(
                    v.trim()
                        .parse()
                        .context("MATCHMAKER_ALLOCATOR_TIMEOUT_MS is not a number")?,
                ),
                None => AllocatorConfig::default().timeout,
            },
        };

        let notifier_url = var("MATCHMAKER_NOTIFIER_URL");

        Ok(Self {
            listen_addr,
            log_level,
            matchmaking,
            allocator,
            notifier_url,
        })
    }
}

impl MatchmakingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.fleet_name.trim().is_empty() {
            bail!("fleet name must not be empty");
        }
        if self.game_mode_id.trim().is_empty() {
            bail!("game mode id must not be empty");
        }
        if self.players_per_match == 0 {
            bail!("players per match must be greater than zero");
        }
        if self.tick_rate.is_zero() {
            bail!("tick rate must be greater than zero");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.listen_addr, "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.log_level, "info");
        assert_eq!(config.matchmaking, MatchmakingConfig::default());
        assert_eq!(config.allocator, AllocatorConfig::default());
        assert!(config.notifier_url.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("MATCHMAKER_FLEET_NAME", "proxy-fleet"),
            ("MATCHMAKER_GAME_MODE_ID", "proxy"),
            ("MATCHMAKER_TICK_RATE_MS", "250"),
            ("MATCHMAKER_PLAYERS_PER_MATCH", "8"),
            ("MATCHMAKER_FAILURE_POLICY", "requeue"),
            ("MATCHMAKER_ALLOCATOR_URL", "http://allocator:8443"),
            ("MATCHMAKER_ALLOCATOR_TIMEOUT_MS", "1500"),
            ("MATCHMAKER_NOTIFIER_URL", "http://bus/topics/mm"),
        ])
        .unwrap();

        assert_eq!(config.matchmaking.fleet_name, "proxy-fleet");
        assert_eq!(config.matchmaking.game_mode_id, "proxy");
        assert_eq!(config.matchmaking.tick_rate, Duration::from_millis(250));
        assert_eq!(config.matchmaking.players_per_match, 8);
        assert_eq!(config.matchmaking.failure_policy, FailurePolicy::Requeue);
        assert_eq!(config.allocator.url.as_deref(), Some("http://allocator:8443"));
        assert_eq!(config.allocator.timeout, Duration::from_millis(1500));
        assert_eq!(config.notifier_url.as_deref(), Some("http://bus/topics/mm"));
    }

    #[test]
    fn test_blank_values_fall_back_to_defaults() {
        let config = load(&[("MATCHMAKER_ALLOCATOR_URL", "  "), ("MATCHMAKER_FLEET_NAME", "")])
            .unwrap();
        assert!(config.allocator.url.is_none());
        assert_eq!(config.matchmaking.fleet_name, "lobby");
    }

    #[rstest]
    #[case("MATCHMAKER_PLAYERS_PER_MATCH", "0")]
    #[case("MATCHMAKER_PLAYERS_PER_MATCH", "lots")]
    #[case("MATCHMAKER_TICK_RATE_MS", "0")]
    #[case("MATCHMAKER_TICK_RATE_MS", "-5")]
    #[case("MATCHMAKER_FAILURE_POLICY", "retry")]
    #[case("MATCHMAKER_LISTEN_ADDR", "not-an-addr")]
    #[case("MATCHMAKER_ALLOCATOR_TIMEOUT_MS", "soon")]
    fn test_invalid_values_rejected(#[case] key: &str, #[case] value: &str) {
        assert!(load(&[(key, value)]).is_err());
    }
}
