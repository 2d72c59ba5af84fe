use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;

use tetris_battle_types::ATTACK_TABLE;

use crate::scheduler::MIN_TIMER_PERIOD;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Players required before the creator may start a round
    pub min_players: usize,
    /// How often targets are re-rolled during a round
    pub retarget_period: Duration,
    /// Longest wait in Starting for every client to report its page loaded
    pub start_grace: Duration,
    /// Capacity of the inbound queue feeding the coordinator
    pub max_pending: usize,
    /// Garbage rows sent, indexed by lines cleared in one lock
    pub attack_table: [u32; 5],
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 10000,
            min_players: 2,
            retarget_period: Duration::from_secs(15),
            start_grace: Duration::from_secs(10),
            max_pending: 1024,
            attack_table: ATTACK_TABLE,
        }
    }
}

impl ServerConfig {
    /// Create from `TETRIS_BATTLE_*` environment variables, falling back to defaults
    pub fn from_env() -> Self {
        use std::env;

        fn parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
            env::var(key).ok().and_then(|s| s.trim().parse().ok())
        }

        let defaults = Self::default();
        let host = env::var("TETRIS_BATTLE_HOST")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.host);

        Self {
            host,
            port: parsed("TETRIS_BATTLE_PORT").unwrap_or(defaults.port),
            min_players: parsed::<usize>("TETRIS_BATTLE_MIN_PLAYERS")
                .unwrap_or(defaults.min_players)
                .max(1),
            retarget_period: parsed("TETRIS_BATTLE_RETARGET_MS")
                .map(Self::retarget_from_millis)
                .unwrap_or(defaults.retarget_period),
            start_grace: parsed("TETRIS_BATTLE_START_GRACE_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.start_grace),
            max_pending: parsed::<usize>("TETRIS_BATTLE_MAX_PENDING")
                .unwrap_or(defaults.max_pending)
                .max(1),
            attack_table: defaults.attack_table,
        }
    }

    /// Retarget period for `ms`, never shorter than [`MIN_TIMER_PERIOD`]
    pub fn retarget_from_millis(ms: u64) -> Duration {
        Duration::from_millis(ms).max(MIN_TIMER_PERIOD)
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = ServerConfig::default();
        assert_eq!(config.min_players, 2);
        assert_eq!(config.retarget_period, Duration::from_secs(15));
        assert_eq!(config.attack_table, [0, 0, 1, 2, 4]);
    }

    #[test]
    fn socket_addr_rejects_garbage_host() {
        let config = ServerConfig {
            host: "not a host".into(),
            ..ServerConfig::default()
        };
        assert!(config.socket_addr().is_err());

        let config = ServerConfig {
            port: 0,
            ..ServerConfig::default()
        };
        assert_eq!(config.socket_addr().map(|a| a.port()).ok(), Some(0));
    }

    #[test]
    fn zero_retarget_period_is_clamped() {
        assert_eq!(ServerConfig::retarget_from_millis(0), Duration::from_millis(1));
        assert_eq!(ServerConfig::retarget_from_millis(250), Duration::from_millis(250));
    }
}
