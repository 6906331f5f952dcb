//! Client Settings
//!
//! Environment-driven configuration. Unparseable values fall back to their
//! defaults; values that parse but are out of range are rejected.

use std::str::FromStr;
use std::time::Duration;

use crate::domain::retention::{Aggregator, DEFAULT_CAPACITY, MAX_CAPACITY, RetentionPolicy};
use crate::infrastructure::feed::messages::ConfigFrame;
use crate::infrastructure::feed::reconnect::{DEFAULT_RECONNECT_DELAY, ReconnectConfig};
use crate::infrastructure::feed::supervisor::{DEFAULT_CLIENT_ID_PREFIX, SupervisorConfig};

/// Default feed endpoint.
pub const DEFAULT_BASE_URL: &str = "wss://mockly.me/ws/stream";

/// Feed connection settings.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedSettings {
    /// Endpoint; the client identifier is appended as the last path segment.
    pub base_url: String,
    /// Prefix for generated client identifiers.
    pub client_id_prefix: String,
    /// Requested update frequency (> 0).
    pub frequency: f64,
    /// Requested price volatility (>= 0).
    pub volatility: f64,
    /// Fixed delay before reconnecting after an abnormal close.
    pub reconnect_delay: Duration,
}

impl Default for FeedSettings {
    fn default() -> Self {
        let frame = ConfigFrame::default();
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            client_id_prefix: DEFAULT_CLIENT_ID_PREFIX.to_string(),
            frequency: frame.frequency,
            volatility: frame.volatility,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
        }
    }
}

/// Retention settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionSettings {
    /// Maximum retained records after a price update (> 0).
    pub capacity: usize,
    /// Whether metadata inserts obey the capacity rule.
    pub policy: RetentionPolicy,
}

impl Default for RetentionSettings {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            policy: RetentionPolicy::default(),
        }
    }
}

/// Local server settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerSettings {
    /// Health check HTTP port (0 = disabled).
    pub health_port: u16,
    /// Interval between snapshot log lines (zero = disabled).
    pub snapshot_log_interval: Duration,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            health_port: 8083,
            snapshot_log_interval: Duration::from_secs(30),
        }
    }
}

/// Complete client configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedConfig {
    /// Feed connection settings.
    pub feed: FeedSettings,
    /// Retention settings.
    pub retention: RetentionSettings,
    /// Local server settings.
    pub server: ServerSettings,
}

impl FeedConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a value is out of range.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns an error if a value is out of range.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let feed = FeedSettings {
            base_url: lookup("FEED_BASE_URL")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.feed.base_url),
            client_id_prefix: lookup("FEED_CLIENT_ID_PREFIX")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.feed.client_id_prefix),
            frequency: parse_var(&lookup, "FEED_FREQUENCY", defaults.feed.frequency),
            volatility: parse_var(&lookup, "FEED_VOLATILITY", defaults.feed.volatility),
            reconnect_delay: Duration::from_millis(parse_var(
                &lookup,
                "FEED_RECONNECT_DELAY_MS",
                duration_millis(defaults.feed.reconnect_delay),
            )),
        };

        let retention = RetentionSettings {
            capacity: parse_var(&lookup, "FEED_RETENTION_CAPACITY", defaults.retention.capacity),
            policy: lookup("FEED_RETENTION_POLICY")
                .map(|s| RetentionPolicy::from_str_case_insensitive(&s))
                .unwrap_or_default(),
        };

        let server = ServerSettings {
            health_port: parse_var(&lookup, "FEED_HEALTH_PORT", defaults.server.health_port),
            snapshot_log_interval: Duration::from_secs(parse_var(
                &lookup,
                "FEED_SNAPSHOT_LOG_INTERVAL_SECS",
                defaults.server.snapshot_log_interval.as_secs(),
            )),
        };

        let config = Self {
            feed,
            retention,
            server,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns the first out-of-range value found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.feed.frequency.is_finite() && self.feed.frequency > 0.0) {
            return Err(ConfigError::InvalidValue {
                key: "FEED_FREQUENCY",
                reason: format!("must be greater than 0, got {}", self.feed.frequency),
            });
        }
        if !(self.feed.volatility.is_finite() && self.feed.volatility >= 0.0) {
            return Err(ConfigError::InvalidValue {
                key: "FEED_VOLATILITY",
                reason: format!("must be 0 or greater, got {}", self.feed.volatility),
            });
        }
        if !(1..=MAX_CAPACITY).contains(&self.retention.capacity) {
            return Err(ConfigError::InvalidValue {
                key: "FEED_RETENTION_CAPACITY",
                reason: format!(
                    "must be between 1 and {MAX_CAPACITY}, got {}",
                    self.retention.capacity
                ),
            });
        }
        Ok(())
    }

    /// Frame sent after each session opens.
    #[must_use]
    pub const fn config_frame(&self) -> ConfigFrame {
        ConfigFrame {
            frequency: self.feed.frequency,
            volatility: self.feed.volatility,
        }
    }

    /// Supervisor configuration derived from these settings.
    #[must_use]
    pub fn supervisor_config(&self) -> SupervisorConfig {
        SupervisorConfig {
            base_url: self.feed.base_url.clone(),
            client_id_prefix: self.feed.client_id_prefix.clone(),
            config_frame: self.config_frame(),
            reconnect: ReconnectConfig::new(self.feed.reconnect_delay),
        }
    }

    /// Empty aggregator with the configured capacity and policy.
    #[must_use]
    pub fn build_aggregator(&self) -> Aggregator {
        Aggregator::with_policy(self.retention.capacity, self.retention.policy)
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A value parsed but is out of range.
    #[error("invalid value for {key}: {reason}")]
    InvalidValue {
        /// Environment variable name.
        key: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
