//! Runtime settings: timeouts, retry policy and spawn polling

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::serde_utils::duration_secs;

/// Tunables shared by the connection manager and orchestrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Per-command timeout on an open connection
    #[serde(with = "duration_secs")]
    pub command_timeout: Duration,

    /// Dial + handshake + authentication timeout
    #[serde(with = "duration_secs")]
    pub connect_timeout: Duration,

    /// Retries after the first failed attempt
    pub max_retries: u32,

    /// Backoff between retries
    pub backoff: BackoffConfig,

    /// Log polls before giving up on a spawn
    pub poll_attempts: u32,

    /// Delay between log polls
    #[serde(with = "duration_secs")]
    pub poll_interval: Duration,

    /// Lines read from the end of `live.log` per poll
    pub log_tail_lines: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            command_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(30),
            max_retries: 3,
            backoff: BackoffConfig::default(),
            poll_attempts: 30,
            poll_interval: Duration::from_secs(1),
            log_tail_lines: 50,
        }
    }
}

/// Exponential backoff configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    /// Initial delay
    #[serde(with = "duration_secs")]
    pub initial: Duration,

    /// Maximum delay
    #[serde(with = "duration_secs")]
    pub max: Duration,

    /// Multiplier for each retry
    pub multiplier: f64,

    /// Jitter factor (0.0 to 1.0)
    pub jitter: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(60),
            multiplier: 2.0,
            jitter: 0.0,
        }
    }
}
