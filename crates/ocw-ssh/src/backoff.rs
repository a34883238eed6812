//! Exponential backoff between connection attempts

use std::time::Duration;

use ocw_core::config::BackoffConfig;

/// Exponential backoff with optional jitter
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    /// Delay handed out by the next call
    current: Duration,
    /// Upper bound on any single delay
    max: Duration,
    /// Growth factor per attempt
    multiplier: f64,
    /// Extra random delay, as a fraction of the base delay (0.0 to 1.0)
    jitter: f64,
    /// Delays handed out so far
    attempts: u32,
}

impl ExponentialBackoff {
    /// Create a new backoff from configuration
    pub fn from_config(config: &BackoffConfig) -> Self {
        Self::new(config.initial, config.max, config.multiplier, config.jitter)
    }

    /// Create a new backoff with custom parameters.
    ///
    /// A multiplier below 1.0 or not finite is treated as 1.0, and a jitter
    /// that is not finite as 0.0.
    pub fn new(initial: Duration, max: Duration, multiplier: f64, jitter: f64) -> Self {
        let multiplier = if multiplier.is_finite() && multiplier >= 1.0 {
            multiplier
        } else {
            tracing::warn!("Invalid backoff multiplier {}, using 1.0", multiplier);
            1.0
        };
        let jitter = if jitter.is_finite() {
            jitter.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            current: std::cmp::min(initial, max),
            max,
            multiplier,
            jitter,
            attempts: 0,
        }
    }

    /// Get the next delay and advance the backoff
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.attempts += 1;

        let next = Duration::try_from_secs_f64(self.current.as_secs_f64() * self.multiplier)
            .unwrap_or(self.max);
        self.current = std::cmp::min(next, self.max);

        if self.jitter == 0.0 {
            return delay;
        }
        let jitter_amount = delay.as_secs_f64() * self.jitter * rand::random::<f64>();
        delay + Duration::from_secs_f64(jitter_amount)
    }

    /// Number of delays handed out so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}
