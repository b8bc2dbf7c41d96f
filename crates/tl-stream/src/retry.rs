//! Fixed-interval retry policy
//!
//! The target is a fixed-address device that is expected to come back
//! quickly (for example after rebooting itself), so attempts are spaced by a
//! constant interval instead of an exponential backoff.

use std::time::Duration;

use tl_core::config::TargetConfig;
use tl_core::ConnectionState;
use tokio_util::sync::CancellationToken;

/// Whether a cycle of attempts is the first connect or follows a drop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptMode {
    /// Started by an explicit connect
    Initial,
    /// Started after an established stream ended
    Reconnect,
}

impl AttemptMode {
    /// The state published when `attempt` of `max_attempts` starts
    pub fn state(self, attempt: u32, max_attempts: u32) -> ConnectionState {
        match self {
            AttemptMode::Initial => ConnectionState::Connecting {
                attempt,
                max_attempts,
            },
            AttemptMode::Reconnect => ConnectionState::Reconnecting {
                attempt,
                max_attempts,
            },
        }
    }
}

/// Bounded attempts with a fixed wait between them
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per cycle, at least 1
    max_attempts: u32,
    /// Wait before every attempt after the first
    interval: Duration,
}

impl RetryPolicy {
    /// Create a policy; `max_attempts` is clamped to at least 1
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            interval,
        }
    }

    /// Create a policy from the target configuration
    pub fn from_config(config: &TargetConfig) -> Self {
        Self::new(config.max_retry_attempts, config.retry_interval)
    }

    /// Attempts per cycle
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Fixed wait between attempts
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether `attempt` was the last one allowed
    pub fn is_exhausted(&self, attempt: u32) -> bool {
        attempt >= self.max_attempts
    }

    /// Message for the terminal error state
    pub fn exhausted_message(&self, cause: &dyn std::fmt::Display) -> String {
        format!("Failed after {} attempts: {}", self.max_attempts, cause)
    }

    /// Sleep for the interval unless `cancel` fires first.
    ///
    /// Returns `false` if cancelled.
    pub async fn pause(&self, cancel: &CancellationToken) -> bool {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(self.interval) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attempts_clamped_to_one() {
        let policy = RetryPolicy::new(0, Duration::from_secs(1));
        assert_eq!(policy.max_attempts(), 1);
        assert!(policy.is_exhausted(1));
    }

    #[test]
    fn test_exhaustion_is_strict() {
        let policy = RetryPolicy::new(3, Duration::from_secs(2));
        assert!(!policy.is_exhausted(1));
        assert!(!policy.is_exhausted(2));
        assert!(policy.is_exhausted(3));
    }

    #[test]
    fn test_exhausted_message() {
        let policy = RetryPolicy::new(3, Duration::from_secs(2));
        assert_eq!(
            policy.exhausted_message(&"connection refused"),
            "Failed after 3 attempts: connection refused"
        );
    }

    #[test]
    fn test_mode_state() {
        assert_eq!(
            AttemptMode::Initial.state(1, 4),
            ConnectionState::Connecting {
                attempt: 1,
                max_attempts: 4
            }
        );
        assert_eq!(
            AttemptMode::Reconnect.state(2, 4),
            ConnectionState::Reconnecting {
                attempt: 2,
                max_attempts: 4
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_waits_fixed_interval() {
        let policy = RetryPolicy::new(3, Duration::from_millis(2000));
        let started = tokio::time::Instant::now();
        assert!(policy.pause(&CancellationToken::new()).await);
        assert!(started.elapsed() >= Duration::from_millis(2000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_cancelled() {
        let policy = RetryPolicy::new(3, Duration::from_secs(60));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let started = tokio::time::Instant::now();
        assert!(!policy.pause(&cancel).await);
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
