//! Event stream reconnection policy.

use std::time::Duration;

/// Default wait between failed event stream connection attempts.
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_secs(5);

/// When the pull transport retries a failed connection.
///
/// Attempts are unbounded. A failed connect waits [`Self::interval`]
/// before the next attempt; a rejected handshake retries immediately
/// against the next member instead, and a dropped stream reconnects
/// without waiting.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Fixed wait after a failed connect.
    pub interval: Duration,
}

impl ReconnectPolicy {
    /// Fixed-interval policy.
    pub const fn fixed(interval: Duration) -> Self {
        Self { interval }
    }

    /// Policy with the interval configured in milliseconds (minimum 1ms).
    pub fn from_millis(interval_ms: u64) -> Self {
        Self::fixed(Duration::from_millis(interval_ms.max(1)))
    }

    /// Wait before connect attempt `attempt + 1`, given `attempt` consecutive failures.
    pub fn delay(&self, _attempt: u32) -> Duration {
        self.interval
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::fixed(DEFAULT_RECONNECT_INTERVAL)
    }
}
