// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Reconnect backoff.
//
// The delay before the next connection attempt doubles with every attempt
// that failed to reach `connected` and is capped at 60 units.  No jitter:
// the curve is a pure function of the retry count.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Upper bound on the delay, in units.
pub const MAX_BACKOFF_UNITS: u64 = 60;

/// Delay in units for a given retry count: `min(2^retry_count, 60)`.
pub fn backoff_units(retry_count: u32) -> u64 {
    1u64.checked_shl(retry_count)
        .unwrap_or(u64::MAX)
        .min(MAX_BACKOFF_UNITS)
}

/// Backoff configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Length of one unit.
    pub unit: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            unit: Duration::from_secs(1),
        }
    }
}

impl BackoffPolicy {
    pub fn new(unit: Duration) -> Self {
        Self { unit }
    }

    /// Wall-clock delay for a given retry count.
    pub fn delay(&self, retry_count: u32) -> Duration {
        // backoff_units is at most 60, so this fits in a u32.
        self.unit.saturating_mul(backoff_units(retry_count) as u32)
    }
}

/// Sleep for `delay` unless `cancel` fires first.
///
/// Returns `true` if the full delay elapsed, `false` if cancelled.
pub async fn wait(delay: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => {
            debug!("backoff wait cancelled");
            false
        }
        _ = tokio::time::sleep(delay) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_doubles_then_caps() {
        assert_eq!(backoff_units(0), 1);
        assert_eq!(backoff_units(1), 2);
        assert_eq!(backoff_units(2), 4);
        assert_eq!(backoff_units(5), 32);
        assert_eq!(backoff_units(6), 60);
        assert_eq!(backoff_units(10), 60);
        assert_eq!(backoff_units(200), 60);
    }

    #[test]
    fn delay_scales_with_unit() {
        let policy = BackoffPolicy::new(Duration::from_millis(10));
        assert_eq!(policy.delay(0), Duration::from_millis(10));
        assert_eq!(policy.delay(3), Duration::from_millis(80));
        assert_eq!(BackoffPolicy::default().delay(10), Duration::from_secs(60));
    }

    #[tokio::test]
    async fn cancelled_wait_returns_immediately() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let started = std::time::Instant::now();
        assert!(!wait(Duration::from_secs(60), &cancel).await);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn uncancelled_wait_elapses() {
        let cancel = CancellationToken::new();
        assert!(wait(Duration::from_millis(1), &cancel).await);
    }
}
