//! Shared rate limiting for the external classifier
//!
//! One gate per process: every classifier call, from every concurrent
//! resolution, acquires the gate before issuing its request. The gate sleeps
//! out the remainder of the minimum interval while holding its lock, so
//! concurrency cannot compress the effective query rate. No other lock is
//! held across network I/O anywhere in the pipeline.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Minimum-interval gate in front of the classifier API.
///
/// Owned by the resolver and handed to the adapter; never ambient global
/// state. Share across tasks with an `Arc`.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Option<Duration>,
    last_call: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Gate enforcing at most `max_qps` calls per second. A non-positive
    /// rate disables the gate.
    pub fn new(max_qps: f64) -> Self {
        let min_interval = if max_qps > 0.0 {
            Some(Duration::from_secs_f64(1.0 / max_qps))
        } else {
            None
        };
        Self {
            min_interval,
            last_call: Mutex::new(None),
        }
    }

    /// Wait until the minimum interval since the previous call has elapsed,
    /// then claim the current slot.
    pub async fn acquire(&self) {
        let Some(min_interval) = self.min_interval else {
            return;
        };

        let mut last = self.last_call.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < min_interval {
                tokio::time::sleep(min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// Exponential backoff schedule: `base * 2^(attempt-1)` for attempt 1, 2, ...
///
/// An iterator rather than a sleep loop so callers await the delay without
/// blocking unrelated work.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    attempt: u32,
}

impl Backoff {
    pub fn new(base: Duration) -> Self {
        Self { base, attempt: 0 }
    }
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        let delay = self
            .base
            .checked_mul(1u32 << self.attempt.min(31))
            .unwrap_or(Duration::MAX);
        self.attempt = self.attempt.saturating_add(1);
        Some(delay)
    }
}
