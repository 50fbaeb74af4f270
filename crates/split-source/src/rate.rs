//! Fixed-window pacing of reader output.

use fake_generator::RateLimit;
use std::time::Duration;
use tokio::time::Instant;

/// Allows at most `rows_per_interval` rows in each window of `interval`.
///
/// The limiter never sleeps. It tells the caller how long to wait, so a
/// paced reader never holds anything shared while it waits.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    limit: RateLimit,
    window_start: Option<Instant>,
    emitted: u64,
}

impl RateLimiter {
    pub fn new(limit: RateLimit) -> Self {
        Self {
            limit,
            window_start: None,
            emitted: 0,
        }
    }

    /// Rows that may be emitted now, or how long to wait for the next window.
    pub fn allowance(&mut self) -> Result<u64, Duration> {
        let now = Instant::now();
        let start = match self.window_start {
            Some(start) if now.duration_since(start) < self.limit.interval => start,
            _ => {
                self.window_start = Some(now);
                self.emitted = 0;
                now
            }
        };

        if self.emitted < self.limit.rows_per_interval {
            Ok(self.limit.rows_per_interval - self.emitted)
        } else {
            Err((start + self.limit.interval).saturating_duration_since(now))
        }
    }

    /// Record rows emitted in the current window.
    pub fn consume(&mut self, rows: u64) {
        self.emitted = self.emitted.saturating_add(rows);
    }
}
