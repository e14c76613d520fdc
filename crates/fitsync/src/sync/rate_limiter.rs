//! Per-provider request pacing with exponential backoff on HTTP 429

use std::time::{Duration, Instant};

use tracing::warn;

/// Spacing and backoff state for one provider
#[derive(Debug)]
pub struct RateLimiter {
    /// Minimum delay between requests
    min_delay: Duration,
    /// Extra delay added after rate limiting, zero when healthy
    backoff: Duration,
    max_backoff: Duration,
    last_request: Option<Instant>,
    consecutive_429s: u32,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(Duration::from_millis(2000))
    }
}

impl RateLimiter {
    pub fn new(min_delay: Duration) -> Self {
        Self {
            min_delay,
            backoff: Duration::ZERO,
            max_backoff: Duration::from_secs(300), // 5 minutes
            last_request: None,
            consecutive_429s: 0,
        }
    }

    /// Wait before making the next request
    pub async fn wait(&mut self) {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            let required_delay = self.min_delay + self.backoff;

            if elapsed < required_delay {
                tokio::time::sleep(required_delay - elapsed).await;
            }
        }
        self.last_request = Some(Instant::now());
    }

    pub fn on_success(&mut self) {
        self.backoff = Duration::ZERO;
        self.consecutive_429s = 0;
    }

    /// Handle a rate limit (HTTP 429) response
    pub fn on_rate_limit(&mut self) {
        self.consecutive_429s += 1;
        self.backoff = (self.backoff * 2)
            .max(Duration::from_secs(1))
            .min(self.max_backoff);
        warn!(
            backoff_secs = self.backoff.as_secs(),
            consecutive = self.consecutive_429s,
            "rate limited, backing off"
        );
    }

    /// Give up on a provider after repeated rate limits
    pub fn should_give_up(&self) -> bool {
        self.consecutive_429s >= 5
    }

    pub fn current_backoff(&self) -> Duration {
        self.backoff
    }
}
