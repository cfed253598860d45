use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

use crate::domain::models::RateLimitConfig;

/// Token bucket rate limiter for API request throttling
///
/// Implements the token bucket algorithm to keep backend requests
/// within the configured rate. The bucket starts full: up to
/// `burst_size` requests pass immediately, then requests are paced at
/// `requests_per_second`.
#[derive(Clone)]
pub struct TokenBucketRateLimiter {
    /// Current number of available tokens
    tokens: Arc<Mutex<f64>>,
    /// Maximum token capacity (burst tolerance)
    capacity: f64,
    /// Tokens added per second
    refill_rate: f64,
    /// Last time tokens were refilled
    last_refill: Arc<Mutex<Instant>>,
}

impl TokenBucketRateLimiter {
    /// Create a new rate limiter
    ///
    /// # Arguments
    /// * `requests_per_second` - Sustained request rate (refill rate)
    /// * `burst_size` - Bucket capacity; requests that fit the burst pass
    ///   without waiting
    pub fn new(requests_per_second: f64, burst_size: u32) -> Self {
        assert!(requests_per_second > 0.0, "rate limit must be positive");
        assert!(burst_size > 0, "burst size must be at least 1");

        let capacity = f64::from(burst_size);
        Self {
            tokens: Arc::new(Mutex::new(capacity)),
            capacity,
            refill_rate: requests_per_second,
            last_refill: Arc::new(Mutex::new(Instant::now())),
        }
    }

    /// Build a limiter from configuration
    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.requests_per_second, config.burst_size)
    }

    /// Acquire a token from the bucket, waiting if necessary
    ///
    /// Blocks until a token is available. Tokens are refilled based on
    /// the elapsed time since the last refill.
    pub async fn acquire(&self) {
        loop {
            let mut tokens = self.tokens.lock().await;
            let mut last_refill = self.last_refill.lock().await;

            // Refill tokens based on elapsed time
            let now = Instant::now();
            let elapsed = now.duration_since(*last_refill).as_secs_f64();
            let new_tokens = (*tokens + elapsed * self.refill_rate).min(self.capacity);

            if new_tokens >= 1.0 {
                *tokens = new_tokens - 1.0;
                *last_refill = now;
                break;
            }

            // No tokens available; wait roughly until the next one lands
            let tokens_needed = 1.0 - new_tokens;
            let wait_time_secs = tokens_needed / self.refill_rate;
            let wait_duration = Duration::from_secs_f64(wait_time_secs.max(0.01));

            // Release locks before sleeping
            drop(tokens);
            drop(last_refill);

            sleep(wait_duration).await;
        }
    }

    /// Get the current number of available tokens (for testing/monitoring)
    #[cfg(test)]
    pub async fn available_tokens(&self) -> f64 {
        let tokens = self.tokens.lock().await;
        let last_refill = self.last_refill.lock().await;

        let now = Instant::now();
        let elapsed = now.duration_since(*last_refill).as_secs_f64();
        (*tokens + elapsed * self.refill_rate).min(self.capacity)
    }
}
