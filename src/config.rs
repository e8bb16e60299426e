use crate::domain::country::Bounds;
use rust_decimal_macros::dec;
use std::time::Duration;

/// Exponential backoff settings for a retried backend call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    pub const fn new(max_retries: u32, initial_backoff: Duration, max_backoff: Duration) -> Self {
        Self {
            max_retries,
            initial_backoff,
            max_backoff,
        }
    }

    /// Delay before retry number `attempt` (0-based), capped at `max_backoff`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Platform-wide amount bounds, applied before any country bound.
    pub global_bounds: Bounds,
    pub poll_interval: Duration,
    pub rate_retry: RetryPolicy,
    pub rate_prefetch_retry: RetryPolicy,
    pub institution_prefetch_retry: RetryPolicy,
    pub support_email: String,
    pub default_asset: String,
    pub supported_countries: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            global_bounds: Bounds::new(dec!(1), dec!(100000)),
            poll_interval: Duration::from_secs(5),
            rate_retry: RetryPolicy::new(3, Duration::from_secs(1), Duration::from_secs(30)),
            rate_prefetch_retry: RetryPolicy::new(
                2,
                Duration::from_secs(2),
                Duration::from_secs(10),
            ),
            institution_prefetch_retry: RetryPolicy::new(
                3,
                Duration::from_secs(2),
                Duration::from_secs(10),
            ),
            support_email: "support@oneramp.io".to_string(),
            default_asset: "USDC".to_string(),
            supported_countries: ["NG", "KE", "GHA", "ZM", "UG", "TZ", "ZA"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}
