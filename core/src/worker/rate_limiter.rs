//! Per-engine query rate limiting

use governor::{clock::DefaultClock, state::InMemoryState, state::NotKeyed, Quota, RateLimiter};
use std::num::NonZeroU32;
use tokio_util::sync::CancellationToken;

/// Token bucket limiting how many queries per second reach one engine
///
/// A single instance is shared (via `Arc`) by every worker of an engine's
/// pool, so the limit applies to the engine as a whole.
pub struct EngineRateLimiter {
    limiter: Option<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    queries_per_second: Option<f64>,
}

impl EngineRateLimiter {
    /// Create a limiter; `None` or a non-positive rate disables it
    ///
    /// Fractional rates round up to the next whole query per second.
    pub fn new(queries_per_second: Option<f64>) -> Self {
        let limiter = queries_per_second.and_then(|qps| {
            if qps <= 0.0 {
                return None;
            }
            let per_second = (qps.ceil() as u32).max(1);
            let quota = Quota::per_second(NonZeroU32::new(per_second)?);
            Some(RateLimiter::direct(quota))
        });

        Self {
            limiter,
            queries_per_second,
        }
    }

    /// A limiter that never waits
    pub fn unlimited() -> Self {
        Self::new(None)
    }

    /// Wait for a permit, giving up if `cancel` fires first
    ///
    /// Returns `false` when cancelled before a permit was granted.
    pub async fn acquire(&self, cancel: &CancellationToken) -> bool {
        let Some(limiter) = &self.limiter else {
            return !cancel.is_cancelled();
        };
        tokio::select! {
            biased;
            _ = cancel.cancelled() => false,
            _ = limiter.until_ready() => true,
        }
    }

    /// Check if rate limiting is enabled
    pub fn is_enabled(&self) -> bool {
        self.limiter.is_some()
    }

    /// Configured queries per second
    pub fn queries_per_second(&self) -> Option<f64> {
        self.queries_per_second
    }
}

impl Default for EngineRateLimiter {
    fn default() -> Self {
        Self::unlimited()
    }
}

impl std::fmt::Debug for EngineRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineRateLimiter")
            .field("queries_per_second", &self.queries_per_second)
            .field("enabled", &self.is_enabled())
            .finish()
    }
}
