use std::fmt::Debug;
use std::time::Duration;

use rand::Rng;

/// Source of the random factor applied to backoff delays
pub trait Jitter: Send + Sync + Debug {
    /// A factor sampled from `[1 - spread, 1 + spread]`
    fn factor(&self, spread: f64) -> f64;
}

/// Samples jitter uniformly from the thread-local RNG
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomJitter;

impl Jitter for RandomJitter {
    fn factor(&self, spread: f64) -> f64 {
        if !spread.is_finite() {
            return 1.0;
        }
        let spread = spread.clamp(0.0, 1.0);
        rand::thread_rng().gen_range((1.0 - spread)..=(1.0 + spread))
    }
}

/// Always returns the same factor, ignoring the spread
#[derive(Debug, Clone, Copy)]
pub struct FixedJitter(pub f64);

impl Jitter for FixedJitter {
    fn factor(&self, _spread: f64) -> f64 {
        self.0
    }
}

/// Exponential backoff schedule for rate-limited requests.
///
/// The delay before retry `n` (counting from zero) is
/// `min(base_delay * 2^n, max_delay) * jitter`, clamped to `max_delay`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    base_delay: Duration,
    max_delay: Duration,
    spread: f64,
}

impl Backoff {
    /// Create a new backoff schedule
    #[must_use]
    pub const fn new(base_delay: Duration, max_delay: Duration, spread: f64) -> Self {
        Self {
            base_delay,
            max_delay,
            spread,
        }
    }

    /// Delay before the retry following `retry_count` earlier retries,
    /// without jitter
    #[must_use]
    pub fn exponential(&self, retry_count: u32) -> Duration {
        2u32.checked_pow(retry_count)
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    /// Delay before the retry following `retry_count` earlier retries.
    ///
    /// A non-finite jitter factor counts as `1.0`, and a delay too large to
    /// represent is capped at `max_delay`.
    #[must_use]
    pub fn delay(&self, retry_count: u32, jitter: &dyn Jitter) -> Duration {
        let factor = jitter.factor(self.spread);
        let factor = if factor.is_finite() { factor.max(0.0) } else { 1.0 };
        let delay = self.exponential(retry_count).as_secs_f64() * factor;
        Duration::try_from_secs_f64(delay)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}
