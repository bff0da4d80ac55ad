use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;

use super::Backoff;

/// Default length of the cooldown window after a rate-limit signal
const DEFAULT_COOLDOWN: Duration = Duration::from_secs(60);

/// Default delay before the first retry of a rate-limited request
const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Default upper bound for a single backoff delay
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(300);

/// Default jitter spread, i.e. delays are scaled by a factor in `[0.75, 1.25]`
const DEFAULT_JITTER: f64 = 0.25;

/// Rate limiting configuration shared by every request of a coordinator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RateLimitConfig {
    /// How long new requests are queued after the last rate-limit signal
    #[serde(default = "default_cooldown", with = "humantime_serde")]
    pub cooldown: Duration,

    /// Backoff delay before the first retry; doubled on every further retry
    #[serde(default = "default_base_delay", with = "humantime_serde")]
    pub base_delay: Duration,

    /// Upper bound for a single backoff delay
    #[serde(default = "default_max_delay", with = "humantime_serde")]
    pub max_delay: Duration,

    /// Relative jitter spread applied to every backoff delay
    #[serde(default = "default_jitter", deserialize_with = "deserialize_jitter")]
    pub jitter: f64,

    /// Give up after this many retries of a rate-limited request.
    /// Rate-limited requests are retried forever if unset.
    #[serde(default)]
    pub max_retries: Option<u32>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            cooldown: DEFAULT_COOLDOWN,
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            jitter: DEFAULT_JITTER,
            max_retries: None,
        }
    }
}

const fn default_cooldown() -> Duration {
    DEFAULT_COOLDOWN
}

const fn default_base_delay() -> Duration {
    DEFAULT_BASE_DELAY
}

const fn default_max_delay() -> Duration {
    DEFAULT_MAX_DELAY
}

const fn default_jitter() -> f64 {
    DEFAULT_JITTER
}

// A spread outside of `[0, 1]` would allow negative or unbounded delays
fn deserialize_jitter<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let jitter = f64::deserialize(deserializer)?;
    if (0.0..=1.0).contains(&jitter) {
        Ok(jitter)
    } else {
        Err(serde::de::Error::custom(format!(
            "invalid jitter `{jitter}`, expected a number between 0 and 1"
        )))
    }
}

impl RateLimitConfig {
    /// The backoff schedule described by this configuration
    #[must_use]
    pub const fn backoff(&self) -> Backoff {
        Backoff::new(self.base_delay, self.max_delay, self.jitter)
    }

    /// Has a request that was retried `retry_count` times used up its retries?
    #[must_use]
    pub fn retries_exhausted(&self, retry_count: u32) -> bool {
        self.max_retries.is_some_and(|max| retry_count >= max)
    }
}
