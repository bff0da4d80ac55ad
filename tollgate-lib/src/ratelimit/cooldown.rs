use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;

use super::Clock;

/// Tracks the last rate-limit signal.
///
/// The cooldown is global rather than per endpoint: any rate-limit signal
/// restarts the window for every request.
#[derive(Debug)]
pub struct Cooldown {
    window: Duration,
    last_signal: Mutex<Option<Instant>>,
    clock: Arc<dyn Clock>,
}

impl Cooldown {
    /// Create a cooldown that stays active for `window` after each signal
    #[must_use]
    pub fn new(window: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            window,
            last_signal: Mutex::new(None),
            clock,
        }
    }

    /// Record a rate-limit signal now and return when the window closes
    ///
    /// # Panics
    ///
    /// Panics if the cooldown mutex is poisoned
    pub fn trigger(&self) -> Instant {
        let now = self.clock.now();
        *self.last_signal.lock().unwrap() = Some(now);
        now + self.window
    }

    /// Is a rate-limit signal younger than the cooldown window?
    #[must_use]
    pub fn is_limited(&self) -> bool {
        self.remaining().is_some()
    }

    /// Time left until the window closes, or `None` if it is closed
    ///
    /// # Panics
    ///
    /// Panics if the cooldown mutex is poisoned
    #[must_use]
    pub fn remaining(&self) -> Option<Duration> {
        let last = (*self.last_signal.lock().unwrap())?;
        let elapsed = self.clock.now().saturating_duration_since(last);
        self.window.checked_sub(elapsed).filter(|d| !d.is_zero())
    }
}
