//! Rate-limit handling: the global cooldown window and the backoff schedule
//! for retrying rate-limited requests.
//!
//! # Architecture
//!
//! - [`Cooldown`]: Remembers the last rate-limit signal and derives whether
//!   new requests must wait
//! - [`Backoff`]: Exponential delay schedule with jitter
//! - [`Clock`] and [`Jitter`]: Injectable sources of time and randomness
//! - [`RateLimitConfig`]: Configuration for all of the above

mod backoff;
mod clock;
mod config;
mod cooldown;

pub use backoff::{Backoff, FixedJitter, Jitter, RandomJitter};
pub use clock::{Clock, ManualClock, TokioClock};
pub use config::RateLimitConfig;
pub use cooldown::Cooldown;
