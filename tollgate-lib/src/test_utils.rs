use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::ratelimit::{FixedJitter, RateLimitConfig, TokioClock};
use crate::{Coordinator, Outcome, RequestFn};

/// A fake transport which plays back a script of outcomes.
///
/// Once the script is exhausted, the last outcome is repeated.
#[derive(Debug)]
pub(crate) struct ScriptedTransport<T> {
    script: Mutex<VecDeque<Outcome<T>>>,
    last: Mutex<Option<Outcome<T>>>,
    latency: Duration,
    calls: AtomicUsize,
}

impl<T> ScriptedTransport<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(script: impl IntoIterator<Item = Outcome<T>>) -> Arc<Self> {
        Self::with_latency(script, Duration::ZERO)
    }

    /// Every call takes `latency` before it returns its outcome
    pub(crate) fn with_latency(
        script: impl IntoIterator<Item = Outcome<T>>,
        latency: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into_iter().collect()),
            last: Mutex::new(None),
            latency,
            calls: AtomicUsize::new(0),
        })
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_outcome(&self) -> Outcome<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut last = self.last.lock().unwrap();
        if let Some(outcome) = self.script.lock().unwrap().pop_front() {
            *last = Some(outcome.clone());
            return outcome;
        }
        last.clone().expect("Transport script must not be empty")
    }

    pub(crate) fn request(self: &Arc<Self>) -> RequestFn<T> {
        let transport = Arc::clone(self);
        RequestFn::new(move || {
            let transport = Arc::clone(&transport);
            async move {
                if !transport.latency.is_zero() {
                    tokio::time::sleep(transport.latency).await;
                }
                transport.next_outcome()
            }
        })
    }
}

/// A coordinator with default timings and no jitter
pub(crate) fn coordinator<T>() -> Coordinator<T>
where
    T: Clone + Send + Sync + 'static,
{
    coordinator_with(RateLimitConfig::default())
}

/// A coordinator with the given timings and no jitter
pub(crate) fn coordinator_with<T>(config: RateLimitConfig) -> Coordinator<T>
where
    T: Clone + Send + Sync + 'static,
{
    Coordinator::with_sources(config, Arc::new(TokioClock), Arc::new(FixedJitter(1.0)))
}
