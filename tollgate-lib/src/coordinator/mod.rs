//! Deduplication, cooldown queueing and retry of requests.
//!
//! A [`Coordinator`] sits between application code and a transport. Every
//! request is identified by its [`Signature`]:
//!
//! - If a request with the same signature is already in flight, the caller
//!   joins it instead of issuing a second transport call. This includes
//!   requests that are waiting for a backoff timer.
//! - If the API signalled rate limiting within the cooldown window, new
//!   requests are parked in a FIFO queue. The queue is drained one request
//!   at a time once the window has passed.
//! - Otherwise the request is dispatched. Rate-limited attempts are retried
//!   with exponential backoff until they succeed or fail for another reason.
//!
//! ```
//! use tollgate_lib::{Coordinator, Outcome, RequestFn, Signature};
//! use http::Method;
//!
//! #[tokio::main]
//! async fn main() -> tollgate_lib::Result<()> {
//!     let coordinator = Coordinator::default();
//!     let request = RequestFn::new(|| async { Outcome::Ok("hello".to_string()) });
//!     let signature = Signature::of(&Method::GET, "https://api.example.com/greeting");
//!
//!     let greeting = coordinator.submit(request, signature).await?;
//!     assert_eq!(greeting, "hello");
//!     Ok(())
//! }
//! ```

mod queue;
mod registry;
mod request;

use std::convert::Infallible;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::FutureExt;
use log::{debug, warn};
use tokio::sync::oneshot;

use crate::ratelimit::{Backoff, Clock, Cooldown, Jitter, RandomJitter, RateLimitConfig, TokioClock};
use crate::{ErrorKind, Outcome, Result, Signature};

use queue::{PendingQueue, QueueItem};
use registry::{Joined, Registry};

pub use registry::Phase;
pub use request::{Pending, RequestFn};

/// Shared state behind every clone of a [`Coordinator`]
struct State<T: Clone> {
    config: RateLimitConfig,
    backoff: Backoff,
    cooldown: Cooldown,
    jitter: Arc<dyn Jitter>,
    registry: Registry<T>,
    queue: Mutex<PendingQueue<T>>,
    next_id: AtomicU64,
    /// Set while a task is waiting for the cooldown window to close
    wakeup_armed: AtomicBool,
}

/// Coordinates requests of one kind against one remote API.
///
/// Cloning is cheap and every clone shares the same registry, cooldown and
/// queue. An application usually creates a single coordinator at startup
/// and hands out clones.
pub struct Coordinator<T: Clone> {
    state: Arc<State<T>>,
}

impl<T: Clone> Clone for Coordinator<T> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<T: Clone> fmt::Debug for Coordinator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coordinator")
            .field("config", &self.state.config)
            .field("cooldown", &self.state.cooldown)
            .field("in_flight", &self.state.registry.len())
            .finish_non_exhaustive()
    }
}

impl<T> Default for Coordinator<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(RateLimitConfig::default())
    }
}

impl<T> Coordinator<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a coordinator using the Tokio clock and random jitter
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_sources(config, Arc::new(TokioClock), Arc::new(RandomJitter))
    }

    /// Create a coordinator with explicit sources of time and randomness
    #[must_use]
    pub fn with_sources(
        config: RateLimitConfig,
        clock: Arc<dyn Clock>,
        jitter: Arc<dyn Jitter>,
    ) -> Self {
        Self {
            state: Arc::new(State {
                config,
                backoff: config.backoff(),
                cooldown: Cooldown::new(config.cooldown, clock),
                jitter,
                registry: Registry::new(),
                queue: Mutex::new(PendingQueue::new()),
                next_id: AtomicU64::new(1),
                wakeup_armed: AtomicBool::new(false),
            }),
        }
    }

    /// Submit a request.
    ///
    /// Joins the in-flight execution with the same signature if there is
    /// one, queues the request while the cooldown is active, and dispatches
    /// it otherwise. The transport call starts right away; awaiting the
    /// returned [`Pending`] only observes it.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime, or if the queue mutex
    /// is poisoned
    pub fn submit(&self, request: RequestFn<T>, signature: Signature) -> Pending<T> {
        let joined = self.state.registry.join_or_start(&signature, || {
            if self.state.cooldown.is_limited() {
                Err(request.clone())
            } else {
                Ok(self.dispatch(request.clone(), signature.clone(), 0))
            }
        });

        match joined {
            Joined::Existing(pending) => {
                debug!("Joining in-flight request {signature}");
                pending
            }
            Joined::Started(pending) => pending,
            Joined::Declined(request) => self.enqueue(request, signature),
        }
    }

    /// Is the API currently considered rate limited?
    #[must_use]
    pub fn is_limited(&self) -> bool {
        self.state.cooldown.is_limited()
    }

    /// Time left until the cooldown window closes
    #[must_use]
    pub fn cooldown_remaining(&self) -> Option<Duration> {
        self.state.cooldown.remaining()
    }

    /// Reject every queued request with [`ErrorKind::QueueCancelled`].
    ///
    /// Requests that are already dispatched are not affected. Returns the
    /// number of rejected requests.
    ///
    /// # Panics
    ///
    /// Panics if the queue mutex is poisoned
    pub fn clear_queue(&self) -> usize {
        let items = self.state.queue.lock().unwrap().take_all();
        let cleared = items.len();
        for item in items {
            // The caller may have stopped waiting; nothing to do then
            let _ = item.respond.send(Err(ErrorKind::QueueCancelled));
        }
        if cleared > 0 {
            debug!("Cancelled {cleared} queued requests");
        }
        cleared
    }

    /// Number of requests waiting in the cooldown queue
    ///
    /// # Panics
    ///
    /// Panics if the queue mutex is poisoned
    #[must_use]
    pub fn queue_len(&self) -> usize {
        self.state.queue.lock().unwrap().len()
    }

    /// Number of signatures with an in-flight execution
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.state.registry.len()
    }

    /// Where the execution for `signature` currently is
    #[must_use]
    pub fn phase(&self, signature: &Signature) -> Phase {
        self.state.registry.phase(signature)
    }

    /// The rate limiting configuration of this coordinator
    #[must_use]
    pub fn config(&self) -> &RateLimitConfig {
        &self.state.config
    }

    /// Spawn the execution of a request. The caller registers the returned
    /// [`Pending`] under `signature`.
    fn dispatch(
        &self,
        request: RequestFn<T>,
        signature: Signature,
        retry_count: u32,
    ) -> (u64, Pending<T>) {
        let id = self.state.next_id.fetch_add(1, Ordering::Relaxed);
        debug!("Dispatching {signature}");

        let coordinator = self.clone();
        let handle = tokio::spawn(async move {
            let result = AssertUnwindSafe(coordinator.execute(&request, &signature, id, retry_count))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| Err(ErrorKind::ExecutionAborted(format!("{signature} panicked"))));
            coordinator.settle(&signature, id);
            result
        });

        let pending = Pending::new(async move { handle.await.unwrap_or_else(|e| Err(e.into())) });
        (id, pending)
    }

    /// Drive one execution until it succeeds or fails for a reason other
    /// than rate limiting
    async fn execute(
        &self,
        request: &RequestFn<T>,
        signature: &Signature,
        id: u64,
        mut retry_count: u32,
    ) -> Result<T> {
        let registry = &self.state.registry;
        loop {
            registry.enter(signature, id, Phase::Dispatched { retry_count });
            match request.call().await {
                Outcome::Ok(value) => return Ok(value),
                Outcome::Failed(e) => {
                    debug!("{signature} failed: {e}");
                    return Err(e);
                }
                Outcome::RateLimited => {
                    self.signal_rate_limit();
                    if self.state.config.retries_exhausted(retry_count) {
                        warn!("Giving up on {signature} after {retry_count} rate-limited retries");
                        return Err(ErrorKind::RetriesExhausted {
                            signature: signature.to_string(),
                            retries: retry_count,
                        });
                    }

                    let delay = self.state.backoff.delay(retry_count, self.state.jitter.as_ref());
                    debug!(
                        "{signature} was rate limited, retry {} in {}ms",
                        retry_count + 1,
                        delay.as_millis()
                    );
                    registry.enter(signature, id, Phase::CoolingDown { retry_count });
                    tokio::time::sleep(delay).await;
                    retry_count += 1;
                }
            }
        }
    }

    /// Release the registry slot of a finished execution and move the queue
    fn settle(&self, signature: &Signature, id: u64) {
        self.state.registry.enter(signature, id, Phase::Settled);
        self.state.registry.release(signature, id);
        self.drain();
    }

    /// Restart the cooldown window and make sure the queue is drained when
    /// it closes, even if no other request settles afterwards
    fn signal_rate_limit(&self) {
        self.state.cooldown.trigger();
        self.arm_wakeup();
    }

    /// Spawn a task that drains the queue once the cooldown window closes.
    ///
    /// At most one such task exists per coordinator. The window is measured
    /// with the coordinator's clock: the task sleeps for the remaining time
    /// and checks again until the clock agrees that the window is closed.
    fn arm_wakeup(&self) {
        let state = &self.state;
        if state.wakeup_armed.swap(true, Ordering::AcqRel) {
            return;
        }

        let coordinator = self.clone();
        tokio::spawn(async move {
            let state = &coordinator.state;
            loop {
                while let Some(remaining) = state.cooldown.remaining() {
                    tokio::time::sleep(remaining).await;
                }
                state.wakeup_armed.store(false, Ordering::Release);
                // A signal may have arrived between the last check and the
                // release; keep waiting unless another task took over
                if !state.cooldown.is_limited() || state.wakeup_armed.swap(true, Ordering::AcqRel) {
                    break;
                }
            }
            debug!("Cooldown window closed");
            coordinator.drain();
        });
    }

    fn enqueue(&self, request: RequestFn<T>, signature: Signature) -> Pending<T> {
        let (respond, receiver) = oneshot::channel();
        {
            let mut queue = self.state.queue.lock().unwrap();
            debug!(
                "Cooldown active, queueing {signature} behind {} requests",
                queue.len()
            );
            queue.push(QueueItem {
                request,
                signature,
                respond,
                retry_count: 0,
            });
        }
        // The window may have closed since `submit` checked it
        self.drain();
        Pending::new(async move { receiver.await.unwrap_or(Err(ErrorKind::QueueCancelled)) })
    }

    /// Execute the oldest queued request, unless the cooldown is active or
    /// a queued request is still running
    fn drain(&self) {
        let item = {
            let mut queue = self.state.queue.lock().unwrap();
            if queue.is_empty() {
                return;
            }
            if self.state.cooldown.is_limited() {
                drop(queue);
                self.arm_wakeup();
                return;
            }
            match queue.next() {
                Some(item) => item,
                None => return,
            }
        };

        let QueueItem {
            request,
            signature,
            respond,
            retry_count,
        } = item;
        debug!("Dequeued {signature}");

        // Queued requests skipped the dedup check at dispatch time; a
        // request with the same signature may have been started since
        let joined = self
            .state
            .registry
            .join_or_start::<_, Infallible>(&signature, || {
                Ok(self.dispatch(request, signature.clone(), retry_count))
            });
        let pending = match joined {
            Joined::Existing(pending) | Joined::Started(pending) => pending,
            Joined::Declined(never) => match never {},
        };

        let coordinator = self.clone();
        tokio::spawn(async move {
            let result = pending.await;
            let _ = respond.send(result);
            coordinator.state.queue.lock().unwrap().finish();
            coordinator.drain();
        });
    }
}

#[cfg(test)]
mod tests;
