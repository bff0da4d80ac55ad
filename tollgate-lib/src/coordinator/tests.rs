use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::join_all;
use http::StatusCode;
use pretty_assertions::assert_eq;
use tokio::time::{Instant, sleep, sleep_until};

use super::*;
use crate::ratelimit::{FixedJitter, ManualClock};
use crate::test_utils::{ScriptedTransport, coordinator, coordinator_with};

fn signature(name: &str) -> Signature {
    Signature::from(format!("GET:https://api.example.com/{name}:"))
}

/// Put the coordinator into cooldown by letting one request hit the rate
/// limit once. The returned result settles after the first backoff.
async fn trigger_cooldown<T>(coordinator: &Coordinator<T>, value: T) -> Pending<T>
where
    T: Clone + Send + Sync + 'static,
{
    let limiter = ScriptedTransport::new([Outcome::RateLimited, Outcome::Ok(value)]);
    let pending = coordinator.submit(limiter.request(), signature("limiter"));
    sleep(Duration::from_millis(1)).await;
    assert!(coordinator.is_limited());
    pending
}

/// A request which records when it starts and ends
fn logged_request(name: &'static str, log: &Arc<Mutex<Vec<String>>>) -> RequestFn<&'static str> {
    let log = Arc::clone(log);
    RequestFn::new(move || {
        let log = Arc::clone(&log);
        async move {
            log.lock().unwrap().push(format!("start {name}"));
            sleep(Duration::from_millis(100)).await;
            log.lock().unwrap().push(format!("end {name}"));
            Outcome::Ok(name)
        }
    })
}

#[tokio::test(start_paused = true)]
async fn test_identical_requests_share_one_call() {
    let coordinator = coordinator();
    let transport = ScriptedTransport::with_latency([Outcome::Ok(42)], Duration::from_millis(10));

    let pending: Vec<_> = (0..5)
        .map(|_| coordinator.submit(transport.request(), signature("a")))
        .collect();
    assert_eq!(coordinator.in_flight(), 1);

    let results = join_all(pending).await;
    assert_eq!(results, vec![Ok(42); 5]);
    assert_eq!(transport.calls(), 1);
    assert_eq!(coordinator.in_flight(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_settled_signature_dispatches_again() {
    let coordinator = coordinator();
    let transport = ScriptedTransport::new([Outcome::Ok(1), Outcome::Ok(2)]);

    assert_eq!(coordinator.submit(transport.request(), signature("a")).await, Ok(1));
    assert_eq!(coordinator.phase(&signature("a")), Phase::Idle);
    assert_eq!(coordinator.submit(transport.request(), signature("a")).await, Ok(2));
    assert_eq!(transport.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_distinct_signatures_are_not_merged() {
    let coordinator = coordinator();
    let transport = ScriptedTransport::with_latency([Outcome::Ok(())], Duration::from_millis(10));

    let a = coordinator.submit(transport.request(), signature("a"));
    let b = coordinator.submit(transport.request(), signature("b"));
    assert_eq!(coordinator.in_flight(), 2);

    assert_eq!(a.await, Ok(()));
    assert_eq!(b.await, Ok(()));
    assert_eq!(transport.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_failure_reaches_every_caller() {
    let coordinator = coordinator::<()>();
    let error = ErrorKind::RejectedStatusCode {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: "boom".into(),
    };
    let transport = ScriptedTransport::with_latency(
        [Outcome::Failed(error.clone())],
        Duration::from_millis(10),
    );

    let pending: Vec<_> = (0..3)
        .map(|_| coordinator.submit(transport.request(), signature("a")))
        .collect();
    let results = join_all(pending).await;

    assert_eq!(results, vec![Err(error); 3]);
    assert_eq!(transport.calls(), 1);
    assert_eq!(coordinator.in_flight(), 0);
    assert!(!coordinator.is_limited(), "only 429s start a cooldown");
}

#[tokio::test(start_paused = true)]
async fn test_rate_limited_request_is_retried_with_backoff() {
    let coordinator = coordinator();
    let transport = ScriptedTransport::new([
        Outcome::RateLimited,
        Outcome::RateLimited,
        Outcome::Ok("done"),
    ]);

    let start = Instant::now();
    let result = coordinator.submit(transport.request(), signature("a")).await;

    assert_eq!(result, Ok("done"));
    assert_eq!(transport.calls(), 3);
    // 1s before the first retry, 2s before the second
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(3), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(3_100), "{elapsed:?}");
    assert!(coordinator.is_limited());
}

#[tokio::test(start_paused = true)]
async fn test_callers_join_request_waiting_for_retry() {
    let coordinator = coordinator();
    let transport = ScriptedTransport::new([Outcome::RateLimited, Outcome::Ok(1)]);

    let first = coordinator.submit(transport.request(), signature("a"));
    sleep(Duration::from_millis(100)).await;
    assert!(coordinator.is_limited());
    assert_eq!(
        coordinator.phase(&signature("a")),
        Phase::CoolingDown { retry_count: 0 }
    );

    let second = coordinator.submit(transport.request(), signature("a"));
    assert_eq!(coordinator.queue_len(), 0, "in-flight signatures are joined, not queued");

    assert_eq!(first.await, Ok(1));
    assert_eq!(second.await, Ok(1));
    assert_eq!(transport.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_cooldown_lifecycle() {
    let coordinator = coordinator();
    let start = Instant::now();
    let pending = trigger_cooldown(&coordinator, ()).await;

    assert_eq!(pending.await, Ok(()));
    assert!(coordinator.is_limited(), "a successful retry does not end the cooldown");

    sleep_until(start + Duration::from_millis(59_999)).await;
    assert!(coordinator.is_limited());
    sleep(Duration::from_millis(1)).await;
    assert!(!coordinator.is_limited());
    assert_eq!(coordinator.cooldown_remaining(), None);
}

#[tokio::test(start_paused = true)]
async fn test_queue_runs_in_submission_order_one_at_a_time() {
    let coordinator = coordinator();
    let start = Instant::now();
    let limiter = trigger_cooldown(&coordinator, "limiter").await;

    let log = Arc::new(Mutex::new(Vec::new()));
    let queued: Vec<_> = ["a", "b", "c"]
        .into_iter()
        .map(|name| coordinator.submit(logged_request(name, &log), signature(name)))
        .collect();
    assert_eq!(coordinator.queue_len(), 3);
    assert_eq!(coordinator.phase(&signature("a")), Phase::Idle);

    assert_eq!(limiter.await, Ok("limiter"));
    assert!(log.lock().unwrap().is_empty(), "queue waits for the cooldown");

    let results = join_all(queued).await;
    assert_eq!(results, vec![Ok("a"), Ok("b"), Ok("c")]);
    assert_eq!(
        *log.lock().unwrap(),
        vec!["start a", "end a", "start b", "end b", "start c", "end c"]
    );
    assert!(start.elapsed() >= Duration::from_secs(60));
    assert_eq!(coordinator.queue_len(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_clear_queue_rejects_waiting_requests() {
    let coordinator = coordinator();
    let _limiter = trigger_cooldown(&coordinator, 0).await;

    let executed = Arc::new(AtomicUsize::new(0));
    let request = {
        let executed = Arc::clone(&executed);
        RequestFn::new(move || {
            executed.fetch_add(1, Ordering::SeqCst);
            async { Outcome::Ok(1) }
        })
    };
    let a = coordinator.submit(request.clone(), signature("a"));
    let b = coordinator.submit(request, signature("b"));
    assert_eq!(coordinator.queue_len(), 2);

    assert_eq!(coordinator.clear_queue(), 2);
    assert_eq!(coordinator.queue_len(), 0);
    assert_eq!(a.await, Err(ErrorKind::QueueCancelled));
    assert_eq!(b.await, Err(ErrorKind::QueueCancelled));

    sleep(Duration::from_secs(61)).await;
    assert_eq!(executed.load(Ordering::SeqCst), 0);
    assert_eq!(coordinator.clear_queue(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_retry_ceiling() {
    let coordinator = coordinator_with::<()>(RateLimitConfig {
        max_retries: Some(2),
        ..RateLimitConfig::default()
    });
    let transport = ScriptedTransport::new([Outcome::RateLimited]);

    let result = coordinator.submit(transport.request(), signature("a")).await;

    assert_eq!(
        result,
        Err(ErrorKind::RetriesExhausted {
            signature: signature("a").to_string(),
            retries: 2,
        })
    );
    assert_eq!(transport.calls(), 3);
    assert_eq!(coordinator.in_flight(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_dequeued_request_joins_matching_in_flight_request() {
    let coordinator = coordinator();
    let start = Instant::now();
    let _limiter = trigger_cooldown(&coordinator, "limiter").await;

    let slow = ScriptedTransport::with_latency([Outcome::Ok("a")], Duration::from_secs(100));
    let shared = ScriptedTransport::with_latency([Outcome::Ok("s")], Duration::from_secs(200));
    let queued_a = coordinator.submit(slow.request(), signature("a"));
    let queued_s = coordinator.submit(shared.request(), signature("s"));
    assert_eq!(coordinator.queue_len(), 2);

    // The queue is busy with `a` when the same request is submitted again
    sleep_until(start + Duration::from_secs(70)).await;
    assert!(!coordinator.is_limited());
    assert_eq!(coordinator.queue_len(), 1);
    let direct_s = coordinator.submit(shared.request(), signature("s"));
    assert_eq!(
        coordinator.phase(&signature("s")),
        Phase::Dispatched { retry_count: 0 }
    );

    assert_eq!(queued_a.await, Ok("a"));
    assert_eq!(queued_s.await, Ok("s"));
    assert_eq!(direct_s.await, Ok("s"));
    assert_eq!(shared.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_panicking_request_releases_its_slot() {
    fn explode() -> Outcome<()> {
        panic!("transport bug")
    }

    let coordinator = coordinator::<()>();
    let request = RequestFn::new(|| async { explode() });

    let result = coordinator.submit(request, signature("a")).await;

    assert!(matches!(result, Err(ErrorKind::ExecutionAborted(_))));
    assert_eq!(coordinator.in_flight(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_queue_drains_when_injected_clock_passes_cooldown() {
    let clock = ManualClock::new();
    let coordinator = Coordinator::with_sources(
        RateLimitConfig::default(),
        Arc::new(clock.clone()),
        Arc::new(FixedJitter(1.0)),
    );
    let _limiter = trigger_cooldown(&coordinator, 0).await;

    let transport = ScriptedTransport::new([Outcome::Ok(1)]);
    let queued = coordinator.submit(transport.request(), signature("a"));
    assert_eq!(coordinator.queue_len(), 1);

    // Runtime time alone does not end the cooldown
    sleep(Duration::from_secs(61)).await;
    assert!(coordinator.is_limited());
    assert_eq!(coordinator.queue_len(), 1);
    assert_eq!(transport.calls(), 0);

    clock.advance(Duration::from_secs(61));
    assert!(!coordinator.is_limited());
    let result = tokio::time::timeout(Duration::from_secs(3600), queued).await;
    assert_eq!(result, Ok(Ok(1)));
    assert_eq!(transport.calls(), 1);
    assert_eq!(coordinator.queue_len(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_repeated_rate_limits_share_one_wakeup() {
    let coordinator = coordinator();
    let transport = ScriptedTransport::new([
        Outcome::RateLimited,
        Outcome::RateLimited,
        Outcome::RateLimited,
        Outcome::RateLimited,
        Outcome::RateLimited,
        Outcome::Ok(()),
    ]);

    let result = coordinator.submit(transport.request(), signature("a")).await;

    assert_eq!(result, Ok(()));
    assert_eq!(transport.calls(), 6);
    assert!(coordinator.is_limited());
    // This handle plus the one task waiting for the window to close
    assert_eq!(Arc::strong_count(&coordinator.state), 2);

    sleep(Duration::from_secs(61)).await;
    assert!(!coordinator.is_limited());
    assert_eq!(Arc::strong_count(&coordinator.state), 1);
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_is_absorbed_with_non_finite_jitter() {
    let coordinator = Coordinator::new(RateLimitConfig {
        jitter: f64::NAN,
        ..RateLimitConfig::default()
    });
    let transport = ScriptedTransport::new([Outcome::RateLimited, Outcome::Ok(1)]);

    let result = coordinator.submit(transport.request(), signature("a")).await;

    assert_eq!(result, Ok(1));
    assert_eq!(transport.calls(), 2);
}
