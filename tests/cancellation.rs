//! Cooperative cancellation: signal-wired timers, cancellable delays and
//! observer cleanup.

pub mod common;

use std::time::Duration;

use common::harness::{counter, eventually, init_tracing, settle};
use tern_timer::{CancelSource, TimerEngine};
use tokio::time::Instant;

const HOUR: Duration = Duration::from_secs(3600);

#[tokio::test(start_paused = true)]
async fn test_signal_clears_pending_timer() {
    init_tracing();
    let engine = TimerEngine::new();
    let (count, on_fire) = counter();
    let source = CancelSource::new();
    let signal = source.signal();

    let handle = engine.schedule_timeout_with_signal(HOUR, on_fire, &signal);
    settle().await;
    assert!(!handle.cleared());

    source.cancel();
    assert!(eventually(|| handle.cleared()).await);

    // Long past the original deadline, the callback still never ran
    tokio::time::advance(2 * HOUR).await;
    settle().await;
    assert_eq!(count.load(std::sync::atomic::Ordering::SeqCst), 0);
    assert_eq!(engine.active(), 0);
    assert_eq!(engine.stats().cleared, 1);
}

#[tokio::test(start_paused = true)]
async fn test_signal_observer_released_after_completion() {
    init_tracing();
    let engine = TimerEngine::new();
    let (count, on_fire) = counter();
    let source = CancelSource::new();
    let signal = source.signal();
    let baseline = source.observer_count();

    engine.schedule_timeout_with_signal(Duration::from_millis(10), on_fire, &signal);
    settle().await;
    // An armed watcher holds its captured signal clone plus a receiver
    // parked inside its await, so the count sits above baseline
    assert!(source.observer_count() > baseline);

    tokio::time::advance(Duration::from_millis(10)).await;
    assert!(eventually(|| count.load(std::sync::atomic::Ordering::SeqCst) == 1).await);

    // The watcher task was aborted at dispatch and has dropped its signal
    assert!(eventually(|| source.observer_count() == baseline).await);
}

#[tokio::test(start_paused = true)]
async fn test_signal_observer_released_after_clear() {
    init_tracing();
    let engine = TimerEngine::new();
    let (_count, on_fire) = counter();
    let source = CancelSource::new();
    let signal = source.signal();
    let baseline = source.observer_count();

    let handle = engine.schedule_timeout_with_signal(HOUR, on_fire, &signal);
    settle().await;
    assert!(source.observer_count() > baseline);

    handle.clear();
    assert!(eventually(|| source.observer_count() == baseline).await);
}

#[tokio::test(start_paused = true)]
async fn test_delay_with_signal_cancelled_mid_wait() {
    init_tracing();
    let engine = TimerEngine::new();
    let source = CancelSource::new();
    let signal = source.signal();

    let start = Instant::now();
    let waiter = tokio::spawn({
        let engine = engine.clone();
        async move { engine.delay_with_signal(HOUR, &signal).await }
    });
    settle().await;

    source.cancel();
    let outcome = waiter.await.unwrap();

    let err = outcome.unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(err.to_string(), "the operation was cancelled");
    // Cancellation came back without burning through the hour
    assert!(Instant::now() - start < HOUR);

    // The backing timer was cleared along with the lost wait
    assert!(eventually(|| engine.active() == 0).await);
}

#[tokio::test(start_paused = true)]
async fn test_delay_with_signal_pre_cancelled() {
    init_tracing();
    let engine = TimerEngine::new();
    let source = CancelSource::new();
    let signal = source.signal();
    source.cancel();

    let outcome = engine.delay_with_signal(HOUR, &signal).await;

    assert!(outcome.unwrap_err().is_cancelled());
    // Nothing was ever scheduled
    assert_eq!(engine.stats().scheduled, 0);
    assert_eq!(engine.active(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_delay_with_signal_completes_when_untripped() {
    init_tracing();
    let engine = TimerEngine::new();
    let source = CancelSource::new();
    let signal = source.signal();

    engine
        .delay_with_signal(Duration::from_millis(20), &signal)
        .await
        .unwrap();

    // Tripping the source afterwards is inert
    source.cancel();
    settle().await;
    assert_eq!(engine.active(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_clear_all_fails_suspended_delays() {
    init_tracing();
    let engine = TimerEngine::new();

    let waiter = tokio::spawn({
        let engine = engine.clone();
        async move { engine.delay(HOUR).await }
    });
    settle().await;
    assert_eq!(engine.active(), 1);

    assert_eq!(engine.clear_all(), 1);
    let err = waiter.await.unwrap().unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(err.to_string(), "the timer backing this delay was cleared");
}

#[tokio::test(start_paused = true)]
async fn test_dropped_delay_future_clears_its_timer() {
    init_tracing();
    let engine = TimerEngine::new();

    tokio::select! {
        biased;
        _ = tokio::time::sleep(Duration::from_millis(5)) => {}
        _ = engine.delay(HOUR) => panic!("the losing delay must not win"),
    }

    // Losing the select dropped the delay future and its timer with it
    assert!(eventually(|| engine.active() == 0).await);
    assert_eq!(engine.stats().cleared, 1);
}
