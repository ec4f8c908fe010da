//! Long-horizon timers on the real Tokio driver, under a paused clock.
//!
//! Delays far beyond the native segment bound (about 24.8 days) must elapse
//! at exactly the requested virtual instant, with remaining-time queries
//! staying coherent mid-chain.

pub mod common;

use std::time::Duration;

use common::harness::{counter, init_tracing, settle};
use tern_timer::{Remaining, TimerEngine, MAX_SEGMENT};
use tokio::sync::oneshot;
use tokio::time::Instant;

const DAY: Duration = Duration::from_secs(24 * 3600);

#[tokio::test(start_paused = true)]
async fn test_sixty_day_timeout_elapses_exactly() {
    init_tracing();
    let engine = TimerEngine::new();
    let (tx, rx) = oneshot::channel();

    // 60 days needs three native segments
    assert!(60 * DAY > 2 * MAX_SEGMENT);
    let start = Instant::now();
    let handle = engine.schedule_timeout(60 * DAY, move || {
        let _ = tx.send(Instant::now());
    });
    settle().await;

    let fired_at = rx.await.unwrap();
    assert_eq!(fired_at - start, 60 * DAY);
    assert!(!handle.cleared());
    assert_eq!(handle.remaining(), Remaining::Finite(Duration::ZERO));
    assert_eq!(engine.stats().completed, 1);
    assert_eq!(engine.active(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_remaining_counts_down_across_segments() {
    init_tracing();
    let engine = TimerEngine::new();
    let (_count, on_fire) = counter();

    let handle = engine.schedule_timeout(60 * DAY, on_fire);
    settle().await;
    assert_eq!(handle.remaining(), Remaining::Finite(60 * DAY));

    // Ten days in, still inside the first native segment
    tokio::time::advance(10 * DAY).await;
    settle().await;
    assert_eq!(handle.remaining(), Remaining::Finite(50 * DAY));

    // Thirty days in, the chain has crossed into its second segment
    tokio::time::advance(20 * DAY).await;
    settle().await;
    assert_eq!(handle.remaining(), Remaining::Finite(30 * DAY));

    handle.clear();
    assert_eq!(handle.remaining(), Remaining::Finite(Duration::ZERO));
    assert_eq!(engine.active(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_delay_spans_beyond_native_bound() {
    init_tracing();
    let engine = TimerEngine::new();

    let start = Instant::now();
    engine.delay(30 * DAY).await.unwrap();
    assert_eq!(Instant::now() - start, 30 * DAY);
}

#[tokio::test(start_paused = true)]
async fn test_short_timeout_on_real_driver() {
    init_tracing();
    let engine = TimerEngine::new();
    let (count, on_fire) = counter();

    engine.schedule_timeout(Duration::from_millis(25), on_fire);
    settle().await;

    tokio::time::advance(Duration::from_millis(24)).await;
    settle().await;
    assert_eq!(count.load(std::sync::atomic::Ordering::SeqCst), 0);

    tokio::time::advance(Duration::from_millis(1)).await;
    settle().await;
    assert_eq!(count.load(std::sync::atomic::Ordering::SeqCst), 1);
}
