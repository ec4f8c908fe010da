//! Repeating timers on the real Tokio driver: exact cadence, long periods
//! and clear semantics.

pub mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use common::harness::{counter, init_tracing, settle};
use tern_timer::{TimerEngine, MAX_SEGMENT};

const DAY: Duration = Duration::from_secs(24 * 3600);

#[tokio::test(start_paused = true)]
async fn test_interval_fires_on_exact_grid() {
    init_tracing();
    let engine = TimerEngine::new();
    let (ticks, on_tick) = counter();
    let period = Duration::from_millis(100);

    let handle = engine.schedule_interval(period, on_tick);
    settle().await;
    assert_eq!(ticks.load(Ordering::SeqCst), 0);

    for expected in 1..=10u32 {
        tokio::time::advance(period).await;
        settle().await;
        assert_eq!(ticks.load(Ordering::SeqCst), expected);
    }

    handle.clear();
    tokio::time::advance(5 * period).await;
    settle().await;
    assert_eq!(ticks.load(Ordering::SeqCst), 10);
    assert_eq!(engine.active(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_interval_with_period_beyond_native_bound() {
    init_tracing();
    let engine = TimerEngine::new();
    let (ticks, on_tick) = counter();

    // Each 30-day cycle needs its own chain of native segments
    assert!(30 * DAY > MAX_SEGMENT);
    let handle = engine.schedule_interval(30 * DAY, on_tick);
    settle().await;

    for _ in 0..3 {
        tokio::time::advance(10 * DAY).await;
        settle().await;
    }
    assert_eq!(ticks.load(Ordering::SeqCst), 1);

    for _ in 0..3 {
        tokio::time::advance(10 * DAY).await;
        settle().await;
    }
    assert_eq!(ticks.load(Ordering::SeqCst), 2);

    handle.clear();
    assert_eq!(engine.active(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_interval_keeps_cadence_across_late_wakeups() {
    init_tracing();
    let engine = TimerEngine::new();
    let (ticks, on_tick) = counter();
    let period = Duration::from_millis(100);

    let handle = engine.schedule_interval(period, on_tick);
    settle().await;

    // Sweep past two cycle targets in one jump: one dispatch per completed
    // cycle, anchored to the absolute 100ms grid
    tokio::time::advance(Duration::from_millis(250)).await;
    settle().await;
    assert_eq!(ticks.load(Ordering::SeqCst), 2);

    // By t=800ms eight targets have been crossed in total
    tokio::time::advance(Duration::from_millis(550)).await;
    settle().await;
    assert_eq!(ticks.load(Ordering::SeqCst), 8);

    handle.clear();
}
