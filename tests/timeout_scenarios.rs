//! End-to-end timeout behavior: ordering, argument capture, pre-clear and
//! the default-engine free functions.

pub mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use common::harness::{counter, eventually, init_tracing, settle};
use tern_timer::TimerEngine;
use tokio::sync::oneshot;

#[tokio::test(start_paused = true)]
async fn test_timers_fire_in_deadline_order() {
    init_tracing();
    let engine = TimerEngine::new();
    let order: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));

    let slow = order.clone();
    engine.schedule_timeout(Duration::from_millis(20), move || {
        slow.lock().unwrap().push("slow");
    });
    let fast = order.clone();
    engine.schedule_timeout(Duration::from_millis(10), move || {
        fast.lock().unwrap().push("fast");
    });
    settle().await;

    tokio::time::advance(Duration::from_millis(20)).await;
    settle().await;

    assert_eq!(*order.lock().unwrap(), vec!["fast", "slow"]);
}

#[tokio::test(start_paused = true)]
async fn test_callback_captures_its_arguments() {
    init_tracing();
    let engine = TimerEngine::new();
    let (tx, rx) = oneshot::channel();

    let who = String::from("operator");
    let attempt = 3u32;
    engine.schedule_timeout(Duration::from_millis(5), move || {
        let _ = tx.send(format!("{who}:{attempt}"));
    });
    settle().await;

    assert_eq!(rx.await.unwrap(), "operator:3");
}

#[tokio::test(start_paused = true)]
async fn test_clear_before_first_poll_never_fires() {
    init_tracing();
    let engine = TimerEngine::new();
    let (count, on_fire) = counter();

    let handle = engine.schedule_timeout(Duration::from_millis(10), on_fire);
    handle.clear();

    tokio::time::advance(Duration::from_millis(50)).await;
    settle().await;
    assert_eq!(count.load(std::sync::atomic::Ordering::SeqCst), 0);
    assert!(handle.cleared());
}

#[tokio::test(start_paused = true)]
async fn test_many_concurrent_delays_resolve_together() {
    init_tracing();
    let engine = TimerEngine::new();

    let waits = (1..=20u32).map(|step| {
        let engine = engine.clone();
        async move { engine.delay(Duration::from_millis(u64::from(step) * 10)).await }
    });
    let outcomes = futures::future::join_all(waits).await;

    assert_eq!(outcomes.len(), 20);
    assert!(outcomes.into_iter().all(|outcome| outcome.is_ok()));
    assert_eq!(engine.active(), 0);
    assert_eq!(engine.stats().completed, 20);
}

#[tokio::test(start_paused = true)]
async fn test_default_engine_free_functions() {
    init_tracing();
    let (count, on_fire) = counter();

    let handle = tern_timer::schedule_timeout(Duration::from_millis(10), on_fire);
    settle().await;
    assert!(eventually(|| count.load(std::sync::atomic::Ordering::SeqCst) == 1).await);
    assert!(!handle.cleared());

    tern_timer::delay(Duration::from_millis(5)).await.unwrap();

    let (ticks, on_tick) = counter();
    let repeating = tern_timer::schedule_interval(Duration::from_millis(10), on_tick);
    assert!(eventually(|| ticks.load(std::sync::atomic::Ordering::SeqCst) >= 3).await);
    repeating.clear();
}
