//! tests/common/harness.rs
use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc, Once,
};
use std::time::Duration;
use tracing_subscriber::fmt::format::FmtSpan;

/// Initializes tracing for tests, ensuring it's only done once.
pub fn init_tracing() {
    static TRACING_INIT: Once = Once::new();
    TRACING_INIT.call_once(|| {
        let filter =
            std::env::var("RUST_LOG").unwrap_or_else(|_| "tern_timer=debug".to_string());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::FULL)
            .with_test_writer()
            .init();
    });
}

/// Builds a callback that counts its invocations.
pub fn counter() -> (Arc<AtomicU32>, impl Fn() + Send + 'static) {
    let count = Arc::new(AtomicU32::new(0));
    let captured = count.clone();
    (count, move || {
        captured.fetch_add(1, Ordering::SeqCst);
    })
}

/// Lets spawned tasks (segment sleeps, watchers, aborts) run to quiescence
/// on the current-thread test runtime.
pub async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

/// Polls a condition under the paused clock, nudging virtual time by one
/// millisecond per attempt. Returns the final verdict after at most 200ms
/// of virtual time.
pub async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    condition()
}
