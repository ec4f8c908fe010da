#![deny(clippy::expect_used, clippy::unwrap_used)]

//! The root of the chained-segment timer library.
//! 链式分段定时器库的根。
//!
//! 原生定时器原语的时长上界约为 24.8 天（2^31−1 毫秒），超界即刻或
//! 静默错误触发。本库把任意时长的逻辑定时器分解为一串有界原生分段，
//! 在保持可取消、可查询剩余时间的同时覆盖任意延迟。
//!
//! The native timer primitive is bounded at roughly 24.8 days (2^31−1
//! milliseconds); anything beyond misfires immediately or silently. This
//! library decomposes a logical timer of arbitrary span into a chain of
//! bounded native segments, covering any delay while staying cancellable
//! and introspectable.
//!
//! # Quick start
//!
//! ```no_run
//! use std::time::Duration;
//! use tern_timer::{schedule_timeout, CancelSource};
//!
//! #[tokio::main]
//! async fn main() {
//!     // 一次性定时器：60 天的延迟被自动切成受界分段
//!     // One-shot timer: a 60-day delay is carved into bounded segments
//!     let handle = schedule_timeout(Duration::from_secs(60 * 24 * 3600), || {
//!         println!("two months later");
//!     });
//!
//!     // 可被信号取消的挂起
//!     // A suspension cancellable by signal
//!     let source = CancelSource::new();
//!     let signal = source.signal();
//!     tokio::spawn(async move {
//!         let _ = tern_timer::delay_with_signal(Duration::from_secs(3600), &signal).await;
//!     });
//!
//!     source.cancel();
//!     handle.clear();
//! }
//! ```

pub mod driver;
pub mod engine;
pub mod error;
pub mod signal;
pub mod testing;
pub mod timer;

pub use driver::{TimerDriver, TokioTimer, MAX_SEGMENT, MAX_SEGMENT_MILLIS};
pub use engine::{
    clear_all, default_engine, delay, delay_with_signal, schedule_interval, schedule_timeout,
    schedule_timeout_with_signal, TimerEngine, TimerStats,
};
pub use error::{Error, Result};
pub use signal::{CancelSignal, CancelSource};
pub use timer::{Remaining, TimerHandle, TimerId};
