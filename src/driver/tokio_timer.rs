//! 基于 Tokio 的生产环境驱动实现
//! Production driver implementation backed by Tokio

use super::{SegmentCallback, TimerDriver};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep};

/// The production driver: each segment is one spawned Tokio task sleeping for
/// the segment span.
///
/// Cancellation aborts the task. Tokio tasks have no keep-alive concept (the
/// runtime does not wait for spawned timers), so the keep-alive toggle is the
/// trait's no-op default. Must be used from within a Tokio runtime.
///
/// 生产环境驱动：每个分段是一个休眠该分段跨度的 Tokio 任务。
///
/// 取消即中止任务。Tokio 任务没有保活概念（运行时不会为派生的定时器
/// 而等待），因此保活开关沿用 trait 的空操作默认实现。必须在 Tokio
/// 运行时内使用。
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioTimer;

impl TimerDriver for TokioTimer {
    type Native = JoinHandle<()>;

    fn schedule(&self, span: Duration, on_fire: SegmentCallback) -> Self::Native {
        debug_assert!(
            span <= self.max_segment(),
            "segment span exceeds the platform bound"
        );
        tokio::spawn(async move {
            sleep(span).await;
            on_fire();
        })
    }

    fn cancel(&self, native: Self::Native) {
        native.abort();
    }

    fn now(&self) -> Instant {
        Instant::now()
    }
}
