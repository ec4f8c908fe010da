//! 原生定时器驱动抽象
//! Native timer driver abstraction
//!
//! 该模块把引擎的三个外部协作者（有界原生定时器原语、单调时钟、
//! 保活开关）收拢为一个 trait。链式调度器只通过这个接口与平台交互，
//! 因此测试可以用虚拟时钟驱动替换真实平台。
//!
//! This module gathers the engine's three external collaborators (the bounded
//! native timer primitive, the monotonic clock, and the keep-alive toggle)
//! behind a single trait. The chain scheduler talks to the platform only
//! through this seam, so tests can substitute a virtual-clock driver for the
//! real platform.

mod tokio_timer;

pub use tokio_timer::TokioTimer;

use std::time::Duration;
use tokio::time::Instant;

/// Maximum span of a single native timer registration, in milliseconds.
///
/// The underlying platform primitive stores its delay in a signed 32-bit
/// millisecond counter; a registration beyond this bound silently misfires
/// near-immediately. The chain scheduler never issues a longer segment, and
/// the constant is exported so callers and tests can reason about chain
/// lengths.
///
/// 单个原生定时器注册的最大跨度（毫秒）。
///
/// 底层平台原语用带符号 32 位毫秒计数器保存延迟；超出该上界的注册会
/// 近乎立即地错误触发。链式调度器绝不发出更长的分段，导出该常量以便
/// 调用者与测试推断链长。
pub const MAX_SEGMENT_MILLIS: u64 = 2_147_483_647;

/// [`MAX_SEGMENT_MILLIS`] as a [`Duration`] (about 24.8 days).
/// 以 [`Duration`] 表示的 [`MAX_SEGMENT_MILLIS`]（约 24.8 天）。
pub const MAX_SEGMENT: Duration = Duration::from_millis(MAX_SEGMENT_MILLIS);

/// Callback invoked when a native segment expires.
/// 原生分段到期时调用的回调。
pub type SegmentCallback = Box<dyn FnOnce() + Send + 'static>;

/// The bounded single-segment timer primitive together with its monotonic
/// clock.
///
/// A driver schedules one callback after at most [`max_segment`] time units,
/// returns an opaque registration handle, and can cancel an outstanding
/// registration. Keep-alive toggling is forwarded to platforms that have the
/// concept and ignored elsewhere. All methods are synchronous; firing happens
/// on the driver's own execution context.
///
/// 有界单段定时器原语及其单调时钟。
///
/// 驱动在至多 [`max_segment`] 个时间单位后调度一次回调，返回不透明的
/// 注册句柄，并可取消未决注册。保活开关会被转发给具备该概念的平台，
/// 其余平台忽略。所有方法均为同步；触发发生在驱动自身的执行上下文上。
///
/// [`max_segment`]: TimerDriver::max_segment
pub trait TimerDriver: Send + Sync + 'static {
    /// Opaque handle for one outstanding native registration.
    /// 一次未决原生注册的不透明句柄。
    type Native: Send + 'static;

    /// Registers `on_fire` to run once `span` has elapsed.
    ///
    /// Callers must keep `span` within [`max_segment`](Self::max_segment);
    /// the chain scheduler guarantees this by construction.
    ///
    /// 注册 `on_fire`，在 `span` 经过后执行一次。
    /// 调用者必须保证 `span` 不超过 [`max_segment`](Self::max_segment)；
    /// 链式调度器在构造上保证这一点。
    fn schedule(&self, span: Duration, on_fire: SegmentCallback) -> Self::Native;

    /// Cancels an outstanding registration. The callback will not run.
    /// 取消未决注册。回调将不会运行。
    fn cancel(&self, native: Self::Native);

    /// Applies the caller's keep-alive intent to an outstanding registration.
    ///
    /// Platforms without the concept ignore the call; the default does
    /// nothing.
    ///
    /// 将调用者的保活意图应用到未决注册上。
    /// 不具备该概念的平台忽略此调用；默认实现为空操作。
    fn set_keep_alive(&self, native: &Self::Native, keep_alive: bool) {
        let _ = (native, keep_alive);
    }

    /// Reads the platform's monotonic clock.
    /// 读取平台的单调时钟。
    fn now(&self) -> Instant;

    /// The platform's bound on a single registration span.
    ///
    /// Defaults to [`MAX_SEGMENT`]; test drivers may shrink it to exercise
    /// long chains cheaply.
    ///
    /// 平台对单次注册跨度的上界。
    /// 默认为 [`MAX_SEGMENT`]；测试驱动可缩小它以低成本演练长链。
    fn max_segment(&self) -> Duration {
        MAX_SEGMENT
    }
}
