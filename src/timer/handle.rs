//! 定时器句柄
//! Timer handle
//!
//! [`TimerHandle`] 是一条定时器链对外的唯一操作面：清除、剩余时间
//! 查询与保活控制都经由它完成。句柄可自由克隆，所有克隆指向同一条链。
//!
//! [`TimerHandle`] is the sole external surface of a timer chain: clearing,
//! remaining-time queries and keep-alive control all go through it. Handles
//! clone freely; every clone points at the same chain.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::driver::TimerDriver;

use super::state::{TimerCore, TimerId};

/// 定时器的剩余时间
/// Remaining time of a timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remaining {
    /// 距下一次触发还有这么久；已触发或已清除时为零
    /// This long until the next firing; zero once fired or cleared
    Finite(Duration),
    /// 目标时间无法表示，定时器永不触发
    /// The target time is not representable; the timer never fires
    Unbounded,
}

impl Remaining {
    /// 是否为无界剩余
    /// Whether the remaining time is unbounded
    pub fn is_unbounded(&self) -> bool {
        matches!(self, Self::Unbounded)
    }

    /// 有界剩余时间；无界时为 None
    /// The finite remaining time; None when unbounded
    pub fn finite(&self) -> Option<Duration> {
        match self {
            Self::Finite(remaining) => Some(*remaining),
            Self::Unbounded => None,
        }
    }
}

impl fmt::Display for Remaining {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finite(remaining) => write!(f, "{}ms", remaining.as_millis()),
            Self::Unbounded => write!(f, "unbounded"),
        }
    }
}

/// 定时器链的句柄
/// Handle to a timer chain
///
/// 丢弃全部句柄不会停止定时器：链会继续运行直到到期或被清除。需要
/// 停止时必须显式调用 [`TimerHandle::clear`]。
/// Dropping every handle does not stop the timer: the chain keeps running
/// until it elapses or is cleared. Stopping requires an explicit call to
/// [`TimerHandle::clear`].
pub struct TimerHandle<D: TimerDriver> {
    core: Arc<TimerCore<D>>,
}

impl<D: TimerDriver> Clone for TimerHandle<D> {
    fn clone(&self) -> Self {
        Self {
            core: Arc::clone(&self.core),
        }
    }
}

impl<D: TimerDriver> fmt::Debug for TimerHandle<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerHandle")
            .field("id", &self.id())
            .field("cleared", &self.cleared())
            .finish()
    }
}

impl<D: TimerDriver> TimerHandle<D> {
    pub(crate) fn new(core: Arc<TimerCore<D>>) -> Self {
        Self { core }
    }

    pub(crate) fn core(&self) -> &Arc<TimerCore<D>> {
        &self.core
    }

    /// 定时器标识
    /// The timer's identity
    pub fn id(&self) -> TimerId {
        self.core.id
    }

    /// 清除定时器：取消在飞的原生分段并丢弃用户回调
    /// Clears the timer: cancels the in-flight native segment and drops the
    /// user callback
    ///
    /// 幂等。对已走完全程的一次性定时器调用同样安全：仅置位清除标志，
    /// 已无分段可取消。
    /// Idempotent. Calling it on a one-shot that already ran its course is
    /// equally safe: the cleared flag is raised, with no segment left to
    /// cancel.
    pub fn clear(&self) {
        if self.core.clear() {
            debug!(timer_id = self.core.id, "timer cleared");
        }
    }

    /// 清除标志是否已置位
    /// Whether the cleared flag has been raised
    ///
    /// 只反映显式清除（句柄、取消信号或 clear_all）。正常到期且其后
    /// 未被清除的一次性定时器返回 false，其剩余时间为零。
    /// Reflects explicit clears only (handle, cancellation signal or
    /// clear_all). A one-shot that elapsed normally and was never cleared
    /// afterwards reports false, with zero remaining time.
    pub fn cleared(&self) -> bool {
        self.core.cleared()
    }

    /// 距下一次触发的剩余时间
    /// Remaining time until the next firing
    ///
    /// 周期定时器在回调执行期间已指向下一个周期的目标。
    /// During a repeating timer's callback this already points at the next
    /// cycle's target.
    pub fn remaining(&self) -> Remaining {
        let state = self.core.lock();
        if self.core.cleared() {
            return Remaining::Finite(Duration::ZERO);
        }
        match state.target {
            Some(target) => {
                Remaining::Finite(target.saturating_duration_since(self.core.driver.now()))
            }
            None => Remaining::Unbounded,
        }
    }

    /// 要求定时器在挂起期间保活宿主进程（默认行为）
    /// Asks the timer to keep the host process alive while pending (the
    /// default)
    pub fn keep_alive(&self) -> &Self {
        self.core.set_keep_alive(true);
        self
    }

    /// 允许宿主进程在定时器挂起期间退出
    /// Allows the host process to exit while the timer is pending
    ///
    /// 语义贯穿整条链：此后签发的每个原生分段都继承该设置。
    /// The semantics span the whole chain: every native segment issued from
    /// now on inherits the setting.
    pub fn unref(&self) -> &Self {
        self.core.set_keep_alive(false);
        self
    }
}
