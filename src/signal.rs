//! 取消信号：一次性从“活动”翻转为“已取消”的可观察对象
//! Cancellation signal: an observable that trips once from active to cancelled
//!
//! 引擎只要求信号具备两种能力：查询当前状态，以及等待它翻转。
//! [`CancelSource`] 是拥有方（翻转它），[`CancelSignal`] 是可克隆的
//! 观察方。信号是水平触发的：在翻转之后创建的观察者同样能立即看到
//! 已取消状态。
//!
//! The engine needs exactly two capabilities from a signal: query the current
//! state, and await the transition. [`CancelSource`] is the owning side (it
//! trips the signal); [`CancelSignal`] is the cloneable observing side. The
//! signal is level-triggered: an observer created after the trip still sees
//! the cancelled state immediately.

use tokio::sync::watch;

/// The owning side of a cancellation signal.
///
/// Dropping the source without cancelling leaves every signal permanently
/// active: observers waiting on [`CancelSignal::cancelled`] will never
/// resolve.
///
/// 取消信号的拥有方。
///
/// 不取消而直接丢弃拥有方会让所有信号永久保持活动状态：等待
/// [`CancelSignal::cancelled`] 的观察者永远不会被唤醒。
#[derive(Debug)]
pub struct CancelSource {
    tx: watch::Sender<bool>,
}

impl CancelSource {
    /// Creates a new, untripped source.
    /// 创建一个新的、尚未触发的拥有方。
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// Returns a fresh observer of this source.
    /// 返回此拥有方的一个新观察者。
    pub fn signal(&self) -> CancelSignal {
        CancelSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Trips the signal. Idempotent; every current and future observer sees
    /// the cancelled state.
    /// 触发信号。幂等；所有当前与未来的观察者都会看到已取消状态。
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Whether the signal has been tripped.
    /// 信号是否已被触发。
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Number of live observers (signals handed out and watchers parked on
    /// them). Useful for asserting that completed timers deregister their
    /// watchers.
    /// 存活观察者数量（已发出的信号与停靠其上的观察任务）。可用于断言
    /// 已完成的定时器注销了它们的观察任务。
    pub fn observer_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for CancelSource {
    fn default() -> Self {
        Self::new()
    }
}

/// The observing side of a cancellation signal.
/// 取消信号的观察方。
#[derive(Debug, Clone)]
pub struct CancelSignal {
    rx: watch::Receiver<bool>,
}

impl CancelSignal {
    /// Whether the signal has been tripped.
    /// 信号是否已被触发。
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Suspends until the signal trips.
    ///
    /// Resolves immediately if it already has. If the [`CancelSource`] is
    /// dropped without cancelling, the signal can never trip and this future
    /// stays pending forever.
    ///
    /// 挂起直到信号触发。
    ///
    /// 若信号已触发则立即返回。若 [`CancelSource`] 未取消即被丢弃，
    /// 信号永远不会触发，此 future 将永久挂起。
    pub async fn cancelled(&self) {
        // wait_for needs a mutable receiver; observe through a private clone
        // so the signal itself stays shareable.
        let mut rx = self.rx.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            // Source dropped while still active: this signal can never trip.
            std::future::pending::<()>().await;
        }
    }
}
