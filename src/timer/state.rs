//! 定时器链的共享状态
//! Shared state of a timer chain
//!
//! 一个逻辑定时器的全部可变状态都集中在 [`TimerCore`] 中：当前在飞的
//! 原生分段、绝对目标时间、用户回调以及可选的取消观察任务。状态锁是
//! 清除与触发竞争的线性化点。
//!
//! All mutable state of one logical timer lives in [`TimerCore`]: the native
//! segment currently in flight, the absolute target time, the user callback
//! and the optional cancellation watcher task. The state lock is the
//! linearization point for clear-versus-fire races.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::driver::TimerDriver;
use crate::engine::EngineShared;

/// 定时器的唯一标识符
/// Unique identifier for a timer
pub type TimerId = u64;

/// 定时器携带的用户作业
/// The user job carried by a timer
pub(crate) enum TimerJob {
    /// 一次性回调，在链的最后一个分段到期时调用
    /// One-shot callback, invoked when the final segment of the chain expires
    Once(Box<dyn FnOnce() + Send + 'static>),
    /// 周期回调，每完成一个完整周期调用一次
    /// Repeating callback, invoked once per completed full cycle
    Repeat {
        period: Duration,
        tick: Box<dyn FnMut() + Send + 'static>,
    },
}

/// 受锁保护的链状态
/// Lock-protected chain state
pub(crate) struct ChainState<D: TimerDriver> {
    /// 当前在飞的原生分段（两次分段之间为 None）
    /// The native segment currently in flight (None between segments)
    pub(crate) native: Option<D::Native>,
    /// 绝对目标时间；None 表示延迟无法表示，定时器永不触发
    /// Absolute target time; None means the delay is not representable
    /// and the timer never fires
    pub(crate) target: Option<Instant>,
    /// 当前分段是否为链的最后一段（在签发时决定）
    /// Whether the current segment is the last of the chain (decided at issue time)
    pub(crate) final_segment: bool,
    /// 是否要求原生分段保活宿主进程
    /// Whether native segments are asked to keep the host process alive
    pub(crate) keep_alive: bool,
    /// 用户作业；触发派发期间被取走，清除后永久为 None
    /// The user job; checked out during dispatch, permanently None once cleared
    pub(crate) job: Option<TimerJob>,
    /// 定时器是否已走完全程（一次性作业已派发）
    /// Whether the timer ran its full course (one-shot job dispatched)
    pub(crate) done: bool,
    /// 取消信号观察任务
    /// The cancellation watcher task
    pub(crate) watcher: Option<JoinHandle<()>>,
    /// 已签发的分段计数（用于日志）
    /// Count of issued segments (for logging)
    pub(crate) segments_issued: u64,
}

/// 一个逻辑定时器的核心：句柄、链与观察者共享的所有权单元
/// The core of one logical timer: the ownership unit shared by handle,
/// chain and watcher
pub(crate) struct TimerCore<D: TimerDriver> {
    /// 定时器标识
    /// Timer identity
    pub(crate) id: TimerId,
    /// 原生定时器驱动
    /// The native timer driver
    pub(crate) driver: Arc<D>,
    /// 所属引擎（弱引用，终态时回报注册表与统计）
    /// Owning engine (weak; reports back to registry and stats on terminal states)
    pub(crate) engine: Weak<EngineShared<D>>,
    /// 清除标志，一旦置位永不复位
    /// Cleared flag, never reset once raised
    cleared: AtomicBool,
    /// 链状态
    /// Chain state
    state: Mutex<ChainState<D>>,
}

impl<D: TimerDriver> TimerCore<D> {
    /// 创建一个尚未签发任何分段的新核心
    /// Creates a fresh core with no segment issued yet
    pub(crate) fn new(id: TimerId, driver: Arc<D>, engine: Weak<EngineShared<D>>, job: TimerJob) -> Self {
        Self {
            id,
            driver,
            engine,
            cleared: AtomicBool::new(false),
            state: Mutex::new(ChainState {
                native: None,
                target: None,
                final_segment: false,
                keep_alive: true,
                job: Some(job),
                done: false,
                watcher: None,
                segments_issued: 0,
            }),
        }
    }

    /// 创建一个出生即被清除的核心（预先触发的取消信号）
    /// Creates a core that is born cleared (pre-tripped cancellation signal)
    pub(crate) fn pre_cleared(id: TimerId, driver: Arc<D>) -> Self {
        Self {
            id,
            driver,
            engine: Weak::new(),
            cleared: AtomicBool::new(true),
            state: Mutex::new(ChainState {
                native: None,
                target: None,
                final_segment: false,
                keep_alive: true,
                job: None,
                done: false,
                watcher: None,
                segments_issued: 0,
            }),
        }
    }

    /// 获取状态锁
    /// Acquires the state lock
    ///
    /// 锁毒化只可能来自触发派发路径上的用户回调恐慌，状态本身仍然
    /// 一致，因此直接恢复内部值。
    /// A poisoned lock can only come from a user callback panicking on the
    /// dispatch path; the state itself is still consistent, so the inner
    /// value is recovered directly.
    pub(crate) fn lock(&self) -> MutexGuard<'_, ChainState<D>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 清除标志是否已置位
    /// Whether the cleared flag has been raised
    pub(crate) fn cleared(&self) -> bool {
        self.cleared.load(Ordering::SeqCst)
    }

    /// 幂等的清除转换
    /// The idempotent clear transition
    ///
    /// 返回 true 表示本次调用拆除了活跃资源：取消在飞的原生分段、丢弃
    /// 用户作业并中止观察任务。对已走完全程的一次性定时器调用只补置
    /// 清除标志并返回 false；重复清除同样返回 false。
    /// Returns true when this call tore down live resources: the in-flight
    /// native segment is cancelled, the user job dropped and the watcher
    /// task aborted. On a one-shot that already ran its course only the
    /// cleared flag is raised and false is returned; repeated clears return
    /// false as well.
    pub(crate) fn clear(&self) -> bool {
        let (native, watcher, job) = {
            let mut state = self.lock();
            if self.cleared() {
                return false;
            }
            self.cleared.store(true, Ordering::SeqCst);
            if state.done {
                // 已走完全程：资源在完成时就已拆除，这里只补置标志
                // Already ran its course: resources went down at completion,
                // only the flag is raised here
                return false;
            }
            (state.native.take(), state.watcher.take(), state.job.take())
        };
        if let Some(native) = native {
            self.driver.cancel(native);
        }
        if let Some(watcher) = watcher {
            watcher.abort();
        }
        // 用户作业在锁外析构
        // The user job is dropped outside the lock
        drop(job);
        if let Some(shared) = self.engine.upgrade() {
            shared.on_cleared(self.id);
        }
        true
    }

    /// 更新保活语义并转发给在飞的原生分段
    /// Updates keep-alive semantics and forwards them to the in-flight
    /// native segment
    pub(crate) fn set_keep_alive(&self, keep_alive: bool) {
        let mut state = self.lock();
        state.keep_alive = keep_alive;
        if let Some(native) = state.native.as_ref() {
            self.driver.set_keep_alive(native, keep_alive);
        }
    }

    /// 挂接取消观察任务
    /// Attaches the cancellation watcher task
    ///
    /// 若定时器已经终止（已清除或作业已派发完毕），观察任务立即中止，
    /// 不会留下悬挂的信号观察者。
    /// If the timer is already terminal (cleared, or its job fully
    /// dispatched), the watcher is aborted immediately so no dangling signal
    /// observer is left behind.
    pub(crate) fn attach_watcher(&self, watcher: JoinHandle<()>) {
        let mut state = self.lock();
        if self.cleared() || state.done {
            watcher.abort();
        } else {
            state.watcher = Some(watcher);
        }
    }
}
