//! 定时器引擎
//! Timer engine
//!
//! [`TimerEngine`] 是调度入口：为每个逻辑定时器分配标识、维护活跃
//! 注册表与统计，并把延迟交给链式分段调度，从而突破原生原语的时长
//! 上界。进程级默认引擎由模块级自由函数封装，开箱即用。
//!
//! [`TimerEngine`] is the scheduling entry point: it allocates identities
//! for logical timers, maintains the active registry and statistics, and
//! hands delays to the chained segment scheduler, lifting the duration bound
//! of the native primitive. A process-wide default engine is wrapped by
//! module-level free functions for out-of-the-box use.

pub mod stats;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::oneshot;
use tracing::{debug, trace, warn};

use crate::driver::{TimerDriver, TokioTimer};
use crate::error::{Error, Result};
use crate::signal::CancelSignal;
use crate::timer::chain;
use crate::timer::state::{TimerCore, TimerId, TimerJob};
use crate::timer::TimerHandle;

pub use stats::TimerStats;

use self::stats::StatsCounters;

/// 支撑 delay 的定时器被外部清除时返回的错误消息
/// Error message returned when the timer backing a delay is cleared
/// externally
const DELAY_CLEARED_MESSAGE: &str = "the timer backing this delay was cleared";

/// 引擎的共享内部：驱动、注册表与统计
/// The engine's shared internals: driver, registry and stats
pub(crate) struct EngineShared<D: TimerDriver> {
    /// 原生定时器驱动
    /// The native timer driver
    driver: Arc<D>,
    /// 活跃定时器注册表；弱引用，终态时移除
    /// Active timer registry; weak references, removed on terminal states
    registry: DashMap<TimerId, Weak<TimerCore<D>>>,
    /// 下一个分配的定时器标识
    /// Next timer identity to allocate
    next_id: AtomicU64,
    /// 统计计数器
    /// Statistics counters
    stats: StatsCounters,
}

impl<D: TimerDriver> EngineShared<D> {
    fn allocate_id(&self) -> TimerId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn stats(&self) -> &StatsCounters {
        &self.stats
    }

    /// 一次性定时器正常到期的终态回报
    /// Terminal report for a one-shot that elapsed normally
    pub(crate) fn on_completed(&self, id: TimerId) {
        self.registry.remove(&id);
        self.stats.record_completed();
    }

    /// 清除转换的终态回报
    /// Terminal report for the clear transition
    pub(crate) fn on_cleared(&self, id: TimerId) {
        if self.registry.remove(&id).is_some() {
            self.stats.record_cleared();
        }
    }
}

/// 链式分段定时器引擎
/// The chained-segment timer engine
///
/// 克隆引擎得到同一实例的另一个句柄。已调度的定时器不依附任何引擎
/// 句柄：即使全部句柄被丢弃，链也会继续运行直到到期或被清除。
/// Cloning the engine yields another handle to the same instance. Scheduled
/// timers are not tied to any engine handle: even after every handle is
/// dropped the chains keep running to expiry or clear.
pub struct TimerEngine<D: TimerDriver> {
    shared: Arc<EngineShared<D>>,
}

impl<D: TimerDriver> Clone for TimerEngine<D> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<D: TimerDriver> fmt::Debug for TimerEngine<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerEngine")
            .field("active", &self.active())
            .finish()
    }
}

impl TimerEngine<TokioTimer> {
    /// 创建由 Tokio 运行时驱动的引擎
    /// Creates an engine driven by the Tokio runtime
    pub fn new() -> Self {
        Self::with_driver(TokioTimer)
    }
}

impl Default for TimerEngine<TokioTimer> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: TimerDriver> TimerEngine<D> {
    /// 以自定义驱动创建引擎
    /// Creates an engine with a custom driver
    ///
    /// 测试中与 [`crate::testing::MockTimer`] 配合使用，可在虚拟时间
    /// 上确定性地驱动链。
    /// Pairs with [`crate::testing::MockTimer`] in tests to drive chains
    /// deterministically on virtual time.
    pub fn with_driver(driver: D) -> Self {
        Self {
            shared: Arc::new(EngineShared {
                driver: Arc::new(driver),
                registry: DashMap::new(),
                next_id: AtomicU64::new(1),
                stats: StatsCounters::default(),
            }),
        }
    }

    /// 调度一次性定时器
    /// Schedules a one-shot timer
    ///
    /// 延迟超出原生上界时自动分段。回调在到期后被调用恰好一次；清除
    /// 先于到期则一次也不调用。
    /// Delays beyond the native bound are segmented automatically. The
    /// callback is invoked exactly once after expiry, or not at all when a
    /// clear gets there first.
    pub fn schedule_timeout<F>(&self, delay: Duration, callback: F) -> TimerHandle<D>
    where
        F: FnOnce() + Send + 'static,
    {
        self.schedule_job(delay, TimerJob::Once(Box::new(callback)))
    }

    /// 调度一次性定时器并与取消信号联动
    /// Schedules a one-shot timer wired to a cancellation signal
    ///
    /// 信号取消即清除定时器。信号已处于取消态时返回出生即清除的句柄，
    /// 完全不触碰分段调度。定时器到期或被清除后，信号观察任务随之
    /// 注销，不会残留观察者。
    /// Cancelling the signal clears the timer. When the signal is already
    /// cancelled a born-cleared handle is returned and segment scheduling is
    /// never touched. Once the timer elapses or is cleared the signal
    /// watcher task is deregistered; no observer is left behind.
    pub fn schedule_timeout_with_signal<F>(
        &self,
        delay: Duration,
        callback: F,
        signal: &CancelSignal,
    ) -> TimerHandle<D>
    where
        F: FnOnce() + Send + 'static,
    {
        if signal.is_cancelled() {
            let id = self.shared.allocate_id();
            trace!(timer_id = id, "signal already cancelled, timer born cleared");
            return TimerHandle::new(Arc::new(TimerCore::pre_cleared(
                id,
                Arc::clone(&self.shared.driver),
            )));
        }

        let handle = self.schedule_job(delay, TimerJob::Once(Box::new(callback)));
        let watcher = tokio::spawn({
            let signal = signal.clone();
            let core = Arc::clone(handle.core());
            async move {
                signal.cancelled().await;
                if core.clear() {
                    debug!(timer_id = core.id, "timer cleared by cancellation signal");
                }
            }
        });
        handle.core().attach_watcher(watcher);
        handle
    }

    /// 调度周期定时器
    /// Schedules a repeating timer
    ///
    /// 首个周期与后续周期等长。回调之间绝不重叠；节奏锚定绝对时间，
    /// 不随回调耗时漂移。周期定时器只能通过清除停止。
    /// The first cycle is as long as every later one. Callbacks never
    /// overlap; the cadence is anchored to absolute time and does not drift
    /// with callback duration. A repeating timer stops only when cleared.
    pub fn schedule_interval<F>(&self, period: Duration, tick: F) -> TimerHandle<D>
    where
        F: FnMut() + Send + 'static,
    {
        self.schedule_job(
            period,
            TimerJob::Repeat {
                period,
                tick: Box::new(tick),
            },
        )
    }

    fn schedule_job(&self, delay: Duration, job: TimerJob) -> TimerHandle<D> {
        let id = self.shared.allocate_id();
        let core = Arc::new(TimerCore::new(
            id,
            Arc::clone(&self.shared.driver),
            Arc::downgrade(&self.shared),
            job,
        ));
        self.shared.registry.insert(id, Arc::downgrade(&core));
        self.shared.stats.record_scheduled();
        trace!(
            timer_id = id,
            delay_ms = delay.as_millis() as u64,
            "timer scheduled"
        );
        chain::start(&core, delay);
        TimerHandle::new(core)
    }

    /// 挂起直到给定时长过去
    /// Suspends until the given span has passed
    ///
    /// 基于一次性定时器实现，同样不受原生上界限制。未来被提前丢弃时
    /// 定时器随之清除；定时器被外部清除（例如 clear_all）时返回取消
    /// 错误。
    /// Built on a one-shot timer, so it is equally free of the native bound.
    /// Dropping the future early clears the timer with it; when the timer is
    /// cleared externally (clear_all for instance) a cancellation error is
    /// returned.
    pub async fn delay(&self, duration: Duration) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        let _guard = ClearOnDrop::new(self.schedule_timeout(duration, move || {
            if tx.send(()).is_err() {
                warn!("delay elapsed but the waiter was gone");
            }
        }));
        match rx.await {
            Ok(()) => Ok(()),
            Err(_) => Err(Error::cancelled_with(DELAY_CLEARED_MESSAGE)),
        }
    }

    /// 挂起直到时长过去或信号取消，二者同备时取消优先
    /// Suspends until the span passes or the signal cancels; cancellation
    /// wins when both are ready
    ///
    /// 信号已处于取消态时立即返回取消错误，不调度任何定时器。
    /// When the signal is already cancelled a cancellation error is returned
    /// immediately and no timer is scheduled.
    pub async fn delay_with_signal(&self, duration: Duration, signal: &CancelSignal) -> Result<()> {
        if signal.is_cancelled() {
            return Err(Error::cancelled());
        }
        let (tx, rx) = oneshot::channel();
        let _guard = ClearOnDrop::new(self.schedule_timeout(duration, move || {
            if tx.send(()).is_err() {
                warn!("delay elapsed but the waiter was gone");
            }
        }));
        tokio::select! {
            biased;
            _ = signal.cancelled() => Err(Error::cancelled()),
            elapsed = rx => match elapsed {
                Ok(()) => Ok(()),
                Err(_) => Err(Error::cancelled_with(DELAY_CLEARED_MESSAGE)),
            },
        }
    }

    /// 清除所有活跃定时器，返回本次清除的数量
    /// Clears every active timer, returning how many this call cleared
    pub fn clear_all(&self) -> usize {
        // 先收集再清除：清除会回调注册表删除，不能在分片迭代中进行
        // Collect first, then clear: clearing removes registry entries,
        // which must not happen while iterating the shards
        let cores: Vec<Arc<TimerCore<D>>> = self
            .shared
            .registry
            .iter()
            .filter_map(|entry| entry.value().upgrade())
            .collect();
        let mut cleared = 0;
        for core in cores {
            if core.clear() {
                cleared += 1;
            }
        }
        debug!(count = cleared, "cleared all active timers");
        cleared
    }

    /// 当前活跃的定时器数量
    /// Number of currently active timers
    pub fn active(&self) -> usize {
        self.shared.registry.len()
    }

    /// 运行统计快照
    /// Snapshot of runtime statistics
    pub fn stats(&self) -> TimerStats {
        self.shared.stats.snapshot(self.active())
    }
}

/// 随未来一同存亡的清除守卫
/// A clear guard that lives and dies with its future
///
/// delay 的未来被丢弃（包括 select 落选）时，底层定时器立即清除，
/// 不会有分段继续在后台走完全年。
/// When a delay future is dropped, losing a select included, the backing
/// timer is cleared on the spot; no segment keeps marching through the rest
/// of the year in the background.
struct ClearOnDrop<D: TimerDriver> {
    handle: TimerHandle<D>,
}

impl<D: TimerDriver> ClearOnDrop<D> {
    fn new(handle: TimerHandle<D>) -> Self {
        Self { handle }
    }
}

impl<D: TimerDriver> Drop for ClearOnDrop<D> {
    fn drop(&mut self) {
        self.handle.clear();
    }
}

/// 进程级默认引擎
/// The process-wide default engine
static DEFAULT_ENGINE: OnceLock<TimerEngine<TokioTimer>> = OnceLock::new();

/// 返回进程级默认引擎，首次访问时创建
/// Returns the process-wide default engine, created on first access
pub fn default_engine() -> &'static TimerEngine<TokioTimer> {
    DEFAULT_ENGINE.get_or_init(TimerEngine::new)
}

/// 在默认引擎上调度一次性定时器
/// Schedules a one-shot timer on the default engine
///
/// 必须在 Tokio 运行时内调用。
/// Must be called inside a Tokio runtime.
pub fn schedule_timeout<F>(delay: Duration, callback: F) -> TimerHandle<TokioTimer>
where
    F: FnOnce() + Send + 'static,
{
    default_engine().schedule_timeout(delay, callback)
}

/// 在默认引擎上调度与取消信号联动的一次性定时器
/// Schedules a signal-wired one-shot timer on the default engine
pub fn schedule_timeout_with_signal<F>(
    delay: Duration,
    callback: F,
    signal: &CancelSignal,
) -> TimerHandle<TokioTimer>
where
    F: FnOnce() + Send + 'static,
{
    default_engine().schedule_timeout_with_signal(delay, callback, signal)
}

/// 在默认引擎上调度周期定时器
/// Schedules a repeating timer on the default engine
pub fn schedule_interval<F>(period: Duration, tick: F) -> TimerHandle<TokioTimer>
where
    F: FnMut() + Send + 'static,
{
    default_engine().schedule_interval(period, tick)
}

/// 在默认引擎上挂起给定时长
/// Suspends for the given span on the default engine
pub async fn delay(duration: Duration) -> Result<()> {
    default_engine().delay(duration).await
}

/// 在默认引擎上挂起给定时长，可被信号取消
/// Suspends for the given span on the default engine, cancellable by signal
pub async fn delay_with_signal(duration: Duration, signal: &CancelSignal) -> Result<()> {
    default_engine().delay_with_signal(duration, signal).await
}

/// 清除默认引擎上的所有活跃定时器
/// Clears every active timer on the default engine
pub fn clear_all() -> usize {
    default_engine().clear_all()
}
