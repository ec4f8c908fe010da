//! 引擎运行统计
//! Engine runtime statistics

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// 内部原子计数器，终态路径上无锁更新
/// Internal atomic counters, updated lock-free on terminal paths
#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    scheduled: AtomicU64,
    completed: AtomicU64,
    cleared: AtomicU64,
    segments_issued: AtomicU64,
}

impl StatsCounters {
    pub(crate) fn record_scheduled(&self) {
        self.scheduled.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_completed(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_cleared(&self) {
        self.cleared.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_segment(&self) {
        self.segments_issued.fetch_add(1, Ordering::Relaxed);
    }

    /// 抓取一份快照
    /// Takes a snapshot
    pub(crate) fn snapshot(&self, active: usize) -> TimerStats {
        TimerStats {
            scheduled: self.scheduled.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            cleared: self.cleared.load(Ordering::Relaxed),
            segments_issued: self.segments_issued.load(Ordering::Relaxed),
            active,
        }
    }
}

/// 定时器引擎统计快照
/// Snapshot of timer engine statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimerStats {
    /// 已调度的定时器总数
    /// Total timers scheduled
    pub scheduled: u64,
    /// 正常到期完成的一次性定时器总数
    /// Total one-shot timers that elapsed normally
    pub completed: u64,
    /// 到期前被清除的定时器总数
    /// Total timers cleared before expiry
    pub cleared: u64,
    /// 已签发的原生分段总数
    /// Total native segments issued
    pub segments_issued: u64,
    /// 当前活跃的定时器数
    /// Timers currently active
    pub active: usize,
}

impl fmt::Display for TimerStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TimerStats {{ scheduled: {}, completed: {}, cleared: {}, segments: {}, active: {} }}",
            self.scheduled, self.completed, self.cleared, self.segments_issued, self.active
        )
    }
}
