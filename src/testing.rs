//! 测试辅助工具模块
//! Test utilities module
//!
//! [`MockTimer`] 是一个运行在虚拟时钟上的确定性驱动：分段只在显式
//! 调用 [`MockTimer::advance`] 时到期，签发与取消全程留痕，测试可以
//! 精确断言一条链切出了多少段、每段多长、保活位是什么。
//!
//! [`MockTimer`] is a deterministic driver on a virtual clock: segments
//! expire only on explicit [`MockTimer::advance`] calls, and every issue and
//! cancel leaves a record, so tests can assert exactly how many segments a
//! chain carved, how long each was and what its keep-alive bit said.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;
use tracing::trace;

use crate::driver::{SegmentCallback, TimerDriver, MAX_SEGMENT};

/// Mock 驱动签发的原生分段标识
/// Identity of a native segment issued by the mock driver
pub type MockSegmentId = u64;

/// 一条签发记录
/// One issue record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentRecord {
    /// 分段标识
    /// Segment identity
    pub id: MockSegmentId,
    /// 分段跨度
    /// Segment span
    pub span: Duration,
    /// 签发时（或事后更新的）保活位
    /// Keep-alive bit at issue time (or as updated later)
    pub keep_alive: bool,
}

/// 尚未到期的分段
/// A segment not yet expired
struct PendingSegment {
    id: MockSegmentId,
    deadline: Instant,
    callback: SegmentCallback,
}

struct MockInner {
    /// 虚拟时钟原点
    /// Origin of the virtual clock
    base: Instant,
    /// 距原点的虚拟偏移
    /// Virtual offset from the origin
    elapsed: Duration,
    /// 原生上界
    /// The native bound
    max_segment: Duration,
    /// 未到期分段
    /// Pending segments
    pending: Vec<PendingSegment>,
    /// 全部签发记录，按签发顺序
    /// All issue records, in issue order
    issued: Vec<SegmentRecord>,
    /// 被取消的分段标识
    /// Identities of cancelled segments
    cancelled: Vec<MockSegmentId>,
    next_id: MockSegmentId,
}

/// 虚拟时钟上的确定性定时器驱动
/// A deterministic timer driver on a virtual clock
///
/// 克隆得到同一时钟的另一个句柄，测试侧保留一份即可在引擎调度后
/// 推进时间。
/// Cloning yields another handle to the same clock; the test keeps one to
/// advance time after the engine has scheduled.
#[derive(Clone)]
pub struct MockTimer {
    inner: Arc<Mutex<MockInner>>,
}

impl Default for MockTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MockTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("MockTimer")
            .field("elapsed", &inner.elapsed)
            .field("pending", &inner.pending.len())
            .field("issued", &inner.issued.len())
            .finish()
    }
}

impl MockTimer {
    /// 以真实的原生上界创建
    /// Creates with the real native bound
    pub fn new() -> Self {
        Self::with_max_segment(MAX_SEGMENT)
    }

    /// 以人为缩小的原生上界创建，便于在小延迟下观察分段行为
    /// Creates with an artificially small native bound, so segmentation is
    /// observable at small delays
    pub fn with_max_segment(max_segment: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockInner {
                base: Instant::now(),
                elapsed: Duration::ZERO,
                max_segment,
                pending: Vec::new(),
                issued: Vec::new(),
                cancelled: Vec::new(),
                next_id: 1,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 推进虚拟时钟并触发所有到期分段
    /// Advances the virtual clock and fires every segment that came due
    ///
    /// 到期分段按（截止时间，标识）顺序触发，触发期间不持有内部锁，
    /// 因此回调里补发的新分段若也已到期，会在同一次推进中继续触发。
    /// Due segments fire in (deadline, id) order with the internal lock
    /// released, so segments re-issued from inside a callback fire within
    /// the same advance when they are already due.
    pub fn advance(&self, span: Duration) {
        {
            let mut inner = self.lock();
            inner.elapsed = inner.elapsed.saturating_add(span);
        }
        loop {
            let segment = {
                let mut inner = self.lock();
                let now = inner.base + inner.elapsed;
                let due = inner
                    .pending
                    .iter()
                    .enumerate()
                    .filter(|(_, segment)| segment.deadline <= now)
                    .min_by_key(|(_, segment)| (segment.deadline, segment.id))
                    .map(|(index, _)| index);
                match due {
                    Some(index) => inner.pending.swap_remove(index),
                    None => break,
                }
            };
            trace!(segment_id = segment.id, "mock segment expired");
            (segment.callback)();
        }
    }

    /// 已签发的分段总数
    /// Total segments issued so far
    pub fn segment_count(&self) -> usize {
        self.lock().issued.len()
    }

    /// 全部签发记录
    /// All issue records
    pub fn segments(&self) -> Vec<SegmentRecord> {
        self.lock().issued.clone()
    }

    /// 尚未到期的分段数量
    /// Number of segments not yet expired
    pub fn pending_count(&self) -> usize {
        self.lock().pending.len()
    }

    /// 被取消的分段标识
    /// Identities of cancelled segments
    pub fn cancelled(&self) -> Vec<MockSegmentId> {
        self.lock().cancelled.clone()
    }
}

impl TimerDriver for MockTimer {
    type Native = MockSegmentId;

    fn schedule(&self, span: Duration, on_fire: SegmentCallback) -> Self::Native {
        let mut inner = self.lock();
        assert!(
            span <= inner.max_segment,
            "segment span {span:?} exceeds the native bound {:?}",
            inner.max_segment
        );
        let id = inner.next_id;
        inner.next_id += 1;
        let deadline = inner.base + inner.elapsed + span;
        inner.pending.push(PendingSegment {
            id,
            deadline,
            callback: on_fire,
        });
        inner.issued.push(SegmentRecord {
            id,
            span,
            keep_alive: true,
        });
        id
    }

    fn cancel(&self, native: Self::Native) {
        let mut inner = self.lock();
        inner.pending.retain(|segment| segment.id != native);
        inner.cancelled.push(native);
    }

    fn set_keep_alive(&self, native: &Self::Native, keep_alive: bool) {
        let mut inner = self.lock();
        if let Some(record) = inner
            .issued
            .iter_mut()
            .rev()
            .find(|record| record.id == *native)
        {
            record.keep_alive = keep_alive;
        }
    }

    fn now(&self) -> Instant {
        let inner = self.lock();
        inner.base + inner.elapsed
    }

    fn max_segment(&self) -> Duration {
        self.lock().max_segment
    }
}
