//! 分段调度器
//! Segment scheduler
//!
//! 本模块是链式定时器的状态机：把逻辑延迟换算成绝对目标时间，按原生
//! 上界切出分段逐个签发，并在每个分段到期时决定是续链还是派发用户
//! 作业。所有转换都在核心状态锁内完成，用户回调一律在锁外调用。
//!
//! This module is the state machine of a chained timer: it converts the
//! logical delay into an absolute target time, carves segments off it at the
//! native bound and issues them one by one, deciding at every segment expiry
//! whether to extend the chain or dispatch the user job. All transitions
//! happen inside the core state lock; user callbacks always run outside it.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace};

use crate::driver::{SegmentCallback, TimerDriver};

use super::interval;
use super::state::{ChainState, TimerCore, TimerJob};

/// 启动一条新链
/// Starts a fresh chain
///
/// 目标时间无法表示时不签发任何分段：定时器保持无界挂起，只能被清除。
/// When the target time is not representable no segment is issued: the timer
/// stays pending unbounded and can only be cleared.
pub(crate) fn start<D: TimerDriver>(core: &Arc<TimerCore<D>>, total_delay: Duration) {
    let mut state = core.lock();
    match core.driver.now().checked_add(total_delay) {
        Some(target) => {
            state.target = Some(target);
            issue_segment(core, &mut state, total_delay);
        }
        None => {
            state.target = None;
            debug!(
                timer_id = core.id,
                delay_ms = total_delay.as_millis() as u64,
                "target time not representable, timer will never fire"
            );
        }
    }
}

/// 按剩余跨度签发下一个原生分段
/// Issues the next native segment for the given remaining span
///
/// 剩余跨度超过原生上界时按上界截断，是否为最后一段在签发时就已确定。
/// Spans beyond the native bound are capped at it; whether the segment is
/// the final one is decided right here at issue time.
pub(crate) fn issue_segment<D: TimerDriver>(
    core: &Arc<TimerCore<D>>,
    state: &mut ChainState<D>,
    remaining: Duration,
) {
    let max_segment = core.driver.max_segment();
    let span = remaining.min(max_segment);
    let is_final = remaining <= max_segment;

    let callback: SegmentCallback = {
        let core = Arc::clone(core);
        Box::new(move || on_segment_fired(&core))
    };
    let native = core.driver.schedule(span, callback);
    if !state.keep_alive {
        core.driver.set_keep_alive(&native, false);
    }
    state.native = Some(native);
    state.final_segment = is_final;
    state.segments_issued += 1;

    if let Some(shared) = core.engine.upgrade() {
        shared.stats().record_segment();
    }
    trace!(
        timer_id = core.id,
        segment = state.segments_issued,
        span_ms = span.as_millis() as u64,
        is_final,
        "native segment issued"
    );
}

/// 原生分段到期入口
/// Entry point for an expired native segment
///
/// 非最后一段：按绝对目标时间重新计算剩余跨度并续链。最后一段：取出
/// 用户作业并派发。清除与到期在状态锁上线性化，先拿到锁的一方获胜。
/// Non-final segment: recompute the remaining span from the absolute target
/// and extend the chain. Final segment: check out the user job and dispatch
/// it. Clear and expiry linearize on the state lock; whoever takes the lock
/// first wins.
pub(crate) fn on_segment_fired<D: TimerDriver>(core: &Arc<TimerCore<D>>) {
    let job = {
        let mut state = core.lock();
        if core.cleared() {
            // 清除先持锁，本次到期作废
            // A clear won the lock first; this expiry is void
            return;
        }
        state.native = None;
        if !state.final_segment {
            if let Some(target) = state.target {
                let remaining = target.saturating_duration_since(core.driver.now());
                issue_segment(core, &mut state, remaining);
            }
            return;
        }
        let job = state.job.take();
        if !matches!(job, Some(TimerJob::Repeat { .. })) {
            // 一次性定时器到此终结，先注销观察任务再派发
            // A one-shot is terminal here; deregister the watcher before dispatch
            state.done = true;
            if let Some(watcher) = state.watcher.take() {
                watcher.abort();
            }
        }
        job
    };

    match job {
        Some(TimerJob::Once(callback)) => {
            if let Some(shared) = core.engine.upgrade() {
                shared.on_completed(core.id);
            }
            debug!(timer_id = core.id, "timer elapsed");
            callback();
        }
        Some(TimerJob::Repeat { period, tick }) => {
            interval::on_cycle_elapsed(core, period, tick);
        }
        // 作业已被并发派发取走
        // The job was checked out by a concurrent dispatch
        None => {}
    }
}
