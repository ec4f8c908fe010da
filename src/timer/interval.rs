//! 周期定时器的循环推进
//! Cycle advancement for repeating timers
//!
//! 周期节奏锚定绝对时间：每完成一个整周期，目标时间先推进一个周期再
//! 调用用户回调，因此节奏不随回调耗时漂移。下一个分段在回调返回之后
//! 才签发，同一定时器的回调永不重叠。
//!
//! The repeating cadence is anchored to absolute time: after each full cycle
//! the target time is advanced by one period before the user callback runs,
//! so the cadence does not drift with callback duration. The next segment is
//! issued only after the callback returns; callbacks of one timer never
//! overlap.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace};

use crate::driver::TimerDriver;

use super::chain;
use super::state::{TimerCore, TimerJob};

/// 一个完整周期结束后的推进步骤
/// The advancement step after one full cycle has elapsed
///
/// 作业已由 [`chain::on_segment_fired`] 在锁内取出；本函数负责推进
/// 目标、调用回调、放回作业并续签下一个周期的分段。期间任何一次
/// 清除（包括回调内部的自清除）都会终止循环。
/// The job was already checked out under the lock by
/// [`chain::on_segment_fired`]; this function advances the target, runs the
/// callback, puts the job back and issues the next cycle's segment. Any
/// clear in between, including a self-clear from inside the callback, ends
/// the loop.
pub(crate) fn on_cycle_elapsed<D: TimerDriver>(
    core: &Arc<TimerCore<D>>,
    period: Duration,
    mut tick: Box<dyn FnMut() + Send + 'static>,
) {
    {
        let mut state = core.lock();
        if core.cleared() {
            return;
        }
        match state.target.and_then(|target| target.checked_add(period)) {
            Some(next) => state.target = Some(next),
            None => state.target = None,
        }
    }

    trace!(timer_id = core.id, "interval cycle elapsed");
    tick();

    let mut state = core.lock();
    if core.cleared() {
        // 回调内部或并发的清除获胜，作业随 tick 一起丢弃
        // A reentrant or concurrent clear won; the job is dropped with the tick
        return;
    }
    match state.target {
        Some(target) => {
            let remaining = target.saturating_duration_since(core.driver.now());
            state.job = Some(TimerJob::Repeat { period, tick });
            chain::issue_segment(core, &mut state, remaining);
        }
        None => {
            // 目标时间溢出：周期转入静默，保留作业以维持可清除的活跃态
            // Target overflow: the cycle goes quiescent, keeping the job so
            // the timer stays active and clearable
            state.job = Some(TimerJob::Repeat { period, tick });
            debug!(
                timer_id = core.id,
                "next cycle target not representable, interval goes quiescent"
            );
        }
    }
}
