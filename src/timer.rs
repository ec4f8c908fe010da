//! 链式分段定时器引擎
//! Chained-Segment Timer Engine
//!
//! 该模块实现了跨越有界原生原语的长时定时器：一个逻辑定时器被分解为
//! 一串有界分段，上一个分段到期后立即补发下一个分段，直到按绝对目标
//! 时间计算的剩余跨度耗尽为止。整条链自始至终共享同一个句柄，可随时
//! 取消并查询剩余时间。
//!
//! This module implements long-horizon timers on top of a bounded native
//! primitive: one logical timer is decomposed into a chain of bounded
//! segments, re-issuing the next segment as soon as the previous one expires,
//! until the remaining span derived from the absolute target time is
//! exhausted. The whole chain shares a single handle that stays cancellable
//! and introspectable throughout.

pub(crate) mod chain;
pub mod handle;
pub(crate) mod interval;
pub(crate) mod state;


pub use handle::{Remaining, TimerHandle};
pub use state::TimerId;
