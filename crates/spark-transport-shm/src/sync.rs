//! 原子类型与等待策略的切换点：`cfg(loom)` 下改用 loom 的模型化实现。

use std::time::Duration;

#[cfg(loom)]
pub(crate) use loom::sync::atomic::{AtomicU8, AtomicU64, Ordering};
#[cfg(not(loom))]
pub(crate) use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};

/// 忙等轮询的休眠间隔。
pub(crate) const POLL_INTERVAL: Duration = Duration::from_micros(1);

/// 在一次轮询未满足条件后让出执行权。
pub(crate) fn pause() {
    #[cfg(loom)]
    loom::thread::yield_now();
    #[cfg(not(loom))]
    std::thread::sleep(POLL_INTERVAL);
}
