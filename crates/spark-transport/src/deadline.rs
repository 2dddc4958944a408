use std::time::{Duration, Instant};

/// 连接读写使用的绝对截止时间。
///
/// # 教案式注释
///
/// ## 意图 (Why)
/// - 以单调时钟上的绝对时刻表达超时，使跨多次系统调用的读写（例如帧体的完整读取）
///   仍受同一个时间上限约束；
/// - `Deadline::none()` 表示永久阻塞，清除截止时间不会影响已部分消费的帧状态。
///
/// ## 逻辑 (How)
/// - 内部只保存 `Option<Instant>`；
/// - 套接字实现调用 [`Deadline::remaining`] 把剩余时长写入 OS 级超时，
///   共享内存实现则在轮询循环中调用 [`Deadline::is_expired`]。
///
/// ## 契约 (What)
/// - `remaining()` 在未设置时返回 `None`，已过期时返回 `Some(Duration::ZERO)`；
/// - 过去的截止时间意味着操作在触碰底层资源前立即以超时失败。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    /// 不设截止时间。
    pub const fn none() -> Self {
        Self(None)
    }

    /// 指定绝对时刻。
    pub const fn at(instant: Instant) -> Self {
        Self(Some(instant))
    }

    /// 从当前时刻起经过 `timeout` 后到期。
    pub fn after(timeout: Duration) -> Self {
        Self(Instant::now().checked_add(timeout))
    }

    /// 将毫秒配置转换为截止时间，`0` 表示不设限。
    pub fn from_millis(millis: u64) -> Self {
        if millis == 0 {
            Self::none()
        } else {
            Self::after(Duration::from_millis(millis))
        }
    }

    /// 返回内部时刻。
    pub fn instant(&self) -> Option<Instant> {
        self.0
    }

    /// 是否设置了截止时间。
    pub fn is_set(&self) -> bool {
        self.0.is_some()
    }

    /// 截止时间是否已经过去。
    pub fn is_expired(&self) -> bool {
        match self.0 {
            Some(target) => target <= Instant::now(),
            None => false,
        }
    }

    /// 距离截止时间的剩余时长。
    pub fn remaining(&self) -> Option<Duration> {
        self.0
            .map(|target| target.saturating_duration_since(Instant::now()))
    }
}

impl From<Instant> for Deadline {
    fn from(instant: Instant) -> Self {
        Self::at(instant)
    }
}

impl From<Option<Instant>> for Deadline {
    fn from(instant: Option<Instant>) -> Self {
        Self(instant)
    }
}
