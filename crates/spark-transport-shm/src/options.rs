/// 计数器头部长度：head 与 tail 各 8 字节。
pub const HEADER_LEN: usize = 16;

/// 默认环形数据区容量（64 MiB）。
pub const DEFAULT_CAPACITY: usize = 64 * 1024 * 1024;

/// 共享内存通道参数。
///
/// - `capacity`：数据区容量，生产者与消费者必须一致，运行期不做协商；
/// - `reset_on_bind`：监听端绑定时无条件把 head/tail 归零，用于确知没有存活对端的场景。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShmOptions {
    capacity: usize,
    reset_on_bind: bool,
}

impl Default for ShmOptions {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            reset_on_bind: false,
        }
    }
}

impl ShmOptions {
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_reset_on_bind(mut self, reset: bool) -> Self {
        self.reset_on_bind = reset;
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn reset_on_bind(&self) -> bool {
        self.reset_on_bind
    }

    /// 背板文件的最小长度。
    pub fn file_len(&self) -> usize {
        HEADER_LEN + self.capacity
    }
}
