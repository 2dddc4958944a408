//! 与存储无关的 SPSC 环形缓冲算法。

use spark_transport::{Deadline, Result, TransportError};

use crate::{
    error,
    sync::{self, AtomicU8, AtomicU64, Ordering},
};

/// 环形缓冲的底层存储：两个单写者计数器加一段定长数据区。
///
/// # 契约（What）
/// - `load_*` 必须具备 acquire 语义，`advance_*` 必须具备 release 语义，
///   保证数据写入对另一端的可见性不晚于宣告它的计数器更新；
/// - `write_at`/`read_at` 的物理区间必须落在 `[0, capacity)` 内，越界返回协议错误而非越界访问。
pub trait RingMemory {
    /// 数据区容量。
    fn capacity(&self) -> usize;
    /// 读取消费者位置。
    fn load_head(&self) -> u64;
    /// 读取生产者位置。
    fn load_tail(&self) -> u64;
    /// 消费者释放 `n` 字节。
    fn advance_head(&self, n: u64);
    /// 生产者发布 `n` 字节。
    fn advance_tail(&self, n: u64);
    /// 向物理偏移 `offset` 拷入数据。
    fn write_at(&self, offset: usize, src: &[u8]) -> Result<()>;
    /// 从物理偏移 `offset` 拷出数据。
    fn read_at(&self, offset: usize, dst: &mut [u8]) -> Result<()>;
}

/// 单生产者/单消费者环形缓冲。
///
/// # 教案式注释
///
/// ## 意图 (Why)
/// - 以两个单写者计数器实现无锁字节队列：消费者观察到的字节序列恰好等于生产者提交的字节序列。
///
/// ## 逻辑 (How)
/// - 写：负载超过容量立即失败；否则等待 `tail - head + L <= C`，按 `tail mod C` 拷入（必要时拆成两段），
///   最后以 release 语义推进 tail；
/// - 读：等待 `tail != head`，读取 `min(可用, 缓冲区)` 字节（同样可能拆段），以 release 语义推进 head；
/// - 等待时每轮先检查截止时间，再检查条件，过期即返回超时；条件不满足则短暂休眠。
///
/// ## 契约 (What)
/// - 方法以 `&self` 接收：生产者与消费者各自持有同一存储的视图，
///   由调用方保证同一时刻只有一个写者、一个读者；
/// - 截止时间已过的调用立即以 [`TransportError::DeadlineExceeded`] 失败，缓冲区内容不变。
/// - 未读字节超过容量说明计数器已损坏，读写两侧都以 [`TransportError::Protocol`] 报告，不再等待。
#[derive(Debug)]
pub struct SpscRing<M> {
    memory: M,
}

impl<M: RingMemory> SpscRing<M> {
    pub fn new(memory: M) -> Self {
        Self { memory }
    }

    pub fn memory(&self) -> &M {
        &self.memory
    }

    pub fn into_memory(self) -> M {
        self.memory
    }

    pub fn capacity(&self) -> usize {
        self.memory.capacity()
    }

    /// 当前未读字节数。
    pub fn len(&self) -> usize {
        let tail = self.memory.load_tail();
        let head = self.memory.load_head();
        tail.wrapping_sub(head) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 生产者写入一段负载，返回写入长度。
    pub fn write(&self, payload: &[u8], deadline: Deadline) -> Result<usize> {
        let capacity = self.memory.capacity();
        let len = payload.len();
        if len > capacity {
            return Err(TransportError::PayloadTooLarge { len, max: capacity });
        }

        let tail = loop {
            if deadline.is_expired() {
                return Err(TransportError::deadline_exceeded(error::WRITE));
            }
            let tail = self.memory.load_tail();
            let head = self.memory.load_head();
            let used = tail.wrapping_sub(head);
            if used > capacity as u64 {
                return Err(inconsistent_counters(used, capacity));
            }
            if used.saturating_add(len as u64) <= capacity as u64 {
                break tail;
            }
            sync::pause();
        };
        if len == 0 {
            return Ok(0);
        }

        let offset = (tail % capacity as u64) as usize;
        let first = len.min(capacity - offset);
        self.memory.write_at(offset, &payload[..first])?;
        if first < len {
            self.memory.write_at(0, &payload[first..])?;
        }
        self.memory.advance_tail(len as u64);
        Ok(len)
    }

    /// 消费者读取至多 `buf.len()` 字节，返回读取长度。
    pub fn read(&self, buf: &mut [u8], deadline: Deadline) -> Result<usize> {
        let (head, available) = self.wait_readable(deadline)?;
        let to_read = available.min(buf.len());
        self.copy_out(head, &mut buf[..to_read])?;
        Ok(to_read)
    }

    /// 消费者读取当前全部可用字节。
    pub fn read_available(&self, deadline: Deadline) -> Result<Vec<u8>> {
        let (head, available) = self.wait_readable(deadline)?;
        let mut out = vec![0u8; available];
        self.copy_out(head, &mut out)?;
        Ok(out)
    }

    fn wait_readable(&self, deadline: Deadline) -> Result<(u64, usize)> {
        loop {
            if deadline.is_expired() {
                return Err(TransportError::deadline_exceeded(error::READ));
            }
            let head = self.memory.load_head();
            let tail = self.memory.load_tail();
            if tail != head {
                let available = tail.wrapping_sub(head);
                if available > self.memory.capacity() as u64 {
                    return Err(inconsistent_counters(available, self.memory.capacity()));
                }
                return Ok((head, available as usize));
            }
            sync::pause();
        }
    }

    fn copy_out(&self, head: u64, dst: &mut [u8]) -> Result<()> {
        let len = dst.len();
        if len == 0 {
            return Ok(());
        }
        let capacity = self.memory.capacity();
        let offset = (head % capacity as u64) as usize;
        let first = len.min(capacity - offset);
        self.memory.read_at(offset, &mut dst[..first])?;
        if first < len {
            self.memory.read_at(0, &mut dst[first..])?;
        }
        self.memory.advance_head(len as u64);
        Ok(())
    }
}

/// 进程内的环形存储，每个数据字节是一个原子单元。
///
/// 用于同进程的线程间通道，以及在不创建文件的情况下验证环形算法。
#[derive(Debug)]
pub struct HeapRegion {
    head: AtomicU64,
    tail: AtomicU64,
    data: Box<[AtomicU8]>,
}

impl HeapRegion {
    pub fn new(capacity: usize) -> Self {
        Self {
            head: AtomicU64::new(0),
            tail: AtomicU64::new(0),
            data: (0..capacity).map(|_| AtomicU8::new(0)).collect(),
        }
    }

    fn slots(&self, offset: usize, len: usize) -> Result<&[AtomicU8]> {
        offset
            .checked_add(len)
            .and_then(|end| self.data.get(offset..end))
            .ok_or_else(|| out_of_bounds(offset, len, self.data.len()))
    }
}

impl RingMemory for HeapRegion {
    fn capacity(&self) -> usize {
        self.data.len()
    }

    fn load_head(&self) -> u64 {
        self.head.load(Ordering::Acquire)
    }

    fn load_tail(&self) -> u64 {
        self.tail.load(Ordering::Acquire)
    }

    fn advance_head(&self, n: u64) {
        self.head.fetch_add(n, Ordering::Release);
    }

    fn advance_tail(&self, n: u64) {
        self.tail.fetch_add(n, Ordering::Release);
    }

    fn write_at(&self, offset: usize, src: &[u8]) -> Result<()> {
        for (slot, byte) in self.slots(offset, src.len())?.iter().zip(src) {
            slot.store(*byte, Ordering::Relaxed);
        }
        Ok(())
    }

    fn read_at(&self, offset: usize, dst: &mut [u8]) -> Result<()> {
        let slots = self.slots(offset, dst.len())?;
        for (byte, slot) in dst.iter_mut().zip(slots) {
            *byte = slot.load(Ordering::Relaxed);
        }
        Ok(())
    }
}

fn inconsistent_counters(unread: u64, capacity: usize) -> TransportError {
    TransportError::protocol(format!(
        "环形缓冲计数器不一致：未读 {unread} 字节超过容量 {capacity}"
    ))
}

pub(crate) fn out_of_bounds(offset: usize, len: usize, capacity: usize) -> TransportError {
    TransportError::protocol(format!(
        "环形数据区越界访问：偏移 {offset} 长度 {len} 超出容量 {capacity}"
    ))
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn past() -> Deadline {
        Deadline::at(
            Instant::now()
                .checked_sub(Duration::from_millis(1))
                .expect("单调时钟应允许回退"),
        )
    }

    #[test]
    fn wraps_across_the_physical_end() {
        let ring = SpscRing::new(HeapRegion::new(8));
        ring.write(b"abcdef", Deadline::none()).expect("写入 6 字节");
        let mut buf = [0u8; 4];
        assert_eq!(ring.read(&mut buf, Deadline::none()).expect("读取"), 4);
        assert_eq!(&buf, b"abcd");

        ring.write(b"ghijk", Deadline::none()).expect("跨越物理末尾写入");
        assert_eq!(ring.len(), 7);
        assert_eq!(
            ring.read_available(Deadline::none()).expect("读取全部"),
            b"efghijk"
        );
        assert!(ring.is_empty());
    }

    #[test]
    fn payload_larger_than_capacity_fails_immediately() {
        let ring = SpscRing::new(HeapRegion::new(4));
        let err = ring
            .write(b"12345", Deadline::none())
            .expect_err("超过容量的负载永远写不进去");
        assert!(matches!(
            err,
            TransportError::PayloadTooLarge { len: 5, max: 4 }
        ));
    }

    #[test]
    fn full_ring_times_out_without_touching_contents() {
        let ring = SpscRing::new(HeapRegion::new(4));
        ring.write(b"full", Deadline::none()).expect("写满");

        let err = ring
            .write(b"x", Deadline::after(Duration::from_millis(5)))
            .expect_err("已满时应超时");
        assert!(err.is_timeout());
        assert_eq!(ring.len(), 4);
        assert_eq!(ring.read_available(Deadline::none()).expect("读取"), b"full");
    }

    #[test]
    fn empty_ring_read_times_out() {
        let ring = SpscRing::new(HeapRegion::new(4));
        let mut buf = [0u8; 4];
        let err = ring
            .read(&mut buf, Deadline::after(Duration::from_millis(5)))
            .expect_err("空缓冲读取应超时");
        assert!(err.is_timeout());
    }

    #[test]
    fn past_deadline_fails_even_when_ready() {
        let ring = SpscRing::new(HeapRegion::new(4));
        assert!(ring.write(b"a", past()).expect_err("过期写").is_timeout());
        ring.write(b"a", Deadline::none()).expect("写入");
        let mut buf = [0u8; 1];
        assert!(ring.read(&mut buf, past()).expect_err("过期读").is_timeout());
        assert_eq!(ring.len(), 1);
    }

    #[test]
    fn inconsistent_counters_are_reported() {
        let region = HeapRegion::new(4);
        region.advance_tail(9);
        let ring = SpscRing::new(region);
        let err = ring
            .read_available(Deadline::none())
            .expect_err("未读字节超过容量");
        assert!(matches!(err, TransportError::Protocol(_)));
    }

    #[test]
    fn inconsistent_counters_fail_writes_instead_of_spinning() {
        let region = HeapRegion::new(4);
        region.advance_tail(9);
        let ring = SpscRing::new(region);
        let err = ring
            .write(b"a", Deadline::none())
            .expect_err("未读字节超过容量时写入应立即失败");
        assert!(matches!(err, TransportError::Protocol(_)));
    }

    #[test]
    fn heap_region_copies_round_trip_at_offsets() {
        let region = HeapRegion::new(8);
        region.write_at(5, b"xyz").expect("区间内写入");
        let mut out = [0u8; 3];
        region.read_at(5, &mut out).expect("区间内读取");
        assert_eq!(&out, b"xyz");
    }

    #[test]
    fn out_of_bounds_access_is_rejected() {
        let region = HeapRegion::new(4);
        assert!(region.write_at(3, b"ab").is_err());
        let mut buf = [0u8; 2];
        assert!(region.read_at(usize::MAX, &mut buf).is_err());
    }
}
