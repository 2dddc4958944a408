use std::fs::{File, OpenOptions};
use std::io;
use std::num::NonZeroUsize;
use std::path::Path;
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicU64, Ordering};

use nix::sys::mman::{MapFlags, ProtFlags, mmap, munmap};
use spark_transport::{Result, TransportError};
use tracing::debug;

use crate::{
    error,
    options::{HEADER_LEN, ShmOptions},
    ring::{RingMemory, out_of_bounds},
};

const HEAD_OFFSET: usize = 0;
const TAIL_OFFSET: usize = 8;

/// 一段 `MAP_SHARED` 读写映射，析构时 `munmap`。
#[derive(Debug)]
struct Mapping {
    ptr: NonNull<u8>,
    len: usize,
}

impl Mapping {
    fn map(file: &File, len: usize) -> io::Result<Self> {
        let length = NonZeroUsize::new(len)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "映射长度为 0"))?;
        // SAFETY: 不指定地址提示，内核选择新区域，不覆盖任何已有内存；`file` 在调用期间保持打开，
        // 且其长度已被扩展到至少 `len` 字节。
        let raw = unsafe {
            mmap(
                None,
                length,
                ProtFlags::PROT_READ | ProtFlags::PROT_WRITE,
                MapFlags::MAP_SHARED,
                file,
                0,
            )
        }
        .map_err(io::Error::from)?;
        Ok(Self {
            ptr: raw.cast::<u8>(),
            len,
        })
    }
}

impl Drop for Mapping {
    fn drop(&mut self) {
        // SAFETY: `ptr`/`len` 正是 `mmap` 返回的映射；所有借用它的视图都属于同一个
        // `MappedRegion`，在本字段析构前已不可再访问。
        if let Err(errno) = unsafe { munmap(self.ptr.cast(), self.len) } {
            debug!(error = %errno, "munmap 失败");
        }
    }
}

/// 映射内固定偏移上的 head/tail 计数器，只暴露原子读与原子加。
///
/// head 只由消费者推进，tail 只由生产者推进；发布使用 release，观察使用 acquire。
#[derive(Debug)]
pub struct SharedCounters {
    head: NonNull<AtomicU64>,
    tail: NonNull<AtomicU64>,
}

impl SharedCounters {
    fn head(&self) -> &AtomicU64 {
        // SAFETY: 指针指向映射起始处，映射按页对齐，满足 `AtomicU64` 的 8 字节对齐；
        // `AtomicU64` 与 `u64` 布局相同，映射存活期间引用有效。
        unsafe { self.head.as_ref() }
    }

    fn tail(&self) -> &AtomicU64 {
        // SAFETY: 同 `head`，偏移 8 同样满足对齐。
        unsafe { self.tail.as_ref() }
    }

    /// 读取消费者位置。
    pub fn load_head(&self) -> u64 {
        self.head().load(Ordering::Acquire)
    }

    /// 读取生产者位置。
    pub fn load_tail(&self) -> u64 {
        self.tail().load(Ordering::Acquire)
    }

    /// 消费者释放 `n` 字节。
    pub fn advance_head(&self, n: u64) {
        self.head().fetch_add(n, Ordering::Release);
    }

    /// 生产者发布 `n` 字节。
    pub fn advance_tail(&self, n: u64) {
        self.tail().fetch_add(n, Ordering::Release);
    }

    /// 将两个计数器归零；只能在确知没有存活对端时调用。
    pub fn reset(&self) {
        self.tail().store(0, Ordering::SeqCst);
        self.head().store(0, Ordering::SeqCst);
    }
}

/// 映射内的环形数据区，所有访问都经过越界检查。
#[derive(Debug)]
pub struct RingData {
    base: NonNull<u8>,
    len: usize,
}

impl RingData {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn check(&self, offset: usize, len: usize) -> Result<()> {
        match offset.checked_add(len) {
            Some(end) if end <= self.len => Ok(()),
            _ => Err(out_of_bounds(offset, len, self.len)),
        }
    }

    /// 向偏移 `offset` 拷入数据。
    pub fn write_at(&self, offset: usize, src: &[u8]) -> Result<()> {
        self.check(offset, src.len())?;
        // SAFETY: 区间已通过越界检查；SPSC 纪律保证生产者写入的区间不在消费者的未释放区间内，
        // 且使用原始指针拷贝，不在共享内存上构造 `&mut [u8]`。
        unsafe {
            ptr::copy_nonoverlapping(src.as_ptr(), self.base.as_ptr().add(offset), src.len());
        }
        Ok(())
    }

    /// 从偏移 `offset` 拷出数据。
    pub fn read_at(&self, offset: usize, dst: &mut [u8]) -> Result<()> {
        self.check(offset, dst.len())?;
        // SAFETY: 区间已通过越界检查；该区间已由生产者以 release 语义发布，
        // 在消费者推进 head 之前生产者不会改写。
        unsafe {
            ptr::copy_nonoverlapping(self.base.as_ptr().add(offset), dst.as_mut_ptr(), dst.len());
        }
        Ok(())
    }
}

/// 映射到内存的环形缓冲背板文件。
///
/// # 教案式注释
///
/// ## 意图 (Why)
/// - 把 `mmap` 与指针运算限制在本类型内部，传输逻辑只能通过 [`SharedCounters`] 与 [`RingData`] 访问共享内存。
///
/// ## 逻辑 (How)
/// - 打开（必要时创建）文件；长度不足 `16 + capacity` 时扩展，从不收缩，从不重置计数器；
/// - 以 `MAP_SHARED` 读写映射 `16 + capacity` 字节，分别切出计数器与数据区视图。
///
/// ## 契约 (What)
/// - 两端必须使用相同容量；
/// - 析构时解除映射并关闭文件，不保证刷盘。
#[derive(Debug)]
pub struct MappedRegion {
    counters: SharedCounters,
    data: RingData,
    _file: File,
    mapping: Mapping,
}

// SAFETY: 计数器只经由原子操作访问；数据区的并发访问由 SPSC 纪律划分为互不重叠的区间。
unsafe impl Send for MappedRegion {}
// SAFETY: 同上，所有 `&self` 方法均不产生对共享字节的非原子别名引用。
unsafe impl Sync for MappedRegion {}

impl MappedRegion {
    /// 打开或创建背板文件并建立映射。
    pub fn open(path: impl AsRef<Path>, options: &ShmOptions) -> Result<Self> {
        let path = path.as_ref();
        if options.capacity() == 0 {
            return Err(TransportError::config("共享内存容量必须大于 0"));
        }
        let required = options.file_len();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|err| TransportError::from_io(error::OPEN, err))?;
        let current = file
            .metadata()
            .map_err(|err| TransportError::from_io(error::OPEN, err))?
            .len();
        if current < required as u64 {
            file.set_len(required as u64)
                .map_err(|err| TransportError::from_io(error::OPEN, err))?;
            debug!(path = %path.display(), from = current, to = required, "共享内存文件已扩展");
        }

        let mapping =
            Mapping::map(&file, required).map_err(|err| TransportError::from_io(error::MAP, err))?;
        let base = mapping.ptr;
        // SAFETY: 映射长度为 `HEADER_LEN + capacity`，两个计数器偏移与数据区起点都落在映射内。
        let (head, tail, data) = unsafe {
            (
                base.add(HEAD_OFFSET).cast::<AtomicU64>(),
                base.add(TAIL_OFFSET).cast::<AtomicU64>(),
                base.add(HEADER_LEN),
            )
        };
        Ok(Self {
            counters: SharedCounters { head, tail },
            data: RingData {
                base: data,
                len: options.capacity(),
            },
            _file: file,
            mapping,
        })
    }

    pub fn counters(&self) -> &SharedCounters {
        &self.counters
    }

    pub fn data(&self) -> &RingData {
        &self.data
    }

    /// 映射的总字节数。
    pub fn mapped_len(&self) -> usize {
        self.mapping.len
    }
}

impl RingMemory for MappedRegion {
    fn capacity(&self) -> usize {
        self.data.len()
    }

    fn load_head(&self) -> u64 {
        self.counters.load_head()
    }

    fn load_tail(&self) -> u64 {
        self.counters.load_tail()
    }

    fn advance_head(&self, n: u64) {
        self.counters.advance_head(n);
    }

    fn advance_tail(&self, n: u64) {
        self.counters.advance_tail(n);
    }

    fn write_at(&self, offset: usize, src: &[u8]) -> Result<()> {
        self.data.write_at(offset, src)
    }

    fn read_at(&self, offset: usize, dst: &mut [u8]) -> Result<()> {
        self.data.read_at(offset, dst)
    }
}
