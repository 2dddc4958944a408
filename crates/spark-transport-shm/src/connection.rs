use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use spark_transport::{Connection, Deadline, Result, TransportError, TransportSocketAddr};
use tracing::debug;

use crate::{
    options::ShmOptions,
    region::MappedRegion,
    ring::{RingMemory, SpscRing},
};

/// 监听器发放的占用标记，连接关闭或析构时归还。
#[derive(Debug)]
pub(crate) struct AcceptLease(Arc<AtomicBool>);

impl AcceptLease {
    pub(crate) fn new(flag: Arc<AtomicBool>) -> Self {
        Self(flag)
    }
}

impl Drop for AcceptLease {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// 共享内存环形缓冲上的连接。
///
/// # 教案式注释
///
/// ## 意图 (Why)
/// - 两个进程各自打开同一路径即可通信：一端写（生产者），另一端读（消费者）。
///
/// ## 契约 (What)
/// - `write` 一次提交整段负载；负载超过容量立即失败，空间不足时按写截止时间等待；
/// - `read` 读取至多 `buf.len()` 字节；`read_message` 读取当前全部可用字节；
/// - 地址均为化名 [`TransportSocketAddr::Memory`]；
/// - `close` 解除映射并关闭文件，之后的操作返回 [`TransportError::Closed`]。
///
/// ## 注意事项 (Trade-offs)
/// - 同一文件上只能有一个生产者与一个消费者，由部署配置保证；
/// - 环形缓冲不保留消息边界，[`Connection::is_message_oriented`] 返回 `false`。
#[derive(Debug)]
pub struct ShmConnection {
    ring: Option<SpscRing<MappedRegion>>,
    path: PathBuf,
    read_deadline: Deadline,
    write_deadline: Deadline,
    lease: Option<AcceptLease>,
}

impl ShmConnection {
    /// 以默认容量打开。
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_options(path, &ShmOptions::default())
    }

    /// 以指定参数打开。
    pub fn open_with_options(path: impl AsRef<Path>, options: &ShmOptions) -> Result<Self> {
        let path = path.as_ref();
        let region = MappedRegion::open(path, options)?;
        debug!(
            path = %path.display(),
            capacity = options.capacity(),
            unread = region.load_tail().wrapping_sub(region.load_head()),
            "shm ring opened"
        );
        Ok(Self {
            ring: Some(SpscRing::new(region)),
            path: path.to_path_buf(),
            read_deadline: Deadline::none(),
            write_deadline: Deadline::none(),
            lease: None,
        })
    }

    pub(crate) fn with_lease(mut self, lease: AcceptLease) -> Self {
        self.lease = Some(lease);
        self
    }

    /// 背板文件路径。
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 数据区容量。
    pub fn capacity(&self) -> Result<usize> {
        Ok(self.ring()?.capacity())
    }

    /// 当前未读字节数。
    pub fn available(&self) -> Result<usize> {
        Ok(self.ring()?.len())
    }

    fn ring(&self) -> Result<&SpscRing<MappedRegion>> {
        self.ring.as_ref().ok_or(TransportError::Closed)
    }
}

impl Connection for ShmConnection {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.ring()?.read(buf, self.read_deadline)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.ring()?.write(buf, self.write_deadline)
    }

    fn read_message(&mut self) -> Result<Vec<u8>> {
        self.ring()?.read_available(self.read_deadline)
    }

    fn close(&mut self) -> Result<()> {
        self.ring.take().ok_or(TransportError::Closed)?;
        self.lease = None;
        debug!(path = %self.path.display(), "shm ring closed");
        Ok(())
    }

    fn local_addr(&self) -> TransportSocketAddr {
        TransportSocketAddr::Memory
    }

    fn peer_addr(&self) -> TransportSocketAddr {
        TransportSocketAddr::Memory
    }

    fn set_read_deadline(&mut self, deadline: Deadline) -> Result<()> {
        self.ring()?;
        self.read_deadline = deadline;
        Ok(())
    }

    fn set_write_deadline(&mut self, deadline: Deadline) -> Result<()> {
        self.ring()?;
        self.write_deadline = deadline;
        Ok(())
    }

    fn is_message_oriented(&self) -> bool {
        false
    }
}
