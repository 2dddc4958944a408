use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use spark_transport::{Deadline, Listener, Result, TransportError, TransportSocketAddr};
use tracing::{debug, warn};

use crate::{
    connection::{AcceptLease, ShmConnection},
    options::ShmOptions,
    region::MappedRegion,
};

/// 共享内存监听端：拥有背板文件的生命周期，并一次只交出一个端点。
///
/// # Why
/// - 让服务端以统一的 `listen → accept` 流程使用共享内存，握手逻辑无需区分介质。
///
/// # What
/// - `bind`：创建或扩展背板文件；计数器明显损坏（`tail < head` 或未读字节超过容量）时归零并告警，
///   `reset_on_bind` 为真时无条件归零；
/// - `accept`：立即返回映射同一文件的端点；前一个端点未关闭时返回 [`TransportError::Busy`]；
/// - 截止时间对 `accept` 无影响，等待对端数据由连接自身的读截止时间控制。
#[derive(Debug)]
pub struct ShmListener {
    path: PathBuf,
    options: ShmOptions,
    region: Option<MappedRegion>,
    in_use: Arc<AtomicBool>,
}

impl ShmListener {
    pub fn bind(path: impl AsRef<Path>, options: ShmOptions) -> Result<Self> {
        let path = path.as_ref();
        let region = MappedRegion::open(path, &options)?;
        let counters = region.counters();
        let head = counters.load_head();
        let tail = counters.load_tail();
        let capacity = options.capacity() as u64;

        if options.reset_on_bind() {
            counters.reset();
            debug!(path = %path.display(), "shm 计数器已按配置归零");
        } else if tail < head || tail - head > capacity {
            warn!(path = %path.display(), head, tail, capacity, "shm 计数器已损坏，归零后继续");
            counters.reset();
        } else if tail != head {
            debug!(path = %path.display(), unread = tail - head, "shm 文件保留了上次运行的未读数据");
        }

        Ok(Self {
            path: path.to_path_buf(),
            options,
            region: Some(region),
            in_use: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Listener for ShmListener {
    type Connection = ShmConnection;

    fn scheme(&self) -> &'static str {
        "shm"
    }

    fn local_addr(&self) -> TransportSocketAddr {
        TransportSocketAddr::Memory
    }

    fn set_accept_deadline(&mut self, _deadline: Deadline) -> Result<()> {
        if self.region.is_none() {
            return Err(TransportError::Closed);
        }
        Ok(())
    }

    fn accept(&mut self) -> Result<ShmConnection> {
        if self.region.is_none() {
            return Err(TransportError::Closed);
        }
        if self.in_use.swap(true, Ordering::AcqRel) {
            return Err(TransportError::Busy(format!(
                "共享内存端点 {} 已被接受且尚未关闭",
                self.path.display()
            )));
        }
        let lease = AcceptLease::new(Arc::clone(&self.in_use));
        let conn = ShmConnection::open_with_options(&self.path, &self.options)?;
        debug!(path = %self.path.display(), "shm endpoint accepted");
        Ok(conn.with_lease(lease))
    }

    fn close(&mut self) -> Result<()> {
        self.region.take().ok_or(TransportError::Closed)?;
        debug!(path = %self.path.display(), "shm listener closed");
        Ok(())
    }
}
