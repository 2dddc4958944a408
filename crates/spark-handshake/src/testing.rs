//! 单元测试用的内存连接对。

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use spark_transport::{Connection, Deadline, Result, TransportError, TransportSocketAddr};

type Queue = Arc<Mutex<VecDeque<Vec<u8>>>>;

const READ_OP: spark_transport::OperationKind =
    spark_transport::OperationKind::new("spark.handshake.test.read", "memory pipe read");

/// 进程内的一端；`message_oriented` 为假时按字节流合并读取。
pub(crate) struct MemoryPipe {
    inbound: Queue,
    outbound: Queue,
    message_oriented: bool,
    local: SocketAddr,
    peer: SocketAddr,
    read_deadline: Deadline,
    closed: bool,
}

impl MemoryPipe {
    pub(crate) fn pair(message_oriented: bool) -> (Self, Self) {
        let a: Queue = Arc::default();
        let b: Queue = Arc::default();
        let client_addr: SocketAddr = ([127, 0, 0, 1], 1000).into();
        let server_addr: SocketAddr = ([127, 0, 0, 1], 2000).into();
        (
            Self::new(Arc::clone(&a), Arc::clone(&b), message_oriented, client_addr, server_addr),
            Self::new(b, a, message_oriented, server_addr, client_addr),
        )
    }

    fn new(
        inbound: Queue,
        outbound: Queue,
        message_oriented: bool,
        local: SocketAddr,
        peer: SocketAddr,
    ) -> Self {
        Self {
            inbound,
            outbound,
            message_oriented,
            local,
            peer,
            read_deadline: Deadline::none(),
            closed: false,
        }
    }

    /// 尚未被本端读取的消息数。
    pub(crate) fn queued(&self) -> usize {
        self.inbound.lock().map(|queue| queue.len()).unwrap_or(0)
    }

    fn pop_front(&self, buf: &mut [u8]) -> Option<usize> {
        let mut queue = self.inbound.lock().ok()?;
        let front = queue.front_mut()?;
        let len = front.len().min(buf.len());
        buf[..len].copy_from_slice(&front[..len]);
        if self.message_oriented || len == front.len() {
            queue.pop_front();
        } else {
            front.drain(..len);
        }
        Some(len)
    }
}

impl Connection for MemoryPipe {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        loop {
            if self.read_deadline.is_expired() {
                return Err(TransportError::deadline_exceeded(READ_OP));
            }
            if let Some(len) = self.pop_front(buf) {
                return Ok(len);
            }
            std::thread::sleep(Duration::from_micros(200));
        }
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.outbound
            .lock()
            .map_err(|_| TransportError::protocol("poisoned"))?
            .push_back(buf.to_vec());
        Ok(buf.len())
    }

    fn read_message(&mut self) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; 65_535];
        let len = self.read(&mut buf)?;
        buf.truncate(len);
        Ok(buf)
    }

    fn close(&mut self) -> Result<()> {
        if std::mem::replace(&mut self.closed, true) {
            return Err(TransportError::Closed);
        }
        Ok(())
    }

    fn local_addr(&self) -> TransportSocketAddr {
        self.local.into()
    }

    fn peer_addr(&self) -> TransportSocketAddr {
        self.peer.into()
    }

    fn set_read_deadline(&mut self, deadline: Deadline) -> Result<()> {
        self.read_deadline = deadline;
        Ok(())
    }

    fn set_write_deadline(&mut self, _deadline: Deadline) -> Result<()> {
        Ok(())
    }

    fn is_message_oriented(&self) -> bool {
        self.message_oriented
    }
}
