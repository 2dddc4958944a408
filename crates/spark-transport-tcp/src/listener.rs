use std::io;
use std::net::{SocketAddr, TcpListener as StdTcpListener};
use std::thread;
use std::time::Duration;

use spark_transport::{Deadline, Listener, Result, TransportError, TransportSocketAddr};
use tracing::debug;

use crate::{FramedTcpConnection, error, util::TcpSocketOptions};

const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// 帧化 TCP 监听器。
///
/// # 教案式注释
///
/// ## 意图 (Why)
/// - 提供“监听 → 接受连接”的最小能力，接受到的连接与拨号侧共享同一套帧化与调优逻辑。
///
/// ## 逻辑 (How)
/// - 未设置接受截止时间时直接使用阻塞 `accept`；
/// - 设置了截止时间时切换为非阻塞模式并按固定间隔轮询，直到有连接到达或截止时间过去；
/// - 接受到的流统一恢复为阻塞模式后交给 [`FramedTcpConnection`]。
///
/// ## 注意事项 (Trade-offs)
/// - 带截止时间的接受存在毫秒级轮询延迟。
#[derive(Debug)]
pub struct FramedTcpListener {
    inner: Option<StdTcpListener>,
    local_addr: TransportSocketAddr,
    accept_deadline: Deadline,
    options: TcpSocketOptions,
    nonblocking: bool,
}

impl FramedTcpListener {
    /// 绑定到指定地址。
    pub fn bind(addr: SocketAddr) -> Result<Self> {
        Self::bind_with_options(addr, TcpSocketOptions::default())
    }

    /// 带参数绑定，参数同样作用于接受到的连接。
    pub fn bind_with_options(addr: SocketAddr, options: TcpSocketOptions) -> Result<Self> {
        let listener =
            StdTcpListener::bind(addr).map_err(|err| TransportError::from_io(error::BIND, err))?;
        let local = listener
            .local_addr()
            .map_err(|err| TransportError::from_io(error::BIND, err))?;
        debug!(addr = %local, "framed tcp listening");
        Ok(Self {
            inner: Some(listener),
            local_addr: local.into(),
            accept_deadline: Deadline::none(),
            options,
            nonblocking: false,
        })
    }

    fn set_nonblocking(&mut self, nonblocking: bool) -> Result<()> {
        if self.nonblocking == nonblocking {
            return Ok(());
        }
        let listener = self.inner.as_ref().ok_or(TransportError::Closed)?;
        listener
            .set_nonblocking(nonblocking)
            .map_err(|err| TransportError::from_io(error::ACCEPT, err))?;
        self.nonblocking = nonblocking;
        Ok(())
    }
}

impl Listener for FramedTcpListener {
    type Connection = FramedTcpConnection;

    fn scheme(&self) -> &'static str {
        "tcp"
    }

    fn local_addr(&self) -> TransportSocketAddr {
        self.local_addr
    }

    fn set_accept_deadline(&mut self, deadline: Deadline) -> Result<()> {
        if self.inner.is_none() {
            return Err(TransportError::Closed);
        }
        self.accept_deadline = deadline;
        Ok(())
    }

    fn accept(&mut self) -> Result<FramedTcpConnection> {
        let deadline = self.accept_deadline;
        self.set_nonblocking(deadline.is_set())?;
        let listener = self.inner.as_ref().ok_or(TransportError::Closed)?;

        let (stream, peer) = loop {
            if deadline.is_expired() {
                return Err(TransportError::deadline_exceeded(error::ACCEPT));
            }
            match listener.accept() {
                Ok(accepted) => break accepted,
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => return Err(TransportError::from_io(error::ACCEPT, err)),
            }
        };
        stream
            .set_nonblocking(false)
            .map_err(|err| TransportError::from_io(error::ACCEPT, err))?;
        debug!(%peer, "framed tcp accepted");
        FramedTcpConnection::from_stream(stream, &self.options)
    }

    fn close(&mut self) -> Result<()> {
        self.inner.take().ok_or(TransportError::Closed)?;
        debug!(addr = %self.local_addr, "framed tcp listener closed");
        Ok(())
    }
}
