use std::io;
use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;

use bytes::Bytes;
use spark_transport::{Deadline, Listener, Result, TransportError, TransportSocketAddr};
use tracing::debug;

use crate::{
    RECV_BUFFER_LEN, UdpConnection,
    error::{self, arm_receive},
    options::UdpSocketOptions,
};

/// UDP 监听器：每个入站报文产出一个瞬时连接。
///
/// # Why
/// - 让服务端以与 TCP 相同的 `accept` 循环处理 UDP 请求。
///
/// # What
/// - `accept`：阻塞等待下一个报文，返回预载该报文、绑定其发送方的 [`UdpConnection`]；
/// - 单次接收失败（含超时）只影响本次 `accept`，监听器保持可用；
/// - `close` 释放监听器持有的套接字引用，尚未关闭的瞬时连接仍可回写。
///
/// # How
/// - 套接字以 `Arc` 与瞬时连接共享，各方在自身收发前装配各自的截止时间。
#[derive(Debug)]
pub struct UdpListener {
    sock: Option<Arc<UdpSocket>>,
    local_addr: TransportSocketAddr,
    accept_deadline: Deadline,
}

impl UdpListener {
    /// 以默认参数绑定。
    pub fn bind(addr: SocketAddr) -> Result<Self> {
        Self::bind_with_options(addr, &UdpSocketOptions::default())
    }

    /// 带参数绑定。
    pub fn bind_with_options(addr: SocketAddr, options: &UdpSocketOptions) -> Result<Self> {
        let sock = UdpSocket::bind(addr).map_err(|err| TransportError::from_io(error::BIND, err))?;
        options.apply(&sock);
        let local = sock
            .local_addr()
            .map_err(|err| TransportError::from_io(error::BIND, err))?;
        debug!(addr = %local, "udp listening");
        Ok(Self {
            sock: Some(Arc::new(sock)),
            local_addr: local.into(),
            accept_deadline: Deadline::none(),
        })
    }
}

impl Listener for UdpListener {
    type Connection = UdpConnection;

    fn scheme(&self) -> &'static str {
        "udp"
    }

    fn local_addr(&self) -> TransportSocketAddr {
        self.local_addr
    }

    fn set_accept_deadline(&mut self, deadline: Deadline) -> Result<()> {
        if self.sock.is_none() {
            return Err(TransportError::Closed);
        }
        self.accept_deadline = deadline;
        Ok(())
    }

    fn accept(&mut self) -> Result<UdpConnection> {
        let sock = self.sock.as_ref().ok_or(TransportError::Closed)?;
        arm_receive(sock, self.accept_deadline, error::ACCEPT)?;

        let mut buf = vec![0u8; RECV_BUFFER_LEN];
        let (n, peer) = loop {
            match sock.recv_from(&mut buf) {
                Ok(received) => break received,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::from_io(error::ACCEPT, err)),
            }
        };
        buf.truncate(n);
        debug!(%peer, len = n, "udp transient connection accepted");
        Ok(UdpConnection::transient(
            Arc::clone(sock),
            self.local_addr,
            peer,
            Bytes::from(buf),
        ))
    }

    fn close(&mut self) -> Result<()> {
        self.sock.take().ok_or(TransportError::Closed)?;
        debug!(addr = %self.local_addr, "udp listener closed");
        Ok(())
    }
}
