use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use std::sync::Arc;

use bytes::Bytes;
use spark_transport::{Connection, Deadline, Result, TransportError, TransportSocketAddr};
use tracing::{debug, trace};

use crate::{
    MAX_DATAGRAM_PAYLOAD, RECV_BUFFER_LEN,
    error::{self, arm_receive, arm_send},
    options::UdpSocketOptions,
};

/// 连接的收发方式。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    /// 拨号侧：套接字已 `connect` 到固定对端。
    Dialed,
    /// 瞬时侧：与监听器共享套接字，写入发往最近一次记录的发送方。
    Transient,
}

/// UDP 连接：拨号侧的已连接套接字，或监听器产出的瞬时连接。
///
/// # Why
/// - UDP 没有持久连接，瞬时连接把“某个发送方的下一次交互”包装成 [`Connection`]，
///   使上层的请求/响应代码与流式介质一致。
///
/// # What
/// - `pending`：`accept` 时已收到的报文，第一次读取直接交付并清空；
/// - `remote`：拨号侧为固定对端；瞬时侧为最近一次接收记录的发送方；
/// - 超过 [`MAX_DATAGRAM_PAYLOAD`] 的写入返回 [`TransportError::PayloadTooLarge`]。
///
/// # How
/// - 无预载报文时执行一次阻塞 `recv_from`，瞬时侧据此更新 `remote`；
/// - 瞬时侧写入使用 `send_to(remote)`，拨号侧使用已连接的 `send`。
#[derive(Debug)]
pub struct UdpConnection {
    sock: Option<Arc<UdpSocket>>,
    mode: Mode,
    remote: SocketAddr,
    pending: Option<Bytes>,
    local_addr: TransportSocketAddr,
    read_deadline: Deadline,
    write_deadline: Deadline,
}

impl UdpConnection {
    /// 以默认参数拨号。
    pub fn connect(addr: SocketAddr) -> Result<Self> {
        Self::connect_with_options(addr, &UdpSocketOptions::default())
    }

    /// 绑定同协议族的临时端口并 `connect` 到目标地址。
    pub fn connect_with_options(addr: SocketAddr, options: &UdpSocketOptions) -> Result<Self> {
        let bind_addr: SocketAddr = if addr.is_ipv4() {
            (Ipv4Addr::UNSPECIFIED, 0).into()
        } else {
            (Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let sock =
            UdpSocket::bind(bind_addr).map_err(|err| TransportError::from_io(error::BIND, err))?;
        sock.connect(addr)
            .map_err(|err| TransportError::from_io(error::CONNECT, err))?;
        options.apply(&sock);
        let local = sock
            .local_addr()
            .map_err(|err| TransportError::from_io(error::CONNECT, err))?;
        debug!(local = %local, peer = %addr, "udp dialed");
        Ok(Self {
            sock: Some(Arc::new(sock)),
            mode: Mode::Dialed,
            remote: addr,
            pending: None,
            local_addr: local.into(),
            read_deadline: Deadline::none(),
            write_deadline: Deadline::none(),
        })
    }

    /// 监听器产出的瞬时连接。
    pub(crate) fn transient(
        sock: Arc<UdpSocket>,
        local_addr: TransportSocketAddr,
        remote: SocketAddr,
        payload: Bytes,
    ) -> Self {
        Self {
            sock: Some(sock),
            mode: Mode::Transient,
            remote,
            pending: Some(payload),
            local_addr,
            read_deadline: Deadline::none(),
            write_deadline: Deadline::none(),
        }
    }

    /// 是否为监听器产出的瞬时连接。
    pub fn is_transient(&self) -> bool {
        self.mode == Mode::Transient
    }

    /// 是否仍有未读取的预载报文。
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    fn socket(&self) -> Result<&Arc<UdpSocket>> {
        self.sock.as_ref().ok_or(TransportError::Closed)
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<usize> {
        let sock = Arc::clone(self.socket()?);
        arm_receive(&sock, self.read_deadline, error::RECEIVE)?;
        let (n, from) = loop {
            match sock.recv_from(buf) {
                Ok(received) => break received,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::from_io(error::RECEIVE, err)),
            }
        };
        if self.mode == Mode::Transient {
            self.remote = from;
        }
        trace!(len = n, %from, "udp datagram received");
        Ok(n)
    }
}

impl Connection for UdpConnection {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.socket()?;
        if let Some(payload) = self.pending.take() {
            let n = payload.len().min(buf.len());
            if n < payload.len() {
                debug!(
                    len = payload.len(),
                    capacity = buf.len(),
                    "预载报文被截断为目标缓冲区大小"
                );
            }
            buf[..n].copy_from_slice(&payload[..n]);
            return Ok(n);
        }
        self.receive(buf)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        if buf.len() > MAX_DATAGRAM_PAYLOAD {
            return Err(TransportError::PayloadTooLarge {
                len: buf.len(),
                max: MAX_DATAGRAM_PAYLOAD,
            });
        }
        let sock = self.socket()?;
        arm_send(sock, self.write_deadline)?;
        let sent = match self.mode {
            Mode::Transient => sock.send_to(buf, self.remote),
            Mode::Dialed => sock.send(buf),
        }
        .map_err(|err| TransportError::from_io(error::SEND, err))?;
        Ok(sent)
    }

    fn read_message(&mut self) -> Result<Vec<u8>> {
        self.socket()?;
        if let Some(payload) = self.pending.take() {
            return Ok(payload.to_vec());
        }
        let mut buf = vec![0u8; RECV_BUFFER_LEN];
        let n = self.receive(&mut buf)?;
        buf.truncate(n);
        Ok(buf)
    }

    fn close(&mut self) -> Result<()> {
        self.sock.take().ok_or(TransportError::Closed)?;
        self.pending = None;
        debug!(peer = %self.remote, transient = self.is_transient(), "udp connection closed");
        Ok(())
    }

    fn local_addr(&self) -> TransportSocketAddr {
        self.local_addr
    }

    fn peer_addr(&self) -> TransportSocketAddr {
        self.remote.into()
    }

    fn set_read_deadline(&mut self, deadline: Deadline) -> Result<()> {
        self.socket()?;
        self.read_deadline = deadline;
        Ok(())
    }

    fn set_write_deadline(&mut self, deadline: Deadline) -> Result<()> {
        self.socket()?;
        self.write_deadline = deadline;
        Ok(())
    }

    fn is_message_oriented(&self) -> bool {
        true
    }
}
