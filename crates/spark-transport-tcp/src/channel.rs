use std::io::Write;
use std::net::{Shutdown, SocketAddr, TcpStream};

use spark_transport::{Connection, Deadline, Result, TransportError, TransportSocketAddr};
use tracing::debug;

use crate::{
    error,
    frame::{FrameReader, encode_frame},
    util::{DeadlineStream, TcpSocketOptions},
};

/// 帧化 TCP 连接。
///
/// # 教案式注释
///
/// ## 意图 (Why)
/// - 在 TCP 字节流上恢复消息边界，使一次 `write` 恰好对应对端的一次 `read`；
/// - 读写截止时间与连接关闭可区分，超时后连接仍可继续使用（帧体中途超时除外）。
///
/// ## 逻辑 (How)
/// - 内部以 [`FrameReader`] 包裹 `DeadlineStream`，读路径经由预读缓冲窥视帧头；
/// - 写路径将帧头与负载拼接后一次 `write_all`，每个底层 `write` 前重新装配写超时；
/// - `close` 执行双向 `shutdown` 并释放套接字，之后的所有操作返回 [`TransportError::Closed`]。
///
/// ## 契约 (What)
/// - `connect`：拨号并应用调优；
/// - `read`/`read_message`/`write`：见 [`Connection`]；
/// - `local_addr`/`peer_addr`：建连时缓存，关闭后仍可查询。
///
/// ## 注意事项 (Trade-offs)
/// - `write_all` 中途超时同样会在对端留下半帧，调用方应视为致命错误。
#[derive(Debug)]
pub struct FramedTcpConnection {
    reader: Option<FrameReader<DeadlineStream>>,
    local_addr: TransportSocketAddr,
    peer_addr: TransportSocketAddr,
    max_frame_len: usize,
}

impl FramedTcpConnection {
    /// 以默认参数拨号。
    pub fn connect(addr: SocketAddr) -> Result<Self> {
        Self::connect_with_options(addr, TcpSocketOptions::default())
    }

    /// 带参数拨号。
    pub fn connect_with_options(addr: SocketAddr, options: TcpSocketOptions) -> Result<Self> {
        let stream = match options.connect_timeout() {
            Some(timeout) if !timeout.is_zero() => TcpStream::connect_timeout(&addr, timeout),
            _ => TcpStream::connect(addr),
        }
        .map_err(|err| TransportError::from_io(error::CONNECT, err))?;
        let conn = Self::from_stream(stream, &options)?;
        debug!(local = %conn.local_addr, peer = %conn.peer_addr, "framed tcp connected");
        Ok(conn)
    }

    /// 包装已建立的流；监听器接受连接后也经由此处。
    pub(crate) fn from_stream(stream: TcpStream, options: &TcpSocketOptions) -> Result<Self> {
        options.tuning().apply(&stream);
        let local_addr = stream
            .local_addr()
            .map_err(|err| TransportError::from_io(error::CONFIGURE, err))?;
        let peer_addr = stream
            .peer_addr()
            .map_err(|err| TransportError::from_io(error::CONFIGURE, err))?;
        Ok(Self {
            reader: Some(FrameReader::with_max_frame_len(
                DeadlineStream::new(stream),
                options.max_frame_len(),
            )),
            local_addr: local_addr.into(),
            peer_addr: peer_addr.into(),
            max_frame_len: options.max_frame_len(),
        })
    }

    /// 单帧负载上限。
    pub fn max_frame_len(&self) -> usize {
        self.max_frame_len
    }

    /// 是否已关闭。
    pub fn is_closed(&self) -> bool {
        self.reader.is_none()
    }

    /// 此前是否发生过帧体中途失败；为真时连接只能关闭。
    pub fn is_desynchronized(&self) -> bool {
        self.reader
            .as_ref()
            .is_some_and(FrameReader::is_desynchronized)
    }

    fn reader(&mut self) -> Result<&mut FrameReader<DeadlineStream>> {
        self.reader.as_mut().ok_or(TransportError::Closed)
    }
}

impl Connection for FramedTcpConnection {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.reader()?.read_frame_into(buf)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let frame = encode_frame(buf, self.max_frame_len)?;
        self.reader()?
            .get_mut()
            .write_all(&frame)
            .map_err(|err| TransportError::from_io(error::WRITE, err))?;
        Ok(buf.len())
    }

    fn read_message(&mut self) -> Result<Vec<u8>> {
        self.reader()?.read_frame()
    }

    fn close(&mut self) -> Result<()> {
        let reader = self.reader.take().ok_or(TransportError::Closed)?;
        let stream = reader.into_inner();
        match stream.stream().shutdown(Shutdown::Both) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotConnected => {}
            Err(err) => return Err(TransportError::from_io(error::SHUTDOWN, err)),
        }
        debug!(peer = %self.peer_addr, "framed tcp closed");
        Ok(())
    }

    fn local_addr(&self) -> TransportSocketAddr {
        self.local_addr
    }

    fn peer_addr(&self) -> TransportSocketAddr {
        self.peer_addr
    }

    fn set_read_deadline(&mut self, deadline: Deadline) -> Result<()> {
        self.reader()?.get_mut().set_read_deadline(deadline);
        Ok(())
    }

    fn set_write_deadline(&mut self, deadline: Deadline) -> Result<()> {
        self.reader()?.get_mut().set_write_deadline(deadline);
        Ok(())
    }

    fn is_message_oriented(&self) -> bool {
        true
    }
}
