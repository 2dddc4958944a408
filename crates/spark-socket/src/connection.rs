use spark_handshake::{EnvelopedConnection, Identity};
use spark_transport::{
    Connection, Deadline, Listener, Result, TransportKind, TransportSocketAddr,
};
use spark_transport_shm::{ShmConnection, ShmListener};
use spark_transport_tcp::{FramedTcpConnection, FramedTcpListener};
use spark_transport_udp::{UdpConnection, UdpListener};

/// 在三种介质变体上分派同一个方法调用。
macro_rules! dispatch {
    ($value:expr, $inner:pat => $body:expr) => {
        match $value {
            Self::Framed($inner) => $body,
            Self::Datagram($inner) => $body,
            Self::SharedMemory($inner) => $body,
        }
    };
}

/// 三种传输连接的标签变体，构造时确定，显式分派而非动态派发。
#[derive(Debug)]
pub enum TransportConnection {
    Framed(FramedTcpConnection),
    Datagram(UdpConnection),
    SharedMemory(ShmConnection),
}

impl TransportConnection {
    pub fn kind(&self) -> TransportKind {
        match self {
            Self::Framed(_) => TransportKind::FramedTcp,
            Self::Datagram(_) => TransportKind::Udp,
            Self::SharedMemory(_) => TransportKind::SharedMemory,
        }
    }
}

impl From<FramedTcpConnection> for TransportConnection {
    fn from(conn: FramedTcpConnection) -> Self {
        Self::Framed(conn)
    }
}

impl From<UdpConnection> for TransportConnection {
    fn from(conn: UdpConnection) -> Self {
        Self::Datagram(conn)
    }
}

impl From<ShmConnection> for TransportConnection {
    fn from(conn: ShmConnection) -> Self {
        Self::SharedMemory(conn)
    }
}

impl Connection for TransportConnection {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        dispatch!(self, conn => conn.read(buf))
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        dispatch!(self, conn => conn.write(buf))
    }

    fn read_message(&mut self) -> Result<Vec<u8>> {
        dispatch!(self, conn => conn.read_message())
    }

    fn close(&mut self) -> Result<()> {
        dispatch!(self, conn => conn.close())
    }

    fn local_addr(&self) -> TransportSocketAddr {
        dispatch!(self, conn => conn.local_addr())
    }

    fn peer_addr(&self) -> TransportSocketAddr {
        dispatch!(self, conn => conn.peer_addr())
    }

    fn set_read_deadline(&mut self, deadline: Deadline) -> Result<()> {
        dispatch!(self, conn => conn.set_read_deadline(deadline))
    }

    fn set_write_deadline(&mut self, deadline: Deadline) -> Result<()> {
        dispatch!(self, conn => conn.set_write_deadline(deadline))
    }

    fn is_message_oriented(&self) -> bool {
        dispatch!(self, conn => conn.is_message_oriented())
    }
}

/// 三种监听器的标签变体。
#[derive(Debug)]
pub enum TransportListener {
    Framed(FramedTcpListener),
    Datagram(UdpListener),
    SharedMemory(ShmListener),
}

impl Listener for TransportListener {
    type Connection = TransportConnection;

    fn scheme(&self) -> &'static str {
        dispatch!(self, listener => listener.scheme())
    }

    fn local_addr(&self) -> TransportSocketAddr {
        dispatch!(self, listener => listener.local_addr())
    }

    fn set_accept_deadline(&mut self, deadline: Deadline) -> Result<()> {
        dispatch!(self, listener => listener.set_accept_deadline(deadline))
    }

    fn accept(&mut self) -> Result<TransportConnection> {
        dispatch!(self, listener => listener.accept().map(TransportConnection::from))
    }

    fn close(&mut self) -> Result<()> {
        dispatch!(self, listener => listener.close())
    }
}

#[derive(Debug)]
enum Channel {
    Plain(TransportConnection),
    Enveloped(EnvelopedConnection<TransportConnection>),
}

/// 门面交给调用方的连接：传输变体加握手状态。
///
/// # 教案式注释
///
/// ## 契约 (What)
/// - [`SocketConnection::identity`]：面向连接握手的结果；服务端为对端身份，客户端为本端发出的身份；
/// - [`SocketConnection::last_identity`]：信封模式下最近一次解出的发送方，仅含名称；
/// - 读写、截止时间与关闭语义与底层传输一致，信封模式下透明拆装。
#[derive(Debug)]
pub struct SocketConnection {
    channel: Channel,
    identity: Option<Identity>,
}

impl SocketConnection {
    pub(crate) fn plain(transport: TransportConnection, identity: Option<Identity>) -> Self {
        Self {
            channel: Channel::Plain(transport),
            identity,
        }
    }

    pub(crate) fn enveloped(transport: TransportConnection, sender_id: &str) -> Self {
        Self {
            channel: Channel::Enveloped(EnvelopedConnection::new(transport, sender_id)),
            identity: None,
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn last_identity(&self) -> Option<&Identity> {
        match &self.channel {
            Channel::Plain(_) => None,
            Channel::Enveloped(conn) => conn.last_identity(),
        }
    }

    /// 是否以逐报文信封收发。
    pub fn is_enveloped(&self) -> bool {
        matches!(self.channel, Channel::Enveloped(_))
    }

    pub fn transport(&self) -> &TransportConnection {
        match &self.channel {
            Channel::Plain(conn) => conn,
            Channel::Enveloped(conn) => conn.get_ref(),
        }
    }

    pub fn kind(&self) -> TransportKind {
        self.transport().kind()
    }

    fn connection(&mut self) -> &mut dyn Connection {
        match &mut self.channel {
            Channel::Plain(conn) => conn,
            Channel::Enveloped(conn) => conn,
        }
    }
}

impl Connection for SocketConnection {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.connection().read(buf)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.connection().write(buf)
    }

    fn read_message(&mut self) -> Result<Vec<u8>> {
        self.connection().read_message()
    }

    fn close(&mut self) -> Result<()> {
        self.connection().close()
    }

    fn local_addr(&self) -> TransportSocketAddr {
        self.transport().local_addr()
    }

    fn peer_addr(&self) -> TransportSocketAddr {
        self.transport().peer_addr()
    }

    fn set_read_deadline(&mut self, deadline: Deadline) -> Result<()> {
        self.connection().set_read_deadline(deadline)
    }

    fn set_write_deadline(&mut self, deadline: Deadline) -> Result<()> {
        self.connection().set_write_deadline(deadline)
    }

    fn is_message_oriented(&self) -> bool {
        self.transport().is_message_oriented()
    }
}
