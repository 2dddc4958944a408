use spark_handshake::initiate;
use spark_transport::{Connection, Deadline, TransportError, TransportKind};
use spark_transport_shm::ShmConnection;
use spark_transport_tcp::{FramedTcpConnection, TcpSocketOptions};
use spark_transport_udp::UdpConnection;
use tracing::{debug, warn};

use crate::{
    Result, SocketConfig, SocketProfile,
    config::resolve_addr,
    connection::{SocketConnection, TransportConnection},
};

/// 客户端门面：拨号、握手，然后以普通连接读写。
///
/// # 教案式注释
///
/// ## 逻辑 (How)
/// - `open`：按档案的传输种类拨号，超时取 [`SocketProfile::connect_timeout`]；
///   `Identity` 握手在 UDP 上改为信封包装（不发送任何报文），其他介质立即发出身份报文；
/// - 握手失败时关闭已建立的传输连接并返回错误，客户端保持未打开状态。
///
/// ## 契约 (What)
/// - 重复 `open` 返回 [`TransportError::AlreadyOpen`]；
/// - 未打开时的读写、截止时间与关闭返回 [`TransportError::NotOpen`]。
#[derive(Debug)]
pub struct SocketClient {
    profile: SocketProfile,
    config: SocketConfig,
    conn: Option<SocketConnection>,
}

impl SocketClient {
    pub fn new(profile: SocketProfile, config: SocketConfig) -> Self {
        Self {
            profile,
            config,
            conn: None,
        }
    }

    pub fn profile(&self) -> &SocketProfile {
        &self.profile
    }

    pub fn config(&self) -> &SocketConfig {
        &self.config
    }

    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    pub fn open(&mut self) -> Result<()> {
        if self.conn.is_some() {
            return Err(TransportError::AlreadyOpen.into());
        }
        let mut transport = self.dial()?;

        let conn = if self.profile.uses_envelope() {
            SocketConnection::enveloped(transport, &self.profile.name)
        } else if self.profile.handshake.is_enabled() {
            match initiate(&mut transport, &self.profile.name, self.config.public_ip()) {
                Ok(identity) => SocketConnection::plain(transport, Some(identity)),
                Err(err) => {
                    warn!(profile = %self.profile.name, error = %err, "handshake failed, closing transport");
                    if let Err(close_err) = transport.close() {
                        debug!(error = %close_err, "close after failed handshake");
                    }
                    return Err(err.into());
                }
            }
        } else {
            SocketConnection::plain(transport, None)
        };

        debug!(
            profile = %self.profile.name,
            transport = %self.profile.transport,
            handshake = %self.profile.handshake,
            "socket client opened"
        );
        self.conn = Some(conn);
        Ok(())
    }

    fn dial(&self) -> Result<TransportConnection> {
        let timeout = self.profile.connect_timeout();
        let transport: TransportConnection = match self.profile.transport {
            TransportKind::FramedTcp => {
                let addr = resolve_addr(&self.profile.address)?;
                let options = TcpSocketOptions::default().with_connect_timeout(Some(timeout));
                FramedTcpConnection::connect_with_options(addr, options)?.into()
            }
            TransportKind::Udp => UdpConnection::connect(resolve_addr(&self.profile.address)?)?.into(),
            TransportKind::SharedMemory => {
                ShmConnection::open_with_options(&self.profile.address, &self.profile.shm_options())?
                    .into()
            }
        };
        Ok(transport)
    }

    /// 写出一条消息，返回负载长度。
    pub fn send(&mut self, data: &[u8]) -> Result<usize> {
        Ok(self.conn_mut()?.write(data)?)
    }

    /// 读取一条消息到 `buf`。
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        Ok(self.conn_mut()?.read(buf)?)
    }

    /// 读取一条消息，缓冲区由实现分配。
    pub fn receive(&mut self) -> Result<Vec<u8>> {
        Ok(self.conn_mut()?.read_message()?)
    }

    pub fn set_read_deadline(&mut self, deadline: Deadline) -> Result<()> {
        Ok(self.conn_mut()?.set_read_deadline(deadline)?)
    }

    pub fn set_write_deadline(&mut self, deadline: Deadline) -> Result<()> {
        Ok(self.conn_mut()?.set_write_deadline(deadline)?)
    }

    pub fn set_deadline(&mut self, deadline: Deadline) -> Result<()> {
        Ok(self.conn_mut()?.set_deadline(deadline)?)
    }

    /// 关闭连接；客户端回到未打开状态，可以再次 `open`。
    pub fn close(&mut self) -> Result<()> {
        let mut conn = self.conn.take().ok_or(TransportError::NotOpen)?;
        conn.close()?;
        debug!(profile = %self.profile.name, "socket client closed");
        Ok(())
    }

    pub fn connection(&self) -> Option<&SocketConnection> {
        self.conn.as_ref()
    }

    pub fn connection_mut(&mut self) -> Option<&mut SocketConnection> {
        self.conn.as_mut()
    }

    /// 交出底层连接，客户端回到未打开状态。
    pub fn into_connection(self) -> Option<SocketConnection> {
        self.conn
    }

    fn conn_mut(&mut self) -> Result<&mut SocketConnection, TransportError> {
        self.conn.as_mut().ok_or(TransportError::NotOpen)
    }
}
