use spark_handshake::wait_initiation;
use spark_transport::{
    Connection, Deadline, Listener, TransportError, TransportKind, TransportSocketAddr,
};
use spark_transport_shm::ShmListener;
use spark_transport_tcp::FramedTcpListener;
use spark_transport_udp::UdpListener;
use tracing::{debug, warn};

use crate::{
    Result, SocketConfig, SocketProfile,
    config::resolve_addr,
    connection::{SocketConnection, TransportConnection, TransportListener},
};

/// 服务端门面：监听，并在交出连接前完成握手。
///
/// # 教案式注释
///
/// ## 逻辑 (How)
/// - `accept` 先接受原始连接，再按 [`SocketConfig::deadline_ms`] 设置读写截止时间，最后执行握手：
///   面向连接的介质等待对端身份报文，UDP 包装为信封连接；
/// - 因此沉默的客户端会让 `accept` 在截止时间到达时以超时失败。
///
/// ## 契约 (What)
/// - 握手失败时关闭该原始连接并返回错误，监听器不受影响，调用方可以继续 `accept`；
/// - 重复 `listen` 返回 [`TransportError::AlreadyListening`]，未监听时的操作返回 [`TransportError::NotOpen`]；
/// - 监听器默认没有接受截止时间，可用 [`SocketServer::set_accept_deadline`] 设置。
#[derive(Debug)]
pub struct SocketServer {
    profile: SocketProfile,
    config: SocketConfig,
    listener: Option<TransportListener>,
}

impl SocketServer {
    pub fn new(profile: SocketProfile, config: SocketConfig) -> Self {
        Self {
            profile,
            config,
            listener: None,
        }
    }

    pub fn profile(&self) -> &SocketProfile {
        &self.profile
    }

    pub fn config(&self) -> &SocketConfig {
        &self.config
    }

    pub fn is_listening(&self) -> bool {
        self.listener.is_some()
    }

    pub fn listen(&mut self) -> Result<()> {
        if self.listener.is_some() {
            return Err(TransportError::AlreadyListening.into());
        }
        let listener = match self.profile.transport {
            TransportKind::FramedTcp => {
                TransportListener::Framed(FramedTcpListener::bind(resolve_addr(&self.profile.address)?)?)
            }
            TransportKind::Udp => {
                TransportListener::Datagram(UdpListener::bind(resolve_addr(&self.profile.address)?)?)
            }
            TransportKind::SharedMemory => TransportListener::SharedMemory(ShmListener::bind(
                &self.profile.address,
                self.profile.shm_options(),
            )?),
        };
        debug!(
            profile = %self.profile.name,
            scheme = listener.scheme(),
            addr = %listener.local_addr(),
            "socket server listening"
        );
        self.listener = Some(listener);
        Ok(())
    }

    /// 接受一个连接并完成握手。
    pub fn accept(&mut self) -> Result<SocketConnection> {
        let listener = self.listener.as_mut().ok_or(TransportError::NotOpen)?;
        let mut transport = listener.accept()?;

        let deadline = self.config.accept_deadline();
        if deadline.is_set() {
            if let Err(err) = transport.set_deadline(deadline) {
                discard(transport);
                return Err(err.into());
            }
        }

        if self.profile.uses_envelope() {
            return Ok(SocketConnection::enveloped(transport, &self.profile.name));
        }
        if !self.profile.handshake.is_enabled() {
            return Ok(SocketConnection::plain(transport, None));
        }
        match wait_initiation(&mut transport) {
            Ok(identity) => {
                debug!(peer = %identity.name, host = %identity.host, "handshake accepted");
                Ok(SocketConnection::plain(transport, Some(identity)))
            }
            Err(err) => {
                warn!(profile = %self.profile.name, error = %err, "handshake failed during accept");
                discard(transport);
                Err(err.into())
            }
        }
    }

    /// 限制 `accept` 等待客户端的时长；[`Deadline::none()`] 恢复无限等待。
    pub fn set_accept_deadline(&mut self, deadline: Deadline) -> Result<()> {
        let listener = self.listener.as_mut().ok_or(TransportError::NotOpen)?;
        Ok(listener.set_accept_deadline(deadline)?)
    }

    pub fn local_addr(&self) -> Result<TransportSocketAddr> {
        Ok(self
            .listener
            .as_ref()
            .ok_or(TransportError::NotOpen)?
            .local_addr())
    }

    /// 停止监听；服务端回到未监听状态。
    pub fn close(&mut self) -> Result<()> {
        let mut listener = self.listener.take().ok_or(TransportError::NotOpen)?;
        listener.close()?;
        debug!(profile = %self.profile.name, "socket server closed");
        Ok(())
    }
}

fn discard(mut transport: TransportConnection) {
    if let Err(err) = transport.close() {
        debug!(error = %err, "close of rejected connection failed");
    }
}
