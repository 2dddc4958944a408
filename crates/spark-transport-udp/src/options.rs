use std::net::UdpSocket;

use socket2::SockRef;
use tracing::warn;

const DEFAULT_SOCKET_BUFFER: usize = 4 * 1024 * 1024;

/// UDP 套接字的可选参数集合。
///
/// # 教案级注释
///
/// ## 意图（Why）
/// - 将收发缓冲区、`SO_BROADCAST` 等介质特有配置显式建模，避免宿主层散布字符串参数；
///
/// ## 契约（What）
/// - `buffer_size`：收发缓冲区大小，默认 4 MiB，`None` 沿用系统默认；
/// - `broadcast`：是否允许广播；
/// - 应用失败只记录日志，不影响套接字可用性。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UdpSocketOptions {
    buffer_size: Option<usize>,
    broadcast: bool,
}

impl Default for UdpSocketOptions {
    fn default() -> Self {
        Self {
            buffer_size: Some(DEFAULT_SOCKET_BUFFER),
            broadcast: false,
        }
    }
}

impl UdpSocketOptions {
    /// 设置收发缓冲区大小。
    pub fn with_buffer_size(mut self, size: Option<usize>) -> Self {
        self.buffer_size = size;
        self
    }

    /// 启用或关闭广播。
    pub fn with_broadcast(mut self, enabled: bool) -> Self {
        self.broadcast = enabled;
        self
    }

    pub fn buffer_size(&self) -> Option<usize> {
        self.buffer_size
    }

    pub fn broadcast(&self) -> bool {
        self.broadcast
    }

    /// 以最佳努力方式应用到套接字。
    pub(crate) fn apply(&self, sock: &UdpSocket) {
        let sock_ref = SockRef::from(sock);
        if let Some(size) = self.buffer_size {
            if let Err(err) = sock_ref.set_recv_buffer_size(size) {
                warn!(error = %err, size, "udp 接收缓冲区设置失败");
            }
            if let Err(err) = sock_ref.set_send_buffer_size(size) {
                warn!(error = %err, size, "udp 发送缓冲区设置失败");
            }
        }
        if self.broadcast
            && let Err(err) = sock.set_broadcast(true)
        {
            warn!(error = %err, "SO_BROADCAST 设置失败");
        }
    }
}
