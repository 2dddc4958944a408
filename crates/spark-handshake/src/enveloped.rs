use spark_transport::{Connection, Deadline, Result, TransportError, TransportSocketAddr};
use tracing::debug;

use crate::{Identity, envelope};

/// 逐报文拆装信封的连接包装。
///
/// # 教案式注释
///
/// ## 意图 (Why)
/// - UDP 没有可以一次性附着身份的持久连接，身份只能随每条报文携带；
///   包装后调用方仍以普通 [`Connection`] 读写，不感知信封。
///
/// ## 契约 (What)
/// - `write`：以本端 ID 包裹负载后写出，返回值为负载长度（不含信封头）；
/// - `read`：经内层 [`Connection::read_message`] 取得整条报文，解出负载后拷贝到调用方缓冲区；
///   负载放不下时返回 [`TransportError::ShortBuffer`]，该报文丢弃；
/// - 不经定长暂存区中转：信封头不含负载长度，截断后的报文无法被识别。
/// - 解析失败以 [`TransportError::Protocol`] 报告，只影响当前报文；
/// - [`EnvelopedConnection::last_identity`] 记录最近一次成功解出的发送方。
#[derive(Debug)]
pub struct EnvelopedConnection<C> {
    inner: C,
    sender_id: String,
    last_identity: Option<Identity>,
}

impl<C: Connection> EnvelopedConnection<C> {
    pub fn new(inner: C, sender_id: impl Into<String>) -> Self {
        Self {
            inner,
            sender_id: sender_id.into(),
            last_identity: None,
        }
    }

    /// 本端写出时使用的发送方 ID。
    pub fn sender_id(&self) -> &str {
        &self.sender_id
    }

    /// 最近一次成功解出的对端身份。
    pub fn last_identity(&self) -> Option<&Identity> {
        self.last_identity.as_ref()
    }

    pub fn get_ref(&self) -> &C {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut C {
        &mut self.inner
    }

    pub fn into_inner(self) -> C {
        self.inner
    }

    fn remember(&mut self, identity: Identity) {
        if self.last_identity.as_ref() != Some(&identity) {
            debug!(sender = %identity.name, "envelope sender observed");
        }
        self.last_identity = Some(identity);
    }
}

impl<C: Connection> Connection for EnvelopedConnection<C> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let wire = self.inner.read_message()?;
        let (identity, payload) = envelope::decapsulate(&wire)?;
        let len = payload.len();
        if len > buf.len() {
            return Err(TransportError::ShortBuffer {
                needed: len,
                available: buf.len(),
            });
        }
        buf[..len].copy_from_slice(payload);
        self.remember(identity);
        Ok(len)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let wire = envelope::encapsulate(&self.sender_id, buf)?;
        self.inner.write(&wire)?;
        Ok(buf.len())
    }

    fn read_message(&mut self) -> Result<Vec<u8>> {
        let wire = self.inner.read_message()?;
        let (identity, payload) = envelope::decapsulate(&wire)?;
        let payload = payload.to_vec();
        self.remember(identity);
        Ok(payload)
    }

    fn close(&mut self) -> Result<()> {
        self.inner.close()
    }

    fn local_addr(&self) -> TransportSocketAddr {
        self.inner.local_addr()
    }

    fn peer_addr(&self) -> TransportSocketAddr {
        self.inner.peer_addr()
    }

    fn set_read_deadline(&mut self, deadline: Deadline) -> Result<()> {
        self.inner.set_read_deadline(deadline)
    }

    fn set_write_deadline(&mut self, deadline: Deadline) -> Result<()> {
        self.inner.set_write_deadline(deadline)
    }

    fn set_deadline(&mut self, deadline: Deadline) -> Result<()> {
        self.inner.set_deadline(deadline)
    }

    fn is_message_oriented(&self) -> bool {
        self.inner.is_message_oriented()
    }
}
