use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::trace;

use crate::{HandshakeError, Identity, Result};

/// 信封头部中 ID 长度字段的宽度。
const ID_LEN_FIELD: usize = 2;

/// 发送方 ID 的最大字节数，受 `u16` 长度字段限制。
pub const MAX_SENDER_ID_LEN: usize = u16::MAX as usize;

/// 以发送方 ID 包裹一条负载。
///
/// 线上格式：`[u16 BE id 长度][id UTF-8][负载]`。
pub fn encapsulate(sender_id: &str, payload: &[u8]) -> Result<Bytes> {
    let id = sender_id.as_bytes();
    let id_len = u16::try_from(id.len()).map_err(|_| HandshakeError::SenderIdTooLong {
        len: id.len(),
        max: MAX_SENDER_ID_LEN,
    })?;
    let mut wire = BytesMut::with_capacity(ID_LEN_FIELD + id.len() + payload.len());
    wire.put_u16(id_len);
    wire.put_slice(id);
    wire.put_slice(payload);
    Ok(wire.freeze())
}

/// 拆开一条信封，返回仅含发送方 ID 的身份与负载切片。
///
/// 头部截断、ID 长度越过末尾或 ID 不是合法 UTF-8 都视为协议错误；
/// 每条报文独立解析，失败不影响后续报文。
pub fn decapsulate(wire: &[u8]) -> Result<(Identity, &[u8])> {
    let mut cursor = wire;
    if cursor.remaining() < ID_LEN_FIELD {
        return Err(HandshakeError::malformed_envelope(format!(
            "信封只有 {} 字节，不足以容纳长度字段",
            wire.len()
        )));
    }
    let id_len = usize::from(cursor.get_u16());
    if cursor.remaining() < id_len {
        return Err(HandshakeError::malformed_envelope(format!(
            "发送方 ID 声明 {id_len} 字节，实际只剩 {} 字节",
            cursor.remaining()
        )));
    }
    let (id, payload) = cursor.split_at(id_len);
    let id = core::str::from_utf8(id)
        .map_err(|err| HandshakeError::malformed_envelope(format!("发送方 ID 不是 UTF-8：{err}")))?;
    trace!(sender = id, payload_len = payload.len(), "envelope decoded");
    Ok((Identity::from_sender_id(id), payload))
}
