use bytes::{BufMut, BytesMut};
use spark_transport::{Connection, read_exact};
use tracing::debug;

use crate::{HandshakeError, Identity, Result, identity::local_hostname};

/// 接受方为身份报文预留的读缓冲长度，同时是身份报文的上限。
pub const IDENTITY_READ_BUFFER_LEN: usize = 4096;

const LENGTH_PREFIX_LEN: usize = 4;

/// 发起方：构造身份报文并作为一条消息写出，返回已发送的身份。
///
/// # 教案式注释
///
/// ## 逻辑 (How)
/// - 公网 IP 为必填项，缺失或为空立即以 [`HandshakeError::MissingPublicIp`] 失败，不触碰连接；
/// - 身份字段取自档案名称、本机主机名以及连接自身的本端/对端地址；
/// - 消息语义的连接（帧化 TCP、UDP）一次写出 JSON；
///   字节流语义的连接（共享内存）在 JSON 前加 4 字节大端长度，接受方据此恰好读完身份，
///   不会吞掉紧随其后的用户数据。
///
/// ## 契约 (What)
/// - 报文超过 [`IDENTITY_READ_BUFFER_LEN`] 时返回 [`HandshakeError::IdentityTooLarge`]；
/// - 写失败原样包裹为 [`HandshakeError::Transport`]。
pub fn initiate<C>(conn: &mut C, name: &str, public_ip: Option<&str>) -> Result<Identity>
where
    C: Connection + ?Sized,
{
    let public_ip = public_ip
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .ok_or(HandshakeError::MissingPublicIp)?;
    let identity = Identity {
        name: name.to_owned(),
        host: local_hostname(),
        local_address: conn.local_addr().to_string(),
        remote_address: conn.peer_addr().to_string(),
        public_ip: public_ip.to_owned(),
    };
    let body = serde_json::to_vec(&identity).map_err(HandshakeError::MalformedIdentity)?;
    if body.len() > IDENTITY_READ_BUFFER_LEN {
        return Err(HandshakeError::IdentityTooLarge {
            len: body.len(),
            max: IDENTITY_READ_BUFFER_LEN,
        });
    }

    if conn.is_message_oriented() {
        conn.write(&body)?;
    } else {
        let mut framed = BytesMut::with_capacity(LENGTH_PREFIX_LEN + body.len());
        framed.put_u32(body.len() as u32);
        framed.put_slice(&body);
        conn.write(&framed)?;
    }
    debug!(sender = name, peer = %identity.remote_address, "identity sent");
    Ok(identity)
}

/// 接受方：阻塞等待并解析对端的身份报文。
///
/// 等待时长由连接当前的读截止时间决定；沉默的对端会在截止时间到达后以超时失败。
pub fn wait_initiation<C>(conn: &mut C) -> Result<Identity>
where
    C: Connection + ?Sized,
{
    let body = if conn.is_message_oriented() {
        let mut buf = vec![0u8; IDENTITY_READ_BUFFER_LEN];
        let read = conn.read(&mut buf)?;
        buf.truncate(read);
        buf
    } else {
        let mut prefix = [0u8; LENGTH_PREFIX_LEN];
        read_exact(conn, &mut prefix)?;
        let len = u32::from_be_bytes(prefix) as usize;
        if len > IDENTITY_READ_BUFFER_LEN {
            return Err(HandshakeError::IdentityTooLarge {
                len,
                max: IDENTITY_READ_BUFFER_LEN,
            });
        }
        let mut body = vec![0u8; len];
        read_exact(conn, &mut body)?;
        body
    };
    let identity: Identity =
        serde_json::from_slice(&body).map_err(HandshakeError::MalformedIdentity)?;
    debug!(name = %identity.name, host = %identity.host, "identity received");
    Ok(identity)
}
