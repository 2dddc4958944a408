//! 长度前缀帧的编解码。
//!
//! 线上格式为 `[4 字节大端无符号长度][payload]`。解码侧以 [`FrameReader`] 包裹任意 `Read`，
//! 帧头先落入预读缓冲再决定是否消费，保证“缓冲区不足”时流仍然对齐。

use std::io::{self, Read};

use bytes::{Buf, BufMut, BytesMut};
use spark_transport::{Result, TransportError};

use crate::error::READ;

/// 帧头长度。
pub const FRAME_HEADER_LEN: usize = 4;

/// 默认的单帧负载上限（16 MiB），限制恶意帧头触发的内存分配。
pub const DEFAULT_MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

const READ_AHEAD_CHUNK: usize = 8 * 1024;

/// 将负载编码为一条完整帧（帧头 + 负载），供一次写出。
///
/// 负载超过 `max_frame_len` 或超过 `u32::MAX` 时返回
/// [`TransportError::PayloadTooLarge`]。
pub fn encode_frame(payload: &[u8], max_frame_len: usize) -> Result<BytesMut> {
    let limit = max_frame_len.min(u32::MAX as usize);
    if payload.len() > limit {
        return Err(TransportError::PayloadTooLarge {
            len: payload.len(),
            max: limit,
        });
    }
    let mut frame = BytesMut::with_capacity(FRAME_HEADER_LEN + payload.len());
    frame.put_u32(payload.len() as u32);
    frame.put_slice(payload);
    Ok(frame)
}

/// 带预读缓冲的帧读取器。
///
/// # 教案式注释
///
/// ## 意图 (Why)
/// - 在消费帧头之前得知帧长，从而在目标缓冲区不足时拒绝读取且不破坏字节对齐；
/// - 帧体使用“读满”循环，底层套接字的短读不会导致提前返回。
///
/// ## 逻辑 (How)
/// - `pending` 保存已从底层读出但尚未交付的字节，帧头窥视与顺带读到的后续帧都在其中；
/// - 帧体先从 `pending` 拷贝，剩余部分直接读入调用方缓冲区，不做二次拷贝；
/// - 帧体读取中途失败会把读取器标记为失步，之后的读取返回协议错误。
///
/// ## 契约 (What)
/// - `read_frame_into`：返回帧长；缓冲区不足时返回 [`TransportError::ShortBuffer`] 且不消费任何字节；
/// - `read_frame`：分配恰好等于帧长的缓冲区；
/// - 帧头声明长度超过上限时返回 [`TransportError::MalformedFrame`]。
///
/// ## 注意事项 (Trade-offs)
/// - 帧头阶段的超时只会留下部分帧头在 `pending` 中，下一次读取可以无缝继续。
#[derive(Debug)]
pub struct FrameReader<R> {
    inner: R,
    pending: BytesMut,
    max_frame_len: usize,
    desynchronized: bool,
}

impl<R: Read> FrameReader<R> {
    /// 以默认帧长上限构造读取器。
    pub fn new(inner: R) -> Self {
        Self::with_max_frame_len(inner, DEFAULT_MAX_FRAME_LEN)
    }

    /// 指定帧长上限构造读取器。
    pub fn with_max_frame_len(inner: R, max_frame_len: usize) -> Self {
        Self {
            inner,
            pending: BytesMut::with_capacity(READ_AHEAD_CHUNK),
            max_frame_len,
            desynchronized: false,
        }
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    pub fn max_frame_len(&self) -> usize {
        self.max_frame_len
    }

    /// 预读缓冲中尚未交付的字节数。
    pub fn buffered(&self) -> usize {
        self.pending.len()
    }

    /// 帧体读取是否曾经中断。
    pub fn is_desynchronized(&self) -> bool {
        self.desynchronized
    }

    /// 窥视下一帧的声明长度，不消费帧头。
    pub fn peek_frame_len(&mut self) -> Result<usize> {
        if self.desynchronized {
            return Err(TransportError::protocol(
                "前一次帧体读取中断，字节流已失步，请重建连接",
            ));
        }
        self.fill_pending(FRAME_HEADER_LEN)
            .map_err(|err| TransportError::from_io(READ, err))?;
        let declared = (&self.pending[..FRAME_HEADER_LEN]).get_u32();
        if declared as usize > self.max_frame_len {
            return Err(TransportError::MalformedFrame {
                declared: u64::from(declared),
                max: self.max_frame_len,
            });
        }
        Ok(declared as usize)
    }

    /// 读取一帧到调用方缓冲区。
    pub fn read_frame_into(&mut self, buf: &mut [u8]) -> Result<usize> {
        let len = self.peek_frame_len()?;
        if buf.len() < len {
            return Err(TransportError::ShortBuffer {
                needed: len,
                available: buf.len(),
            });
        }
        self.pending.advance(FRAME_HEADER_LEN);
        self.read_body(&mut buf[..len])?;
        Ok(len)
    }

    /// 读取一帧到新分配的缓冲区。
    pub fn read_frame(&mut self) -> Result<Vec<u8>> {
        let len = self.peek_frame_len()?;
        self.pending.advance(FRAME_HEADER_LEN);
        let mut body = vec![0u8; len];
        self.read_body(&mut body)?;
        Ok(body)
    }

    fn read_body(&mut self, body: &mut [u8]) -> Result<()> {
        let from_pending = body.len().min(self.pending.len());
        body[..from_pending].copy_from_slice(&self.pending[..from_pending]);
        self.pending.advance(from_pending);

        let mut filled = from_pending;
        while filled < body.len() {
            match self.inner.read(&mut body[filled..]) {
                Ok(0) => {
                    self.desynchronized = true;
                    return Err(TransportError::Disconnected);
                }
                Ok(n) => filled += n,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    self.desynchronized = true;
                    return Err(TransportError::from_io(READ, err));
                }
            }
        }
        Ok(())
    }

    fn fill_pending(&mut self, want: usize) -> io::Result<()> {
        let mut chunk = [0u8; READ_AHEAD_CHUNK];
        while self.pending.len() < want {
            match self.inner.read(&mut chunk) {
                Ok(0) => return Err(io::Error::from(io::ErrorKind::UnexpectedEof)),
                Ok(n) => self.pending.extend_from_slice(&chunk[..n]),
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::io::Cursor;

    /// 按脚本逐步吐出数据或错误的读取器，模拟套接字的短读与超时。
    struct Scripted {
        steps: VecDeque<io::Result<Vec<u8>>>,
    }

    impl Scripted {
        fn new(steps: Vec<io::Result<Vec<u8>>>) -> Self {
            Self {
                steps: steps.into(),
            }
        }
    }

    impl Read for Scripted {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.steps.pop_front() {
                None => Ok(0),
                Some(Err(err)) => Err(err),
                Some(Ok(mut bytes)) => {
                    let n = bytes.len().min(buf.len());
                    buf[..n].copy_from_slice(&bytes[..n]);
                    if n < bytes.len() {
                        self.steps.push_front(Ok(bytes.split_off(n)));
                    }
                    Ok(n)
                }
            }
        }
    }

    fn wire(payloads: &[&[u8]]) -> Vec<u8> {
        let mut out = Vec::new();
        for payload in payloads {
            out.extend_from_slice(&encode_frame(payload, DEFAULT_MAX_FRAME_LEN).expect("编码帧"));
        }
        out
    }

    #[test]
    fn header_is_big_endian_length() {
        let frame = encode_frame(b"TCP_PING", DEFAULT_MAX_FRAME_LEN).expect("编码帧");
        assert_eq!(&frame[..4], &[0, 0, 0, 8]);
        assert_eq!(&frame[4..], b"TCP_PING");
    }

    #[test]
    fn short_buffer_leaves_header_for_retry() {
        let mut reader = FrameReader::new(Cursor::new(wire(&[b"hello"])));

        let mut small = [0u8; 2];
        let err = reader
            .read_frame_into(&mut small)
            .expect_err("缓冲区不足应失败");
        assert!(matches!(
            err,
            TransportError::ShortBuffer {
                needed: 5,
                available: 2
            }
        ));

        let mut large = [0u8; 16];
        let n = reader.read_frame_into(&mut large).expect("换大缓冲区后应成功");
        assert_eq!(&large[..n], b"hello");
    }

    #[test]
    fn oversized_header_is_malformed() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1025u32.to_be_bytes());
        bytes.extend_from_slice(&[0u8; 8]);
        let mut reader = FrameReader::with_max_frame_len(Cursor::new(bytes), 1024);
        let err = reader.read_frame().expect_err("超限帧头应失败");
        assert!(matches!(
            err,
            TransportError::MalformedFrame {
                declared: 1025,
                max: 1024
            }
        ));
    }

    #[test]
    fn oversized_payload_is_rejected_on_encode() {
        let err = encode_frame(&[0u8; 33], 32).expect_err("超限负载应失败");
        assert!(matches!(
            err,
            TransportError::PayloadTooLarge { len: 33, max: 32 }
        ));
    }

    #[test]
    fn byte_at_a_time_reads_reassemble_frames() {
        let steps = wire(&[b"first", b"", b"third"])
            .into_iter()
            .map(|byte| Ok(vec![byte]))
            .collect();
        let mut reader = FrameReader::new(Scripted::new(steps));

        assert_eq!(reader.read_frame().expect("第一帧"), b"first");
        assert_eq!(reader.read_frame().expect("空帧"), b"");
        let mut buf = [0u8; 8];
        let n = reader.read_frame_into(&mut buf).expect("第三帧");
        assert_eq!(&buf[..n], b"third");
        assert!(matches!(
            reader.read_frame(),
            Err(TransportError::Disconnected)
        ));
    }

    #[test]
    fn timeout_inside_header_keeps_stream_aligned() {
        let bytes = wire(&[b"late"]);
        let steps = vec![
            Ok(bytes[..2].to_vec()),
            Err(io::Error::from(io::ErrorKind::WouldBlock)),
            Ok(bytes[2..].to_vec()),
        ];
        let mut reader = FrameReader::new(Scripted::new(steps));

        let err = reader.read_frame().expect_err("帧头阶段超时");
        assert!(err.is_timeout());
        assert!(!reader.is_desynchronized());
        assert_eq!(reader.buffered(), 2);

        assert_eq!(reader.read_frame().expect("恢复后应读到完整帧"), b"late");
    }

    #[test]
    fn timeout_inside_body_poisons_reader() {
        let bytes = wire(&[b"partial-body"]);
        let steps = vec![
            Ok(bytes[..6].to_vec()),
            Err(io::Error::from(io::ErrorKind::TimedOut)),
            Ok(bytes[6..].to_vec()),
        ];
        let mut reader = FrameReader::new(Scripted::new(steps));

        let err = reader.read_frame().expect_err("帧体阶段超时");
        assert!(err.is_timeout());
        assert!(reader.is_desynchronized());

        let err = reader.read_frame().expect_err("失步后应拒绝继续读取");
        assert!(matches!(err, TransportError::Protocol(_)));
    }
}
