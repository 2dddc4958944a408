use crate::{Deadline, Result, TransportError, TransportSocketAddr};

/// 统一的阻塞式传输连接接口。
///
/// # 教案级注释
///
/// ## 意图（Why）
/// - 帧化 TCP、UDP 瞬时连接与共享内存环形缓冲呈现一致的读写/关闭/截止时间语义；
/// - 握手协议与门面层只面向本 trait 编写，一份逻辑覆盖三种介质。
///
/// ## 契约说明（What）
/// - `read`：读取一条消息（帧化 TCP、UDP）或当前可用的字节（共享内存）到 `buf`，返回字节数；
/// - `write`：写出一条完整消息，返回逻辑负载长度（不含帧头等线上开销）；
/// - `read_message`：由实现自行分配恰好大小的缓冲区，返回一条完整消息；
/// - `close`：关闭后所有读写返回 [`TransportError::Closed`]，重复关闭同样返回该错误而不会 panic；
/// - 截止时间：超时返回 [`TransportError::DeadlineExceeded`]，与连接关闭可区分；
///   传入 [`Deadline::none()`] 恢复永久阻塞。
///
/// ## 风险提示（Trade-offs）
/// - 方法以 `&mut self` 接收者表达“单个连接不得被多个线程并发读或并发写”；
/// - 帧化 TCP 在读取帧体途中超时会导致字节流失步，调用方必须关闭并重建连接。
pub trait Connection: Send {
    /// 读取数据到缓冲区。
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// 写出一条消息。
    fn write(&mut self, buf: &[u8]) -> Result<usize>;

    /// 读取一条完整消息。
    fn read_message(&mut self) -> Result<Vec<u8>>;

    /// 关闭连接。
    fn close(&mut self) -> Result<()>;

    /// 本端地址。
    fn local_addr(&self) -> TransportSocketAddr;

    /// 对端地址；共享内存连接返回 [`TransportSocketAddr::Memory`]。
    fn peer_addr(&self) -> TransportSocketAddr;

    /// 设置读截止时间。
    fn set_read_deadline(&mut self, deadline: Deadline) -> Result<()>;

    /// 设置写截止时间。
    fn set_write_deadline(&mut self, deadline: Deadline) -> Result<()>;

    /// 同时设置读写截止时间。
    fn set_deadline(&mut self, deadline: Deadline) -> Result<()> {
        self.set_read_deadline(deadline)?;
        self.set_write_deadline(deadline)
    }

    /// 一次写出是否恰好对应对端的一次读取。
    ///
    /// 帧化 TCP 与 UDP 返回 `true`；共享内存环形缓冲不携带消息边界，返回 `false`。
    fn is_message_oriented(&self) -> bool;
}

impl<C: Connection + ?Sized> Connection for Box<C> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read(buf)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        (**self).write(buf)
    }

    fn read_message(&mut self) -> Result<Vec<u8>> {
        (**self).read_message()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }

    fn local_addr(&self) -> TransportSocketAddr {
        (**self).local_addr()
    }

    fn peer_addr(&self) -> TransportSocketAddr {
        (**self).peer_addr()
    }

    fn set_read_deadline(&mut self, deadline: Deadline) -> Result<()> {
        (**self).set_read_deadline(deadline)
    }

    fn set_write_deadline(&mut self, deadline: Deadline) -> Result<()> {
        (**self).set_write_deadline(deadline)
    }

    fn set_deadline(&mut self, deadline: Deadline) -> Result<()> {
        (**self).set_deadline(deadline)
    }

    fn is_message_oriented(&self) -> bool {
        (**self).is_message_oriented()
    }
}

/// 在无消息边界的连接上读满 `buf`。
///
/// 仅适用于字节流语义的连接（`is_message_oriented() == false`）；
/// 在消息语义的连接上，一次 `read` 即为一条完整消息，多次读取会跨越消息边界。
/// 读取返回 0 字节视为对端断开。
pub fn read_exact<C: Connection + ?Sized>(conn: &mut C, buf: &mut [u8]) -> Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        let read = conn.read(&mut buf[filled..])?;
        if read == 0 {
            return Err(TransportError::Disconnected);
        }
        filled += read;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// 每次最多吐出 `chunk` 字节的内存连接，用于验证 `read_exact` 的拼接逻辑。
    struct Trickle {
        data: VecDeque<u8>,
        chunk: usize,
    }

    impl Connection for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
            let n = buf.len().min(self.chunk).min(self.data.len());
            for slot in buf.iter_mut().take(n) {
                *slot = self.data.pop_front().unwrap_or_default();
            }
            Ok(n)
        }

        fn write(&mut self, buf: &[u8]) -> Result<usize> {
            self.data.extend(buf);
            Ok(buf.len())
        }

        fn read_message(&mut self) -> Result<Vec<u8>> {
            Ok(self.data.drain(..).collect())
        }

        fn close(&mut self) -> Result<()> {
            Ok(())
        }

        fn local_addr(&self) -> TransportSocketAddr {
            TransportSocketAddr::Memory
        }

        fn peer_addr(&self) -> TransportSocketAddr {
            TransportSocketAddr::Memory
        }

        fn set_read_deadline(&mut self, _deadline: Deadline) -> Result<()> {
            Ok(())
        }

        fn set_write_deadline(&mut self, _deadline: Deadline) -> Result<()> {
            Ok(())
        }

        fn is_message_oriented(&self) -> bool {
            false
        }
    }

    #[test]
    fn read_exact_stitches_partial_reads() {
        let mut conn = Trickle {
            data: VecDeque::new(),
            chunk: 3,
        };
        conn.write(b"hello world").expect("写入内存连接");

        let mut buf = [0u8; 8];
        read_exact(&mut conn, &mut buf).expect("应读满 8 字节");
        assert_eq!(&buf, b"hello wo");
    }

    #[test]
    fn read_exact_reports_disconnect_on_eof() {
        let mut conn: Box<dyn Connection> = Box::new(Trickle {
            data: VecDeque::from(b"ab".to_vec()),
            chunk: 16,
        });
        let mut buf = [0u8; 4];
        let err = read_exact(&mut conn, &mut buf).expect_err("数据不足时应失败");
        assert!(matches!(err, TransportError::Disconnected));
    }
}
