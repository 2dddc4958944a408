use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use socket2::{SockRef, TcpKeepalive};
use spark_transport::Deadline;
use tracing::warn;

use crate::frame::DEFAULT_MAX_FRAME_LEN;

const DEFAULT_KEEPALIVE: Duration = Duration::from_secs(30);
const DEFAULT_SOCKET_BUFFER: usize = 4 * 1024 * 1024;

/// 建连与接受后应用的流式套接字调优参数。
///
/// 这些参数只影响性能，不影响正确性；任何一项设置失败都只记录 `warn` 日志。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamTuning {
    keepalive: Option<Duration>,
    nodelay: bool,
    buffer_size: Option<usize>,
}

impl Default for StreamTuning {
    fn default() -> Self {
        Self {
            keepalive: Some(DEFAULT_KEEPALIVE),
            nodelay: true,
            buffer_size: Some(DEFAULT_SOCKET_BUFFER),
        }
    }
}

impl StreamTuning {
    /// 不做任何调优。
    pub fn disabled() -> Self {
        Self {
            keepalive: None,
            nodelay: false,
            buffer_size: None,
        }
    }

    /// 设置 keepalive 探测间隔，`None` 表示不启用。
    pub fn with_keepalive(mut self, interval: Option<Duration>) -> Self {
        self.keepalive = interval;
        self
    }

    /// 是否禁用 Nagle 合并。
    pub fn with_nodelay(mut self, enabled: bool) -> Self {
        self.nodelay = enabled;
        self
    }

    /// 设置收发缓冲区大小，`None` 表示沿用系统默认。
    pub fn with_buffer_size(mut self, size: Option<usize>) -> Self {
        self.buffer_size = size;
        self
    }

    pub fn keepalive(&self) -> Option<Duration> {
        self.keepalive
    }

    pub fn nodelay(&self) -> bool {
        self.nodelay
    }

    pub fn buffer_size(&self) -> Option<usize> {
        self.buffer_size
    }

    /// 以最佳努力方式应用到套接字。
    pub(crate) fn apply(&self, stream: &TcpStream) {
        let sock = SockRef::from(stream);
        if let Some(interval) = self.keepalive {
            let keepalive = TcpKeepalive::new().with_time(interval);
            if let Err(err) = sock.set_tcp_keepalive(&keepalive) {
                warn!(error = %err, "tcp keepalive 设置失败，继续使用系统默认值");
            }
        }
        if self.nodelay
            && let Err(err) = stream.set_nodelay(true)
        {
            warn!(error = %err, "TCP_NODELAY 设置失败");
        }
        if let Some(size) = self.buffer_size {
            if let Err(err) = sock.set_recv_buffer_size(size) {
                warn!(error = %err, size, "接收缓冲区设置失败");
            }
            if let Err(err) = sock.set_send_buffer_size(size) {
                warn!(error = %err, size, "发送缓冲区设置失败");
            }
        }
    }
}

/// 帧化 TCP 连接的可选参数集合。
///
/// # 契约（What）
/// - `connect_timeout`：拨号超时，`None` 表示由操作系统决定；
/// - `max_frame_len`：单帧负载上限，写入超限返回 `PayloadTooLarge`，读到超限帧头返回 `MalformedFrame`；
/// - `tuning`：建连/接受后的套接字调优。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TcpSocketOptions {
    connect_timeout: Option<Duration>,
    max_frame_len: usize,
    tuning: StreamTuning,
}

impl Default for TcpSocketOptions {
    fn default() -> Self {
        Self {
            connect_timeout: None,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
            tuning: StreamTuning::default(),
        }
    }
}

impl TcpSocketOptions {
    pub fn with_connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_max_frame_len(mut self, max_frame_len: usize) -> Self {
        self.max_frame_len = max_frame_len;
        self
    }

    pub fn with_tuning(mut self, tuning: StreamTuning) -> Self {
        self.tuning = tuning;
        self
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout
    }

    pub fn max_frame_len(&self) -> usize {
        self.max_frame_len
    }

    pub fn tuning(&self) -> &StreamTuning {
        &self.tuning
    }
}

/// 在每次系统调用前把绝对截止时间换算为套接字超时的 `TcpStream` 包装。
///
/// 截止时间已过时直接返回 `TimedOut`，不触碰套接字；未设置截止时间时只在状态切换时
/// 清除一次套接字超时。
#[derive(Debug)]
pub(crate) struct DeadlineStream {
    stream: TcpStream,
    read_deadline: Deadline,
    write_deadline: Deadline,
    read_unbounded: bool,
    write_unbounded: bool,
}

impl DeadlineStream {
    pub(crate) fn new(stream: TcpStream) -> Self {
        Self {
            stream,
            read_deadline: Deadline::none(),
            write_deadline: Deadline::none(),
            read_unbounded: false,
            write_unbounded: false,
        }
    }

    pub(crate) fn stream(&self) -> &TcpStream {
        &self.stream
    }

    pub(crate) fn set_read_deadline(&mut self, deadline: Deadline) {
        self.read_deadline = deadline;
    }

    pub(crate) fn set_write_deadline(&mut self, deadline: Deadline) {
        self.write_deadline = deadline;
    }

    fn arm_read(&mut self) -> io::Result<()> {
        match remaining(self.read_deadline)? {
            Some(timeout) => {
                self.read_unbounded = false;
                self.stream.set_read_timeout(Some(timeout))
            }
            None if self.read_unbounded => Ok(()),
            None => {
                self.stream.set_read_timeout(None)?;
                self.read_unbounded = true;
                Ok(())
            }
        }
    }

    fn arm_write(&mut self) -> io::Result<()> {
        match remaining(self.write_deadline)? {
            Some(timeout) => {
                self.write_unbounded = false;
                self.stream.set_write_timeout(Some(timeout))
            }
            None if self.write_unbounded => Ok(()),
            None => {
                self.stream.set_write_timeout(None)?;
                self.write_unbounded = true;
                Ok(())
            }
        }
    }
}

/// 剩余时长；截止时间已过时返回 `TimedOut` 错误。
pub(crate) fn remaining(deadline: Deadline) -> io::Result<Option<Duration>> {
    match deadline.remaining() {
        Some(left) if left.is_zero() => Err(io::Error::from(io::ErrorKind::TimedOut)),
        other => Ok(other),
    }
}

impl Read for DeadlineStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.arm_read()?;
        self.stream.read(buf)
    }
}

impl Write for DeadlineStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.arm_write()?;
        self.stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn expired_deadline_reports_timed_out() {
        let past = Instant::now()
            .checked_sub(Duration::from_millis(1))
            .expect("单调时钟应允许回退");
        let err = remaining(Deadline::at(past)).expect_err("过期截止时间应失败");
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
        assert_eq!(remaining(Deadline::none()).expect("未设置截止时间"), None);
    }

    #[test]
    fn default_tuning_matches_stream_profile() {
        let tuning = StreamTuning::default();
        assert_eq!(tuning.keepalive(), Some(Duration::from_secs(30)));
        assert!(tuning.nodelay());
        assert_eq!(tuning.buffer_size(), Some(4 * 1024 * 1024));
        assert_eq!(StreamTuning::disabled().buffer_size(), None);
    }
}
