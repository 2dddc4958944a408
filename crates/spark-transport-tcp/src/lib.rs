#![doc = r#"
# spark-transport-tcp

## 设计动机（Why）
- **定位**：在有序、可靠的 TCP 字节流之上提供消息边界：每条消息前置 4 字节大端无符号长度。
- **架构角色**：实现 `spark-transport` 的 [`Connection`](spark_transport::Connection) 与
  [`Listener`](spark_transport::Listener) 契约，是握手协议在流式介质上的承载层。

## 核心契约（What）
- **线上格式**：`[4 字节大端长度][payload]`，逐条重复，无尾部、无校验和；
- **写入**：帧头与负载拼接为一次写出，返回逻辑负载长度；
- **读取**：先窥视 4 字节帧头而不消费；目标缓冲区不足时返回
  [`TransportError::ShortBuffer`](spark_transport::TransportError::ShortBuffer)，帧头保留在预读缓冲中，
  换更大的缓冲区即可重试；否则消费帧头并完整读取帧体；
- **截止时间**：绝对时刻，每次系统调用前换算为套接字超时。

## 实现策略（How）
- 标准库阻塞 `TcpStream` 外包一层 `DeadlineStream` 负责超时装配；
- [`FrameReader`] 持有 `BytesMut` 预读缓冲，帧头窥视与后续帧的预读都落在其中；
- 建连与接受后以 `socket2` 做最佳努力调优（keepalive、禁用 Nagle、4 MiB 收发缓冲），失败只记录 `warn`。

## 风险与考量（Trade-offs）
- 帧头窥视阶段超时不会破坏字节对齐；帧体读取途中超时则无法重新同步，
  连接会被标记为失步，之后的读取直接返回协议错误，调用方必须重建连接。
"#]

mod channel;
mod error;
pub mod frame;
mod listener;
mod util;

pub use channel::FramedTcpConnection;
pub use frame::{DEFAULT_MAX_FRAME_LEN, FRAME_HEADER_LEN, FrameReader, encode_frame};
pub use listener::FramedTcpListener;
pub use util::{StreamTuning, TcpSocketOptions};
