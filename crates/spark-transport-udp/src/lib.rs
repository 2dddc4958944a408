#![doc = r#"
# spark-transport-udp

## 模块使命（Why）
- **统一 UDP 通路**：让无连接的 UDP 套接字也能以“监听 → 接受 → 连接读写”的方式使用，
  与帧化 TCP、共享内存共享同一套 [`Connection`](spark_transport::Connection) 契约。
- **瞬时连接**：每次 `accept` 把“下一个入站报文”包装为绑定该发送方的一次性连接，
  报文负载预先装入连接，第一次读取直接交付。

## 核心契约（What）
- [`UdpListener`]：绑定本地地址，`accept` 阻塞等待下一个报文，返回 [`UdpConnection`]；
- [`UdpConnection`]：
  - 拨号侧（`connect`）使用已连接的套接字收发；
  - 瞬时侧（`accept` 产出）与监听器共享套接字，写入显式发往最近一次记录的发送方；
  - 每次写出是一个完整报文，超过 [`MAX_DATAGRAM_PAYLOAD`] 直接失败；
  - `read_message` 以 65535 字节缓冲完成一次接收并返回恰好收到的字节。
- 约束：报文之间没有顺序与送达保证。

## 实现策略（How）
- 标准库阻塞 `UdpSocket`，截止时间在每次收发前换算为套接字超时；
- 瞬时连接与监听器通过 `Arc<UdpSocket>` 共享同一个套接字，关闭瞬时连接不会关闭监听器；
- 绑定后以 `socket2` 最佳努力地扩大收发缓冲区，失败只记录 `warn`。
"#]

mod connection;
mod error;
mod listener;
mod options;

pub use connection::UdpConnection;
pub use listener::UdpListener;
pub use options::UdpSocketOptions;

/// 单个 UDP 报文可承载的最大负载（IPv4：65535 - 8 字节 UDP 头 - 20 字节 IP 头）。
pub const MAX_DATAGRAM_PAYLOAD: usize = 65_507;

/// 接收缓冲区大小，足以容纳任意 UDP 报文。
pub const RECV_BUFFER_LEN: usize = 65_535;
