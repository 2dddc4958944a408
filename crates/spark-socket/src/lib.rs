#![doc = r#"
# spark-socket

## 设计动机（Why）
- 应用只关心“以哪个档案、连向哪里、扮演客户端还是服务端”，不关心介质细节；
- 本 crate 把档案、运行期配置、三种传输与握手协议组装为统一的 [`SocketClient`] / [`SocketServer`]。

## 核心契约（What）
- [`SocketProfile`]：静态描述（名称、地址、传输种类、握手协议、连接超时），内置 `tcp`、`tcp-hello`、
  `udp`、`udp-hello`、`shm`、`shm-hello` 六个预设，也可从 TOML 加载；
- [`SocketConfig`]：运行期环境（公网 IP、接受端默认截止时间等）；
- [`create`] / [`create_with_config`]：工厂入口，按 [`Role`] 产出 [`Socket`]，可选择立即打开或监听；
- [`SocketConnection`]：三种传输的标签变体加握手状态，实现 [`spark_transport::Connection`]。

## 注意事项（Trade-offs）
- 所有 I/O 均为阻塞调用，超时一律通过截止时间表达；
- 共享内存环形缓冲是单向通道：客户端写、服务端读。
"#]
#![deny(unsafe_code)]
#![allow(clippy::result_large_err)]

mod client;
mod config;
mod connection;
mod error;
mod factory;
pub mod logging;
mod server;

pub use client::SocketClient;
pub use config::{DEFAULT_CONNECT_TIMEOUT, Role, SocketConfig, SocketProfile, resolve_addr};
pub use connection::{SocketConnection, TransportConnection, TransportListener};
pub use error::SocketError;
pub use factory::{Socket, create, create_open_socket, create_socket, create_with_config};
pub use server::SocketServer;

pub use spark_handshake::{Handshake, Identity};
pub use spark_transport::{Connection, Deadline, TransportKind, TransportSocketAddr};

/// 门面层统一的结果别名。
pub type Result<T, E = SocketError> = core::result::Result<T, E>;
