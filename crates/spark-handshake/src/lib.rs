#![doc = r#"
# spark-handshake

## 设计动机（Why）
- 在任意 [`spark_transport::Connection`] 之上提供可选的身份握手：发起方在数据流动之前声明“我是谁”，
  接受方在 `accept` 完成前解析出对端身份；
- 数据报传输没有可以附着身份的持久连接，因此提供逐包信封：每条负载都携带发送方 ID。

## 核心契约（What）
- [`Handshake`]：构造时选定的标签变体 `{None, Identity}`，由连接建立流程显式分派；
- [`initiate`] / [`wait_initiation`]：面向连接的身份交换，一条 JSON 身份消息；
- [`encapsulate`] / [`decapsulate`]：`[u16 BE id 长度][id][负载]` 信封编解码；
- [`EnvelopedConnection`]：逐次读写自动拆装信封，并记住最近一次解出的发送方身份。

## 注意事项（Trade-offs）
- 信封只携带发送方 ID，解出的 [`Identity`] 其余字段为空；
- 握手失败对本次连接尝试是致命的，不存在部分握手的恢复路径。
"#]
#![deny(unsafe_code)]
#![allow(clippy::result_large_err)]

mod envelope;
mod enveloped;
mod error;
mod identity;
mod mode;
mod protocol;

pub use envelope::{MAX_SENDER_ID_LEN, decapsulate, encapsulate};
pub use enveloped::EnvelopedConnection;
pub use error::HandshakeError;
pub use identity::{Identity, local_hostname};
pub use mode::Handshake;
pub use protocol::{IDENTITY_READ_BUFFER_LEN, initiate, wait_initiation};

/// 握手层统一的结果别名。
pub type Result<T, E = HandshakeError> = core::result::Result<T, E>;

#[cfg(test)]
pub(crate) mod testing;
