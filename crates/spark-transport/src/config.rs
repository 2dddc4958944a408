use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::TransportError;

/// 传输介质种类。
///
/// 配置文件中以小写字符串出现：`tcp`/`framed-tcp`、`udp`、`shm`/`shared-memory`。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransportKind {
    /// 4 字节大端长度前缀的帧化 TCP。
    #[serde(alias = "tcp")]
    FramedTcp,
    /// 以瞬时连接模拟 accept 语义的 UDP。
    Udp,
    /// 内存映射文件上的单生产者/单消费者环形缓冲。
    #[serde(alias = "shm")]
    SharedMemory,
}

impl TransportKind {
    /// 是否为面向连接的介质；决定握手走身份报文还是逐报文信封。
    pub fn is_connection_oriented(&self) -> bool {
        !matches!(self, Self::Udp)
    }

    /// 稳定的短名称，与 [`crate::Listener::scheme`] 一致。
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FramedTcp => "tcp",
            Self::Udp => "udp",
            Self::SharedMemory => "shm",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransportKind {
    type Err = TransportError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "tcp" | "framed-tcp" | "framedtcp" => Ok(Self::FramedTcp),
            "udp" => Ok(Self::Udp),
            "shm" | "shared-memory" | "sharedmemory" => Ok(Self::SharedMemory),
            other => Err(TransportError::config(format!("未知的传输种类 `{other}`"))),
        }
    }
}
