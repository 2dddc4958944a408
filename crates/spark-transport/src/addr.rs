use core::fmt;
use std::net::{Ipv6Addr, SocketAddr};

/// `TransportSocketAddr` 为三种传输介质提供统一的端点地址表达。
///
/// # 教案级注释
///
/// ## 意图（Why）
/// - **统一抽象**：TCP、UDP 与共享内存通道共享同一地址结构，握手报文与日志无需区分介质。
/// - **可扩展性**：保留 `non_exhaustive`，为未来扩展（如 Unix Domain Socket）预留空间。
///
/// ## 合同（What）
/// - `V4` 与 `V6` 分别表示 IPv4/IPv6 套接字地址；
/// - `Memory` 是共享内存连接使用的化名地址，两端都没有网络端点，`Display` 输出固定为 `memory`；
/// - `Display` 输出稳定字符串，握手报文直接使用该格式填写地址字段。
///
/// ## 设计权衡与风险（Trade-offs）
/// - 目前未对 IPv6 进行零压缩优化，优先保障可读性。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[non_exhaustive]
pub enum TransportSocketAddr {
    /// IPv4 地址。
    V4 { addr: [u8; 4], port: u16 },
    /// IPv6 地址。
    V6 { addr: [u16; 8], port: u16 },
    /// 共享内存通道的化名地址。
    Memory,
}

impl TransportSocketAddr {
    /// 转换为标准库地址；`Memory` 没有对应的网络端点，返回 `None`。
    pub fn to_socket_addr(&self) -> Option<SocketAddr> {
        match *self {
            Self::V4 { addr, port } => Some(SocketAddr::from((addr, port))),
            Self::V6 { addr, port } => Some(SocketAddr::from((Ipv6Addr::from(addr), port))),
            Self::Memory => None,
        }
    }

    /// 是否为共享内存化名地址。
    pub fn is_memory(&self) -> bool {
        matches!(self, Self::Memory)
    }
}

impl fmt::Display for TransportSocketAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportSocketAddr::V4 { addr, port } => write!(
                f,
                "{}.{}.{}.{}:{}",
                addr[0], addr[1], addr[2], addr[3], port
            ),
            TransportSocketAddr::V6 { addr, port } => {
                let segments: Vec<String> = addr
                    .iter()
                    .map(|segment| format!("{:x}", segment))
                    .collect();
                write!(f, "[{}]:{}", segments.join(":"), port)
            }
            TransportSocketAddr::Memory => f.write_str("memory"),
        }
    }
}

impl From<SocketAddr> for TransportSocketAddr {
    fn from(addr: SocketAddr) -> Self {
        match addr {
            SocketAddr::V4(v4) => Self::V4 {
                addr: v4.ip().octets(),
                port: v4.port(),
            },
            SocketAddr::V6(v6) => Self::V6 {
                addr: v6.ip().segments(),
                port: v6.port(),
            },
        }
    }
}
