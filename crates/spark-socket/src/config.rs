use core::fmt;
use core::str::FromStr;
use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use spark_handshake::Handshake;
use spark_transport::{Deadline, TransportError, TransportKind};
use spark_transport_shm::{DEFAULT_CAPACITY, ShmOptions};

use crate::{Result, SocketError};

/// 档案未设置连接超时（为 0）时采用的默认值。
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// 工厂预设使用的连接超时（毫秒）。
const PRESET_CONNECT_TIMEOUT_MS: u64 = 5_000;

/// 套接字扮演的角色。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Client,
    Server,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Client => "client",
            Self::Server => "server",
        })
    }
}

impl FromStr for Role {
    type Err = SocketError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "client" => Ok(Self::Client),
            "server" => Ok(Self::Server),
            _ => Err(SocketError::InvalidRole(value.to_owned())),
        }
    }
}

/// 套接字档案：描述“我是什么”的静态数据。
///
/// # 教案式注释
///
/// ## 契约 (What)
/// - `name`：握手身份与信封发送方 ID 使用的名称；
/// - `address`：网络传输为 `host:port`，共享内存为背板文件路径；
/// - `connect_timeout_ms`：客户端拨号超时，0 表示 [`DEFAULT_CONNECT_TIMEOUT`]；
/// - `shm_capacity`：共享内存环形缓冲容量，缺省为 [`DEFAULT_CAPACITY`]，两端必须一致。
///
/// ## 示例
/// ```toml
/// name = "ingest"
/// address = "127.0.0.1:9000"
/// transport = "tcp"
/// handshake = "identity"
/// connect_timeout_ms = 2000
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocketProfile {
    pub name: String,
    pub address: String,
    pub transport: TransportKind,
    #[serde(default)]
    pub handshake: Handshake,
    #[serde(default)]
    pub connect_timeout_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shm_capacity: Option<usize>,
}

impl SocketProfile {
    pub fn new(
        name: impl Into<String>,
        address: impl Into<String>,
        transport: TransportKind,
        handshake: Handshake,
    ) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            transport,
            handshake,
            connect_timeout_ms: 0,
            shm_capacity: None,
        }
    }

    /// 按名称解析内置预设。
    ///
    /// | 预设 | 传输 | 握手 | 名称 |
    /// |---|---|---|---|
    /// | `tcp` | 帧化 TCP | 无 | `TcpRaw` |
    /// | `tcp-hello` | 帧化 TCP | 身份 | 客户端 `TcpClient`，服务端 `TcpServer` |
    /// | `udp` | UDP | 无 | `UdpRaw` |
    /// | `udp-hello` | UDP | 信封 | `UdpHello` |
    /// | `shm` / `shm-hello` | 共享内存 | 无 / 身份 | 文件路径本身 |
    pub fn preset(profile: &str, address: &str, role: Role) -> Result<Self> {
        let (name, transport, handshake) = match profile {
            "tcp" => ("TcpRaw", TransportKind::FramedTcp, Handshake::None),
            "tcp-hello" => match role {
                Role::Client => ("TcpClient", TransportKind::FramedTcp, Handshake::Identity),
                Role::Server => ("TcpServer", TransportKind::FramedTcp, Handshake::Identity),
            },
            "udp" => ("UdpRaw", TransportKind::Udp, Handshake::None),
            "udp-hello" => ("UdpHello", TransportKind::Udp, Handshake::Identity),
            "shm" => (address, TransportKind::SharedMemory, Handshake::None),
            "shm-hello" => (address, TransportKind::SharedMemory, Handshake::Identity),
            other => return Err(SocketError::UnknownProfile(other.to_owned())),
        };
        Ok(Self::new(name, address, transport, handshake)
            .with_connect_timeout_ms(PRESET_CONNECT_TIMEOUT_MS))
    }

    /// 从 TOML 文本加载。
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(SocketError::InvalidConfig)
    }

    pub fn with_connect_timeout_ms(mut self, millis: u64) -> Self {
        self.connect_timeout_ms = millis;
        self
    }

    pub fn with_shm_capacity(mut self, capacity: usize) -> Self {
        self.shm_capacity = Some(capacity);
        self
    }

    /// 生效的连接超时。
    pub fn connect_timeout(&self) -> Duration {
        match self.connect_timeout_ms {
            0 => DEFAULT_CONNECT_TIMEOUT,
            millis => Duration::from_millis(millis),
        }
    }

    /// 共享内存参数；监听端不强制归零计数器。
    pub fn shm_options(&self) -> ShmOptions {
        ShmOptions::default().with_capacity(self.shm_capacity.unwrap_or(DEFAULT_CAPACITY))
    }

    /// 是否以逐报文信封代替一次性身份交换。
    pub fn uses_envelope(&self) -> bool {
        self.handshake.is_enabled() && !self.transport.is_connection_oriented()
    }
}

/// 运行期配置：描述“我在哪里”的环境数据，与档案解耦。
///
/// - `public_ip`：身份握手必填，空串视为缺失；
/// - `deadline_ms`：服务端为新接受的连接设置的默认截止时间，0 表示不设置。
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocketConfig {
    pub name: String,
    pub host: String,
    pub address: String,
    pub public_ip: String,
    pub deadline_ms: u64,
}

impl SocketConfig {
    pub fn with_public_ip(mut self, public_ip: impl Into<String>) -> Self {
        self.public_ip = public_ip.into();
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline_ms = u64::try_from(deadline.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(SocketError::InvalidConfig)
    }

    /// 已配置的公网 IP。
    pub fn public_ip(&self) -> Option<&str> {
        Some(self.public_ip.trim()).filter(|ip| !ip.is_empty())
    }

    /// 从此刻起算的接受端默认截止时间。
    pub fn accept_deadline(&self) -> Deadline {
        Deadline::from_millis(self.deadline_ms)
    }
}

/// 将 `host:port` 解析为第一个可用的套接字地址。
pub fn resolve_addr(address: &str) -> Result<SocketAddr> {
    if address.trim().is_empty() {
        return Err(TransportError::config("网络传输需要 host:port 形式的地址").into());
    }
    let resolve_err = |source| SocketError::Resolve {
        address: address.to_owned(),
        source,
    };
    address
        .to_socket_addrs()
        .map_err(resolve_err)?
        .next()
        .ok_or_else(|| {
            resolve_err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "地址没有解析出任何结果",
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_follow_role_and_transport() {
        let client = SocketProfile::preset("tcp-hello", "127.0.0.1:1", Role::Client).expect("预设");
        assert_eq!(client.name, "TcpClient");
        assert_eq!(client.handshake, Handshake::Identity);
        let server = SocketProfile::preset("tcp-hello", "127.0.0.1:1", Role::Server).expect("预设");
        assert_eq!(server.name, "TcpServer");

        let shm = SocketProfile::preset("shm-hello", "/tmp/ring", Role::Client).expect("预设");
        assert_eq!(shm.name, "/tmp/ring");
        assert_eq!(shm.transport, TransportKind::SharedMemory);
        assert!(!shm.uses_envelope());

        let udp = SocketProfile::preset("udp-hello", "127.0.0.1:1", Role::Server).expect("预设");
        assert!(udp.uses_envelope());

        let err = SocketProfile::preset("quic", "x", Role::Client).expect_err("未知预设");
        assert!(matches!(err, SocketError::UnknownProfile(name) if name == "quic"));
    }

    #[test]
    fn zero_connect_timeout_means_default() {
        let profile = SocketProfile::new("n", "a", TransportKind::Udp, Handshake::None);
        assert_eq!(profile.connect_timeout(), DEFAULT_CONNECT_TIMEOUT);
        assert_eq!(
            profile.with_connect_timeout_ms(250).connect_timeout(),
            Duration::from_millis(250)
        );
    }

    #[test]
    fn profile_loads_from_toml() {
        let profile = SocketProfile::from_toml_str(
            r#"
                name = "ingest"
                address = "/dev/shm/ingest"
                transport = "shm"
                handshake = "hello"
                shm_capacity = 4096
            "#,
        )
        .expect("解析档案");
        assert_eq!(profile.transport, TransportKind::SharedMemory);
        assert_eq!(profile.handshake, Handshake::Identity);
        assert_eq!(profile.connect_timeout_ms, 0);
        assert_eq!(profile.shm_options().capacity(), 4096);
    }

    #[test]
    fn unknown_transport_in_toml_is_a_configuration_error() {
        let err = SocketProfile::from_toml_str(
            r#"
                name = "x"
                address = "127.0.0.1:1"
                transport = "carrier-pigeon"
            "#,
        )
        .expect_err("未知传输");
        assert_eq!(err.category(), spark_transport::ErrorCategory::Configuration);
    }

    #[test]
    fn config_defaults_and_public_ip() {
        let config = SocketConfig::from_toml_str("public_ip = \" 10.0.0.7 \"\ndeadline_ms = 200")
            .expect("解析配置");
        assert_eq!(config.public_ip(), Some("10.0.0.7"));
        assert!(config.accept_deadline().is_set());
        assert_eq!(SocketConfig::default().public_ip(), None);
        assert!(!SocketConfig::default().accept_deadline().is_set());
    }

    #[test]
    fn role_parses_case_insensitively() {
        assert_eq!("SERVER".parse::<Role>().expect("server"), Role::Server);
        assert!(matches!(
            "peer".parse::<Role>(),
            Err(SocketError::InvalidRole(_))
        ));
    }

    #[test]
    fn resolves_literal_addresses_and_rejects_empty() {
        let addr = resolve_addr("127.0.0.1:4100").expect("解析");
        assert_eq!(addr.port(), 4100);
        assert_eq!(
            resolve_addr("  ").expect_err("空地址").category(),
            spark_transport::ErrorCategory::Configuration
        );
    }
}
