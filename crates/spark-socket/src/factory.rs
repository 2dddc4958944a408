use crate::{Result, Role, SocketClient, SocketConfig, SocketProfile, SocketServer};

/// 工厂产出的套接字：客户端或服务端。
#[derive(Debug)]
pub enum Socket {
    Client(SocketClient),
    Server(SocketServer),
}

impl Socket {
    pub fn role(&self) -> Role {
        match self {
            Self::Client(_) => Role::Client,
            Self::Server(_) => Role::Server,
        }
    }

    pub fn as_client_mut(&mut self) -> Option<&mut SocketClient> {
        match self {
            Self::Client(client) => Some(client),
            Self::Server(_) => None,
        }
    }

    pub fn as_server_mut(&mut self) -> Option<&mut SocketServer> {
        match self {
            Self::Server(server) => Some(server),
            Self::Client(_) => None,
        }
    }

    pub fn into_client(self) -> Option<SocketClient> {
        match self {
            Self::Client(client) => Some(client),
            Self::Server(_) => None,
        }
    }

    pub fn into_server(self) -> Option<SocketServer> {
        match self {
            Self::Server(server) => Some(server),
            Self::Client(_) => None,
        }
    }

    /// 关闭客户端连接或停止监听。
    pub fn close(&mut self) -> Result<()> {
        match self {
            Self::Client(client) => client.close(),
            Self::Server(server) => server.close(),
        }
    }
}

/// 最简入口：按预设名称创建套接字，只需提供公网 IP。
///
/// `auto_connect` 为真时客户端立即 `open`，服务端立即 `listen`。
pub fn create(
    profile: &str,
    address: &str,
    public_ip: &str,
    role: Role,
    auto_connect: bool,
) -> Result<Socket> {
    let config = SocketConfig::default().with_public_ip(public_ip);
    create_with_config(profile, address, config, role, auto_connect)
}

/// 完整入口：按预设名称创建套接字，并携带完整的运行期配置（截止时间等）。
pub fn create_with_config(
    profile: &str,
    address: &str,
    config: SocketConfig,
    role: Role,
    auto_connect: bool,
) -> Result<Socket> {
    let profile = SocketProfile::preset(profile, address, role)?;
    if auto_connect {
        create_open_socket(profile, config, role)
    } else {
        Ok(create_socket(profile, config, role))
    }
}

/// 由现成档案创建尚未打开的套接字，适用于延迟连接或连接池。
pub fn create_socket(profile: SocketProfile, config: SocketConfig, role: Role) -> Socket {
    match role {
        Role::Client => Socket::Client(SocketClient::new(profile, config)),
        Role::Server => Socket::Server(SocketServer::new(profile, config)),
    }
}

/// 由现成档案创建套接字并立即打开或监听。
pub fn create_open_socket(profile: SocketProfile, config: SocketConfig, role: Role) -> Result<Socket> {
    let mut socket = create_socket(profile, config, role);
    match &mut socket {
        Socket::Client(client) => client.open()?,
        Socket::Server(server) => server.listen()?,
    }
    Ok(socket)
}
