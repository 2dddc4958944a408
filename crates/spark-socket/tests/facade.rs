//! 门面端到端：档案 → 拨号/监听 → 握手 → 读写。

use std::time::Duration;

use anyhow::{Context, Result, ensure};
use spark_handshake::HandshakeError;
use spark_socket::{
    Connection, Deadline, Role, Socket, SocketClient, SocketConfig, SocketError, SocketProfile,
    SocketServer, TransportKind, create, create_open_socket, create_with_config,
};
use spark_transport::{ErrorCategory, TransportError};
use tracing_test::traced_test;

const PUBLIC_IP: &str = "203.0.113.5";

fn server(profile: &str, config: SocketConfig) -> Result<SocketServer> {
    create_with_config(profile, "127.0.0.1:0", config, Role::Server, true)?
        .into_server()
        .context("工厂应返回服务端")
}

fn client(profile: &str, server: &SocketServer, public_ip: &str) -> Result<SocketClient> {
    let addr = server
        .local_addr()?
        .to_socket_addr()
        .context("网络监听器应有套接字地址")?;
    create(profile, &addr.to_string(), public_ip, Role::Client, true)?
        .into_client()
        .context("工厂应返回客户端")
}

fn with_deadline(millis: u64) -> SocketConfig {
    SocketConfig::default()
        .with_public_ip(PUBLIC_IP)
        .with_deadline(Duration::from_millis(millis))
}

#[test]
fn tcp_hello_accept_carries_client_identity() -> Result<()> {
    let mut server = server("tcp-hello", with_deadline(2_000))?;
    let mut client = client("tcp-hello", &server, PUBLIC_IP)?;
    client.send(b"after-hello")?;

    let mut conn = server.accept()?;
    let identity = conn.identity().context("握手后应有对端身份")?;
    ensure!(identity.name == "TcpClient");
    ensure!(identity.public_ip == PUBLIC_IP);
    ensure!(identity.remote_address == server.local_addr()?.to_string());
    ensure!(
        client.connection().and_then(|c| c.identity()) == Some(identity),
        "客户端记录的已发送身份应与服务端收到的一致"
    );

    ensure!(conn.read_message()? == b"after-hello", "握手后的首条数据不应被吞掉");
    conn.write(b"ack")?;
    ensure!(client.receive()? == b"ack");
    Ok(())
}

#[test]
#[traced_test]
fn silent_client_fails_accept_at_server_deadline() -> Result<()> {
    let mut server = server("tcp-hello", with_deadline(200))?;
    let _silent = client("tcp", &server, "")?;

    let err = server.accept().expect_err("沉默客户端不会发送身份");
    ensure!(err.is_timeout(), "应为超时：{err}");
    ensure!(logs_contain("handshake failed during accept"));

    let mut polite = client("tcp-hello", &server, PUBLIC_IP)?;
    let conn = server.accept().context("监听器在握手失败后仍可用")?;
    ensure!(conn.identity().map(|id| id.name.as_str()) == Some("TcpClient"));
    polite.close()?;
    Ok(())
}

#[test]
fn missing_public_ip_aborts_open_and_closes_transport() -> Result<()> {
    let mut server = server("tcp-hello", with_deadline(2_000))?;
    let addr = server.local_addr()?.to_string();

    let err = create("tcp-hello", &addr, "", Role::Client, true).expect_err("缺少公网 IP");
    ensure!(matches!(err, SocketError::Handshake(HandshakeError::MissingPublicIp)));
    ensure!(err.category() == ErrorCategory::Configuration);

    let err = server.accept().expect_err("客户端已关闭连接");
    ensure!(
        matches!(err.as_transport(), Some(TransportError::Disconnected)),
        "应观察到对端断开：{err}"
    );
    Ok(())
}

#[test]
fn udp_hello_wraps_every_datagram() -> Result<()> {
    let mut server = server("udp-hello", SocketConfig::default())?;
    let mut client = client("udp-hello", &server, "")?;
    client.set_read_deadline(Deadline::after(Duration::from_secs(2)))?;

    client.send(b"UDP_PING")?;
    let mut conn = server.accept()?;
    ensure!(conn.is_enveloped());
    ensure!(conn.identity().is_none());

    let mut buf = [0u8; 64];
    let len = conn.read(&mut buf)?;
    ensure!(&buf[..len] == b"UDP_PING");
    ensure!(conn.last_identity().map(|id| id.name.as_str()) == Some("UdpHello"));

    conn.write(b"UDP_PONG")?;
    ensure!(client.receive()? == b"UDP_PONG");
    let seen = client.connection().and_then(|c| c.last_identity()).context("客户端应记录发送方")?;
    ensure!(seen.is_sender_only());
    Ok(())
}

#[test]
fn udp_hello_carries_datagrams_larger_than_eight_kib() -> Result<()> {
    let mut server = server("udp-hello", SocketConfig::default())?;
    let mut client = client("udp-hello", &server, "")?;
    client.set_read_deadline(Deadline::after(Duration::from_secs(2)))?;

    let payload: Vec<u8> = (0..10_000u32).map(|i| (i % 251) as u8).collect();
    client.send(&payload)?;
    let mut conn = server.accept()?;
    let mut buf = vec![0u8; 65_536];
    let len = conn.read(&mut buf)?;
    ensure!(len == payload.len(), "收到 {len} 字节，应为 {}", payload.len());
    ensure!(buf[..len] == payload[..]);

    conn.write(&payload)?;
    let len = client.read(&mut buf)?;
    ensure!(buf[..len] == payload[..], "回程大报文应完整");
    Ok(())
}

#[test]
fn plain_udp_round_trip() -> Result<()> {
    let mut server = server("udp", SocketConfig::default())?;
    let mut client = client("udp", &server, "")?;
    client.set_deadline(Deadline::after(Duration::from_secs(2)))?;

    client.send(b"raw")?;
    let mut conn = server.accept()?;
    ensure!(!conn.is_enveloped());
    ensure!(conn.read_message()? == b"raw");
    conn.write(b"raw-reply")?;
    ensure!(client.receive()? == b"raw-reply");
    Ok(())
}

#[test]
fn shm_hello_exchanges_identity_over_the_ring() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("ring");
    let path = path.to_str().context("临时路径应为 UTF-8")?;
    let config = with_deadline(2_000);

    let server_profile = SocketProfile::preset("shm-hello", path, Role::Server)?.with_shm_capacity(4096);
    let client_profile = SocketProfile::preset("shm-hello", path, Role::Client)?.with_shm_capacity(4096);

    let mut server = create_open_socket(server_profile, config.clone(), Role::Server)?
        .into_server()
        .context("服务端")?;
    let mut client = create_open_socket(client_profile, config, Role::Client)?
        .into_client()
        .context("客户端")?;
    client.send(b"SHM_DATA")?;

    let mut conn = server.accept()?;
    ensure!(conn.kind() == TransportKind::SharedMemory);
    let identity = conn.identity().context("共享内存握手应产出身份")?;
    ensure!(identity.name == path);
    ensure!(identity.remote_address == "memory");
    ensure!(conn.read_message()? == b"SHM_DATA");
    Ok(())
}

#[test]
fn server_config_deadline_bounds_reads_on_accepted_connection() -> Result<()> {
    let mut server = server("tcp", with_deadline(200))?;
    let _client = client("tcp", &server, "")?;

    let mut conn = server.accept()?;
    let mut buf = [0u8; 1024];
    let err = conn.read(&mut buf).expect_err("客户端保持沉默");
    ensure!(err.is_timeout(), "应为超时：{err}");
    Ok(())
}

#[test]
fn client_deadline_can_be_cleared_to_wait_for_late_response() -> Result<()> {
    let mut server = server("tcp", SocketConfig::default())?;
    let mut client = client("tcp", &server, "")?;
    let mut conn = server.accept()?;

    client.set_read_deadline(Deadline::after(Duration::from_millis(200)))?;
    let err = client.receive().expect_err("服务端尚未回复");
    ensure!(err.is_timeout());

    client.set_read_deadline(Deadline::none())?;
    conn.write(b"LATE_RESPONSE")?;
    ensure!(client.receive()? == b"LATE_RESPONSE");
    Ok(())
}

#[test]
fn lifecycle_misuse_is_reported() -> Result<()> {
    let mut socket = create("tcp", "127.0.0.1:9", "", Role::Client, false)?;
    let idle = socket.as_client_mut().context("客户端")?;
    for err in [
        idle.send(b"x").map(drop).expect_err("未打开"),
        idle.receive().map(drop).expect_err("未打开"),
        idle.close().expect_err("未打开"),
    ] {
        ensure!(matches!(err.as_transport(), Some(TransportError::NotOpen)));
    }

    let mut server = server("tcp", SocketConfig::default())?;
    let err = server.listen().expect_err("重复监听");
    ensure!(matches!(err.as_transport(), Some(TransportError::AlreadyListening)));

    let mut client = client("tcp", &server, "")?;
    let err = client.open().expect_err("重复打开");
    ensure!(matches!(err.as_transport(), Some(TransportError::AlreadyOpen)));
    client.close()?;

    server.close()?;
    let err = server.accept().expect_err("已停止监听");
    ensure!(matches!(err.as_transport(), Some(TransportError::NotOpen)));
    Ok(())
}

#[test]
fn toml_profile_drives_the_factory() -> Result<()> {
    let profile = SocketProfile::from_toml_str(
        r#"
            name = "ingest"
            address = "127.0.0.1:0"
            transport = "framed-tcp"
            handshake = "identity"
            connect_timeout_ms = 1000
        "#,
    )?;
    let config = SocketConfig::from_toml_str(&format!("public_ip = \"{PUBLIC_IP}\"\ndeadline_ms = 2000"))?;

    let Socket::Server(mut server) = create_open_socket(profile.clone(), config.clone(), Role::Server)?
    else {
        anyhow::bail!("应为服务端");
    };
    let mut client_profile = profile;
    client_profile.address = server.local_addr()?.to_string();
    let mut client = create_open_socket(client_profile, config, Role::Client)?
        .into_client()
        .context("客户端")?;

    let conn = server.accept()?;
    ensure!(conn.identity().map(|id| id.name.as_str()) == Some("ingest"));
    client.close()?;
    Ok(())
}
