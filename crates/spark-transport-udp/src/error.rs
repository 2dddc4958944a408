use std::net::UdpSocket;
use std::time::Duration;

use spark_transport::{Deadline, OperationKind, Result, TransportError};

pub(crate) const BIND: OperationKind =
    OperationKind::new("spark.transport.udp.bind_failed", "udp bind");
pub(crate) const CONNECT: OperationKind =
    OperationKind::new("spark.transport.udp.connect_failed", "udp connect");
pub(crate) const RECEIVE: OperationKind =
    OperationKind::new("spark.transport.udp.receive_failed", "udp receive");
pub(crate) const SEND: OperationKind =
    OperationKind::new("spark.transport.udp.send_failed", "udp send");
pub(crate) const ACCEPT: OperationKind =
    OperationKind::new("spark.transport.udp.accept_failed", "udp accept");

/// 把读截止时间装配为套接字接收超时；已过期时直接返回超时错误。
pub(crate) fn arm_receive(sock: &UdpSocket, deadline: Deadline, op: OperationKind) -> Result<()> {
    let timeout = remaining(deadline, op)?;
    sock.set_read_timeout(timeout)
        .map_err(|err| TransportError::from_io(op, err))
}

/// 把写截止时间装配为套接字发送超时。
pub(crate) fn arm_send(sock: &UdpSocket, deadline: Deadline) -> Result<()> {
    let timeout = remaining(deadline, SEND)?;
    sock.set_write_timeout(timeout)
        .map_err(|err| TransportError::from_io(SEND, err))
}

fn remaining(deadline: Deadline, op: OperationKind) -> Result<Option<Duration>> {
    match deadline.remaining() {
        Some(left) if left.is_zero() => Err(TransportError::deadline_exceeded(op)),
        other => Ok(other),
    }
}
