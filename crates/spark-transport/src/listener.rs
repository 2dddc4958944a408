use crate::{Connection, Deadline, Result, TransportSocketAddr};

/// 统一的阻塞式传输监听器接口。
///
/// # 教案级注释
///
/// ## 意图（Why）
/// - 流式介质的 `accept` 即操作系统层面的接受连接；
/// - 数据报介质的 `accept` 是“收到下一个入站报文”，并将其包装为绑定该发送方的瞬时连接；
/// - 共享内存介质的 `accept` 交出映射同一文件的消费端。
///
/// ## 契约说明（What）
/// - `accept` 阻塞至产出一个连接、出错或 `set_accept_deadline` 设定的截止时间到期；
/// - 单次 `accept` 失败不会破坏监听器，调用方可以继续循环接受；
/// - `close` 后 `accept` 返回 [`crate::TransportError::Closed`]；
/// - `scheme` 返回协议标识字符串，供日志使用。
pub trait Listener: Send {
    /// 监听器产出的连接类型。
    type Connection: Connection;

    /// 返回协议标识（例如 `"tcp"`、`"udp"`、`"shm"`）。
    fn scheme(&self) -> &'static str;

    /// 监听器实际绑定的地址。
    fn local_addr(&self) -> TransportSocketAddr;

    /// 设置 `accept` 的截止时间。
    fn set_accept_deadline(&mut self, deadline: Deadline) -> Result<()>;

    /// 接受一个入站连接。
    fn accept(&mut self) -> Result<Self::Connection>;

    /// 关闭监听器。
    fn close(&mut self) -> Result<()>;
}
