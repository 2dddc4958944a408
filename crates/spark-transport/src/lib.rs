#![deny(unsafe_code)]
#![allow(clippy::result_large_err)]
#![doc = "spark-transport: 阻塞式传输契约的统一抽象层。"]
#![doc = ""]
#![doc = "== 使命概述 =="]
#![doc = "- **Why**：让帧化 TCP、UDP 瞬时连接与共享内存环形缓冲三种介质呈现同一套连接语义，调用方无需关心底层差异。"]
#![doc = "- **What**：定义 [`Connection`]、[`Listener`] 两个核心 trait，以及 [`TransportSocketAddr`]、[`Deadline`]、[`TransportError`] 等基础结构。"]
#![doc = "- **How**：所有操作均为同步阻塞调用，超时通过绝对截止时间表达，由各实现在每次系统调用前换算为剩余时长。"]

/// 传输层统一的返回别名，错误类型固定为 [`TransportError`]。
///
/// # 设计背景（Why）
/// - 三种介质共享同一错误分类，调用方可以对超时、容量、生命周期等情形做统一判断。
pub type Result<T, E = TransportError> = core::result::Result<T, E>;

pub mod addr;
pub mod config;
pub mod connection;
pub mod deadline;
pub mod error;
pub mod listener;

pub use addr::TransportSocketAddr;
pub use config::TransportKind;
pub use connection::{Connection, read_exact};
pub use deadline::Deadline;
pub use error::{ErrorCategory, OperationKind, TransportError, categorize_io_error};
pub use listener::Listener;
