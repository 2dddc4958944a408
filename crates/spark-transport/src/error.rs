use std::io;

use thiserror::Error;

/// 描述一次底层操作对应的稳定错误码与默认文案。
///
/// 各传输实现以常量形式声明自己的操作（如 `spark.transport.tcp.read_failed`），
/// 错误码在日志与告警规则中保持稳定。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OperationKind {
    pub code: &'static str,
    pub message: &'static str,
}

impl OperationKind {
    /// 声明一个操作种类。
    pub const fn new(code: &'static str, message: &'static str) -> Self {
        Self { code, message }
    }
}

/// 错误分类，与传输层的五类失败一一对应，另加未归类的 IO 错误。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// 传输种类未知、必填身份字段缺失等配置问题。
    Configuration,
    /// 截止时间已过。
    Timeout,
    /// 缓冲区不足或负载超过介质上限。
    Capacity,
    /// 帧头、身份报文或信封无法解析。
    Protocol,
    /// 在未打开或已关闭的对象上操作、重复打开等。
    Lifecycle,
    /// 其余操作系统错误。
    Io,
}

/// 传输层统一错误。
///
/// # 教案级注释
///
/// ## 意图（Why）
/// - 让调用方区分“截止时间已过”与“连接已关闭”，前者可调整截止时间后重试，后者必须重建连接；
/// - 容量类错误携带实际尺寸，调用方可据此扩大缓冲区后重试。
///
/// ## 契约（What）
/// - [`TransportError::category`] 给出稳定分类；
/// - [`TransportError::code`] 给出稳定错误码，格式为 `spark.transport.*`；
/// - 最佳努力的套接字调优失败不会以本错误返回，只记录日志。
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// 配置错误。
    #[error("传输配置错误：{0}")]
    Config(String),
    /// 截止时间已过，连接本身仍然有效。
    #[error("{}: 截止时间已过", .op.message)]
    DeadlineExceeded { op: OperationKind },
    /// 目标缓冲区小于待读取的消息；帧头未被消费，可换更大的缓冲区重试。
    #[error("目标缓冲区不足：需要 {needed} 字节，仅提供 {available} 字节")]
    ShortBuffer { needed: usize, available: usize },
    /// 负载超过介质允许的最大长度。
    #[error("负载过大：{len} 字节超过上限 {max} 字节")]
    PayloadTooLarge { len: usize, max: usize },
    /// 帧头声明的长度超出上限。
    #[error("帧头非法：声明长度 {declared} 超过上限 {max} 字节")]
    MalformedFrame { declared: u64, max: usize },
    /// 握手报文或信封无法解析。
    #[error("协议错误：{0}")]
    Protocol(String),
    /// 本端已经关闭该连接或监听器。
    #[error("连接已关闭")]
    Closed,
    /// 对端关闭或重置了连接。
    #[error("对端已断开连接")]
    Disconnected,
    /// 尚未打开。
    #[error("连接尚未打开")]
    NotOpen,
    /// 重复打开。
    #[error("连接已经打开")]
    AlreadyOpen,
    /// 重复监听。
    #[error("监听器已在监听")]
    AlreadyListening,
    /// 端点已被占用。
    #[error("端点正被占用：{0}")]
    Busy(String),
    /// 其余 IO 错误。
    #[error("{}: {}", .op.message, .source)]
    Io {
        op: OperationKind,
        #[source]
        source: io::Error,
    },
}

const CONFIG_CODE: &str = "spark.transport.config_invalid";
const TIMEOUT_CODE: &str = "spark.transport.timeout";
const SHORT_BUFFER_CODE: &str = "spark.transport.short_buffer";
const PAYLOAD_TOO_LARGE_CODE: &str = "spark.transport.payload_too_large";
const MALFORMED_FRAME_CODE: &str = "spark.transport.malformed_frame";
const PROTOCOL_CODE: &str = "spark.transport.protocol_violation";
const CLOSED_CODE: &str = "spark.transport.closed";
const DISCONNECTED_CODE: &str = "spark.transport.disconnected";
const NOT_OPEN_CODE: &str = "spark.transport.not_open";
const ALREADY_OPEN_CODE: &str = "spark.transport.already_open";
const ALREADY_LISTENING_CODE: &str = "spark.transport.already_listening";
const BUSY_CODE: &str = "spark.transport.busy";

impl TransportError {
    /// 构造配置错误。
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// 构造协议错误。
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    /// 构造超时错误。
    pub fn deadline_exceeded(op: OperationKind) -> Self {
        Self::DeadlineExceeded { op }
    }

    /// 错误分类。
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(_) => ErrorCategory::Configuration,
            Self::DeadlineExceeded { .. } => ErrorCategory::Timeout,
            Self::ShortBuffer { .. } | Self::PayloadTooLarge { .. } => ErrorCategory::Capacity,
            Self::MalformedFrame { .. } | Self::Protocol(_) => ErrorCategory::Protocol,
            Self::Closed
            | Self::Disconnected
            | Self::NotOpen
            | Self::AlreadyOpen
            | Self::AlreadyListening
            | Self::Busy(_) => ErrorCategory::Lifecycle,
            Self::Io { .. } => ErrorCategory::Io,
        }
    }

    /// 稳定错误码。
    pub fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => CONFIG_CODE,
            Self::DeadlineExceeded { .. } => TIMEOUT_CODE,
            Self::ShortBuffer { .. } => SHORT_BUFFER_CODE,
            Self::PayloadTooLarge { .. } => PAYLOAD_TOO_LARGE_CODE,
            Self::MalformedFrame { .. } => MALFORMED_FRAME_CODE,
            Self::Protocol(_) => PROTOCOL_CODE,
            Self::Closed => CLOSED_CODE,
            Self::Disconnected => DISCONNECTED_CODE,
            Self::NotOpen => NOT_OPEN_CODE,
            Self::AlreadyOpen => ALREADY_OPEN_CODE,
            Self::AlreadyListening => ALREADY_LISTENING_CODE,
            Self::Busy(_) => BUSY_CODE,
            Self::Io { op, .. } => op.code,
        }
    }

    /// 是否为截止时间超时。
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::DeadlineExceeded { .. })
    }

    /// 超时与容量错误属于可预期情形，调用方调整截止时间或缓冲区后可重试。
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Timeout | ErrorCategory::Capacity
        )
    }

    /// 将 IO 错误映射为传输错误。
    ///
    /// 套接字超时在 Unix 上表现为 `WouldBlock`，在 Windows 上表现为 `TimedOut`，
    /// 两者都归为 [`TransportError::DeadlineExceeded`]；对端断开归为 [`TransportError::Disconnected`]。
    pub fn from_io(op: OperationKind, source: io::Error) -> Self {
        match categorize_io_error(&source) {
            ErrorCategory::Timeout => Self::DeadlineExceeded { op },
            ErrorCategory::Lifecycle => Self::Disconnected,
            _ => Self::Io { op, source },
        }
    }
}

/// 依据 `io::ErrorKind` 给出错误分类。
pub fn categorize_io_error(error: &io::Error) -> ErrorCategory {
    use io::ErrorKind;
    match error.kind() {
        ErrorKind::TimedOut | ErrorKind::WouldBlock => ErrorCategory::Timeout,
        ErrorKind::UnexpectedEof
        | ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted
        | ErrorKind::NotConnected
        | ErrorKind::BrokenPipe => ErrorCategory::Lifecycle,
        ErrorKind::InvalidInput => ErrorCategory::Configuration,
        _ => ErrorCategory::Io,
    }
}
