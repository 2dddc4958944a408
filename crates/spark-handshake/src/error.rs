use spark_transport::{ErrorCategory, TransportError};
use thiserror::Error;

/// 握手与信封协议的错误。
///
/// - 配置类：缺少必填的公网 IP、发送方 ID 超过信封可表达的长度；
/// - 协议类：身份消息或信封无法解析；
/// - 其余失败原样包裹底层 [`TransportError`]，保留超时、断开等分类。
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HandshakeError {
    #[error("identity handshake requires a public IP but none is configured")]
    MissingPublicIp,
    #[error("sender id is {len} bytes, envelope allows at most {max}")]
    SenderIdTooLong { len: usize, max: usize },
    #[error("identity message is {len} bytes, limit is {max}")]
    IdentityTooLarge { len: usize, max: usize },
    #[error("malformed identity message: {0}")]
    MalformedIdentity(#[source] serde_json::Error),
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl HandshakeError {
    pub(crate) fn malformed_envelope(message: impl Into<String>) -> Self {
        Self::MalformedEnvelope(message.into())
    }

    /// 错误所属分类，与传输层共用同一套分类。
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::MissingPublicIp | Self::SenderIdTooLong { .. } => ErrorCategory::Configuration,
            Self::IdentityTooLarge { .. } => ErrorCategory::Capacity,
            Self::MalformedIdentity(_) | Self::MalformedEnvelope(_) => ErrorCategory::Protocol,
            Self::Transport(err) => err.category(),
        }
    }

    /// 稳定错误码。
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingPublicIp => "spark.handshake.missing_public_ip",
            Self::SenderIdTooLong { .. } => "spark.handshake.sender_id_too_long",
            Self::IdentityTooLarge { .. } => "spark.handshake.identity_too_large",
            Self::MalformedIdentity(_) => "spark.handshake.malformed_identity",
            Self::MalformedEnvelope(_) => "spark.handshake.malformed_envelope",
            Self::Transport(err) => err.code(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport(err) if err.is_timeout())
    }
}

/// 信封连接需要以 [`TransportError`] 报告握手层失败。
impl From<HandshakeError> for TransportError {
    fn from(err: HandshakeError) -> Self {
        match err {
            HandshakeError::Transport(inner) => inner,
            HandshakeError::MissingPublicIp | HandshakeError::SenderIdTooLong { .. } => {
                TransportError::config(err.to_string())
            }
            HandshakeError::IdentityTooLarge { len, max } => {
                TransportError::PayloadTooLarge { len, max }
            }
            other => TransportError::protocol(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_follow_transport_taxonomy() {
        assert_eq!(
            HandshakeError::MissingPublicIp.category(),
            ErrorCategory::Configuration
        );
        assert_eq!(
            HandshakeError::malformed_envelope("x").category(),
            ErrorCategory::Protocol
        );
        let wrapped = HandshakeError::from(TransportError::Disconnected);
        assert_eq!(wrapped.category(), ErrorCategory::Lifecycle);
        assert_eq!(wrapped.code(), TransportError::Disconnected.code());
    }

    #[test]
    fn converts_back_into_transport_error() {
        let err: TransportError = HandshakeError::malformed_envelope("截断").into();
        assert!(matches!(err, TransportError::Protocol(msg) if msg.contains("截断")));

        let err: TransportError = HandshakeError::MissingPublicIp.into();
        assert_eq!(err.category(), ErrorCategory::Configuration);

        let err: TransportError = HandshakeError::Transport(TransportError::Closed).into();
        assert!(matches!(err, TransportError::Closed));
    }
}
