use std::io;

use spark_handshake::HandshakeError;
use spark_transport::{ErrorCategory, TransportError};
use thiserror::Error;

/// 门面层错误：档案与配置问题，外加对下层错误的透明包裹。
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SocketError {
    #[error("unknown socket profile `{0}`")]
    UnknownProfile(String),
    #[error("invalid socket role `{0}`, expected `client` or `server`")]
    InvalidRole(String),
    #[error("cannot resolve address `{address}`")]
    Resolve {
        address: String,
        #[source]
        source: io::Error,
    },
    #[error("invalid socket configuration")]
    InvalidConfig(#[source] toml::de::Error),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Handshake(#[from] HandshakeError),
}

impl SocketError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::UnknownProfile(_) | Self::InvalidRole(_) | Self::InvalidConfig(_) => {
                ErrorCategory::Configuration
            }
            Self::Resolve { .. } => ErrorCategory::Io,
            Self::Transport(err) => err.category(),
            Self::Handshake(err) => err.category(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Transport(err) => err.is_timeout(),
            Self::Handshake(err) => err.is_timeout(),
            _ => false,
        }
    }

    /// 底层传输错误（含握手过程中包裹的传输错误）。
    pub fn as_transport(&self) -> Option<&TransportError> {
        match self {
            Self::Transport(err) | Self::Handshake(HandshakeError::Transport(err)) => Some(err),
            _ => None,
        }
    }
}
