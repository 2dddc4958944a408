use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use spark_transport::TransportError;

/// 连接建立时使用的握手协议，构造时选定，由建立流程显式分派。
///
/// - `None`：不交换身份；
/// - `Identity`：面向连接的介质交换一条身份报文，UDP 改为逐报文信封。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Handshake {
    #[default]
    None,
    #[serde(alias = "hello")]
    Identity,
}

impl Handshake {
    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Identity)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Identity => "identity",
        }
    }
}

impl fmt::Display for Handshake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Handshake {
    type Err = TransportError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "none" | "" => Ok(Self::None),
            "identity" | "hello" => Ok(Self::Identity),
            other => Err(TransportError::config(format!("未知的握手协议 `{other}`"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_names_and_aliases() {
        assert_eq!("none".parse::<Handshake>().expect("none"), Handshake::None);
        assert_eq!("Hello".parse::<Handshake>().expect("hello"), Handshake::Identity);
        assert_eq!(
            " identity ".parse::<Handshake>().expect("identity"),
            Handshake::Identity
        );
        assert!("tls".parse::<Handshake>().is_err());
    }

    #[test]
    fn defaults_to_no_handshake() {
        assert_eq!(Handshake::default(), Handshake::None);
        assert!(!Handshake::None.is_enabled());
        assert_eq!(Handshake::Identity.to_string(), "identity");
    }
}
