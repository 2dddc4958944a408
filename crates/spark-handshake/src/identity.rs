use serde::{Deserialize, Serialize};
use tracing::debug;

/// 握手双方交换的身份报文。
///
/// 所有字段都是字符串：地址字段使用 [`spark_transport::TransportSocketAddr`] 的 `Display` 格式，
/// 共享内存连接填写 `memory`。经信封重建的身份只有 `name` 有值。
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub local_address: String,
    #[serde(default)]
    pub remote_address: String,
    #[serde(default)]
    pub public_ip: String,
}

impl Identity {
    /// 由信封中的发送方 ID 重建的最小身份。
    pub fn from_sender_id(id: impl Into<String>) -> Self {
        Self {
            name: id.into(),
            ..Self::default()
        }
    }

    /// 是否只携带发送方 ID（信封路径）。
    pub fn is_sender_only(&self) -> bool {
        self.host.is_empty()
            && self.local_address.is_empty()
            && self.remote_address.is_empty()
            && self.public_ip.is_empty()
    }
}

/// 本机主机名；系统调用失败时退回环境变量，仍不可得时为空串。
pub fn local_hostname() -> String {
    #[cfg(unix)]
    match nix::unistd::gethostname() {
        Ok(name) => return name.to_string_lossy().into_owned(),
        Err(errno) => debug!(%errno, "gethostname 失败，改用环境变量"),
    }
    ["HOSTNAME", "COMPUTERNAME"]
        .iter()
        .find_map(|key| std::env::var(key).ok().filter(|value| !value.is_empty()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sender_only_identity_has_empty_details() {
        let identity = Identity::from_sender_id("edge-7");
        assert_eq!(identity.name, "edge-7");
        assert!(identity.is_sender_only());
    }

    #[test]
    fn json_uses_snake_case_keys_and_tolerates_missing_fields() {
        let identity = Identity {
            name: "alpha".into(),
            host: "node-1".into(),
            local_address: "127.0.0.1:5000".into(),
            remote_address: "127.0.0.1:6000".into(),
            public_ip: "203.0.113.9".into(),
        };
        let json = serde_json::to_value(&identity).expect("序列化");
        assert_eq!(json["local_address"], "127.0.0.1:5000");
        assert_eq!(json["public_ip"], "203.0.113.9");

        let partial: Identity = serde_json::from_str(r#"{"name":"beta"}"#).expect("缺省字段");
        assert_eq!(partial, Identity::from_sender_id("beta"));
    }

    #[cfg(unix)]
    #[test]
    fn hostname_is_available_on_unix() {
        assert!(!local_hostname().is_empty());
    }
}
