//! 日志初始化。

use thiserror::Error;
use tracing::dispatcher;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt};

/// 日志初始化失败。
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("a global tracing subscriber is already installed")]
    SubscriberAlreadySet,
    #[error("failed to install tracing subscriber")]
    SetGlobalSubscriber(#[source] tracing::subscriber::SetGlobalDefaultError),
}

/// 安装 `fmt + EnvFilter` 全局订阅者。
///
/// # 教案式说明
/// - **逻辑（How）**：`RUST_LOG` 存在时以它为准，否则使用 `default_directive`（例如 `"info"` 或
///   `"spark_socket=debug"`）；
/// - **契约（What）**：外部已设置全局订阅者时返回 [`LoggingError::SubscriberAlreadySet`]，不会覆盖；
///   调用方可以忽略该错误以获得幂等行为。
pub fn init_tracing(default_directive: &str) -> Result<(), LoggingError> {
    if dispatcher::has_been_set() {
        return Err(LoggingError::SubscriberAlreadySet);
    }
    let subscriber = tracing_subscriber::registry()
        .with(build_env_filter(default_directive))
        .with(tracing_subscriber::fmt::layer());
    tracing::subscriber::set_global_default(subscriber).map_err(LoggingError::SetGlobalSubscriber)
}

fn build_env_filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive))
}
