//! Server-level error type: startup failures that have nowhere else to go
//! before a session (and its own JSON-RPC error mapping) exists yet.

pub type Result<T> = std::result::Result<T, ServerError>;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("config error: {0}")]
    Config(#[from] mcp_broker_config::ConfigError),

    #[error("auth error: {0}")]
    Auth(#[from] mcp_broker_auth::AuthError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
