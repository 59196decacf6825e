//! Downstream client error types.

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Clone, thiserror::Error)]
pub enum ClientError {
    #[error("failed to spawn '{command}': {reason}")]
    SpawnFailed { command: String, reason: String },

    #[error("initialization_timeout")]
    InitializationTimeout,

    #[error("client_timeout")]
    Timeout,

    /// The downstream child exited (or was closing/dead) while this request
    /// was in flight.
    #[error("port_closed")]
    PortClosed,

    #[error("invalid_response: {0}")]
    InvalidResponse(String),

    #[error("downstream error {code}: {message}")]
    Downstream { code: i64, message: String },

    #[error("client_not_found")]
    ClientNotFound,
}

impl From<mcp_broker_protocol::JsonRpcError> for ClientError {
    fn from(err: mcp_broker_protocol::JsonRpcError) -> Self {
        ClientError::Downstream {
            code: err.code,
            message: err.message,
        }
    }
}
