//! Core error types: aggregation and pool-routing failures.

pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Debug, Clone, thiserror::Error)]
pub enum CoreError {
    #[error("client_not_found")]
    ClientNotFound,

    #[error("tool_not_found")]
    ToolNotFound,

    #[error("tool_execution_failed: {tool}: {cause}")]
    ToolExecutionFailed { tool: String, cause: String },

    #[error("invalid_tool_params: {0}")]
    InvalidToolParams(String),
}

impl From<mcp_broker_client::ClientError> for CoreError {
    fn from(err: mcp_broker_client::ClientError) -> Self {
        match err {
            mcp_broker_client::ClientError::ClientNotFound => CoreError::ClientNotFound,
            other => CoreError::ToolExecutionFailed {
                tool: String::new(),
                cause: other.to_string(),
            },
        }
    }
}
