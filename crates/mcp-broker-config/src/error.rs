//! Config error types.

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    ConfigFileNotFound(String),

    #[error("failed to read config file '{path}': {source}")]
    ReadFile {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("server '{server}': invalid command '{command}': {reason}")]
    InvalidCommand {
        server: String,
        command: String,
        reason: String,
    },

    #[error("server '{server}': invalid args: {reason}")]
    InvalidArgs { server: String, reason: String },

    #[error("server '{server}': invalid env: {reason}")]
    InvalidEnv { server: String, reason: String },
}
