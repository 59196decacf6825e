//! Config record for the MCP broker: downstream server definitions,
//! validation (command whitelist, shell-metacharacter rejection, size
//! limits), and file discovery.

pub mod discovery;
pub mod error;
pub mod types;
pub mod validate;

pub use discovery::{discover_config_path, load_config, load_config_file};
pub use error::{ConfigError, Result};
pub use types::{BrokerConfig, RawConfigFile, ServerConfig, TransportKind};
