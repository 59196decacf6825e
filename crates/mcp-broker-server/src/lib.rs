//! The MCP-facing broker endpoint: a per-session JSON-RPC dispatcher
//! (`session::BrokerSession`) plus a stdio transport shell around it.

mod auth_discovery;
pub mod error;
mod session;
mod stdio;

pub use error::{Result, ServerError};
pub use session::BrokerSession;
pub use stdio::{process_line, run_stdio};
