//! Downstream pool supervision (`ClientManager`) and tool catalog
//! aggregation (`ToolAggregator`): the broker's shared core state.

mod aggregator;
mod backoff;
pub mod error;
mod manager;
mod schema;

pub use aggregator::{Tool, ToolAggregator};
pub use error::{CoreError, Result};
pub use manager::{ClientInfo, ClientManager};
pub use schema::simplify_schema;
