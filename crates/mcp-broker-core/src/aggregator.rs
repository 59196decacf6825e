//! Flattens the downstream pool's raw tool lists into one externally-visible
//! catalog: global name-conflict resolution, schema simplification, and a
//! TTL cache invalidated on pool mutation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use mcp_broker_protocol::CallToolResult;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::{CoreError, Result};
use crate::manager::ClientManager;
use crate::schema::simplify_schema;

const CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Aggregator's view of one exposed tool.
#[derive(Debug, Clone, Serialize)]
pub struct Tool {
    pub exposed_name: String,
    pub original_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub input_schema: Value,
    pub server_name: String,
    pub server_tags: Vec<String>,
}

struct CacheEntry {
    tools: Arc<[Tool]>,
    cached_at: Instant,
    generation: u64,
}

pub struct ToolAggregator {
    manager: Arc<ClientManager>,
    cache: RwLock<Option<CacheEntry>>,
}

impl ToolAggregator {
    pub fn new(manager: Arc<ClientManager>) -> Self {
        Self {
            manager,
            cache: RwLock::new(None),
        }
    }

    /// Returns the current catalog, reusing the cached snapshot if it is
    /// within TTL and the pool hasn't mutated since it was built.
    pub async fn aggregate(&self) -> Arc<[Tool]> {
        let current_generation = self.manager.generation();

        if let Some(entry) = self.cache.read().await.as_ref()
            && entry.generation == current_generation
            && entry.cached_at.elapsed() < CACHE_TTL
        {
            return entry.tools.clone();
        }

        let tools = self.build().await;
        *self.cache.write().await = Some(CacheEntry {
            tools: tools.clone(),
            cached_at: Instant::now(),
            generation: current_generation,
        });
        tools
    }

    /// Drop the cached snapshot, forcing the next `aggregate` call to
    /// re-query the pool regardless of TTL.
    pub async fn invalidate(&self) {
        *self.cache.write().await = None;
    }

    async fn build(&self) -> Arc<[Tool]> {
        let raw = self.manager.list_all_tools().await;

        let mut flat = Vec::new();
        for (server_name, raw_tools) in &raw {
            let tags = self
                .manager
                .server_tags(server_name)
                .map(|t| t.to_vec())
                .unwrap_or_default();

            for raw_tool in raw_tools {
                let schema = raw_tool
                    .input_schema
                    .clone()
                    .unwrap_or_else(|| serde_json::json!({}));
                flat.push(Tool {
                    exposed_name: raw_tool.name.clone(),
                    original_name: raw_tool.name.clone(),
                    description: raw_tool.description.clone(),
                    input_schema: simplify_schema(&schema),
                    server_name: server_name.clone(),
                    server_tags: tags.clone(),
                });
            }
        }

        resolve_name_conflicts(&mut flat);
        flat.into()
    }

    pub async fn get_tool_server_tags(&self, exposed_name: &str) -> Option<Vec<String>> {
        self.aggregate()
            .await
            .iter()
            .find(|t| t.exposed_name == exposed_name)
            .map(|t| t.server_tags.clone())
    }

    pub async fn call_tool(
        &self,
        exposed_name: &str,
        arguments: Option<Value>,
    ) -> Result<CallToolResult> {
        let tools = self.aggregate().await;
        let tool = tools
            .iter()
            .find(|t| t.exposed_name == exposed_name)
            .ok_or(CoreError::ToolNotFound)?;

        self.manager
            .call_tool(&tool.server_name, &tool.original_name, arguments)
            .await
    }
}

/// Renames every member of a same-named group to `"<server>.<original>"`.
/// Conflict detection is global, not pairwise: a single downstream
/// publishing the same name twice is treated as a conflict with itself.
fn resolve_name_conflicts(tools: &mut [Tool]) {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for tool in tools.iter() {
        *counts.entry(tool.exposed_name.clone()).or_insert(0) += 1;
    }

    for tool in tools.iter_mut() {
        if counts[&tool.exposed_name] > 1 {
            tool.exposed_name = format!("{}.{}", tool.server_name, tool.original_name);
        }
    }
}
