//! Supervises the pool of downstream clients: startup retries, crash
//! detection, and bounded-concurrency fan-out across the live set.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use mcp_broker_client::{ClientError, DownstreamHandle, DownstreamState};
use mcp_broker_config::ServerConfig;
use mcp_broker_protocol::{CallToolResult, RawTool};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{RwLock, Semaphore};
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::backoff::{self, RECONNECT_MAX_TRIES};
use crate::error::{CoreError, Result};

const LIST_ALL_TOOLS_CONCURRENCY: usize = 10;
const LIST_ALL_TOOLS_QUERY_TIMEOUT: Duration = Duration::from_secs(15);
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// A snapshot of one downstream's static configuration, as exposed through
/// `get_client_info`.
#[derive(Debug, Clone, Serialize)]
pub struct ClientInfo {
    pub command: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    #[serde(rename = "type")]
    pub transport: mcp_broker_config::TransportKind,
    pub tags: Vec<String>,
}

impl From<&ServerConfig> for ClientInfo {
    fn from(config: &ServerConfig) -> Self {
        Self {
            command: config.command.clone(),
            args: config.args.clone(),
            env: config.env.clone(),
            transport: config.transport,
            tags: config.tags.clone(),
        }
    }
}

/// Supervises the downstream client pool. Configuration is read-only after
/// construction; the live client map is the only mutable state, guarded by
/// an async `RwLock` since pool mutations (new client, reconnect) are rare
/// compared to the reads every `tools/list`/`tools/call` does.
pub struct ClientManager {
    configs: HashMap<String, ServerConfig>,
    clients: Arc<RwLock<HashMap<String, DownstreamHandle>>>,
    /// Bumped on every pool insert/remove so the aggregator can invalidate
    /// its cache on a mutation event rather than only on TTL expiry.
    generation: Arc<AtomicU64>,
}

impl ClientManager {
    /// Build the manager and spawn one supervisor task per configured
    /// server. Startup is best-effort: a server that exhausts its startup
    /// retries is logged and simply absent from the live set.
    pub fn start(configs: HashMap<String, ServerConfig>) -> Arc<Self> {
        let manager = Arc::new(Self {
            configs: configs.clone(),
            clients: Arc::new(RwLock::new(HashMap::new())),
            generation: Arc::new(AtomicU64::new(0)),
        });

        for (name, config) in configs {
            let clients = manager.clients.clone();
            let generation = manager.generation.clone();
            tokio::spawn(supervise(name, config, clients, generation));
        }

        manager
    }

    pub fn server_tags(&self, server_name: &str) -> Option<&[String]> {
        self.configs.get(server_name).map(|c| c.tags.as_slice())
    }

    /// Monotonic counter incremented every time the live client set changes.
    /// The aggregator's cache compares this against the value recorded at
    /// build time to detect pool mutation without a separate event bus.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn get_client_info(&self) -> HashMap<String, ClientInfo> {
        self.configs
            .iter()
            .map(|(name, config)| (name.clone(), ClientInfo::from(config)))
            .collect()
    }

    /// Fan out `list_tools` to every live client with bounded concurrency.
    /// A dead-at-call or timed-out client contributes an empty tool list
    /// rather than failing the whole aggregate.
    pub async fn list_all_tools(&self) -> HashMap<String, Vec<RawTool>> {
        let snapshot: Vec<(String, DownstreamHandle)> = {
            let guard = self.clients.read().await;
            guard.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
        };

        let semaphore = Arc::new(Semaphore::new(LIST_ALL_TOOLS_CONCURRENCY));
        let mut join_set = JoinSet::new();
        for (name, handle) in snapshot {
            let semaphore = semaphore.clone();
            join_set.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("semaphore is never closed");
                let tools = match tokio::time::timeout(
                    LIST_ALL_TOOLS_QUERY_TIMEOUT,
                    handle.list_tools(),
                )
                .await
                {
                    Ok(Ok(tools)) => tools,
                    Ok(Err(e)) => {
                        warn!(server = %name, error = %e, "list_tools failed, substituting empty list");
                        Vec::new()
                    }
                    Err(_) => {
                        warn!(server = %name, "list_tools timed out, substituting empty list");
                        Vec::new()
                    }
                };
                (name, tools)
            });
        }

        let mut out = HashMap::new();
        while let Some(joined) = join_set.join_next().await {
            if let Ok((name, tools)) = joined {
                out.insert(name, tools);
            }
        }
        out
    }

    pub async fn call_tool(
        &self,
        server_name: &str,
        tool_name: &str,
        arguments: Option<Value>,
    ) -> Result<CallToolResult> {
        let handle = {
            let guard = self.clients.read().await;
            guard.get(server_name).cloned()
        }
        .ok_or(CoreError::ClientNotFound)?;

        if !matches!(handle.state().await, DownstreamState::Ready) {
            return Err(CoreError::ClientNotFound);
        }

        handle
            .call_tool(tool_name.to_string(), arguments)
            .await
            .map_err(|e| match e {
                ClientError::PortClosed => CoreError::ClientNotFound,
                ClientError::Downstream { message, .. } => CoreError::ToolExecutionFailed {
                    tool: tool_name.to_string(),
                    cause: message,
                },
                other => CoreError::ToolExecutionFailed {
                    tool: tool_name.to_string(),
                    cause: other.to_string(),
                },
            })
    }
}

async fn supervise(
    server_name: String,
    config: ServerConfig,
    clients: Arc<RwLock<HashMap<String, DownstreamHandle>>>,
    generation: Arc<AtomicU64>,
) {
    let Some(mut handle) = start_with_retries(&server_name, &config).await else {
        warn!(server = %server_name, "exhausted startup retries, server stays out of the pool");
        return;
    };
    clients.write().await.insert(server_name.clone(), handle.clone());
    generation.fetch_add(1, Ordering::AcqRel);

    let mut reconnect_attempt = 0u32;
    loop {
        wait_until_terminal(&handle).await;

        if handle.state().await == DownstreamState::Closing {
            clients.write().await.remove(&server_name);
            generation.fetch_add(1, Ordering::AcqRel);
            info!(server = %server_name, "downstream closed intentionally, no reconnect");
            return;
        }

        reconnect_attempt += 1;
        if reconnect_attempt > RECONNECT_MAX_TRIES {
            clients.write().await.remove(&server_name);
            generation.fetch_add(1, Ordering::AcqRel);
            warn!(server = %server_name, "giving up reconnecting after {RECONNECT_MAX_TRIES} tries");
            return;
        }

        let delay = backoff::reconnect_delay(reconnect_attempt);
        warn!(server = %server_name, attempt = reconnect_attempt, delay_secs = delay.as_secs(), "downstream died, scheduling reconnect");
        tokio::time::sleep(delay).await;

        match DownstreamHandle::spawn(server_name.clone(), config.clone()) {
            Ok(new_handle) => {
                clients
                    .write()
                    .await
                    .insert(server_name.clone(), new_handle.clone());
                generation.fetch_add(1, Ordering::AcqRel);
                handle = new_handle;
                reconnect_attempt = 0;
                info!(server = %server_name, "downstream reconnected");
            }
            Err(e) => {
                warn!(server = %server_name, error = %e, "reconnect attempt failed to spawn");
            }
        }
    }
}

/// Spawn and retry until the downstream actually reaches `Ready`, using the
/// startup backoff schedule. A downstream that crashes mid-handshake (spawn
/// succeeds, init never completes) counts as a failed startup attempt just
/// like a spawn error — the reconnect backoff schedule only kicks in once a
/// downstream has been `Ready` at least once, in `supervise` below.
async fn start_with_retries(server_name: &str, config: &ServerConfig) -> Option<DownstreamHandle> {
    let mut attempt = 1;
    loop {
        match DownstreamHandle::spawn(server_name.to_string(), config.clone()) {
            Ok(handle) => match wait_until_ready_or_dead(&handle).await {
                DownstreamState::Ready => return Some(handle),
                _ => {
                    warn!(server = %server_name, attempt, "downstream died before completing handshake");
                }
            },
            Err(e) => {
                warn!(server = %server_name, attempt, error = %e, "startup attempt failed");
            }
        }
        let delay = backoff::startup_delay(attempt)?;
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

async fn wait_until_ready_or_dead(handle: &DownstreamHandle) -> DownstreamState {
    loop {
        let state = handle.state().await;
        if state == DownstreamState::Ready || state.is_terminal() {
            return state;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

async fn wait_until_terminal(handle: &DownstreamHandle) {
    loop {
        if handle.state().await.is_terminal() {
            return;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}
