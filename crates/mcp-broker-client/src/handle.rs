//! Public handle to a supervised downstream MCP server process.

use mcp_broker_config::ServerConfig;
use mcp_broker_protocol::{CallToolResult, RawTool};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::warn;

use crate::actor::{self, ActorCommand};
use crate::error::{ClientError, Result};
use crate::state::DownstreamState;

/// A live connection to one downstream MCP server, backed by a supervised
/// actor task owning the child process's stdio.
///
/// Cloning a handle is cheap: every clone shares the same command channel
/// and therefore the same underlying child process.
#[derive(Clone)]
pub struct DownstreamHandle {
    server_name: String,
    tags: Vec<String>,
    cmd_tx: mpsc::UnboundedSender<ActorCommand>,
}

impl DownstreamHandle {
    /// Spawn the child process described by `config` and start its
    /// supervising actor task. Returns once the process has been spawned;
    /// the `initialize` handshake proceeds in the background.
    pub fn spawn(server_name: impl Into<String>, config: ServerConfig) -> Result<Self> {
        let server_name = server_name.into();
        let tags = config.tags.clone();
        let cmd_tx = actor::spawn_actor(server_name.clone(), config)?;
        Ok(Self {
            server_name,
            tags,
            cmd_tx,
        })
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub async fn state(&self) -> DownstreamState {
        let (tx, rx) = oneshot::channel();
        if self.cmd_tx.send(ActorCommand::GetState(tx)).is_err() {
            return DownstreamState::Dead;
        }
        rx.await.unwrap_or(DownstreamState::Dead)
    }

    pub async fn list_tools(&self) -> Result<Vec<RawTool>> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(ActorCommand::ListTools(tx))
            .map_err(|_| ClientError::PortClosed)?;
        rx.await.map_err(|_| ClientError::PortClosed)?
    }

    pub async fn call_tool(
        &self,
        name: impl Into<String>,
        arguments: Option<Value>,
    ) -> Result<CallToolResult> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(ActorCommand::CallTool {
                name: name.into(),
                arguments,
                reply: tx,
            })
            .map_err(|_| ClientError::PortClosed)?;
        rx.await.map_err(|_| ClientError::PortClosed)?
    }

    /// Ask the actor to kill its child and stop. Best-effort: if the actor
    /// has already died, this is a no-op.
    pub async fn shutdown(&self) {
        let (tx, rx) = oneshot::channel();
        if self.cmd_tx.send(ActorCommand::Shutdown(tx)).is_err() {
            return;
        }
        if rx.await.is_err() {
            warn!(server = %self.server_name, "actor dropped before acking shutdown");
        }
    }
}
