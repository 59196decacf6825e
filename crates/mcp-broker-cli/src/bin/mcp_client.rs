//! Diagnostic CLI: connect to one downstream MCP server directly, bypassing
//! the broker, and either list its tools or call one.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use mcp_broker_client::DownstreamHandle;
use mcp_broker_config::{ServerConfig, TransportKind};

const READY_POLL_INTERVAL: Duration = Duration::from_millis(100);
const READY_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Parser)]
#[command(name = "mcp_client")]
#[command(about = "Connect to one downstream MCP server and inspect or call its tools")]
struct Args {
    /// Downstream command to launch.
    command: String,

    /// Arguments passed to the downstream command.
    #[arg(trailing_var_arg = true)]
    command_args: Vec<String>,

    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand)]
enum Action {
    /// List the downstream's tools.
    ListTools,
    /// Call one tool by name.
    CallTool {
        name: String,
        /// JSON object of arguments, e.g. '{"message":"hi"}'.
        #[arg(long)]
        arguments: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let args = Args::parse();
    let raw = ServerConfig {
        name: String::new(),
        command: args.command,
        args: args.command_args,
        env: HashMap::new(),
        transport: TransportKind::Stdio,
        tags: Vec::new(),
    };
    let config = ServerConfig::validated("diagnostic", raw).context("invalid downstream config")?;

    let handle = DownstreamHandle::spawn("diagnostic", config).context("failed to spawn downstream")?;
    wait_until_ready(&handle).await?;

    match args.action {
        Action::ListTools => {
            let tools = handle.list_tools().await.context("list_tools failed")?;
            println!("{}", serde_json::to_string_pretty(&tools)?);
        }
        Action::CallTool { name, arguments } => {
            let arguments = arguments
                .map(|raw| serde_json::from_str(&raw))
                .transpose()
                .context("--arguments must be valid JSON")?;
            let result = handle
                .call_tool(name, arguments)
                .await
                .context("call_tool failed")?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    handle.shutdown().await;
    Ok(())
}

async fn wait_until_ready(handle: &DownstreamHandle) -> Result<()> {
    let deadline = tokio::time::Instant::now() + READY_TIMEOUT;
    loop {
        let state = handle.state().await;
        if state.accepts_requests() {
            return Ok(());
        }
        if state.is_terminal() {
            return Err(anyhow!("downstream died before becoming ready"));
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(anyhow!("timed out waiting for downstream to become ready"));
        }
        tokio::time::sleep(READY_POLL_INTERVAL).await;
    }
}
