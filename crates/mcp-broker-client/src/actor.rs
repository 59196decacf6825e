//! The per-downstream actor task: owns the child process's stdio and its
//! pending-request table, driven by a single `select!` loop over inbound
//! commands, child stdout lines, and per-request deadlines.

use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;

use mcp_broker_config::ServerConfig;
use mcp_broker_protocol::{
    mcp, CallToolParams, CallToolResult, InboundMessage, JsonRpcNotification, JsonRpcRequest,
    LineAssembler, RawTool, RequestId,
};
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Child;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::error::{ClientError, Result};
use crate::state::DownstreamState;

const INIT_TIMEOUT: Duration = Duration::from_secs(10);
const LIST_TOOLS_TIMEOUT: Duration = Duration::from_secs(10);
const CALL_TOOL_TIMEOUT: Duration = Duration::from_secs(30);
const READ_CHUNK_SIZE: usize = 8192;

pub enum ActorCommand {
    ListTools(oneshot::Sender<Result<Vec<RawTool>>>),
    CallTool {
        name: String,
        arguments: Option<Value>,
        reply: oneshot::Sender<Result<CallToolResult>>,
    },
    GetState(oneshot::Sender<DownstreamState>),
    Shutdown(oneshot::Sender<()>),
}

/// What an in-flight request id should do with the downstream's reply.
enum PendingEntry {
    Init,
    /// The speculative `tools/list` fired right after the handshake
    /// completes, to warm `cached_tools` before anyone asks. Nobody is
    /// waiting on this one, so there's no reply channel to fail.
    WarmupListTools,
    ListTools(oneshot::Sender<Result<Vec<RawTool>>>),
    CallTool(oneshot::Sender<Result<CallToolResult>>),
}

impl PendingEntry {
    fn fail_port_closed(self) {
        match self {
            PendingEntry::Init | PendingEntry::WarmupListTools => {}
            PendingEntry::ListTools(reply) => {
                let _ = reply.send(Err(ClientError::PortClosed));
            }
            PendingEntry::CallTool(reply) => {
                let _ = reply.send(Err(ClientError::PortClosed));
            }
        }
    }

    fn fail_timeout(self) {
        match self {
            PendingEntry::Init | PendingEntry::WarmupListTools => {}
            PendingEntry::ListTools(reply) => {
                let _ = reply.send(Err(ClientError::Timeout));
            }
            PendingEntry::CallTool(reply) => {
                let _ = reply.send(Err(ClientError::Timeout));
            }
        }
    }
}

enum InternalEvent {
    Timeout(RequestId),
}

pub fn spawn_actor(
    server_name: String,
    config: ServerConfig,
) -> Result<mpsc::UnboundedSender<ActorCommand>> {
    let mut command = tokio::process::Command::new(&config.command);
    command
        .args(&config.args)
        .envs(&config.env)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command.spawn().map_err(|e| ClientError::SpawnFailed {
        command: config.command.clone(),
        reason: e.to_string(),
    })?;

    let stdin = child.stdin.take().expect("stdin was piped");
    let stdout = child.stdout.take().expect("stdout was piped");
    let stderr = child.stderr.take().expect("stderr was piped");

    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();

    tokio::spawn(drain_stderr(server_name.clone(), stderr));
    tokio::spawn(run_actor(server_name, child, stdin, stdout, cmd_rx));

    Ok(cmd_tx)
}

async fn drain_stderr(server_name: String, stderr: tokio::process::ChildStderr) {
    let mut reader = tokio::io::BufReader::new(stderr);
    let mut line = String::new();
    loop {
        line.clear();
        match tokio::io::AsyncBufReadExt::read_line(&mut reader, &mut line).await {
            Ok(0) | Err(_) => break,
            Ok(_) => debug!(server = %server_name, stderr = %line.trim_end(), "downstream stderr"),
        }
    }
}

async fn run_actor(
    server_name: String,
    mut child: Child,
    mut stdin: tokio::process::ChildStdin,
    mut stdout: tokio::process::ChildStdout,
    mut cmd_rx: mpsc::UnboundedReceiver<ActorCommand>,
) {
    let mut state = DownstreamState::Starting;
    let mut next_request_id: RequestId = 1;
    let mut pending: HashMap<RequestId, PendingEntry> = HashMap::new();
    let mut cached_tools: Option<Vec<RawTool>> = None;
    let mut assembler = LineAssembler::new();
    let mut read_buf = vec![0u8; READ_CHUNK_SIZE];

    let (internal_tx, mut internal_rx) = mpsc::unbounded_channel::<InternalEvent>();

    state = DownstreamState::Initializing;
    let init_id = next_request_id;
    next_request_id += 1;
    pending.insert(init_id, PendingEntry::Init);
    schedule_timeout(internal_tx.clone(), init_id, INIT_TIMEOUT);

    let init_params = mcp::InitializeParams {
        capabilities: mcp::broker_client_capabilities(),
        ..Default::default()
    };
    let init_request = JsonRpcRequest::new(
        init_id,
        "initialize",
        Some(serde_json::to_value(init_params).expect("InitializeParams always serializes")),
    );
    if write_request(&mut stdin, &init_request).await.is_err() {
        state = DownstreamState::Dead;
    }

    while !state.is_terminal() {
        tokio::select! {
            biased;

            cmd = cmd_rx.recv() => {
                match cmd {
                    None => break,
                    Some(ActorCommand::Shutdown(ack)) => {
                        state = DownstreamState::Closing;
                        let _ = child.start_kill();
                        let _ = ack.send(());
                        break;
                    }
                    Some(ActorCommand::GetState(reply)) => {
                        let _ = reply.send(state);
                    }
                    Some(ActorCommand::ListTools(reply)) => {
                        if let Some(tools) = &cached_tools {
                            let _ = reply.send(Ok(tools.clone()));
                        } else if state.accepts_requests() {
                            let id = next_request_id;
                            next_request_id += 1;
                            pending.insert(id, PendingEntry::ListTools(reply));
                            schedule_timeout(internal_tx.clone(), id, LIST_TOOLS_TIMEOUT);
                            let req = JsonRpcRequest::new(id, "tools/list", None);
                            if write_request(&mut stdin, &req).await.is_err()
                                && let Some(entry) = pending.remove(&id)
                            {
                                entry.fail_port_closed();
                            }
                        } else {
                            let _ = reply.send(Err(ClientError::PortClosed));
                        }
                    }
                    Some(ActorCommand::CallTool { name, arguments, reply }) => {
                        if !state.accepts_requests() {
                            let _ = reply.send(Err(ClientError::PortClosed));
                            continue;
                        }
                        let id = next_request_id;
                        next_request_id += 1;
                        pending.insert(id, PendingEntry::CallTool(reply));
                        schedule_timeout(internal_tx.clone(), id, CALL_TOOL_TIMEOUT);
                        let req = JsonRpcRequest::new(
                            id,
                            "tools/call",
                            Some(serde_json::to_value(CallToolParams { name, arguments })
                                .expect("CallToolParams always serializes")),
                        );
                        if write_request(&mut stdin, &req).await.is_err()
                            && let Some(entry) = pending.remove(&id)
                        {
                            entry.fail_port_closed();
                        }
                    }
                }
            }

            event = internal_rx.recv() => {
                if let Some(InternalEvent::Timeout(id)) = event
                    && let Some(entry) = pending.remove(&id)
                {
                    if id == init_id {
                        state = DownstreamState::Dead;
                    }
                    entry.fail_timeout();
                }
            }

            read_result = stdout.read(&mut read_buf) => {
                match read_result {
                    Ok(0) | Err(_) => {
                        warn!(server = %server_name, "downstream child closed its stdout");
                        state = DownstreamState::Dead;
                    }
                    Ok(n) => {
                        for line in assembler.feed(&read_buf[..n]) {
                            let Some(value) = mcp_broker_protocol::parse_line(&line) else {
                                continue;
                            };
                            handle_inbound(
                                value,
                                &mut state,
                                init_id,
                                &mut pending,
                                &mut cached_tools,
                                &mut stdin,
                                &server_name,
                                &mut next_request_id,
                                &internal_tx,
                            ).await;
                        }
                    }
                }
            }

            status = child.wait() => {
                match &status {
                    Ok(s) if s.success() => info!(server = %server_name, "downstream exited normally"),
                    _ => warn!(server = %server_name, ?status, "downstream exited abnormally"),
                }
                state = DownstreamState::Dead;
                break;
            }
        }
    }

    for (_, entry) in pending.drain() {
        entry.fail_port_closed();
    }
}

fn schedule_timeout(tx: mpsc::UnboundedSender<InternalEvent>, id: RequestId, after: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(after).await;
        let _ = tx.send(InternalEvent::Timeout(id));
    });
}

async fn write_request(
    stdin: &mut tokio::process::ChildStdin,
    request: &JsonRpcRequest,
) -> std::io::Result<()> {
    let bytes = mcp_broker_protocol::encode_line(&serde_json::to_value(request).unwrap())
        .expect("JsonRpcRequest always serializes");
    stdin.write_all(&bytes).await?;
    stdin.flush().await
}

async fn handle_inbound(
    value: Value,
    state: &mut DownstreamState,
    init_id: RequestId,
    pending: &mut HashMap<RequestId, PendingEntry>,
    cached_tools: &mut Option<Vec<RawTool>>,
    stdin: &mut tokio::process::ChildStdin,
    server_name: &str,
    next_request_id: &mut RequestId,
    internal_tx: &mpsc::UnboundedSender<InternalEvent>,
) {
    let Some(InboundMessage::Response(resp)) = InboundMessage::classify(value) else {
        debug!(server = %server_name, "ignoring inbound request/notification from downstream");
        return;
    };

    let id = resp.id;
    let Some(entry) = pending.remove(&id) else {
        debug!(server = %server_name, id, "response with unknown id, dropping");
        return;
    };

    match entry {
        PendingEntry::Init => {
            if resp.is_error() {
                *state = DownstreamState::Dead;
                return;
            }
            *state = DownstreamState::Ready;

            let notif = JsonRpcNotification::new("notifications/initialized", None);
            if let Ok(bytes) =
                mcp_broker_protocol::encode_line(&serde_json::to_value(&notif).unwrap())
            {
                let _ = stdin.write_all(&bytes).await;
                let _ = stdin.flush().await;
            }

            // Warm the tool cache immediately so the first real ListTools
            // command doesn't have to wait on a round trip.
            let id = *next_request_id;
            *next_request_id += 1;
            pending.insert(id, PendingEntry::WarmupListTools);
            schedule_timeout(internal_tx.clone(), id, LIST_TOOLS_TIMEOUT);
            let req = JsonRpcRequest::new(id, "tools/list", None);
            if write_request(stdin, &req).await.is_err() {
                pending.remove(&id);
            }
        }
        PendingEntry::WarmupListTools => {
            let result = resp.into_result().map_err(ClientError::from).and_then(|value| {
                serde_json::from_value::<mcp::ListToolsResult>(value)
                    .map_err(|e| ClientError::InvalidResponse(e.to_string()))
            });
            if let Ok(list) = result {
                *cached_tools = Some(list.tools);
            }
        }
        PendingEntry::ListTools(reply) => {
            let result = resp.into_result().map_err(ClientError::from).and_then(|value| {
                serde_json::from_value::<mcp::ListToolsResult>(value)
                    .map_err(|e| ClientError::InvalidResponse(e.to_string()))
            });
            if let Ok(list) = &result {
                *cached_tools = Some(list.tools.clone());
            }
            let _ = reply.send(result.map(|list| list.tools));
        }
        PendingEntry::CallTool(reply) => {
            let result = resp.into_result().map_err(ClientError::from).and_then(|value| {
                serde_json::from_value::<CallToolResult>(value)
                    .map_err(|e| ClientError::InvalidResponse(e.to_string()))
            });
            let _ = reply.send(result);
        }
    }
}
