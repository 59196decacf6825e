//! Wire types shared by every crate in the broker: the JSON-RPC 2.0
//! envelope, MCP's handshake/tool payloads layered on top of it, and the
//! newline-delimited line codec both downstream and upstream sides read
//! and write through.

pub mod framing;
pub mod jsonrpc;
pub mod mcp;

pub use framing::{encode_line, parse_line, LineAssembler};
pub use jsonrpc::{
    InboundMessage, JsonRpcError, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, RequestId,
    JSONRPC_VERSION,
};
pub use mcp::{
    broker_client_capabilities, CallToolParams, CallToolResult, ClientCapabilities, ClientInfo,
    InitializeParams, InitializeResult, ListToolsResult, RawTool, ServerCapabilities, ServerInfo,
    ToolContent, ToolsCapability, BROKER_NAME, MCP_PROTOCOL_VERSION,
};
