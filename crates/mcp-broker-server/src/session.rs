//! Per-session JSON-RPC dispatcher.
//!
//! One [`BrokerSession`] is created per external client connection (for the
//! stdio transport, that means per process invocation — see
//! [`crate::stdio`]). It owns the `ClientContext` slot a successful
//! `authenticate` call fills in, similar in spirit to a web handler closing
//! over a request-scoped identity extension — except here that slot is
//! mutable session-local state rather than middleware, since MCP sessions
//! authenticate mid-stream rather than per-request.

use std::sync::Arc;

use mcp_broker_auth::{has_access, ClientContext, JwtVerifier};
use mcp_broker_core::{CoreError, ToolAggregator};
use mcp_broker_protocol::{
    CallToolResult, InboundMessage, InitializeResult, JsonRpcError, JsonRpcRequest,
    JsonRpcResponse, MCP_PROTOCOL_VERSION, RequestId, ServerCapabilities, ServerInfo,
    ToolsCapability, BROKER_NAME,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::auth_discovery;

const MAX_ARGUMENT_KEYS: usize = 100;

/// Holds the shared core state plus whatever this one session has
/// authenticated as. Cheap to construct; the expensive state
/// (`ToolAggregator`, `JwtVerifier`) is shared via `Arc`.
pub struct BrokerSession {
    aggregator: Arc<ToolAggregator>,
    verifier: Option<Arc<JwtVerifier>>,
    require_auth: bool,
    context: Option<ClientContext>,
}

impl BrokerSession {
    /// Build a session and attempt client-token auto-discovery, so a
    /// session can start authenticated without an explicit `authenticate`
    /// call when the transport already knows its token (the common case
    /// for the stdio transport).
    pub fn new(
        aggregator: Arc<ToolAggregator>,
        verifier: Option<Arc<JwtVerifier>>,
        require_auth: bool,
    ) -> Self {
        let mut session = Self {
            aggregator,
            verifier,
            require_auth,
            context: None,
        };
        session.try_auto_authenticate();
        session
    }

    fn try_auto_authenticate(&mut self) {
        let Some(verifier) = self.verifier.clone() else {
            return;
        };
        let Some(token) = auth_discovery::discover_client_token() else {
            return;
        };
        match verifier.verify(&token) {
            Ok(claims) => {
                let subject = claims.subject.clone();
                self.context = Some(ClientContext::from_claims(claims, now()));
                info!(subject = %subject, "session auto-authenticated from discovered token");
            }
            Err(error) => {
                warn!(%error, "discovered client token failed verification; session starts unauthenticated");
            }
        }
    }

    /// Handle one inbound JSON-RPC message. Returns `None` for notifications
    /// and unsolicited responses, which absorb silently.
    pub async fn handle(&mut self, raw: Value) -> Option<JsonRpcResponse> {
        match InboundMessage::classify(raw.clone()) {
            Some(InboundMessage::Request(req)) => Some(self.dispatch(req).await),
            Some(InboundMessage::Notification(notification)) => {
                debug!(method = %notification.method, "absorbing notification");
                None
            }
            Some(InboundMessage::Response(response)) => {
                debug!(id = response.id, "ignoring unsolicited response on session channel");
                None
            }
            None => {
                let id = raw.get("id").and_then(Value::as_i64)?;
                Some(JsonRpcResponse::failure(
                    id,
                    JsonRpcError::new(JsonRpcError::INVALID_REQUEST, "Invalid Request"),
                ))
            }
        }
    }

    async fn dispatch(&mut self, req: JsonRpcRequest) -> JsonRpcResponse {
        match req.method.as_str() {
            "initialize" => self.handle_initialize(req.id),
            "authenticate" => self.handle_authenticate(req.id, req.params),
            "tools/list" => self.handle_tools_list(req.id).await,
            "tools/call" => self.handle_tools_call(req.id, req.params).await,
            other => {
                debug!(method = other, "method not found");
                JsonRpcResponse::failure(
                    req.id,
                    JsonRpcError::new(JsonRpcError::METHOD_NOT_FOUND, "Method not found"),
                )
            }
        }
    }

    fn handle_initialize(&self, id: RequestId) -> JsonRpcResponse {
        let result = InitializeResult {
            protocol_version: MCP_PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability { list_changed: Some(false) }),
                ..Default::default()
            },
            server_info: ServerInfo {
                name: BROKER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };
        JsonRpcResponse::success(
            id,
            serde_json::to_value(result).expect("InitializeResult always serializes"),
        )
    }

    fn handle_authenticate(&mut self, id: RequestId, params: Option<Value>) -> JsonRpcResponse {
        let Some(verifier) = self.verifier.clone() else {
            return JsonRpcResponse::failure(
                id,
                JsonRpcError::new(JsonRpcError::INTERNAL_ERROR, "server_not_available")
                    .with_data(json!({"reason": "server_not_available"})),
            );
        };

        let token = match params.and_then(|p| serde_json::from_value::<AuthenticateParams>(p).ok()) {
            Some(p) => p.jwt_token,
            None => {
                return JsonRpcResponse::failure(
                    id,
                    JsonRpcError::new(JsonRpcError::INVALID_PARAMS, "Invalid params"),
                )
            }
        };

        match verifier.verify(&token) {
            Ok(claims) => {
                let subject = claims.subject.clone();
                self.context = Some(ClientContext::from_claims(claims, now()));
                JsonRpcResponse::success(id, json!({"ok": true, "subject": subject}))
            }
            Err(error) => {
                warn!(%error, "authenticate rejected an invalid token");
                JsonRpcResponse::failure(
                    id,
                    JsonRpcError::new(JsonRpcError::INTERNAL_ERROR, "invalid_token")
                        .with_data(json!({"reason": "invalid_token"})),
                )
            }
        }
    }

    async fn handle_tools_list(&self, id: RequestId) -> JsonRpcResponse {
        self.warn_if_dev_mode();
        let tools = self.aggregator.aggregate().await;
        let visible: Vec<Value> = tools
            .iter()
            .filter(|t| self.allows(&t.server_tags))
            .map(|t| {
                let mut entry = serde_json::Map::new();
                entry.insert("name".to_string(), json!(t.exposed_name));
                if let Some(description) = &t.description {
                    entry.insert("description".to_string(), json!(description));
                }
                entry.insert("inputSchema".to_string(), t.input_schema.clone());
                Value::Object(entry)
            })
            .collect();
        JsonRpcResponse::success(id, json!({"tools": visible}))
    }

    async fn handle_tools_call(&self, id: RequestId, params: Option<Value>) -> JsonRpcResponse {
        let params = match params.and_then(|p| serde_json::from_value::<CallToolParams>(p).ok()) {
            Some(p) => p,
            None => {
                return JsonRpcResponse::failure(
                    id,
                    JsonRpcError::new(JsonRpcError::INVALID_PARAMS, "Invalid params"),
                )
            }
        };

        if !is_valid_tool_name(&params.name) {
            return JsonRpcResponse::failure(
                id,
                JsonRpcError::new(JsonRpcError::INVALID_PARAMS, "Invalid params")
                    .with_data(json!({"reason": "invalid tool name"})),
            );
        }

        if let Some(args) = &params.arguments {
            let is_small_object = matches!(args, Value::Object(map) if map.len() <= MAX_ARGUMENT_KEYS);
            if !is_small_object {
                return JsonRpcResponse::failure(
                    id,
                    JsonRpcError::new(JsonRpcError::INVALID_PARAMS, "Invalid params").with_data(
                        json!({"reason": "arguments must be an object with at most 100 keys"}),
                    ),
                );
            }
        }

        self.warn_if_dev_mode();
        let server_tags = self.aggregator.get_tool_server_tags(&params.name).await;
        let allowed = match &server_tags {
            Some(tags) => self.allows(tags),
            // Fail-safe deny: a name that resolves to no tool has no tags
            // to check against.
            None => false,
        };

        if !allowed {
            return JsonRpcResponse::failure(
                id,
                JsonRpcError::new(JsonRpcError::INTERNAL_ERROR, "Access denied")
                    .with_data(json!({"reason": "access_denied"})),
            );
        }

        match self.aggregator.call_tool(&params.name, params.arguments).await {
            Ok(result) => JsonRpcResponse::success(id, wrap_call_result(result)),
            Err(CoreError::ToolNotFound) => JsonRpcResponse::failure(
                id,
                JsonRpcError::new(JsonRpcError::INTERNAL_ERROR, "tool not found")
                    .with_data(json!({"reason": "tool_not_found"})),
            ),
            Err(error) => JsonRpcResponse::failure(
                id,
                JsonRpcError::new(JsonRpcError::INTERNAL_ERROR, error.to_string())
                    .with_data(json!({"reason": "tool_execution_failed"})),
            ),
        }
    }

    /// OR-over-tags visibility check, folding in the development-mode
    /// bypass: an unauthenticated session only sees (and may call)
    /// everything when `require_auth` has been explicitly turned off.
    fn allows(&self, server_tags: &[String]) -> bool {
        match &self.context {
            Some(ctx) => has_access(Some(ctx), server_tags),
            None => !self.require_auth,
        }
    }

    fn warn_if_dev_mode(&self) {
        if self.context.is_none() && !self.require_auth {
            warn!("unauthenticated session running in development mode: every tool is visible");
        }
    }
}

#[derive(Deserialize)]
struct AuthenticateParams {
    #[serde(alias = "token")]
    jwt_token: String,
}

#[derive(Deserialize)]
struct CallToolParams {
    name: String,
    #[serde(default)]
    arguments: Option<Value>,
}

fn is_valid_tool_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

/// Wrap a downstream's tool result as the `{content:[{type,text}]}` shape
/// external clients expect: string results pass through, anything else is
/// re-encoded as pretty JSON.
fn wrap_call_result(result: CallToolResult) -> Value {
    let text = result
        .text()
        .unwrap_or_else(|| serde_json::to_string_pretty(&result.content).unwrap_or_default());
    json!({"content": [{"type": "text", "text": text}]})
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}
