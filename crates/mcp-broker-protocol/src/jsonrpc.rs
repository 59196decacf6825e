//! JSON-RPC 2.0 envelope types shared by every MCP participant.
//!
//! The broker speaks JSON-RPC 2.0 on two fronts: downstream, over a child
//! process's stdio (newline-delimited, see [`crate::framing`]); upstream, to
//! whatever transport fronts an external client's session. Both sides use
//! these same envelope types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON-RPC version string. Always `"2.0"`.
pub const JSONRPC_VERSION: &str = "2.0";

/// A JSON-RPC request or notification id. Notifications carry no id.
pub type RequestId = i64;

/// A JSON-RPC request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: RequestId,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn new(id: RequestId, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method: method.into(),
            params,
        }
    }
}

/// A JSON-RPC notification (no id, no response expected).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcNotification {
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
        }
    }
}

/// A JSON-RPC response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: RequestId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: RequestId, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Consume the response, yielding `result` on success or the error object
    /// on failure.
    pub fn into_result(self) -> Result<Value, JsonRpcError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

/// A JSON-RPC error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;

    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// A raw inbound line from a downstream or upstream peer: either a request,
/// a notification, or a response. JSON-RPC distinguishes these only by
/// shape (presence of `id`, `method`, `result`/`error`), so we parse
/// permissively and classify after the fact.
#[derive(Clone)]
pub enum InboundMessage {
    Request(JsonRpcRequest),
    Notification(JsonRpcNotification),
    Response(JsonRpcResponse),
}

impl InboundMessage {
    /// Classify a raw JSON value into a request, notification, or response.
    ///
    /// Returns `None` if the value has neither `method` nor (`result` or
    /// `error`) — i.e. it isn't a valid JSON-RPC message at all.
    pub fn classify(value: Value) -> Option<Self> {
        let obj = value.as_object()?;
        if obj.contains_key("method") {
            if obj.contains_key("id") {
                serde_json::from_value(value).ok().map(Self::Request)
            } else {
                serde_json::from_value(value).ok().map(Self::Notification)
            }
        } else if obj.contains_key("result") || obj.contains_key("error") {
            serde_json::from_value(value).ok().map(Self::Response)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_roundtrip() {
        let req = JsonRpcRequest::new(7, "tools/list", None);
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("\"id\":7"));
        assert!(!json.contains("params"));
    }

    #[test]
    fn response_into_result_success() {
        let resp = JsonRpcResponse::success(1, serde_json::json!({"ok": true}));
        let result = resp.into_result().unwrap();
        assert_eq!(result["ok"], true);
    }

    #[test]
    fn response_into_result_error() {
        let resp = JsonRpcResponse::failure(1, JsonRpcError::new(-32601, "Method not found"));
        let err = resp.into_result().unwrap_err();
        assert_eq!(err.code, -32601);
    }

    #[test]
    fn classify_request_vs_notification() {
        let req = serde_json::json!({"jsonrpc":"2.0","id":1,"method":"ping"});
        match InboundMessage::classify(req) {
            Some(InboundMessage::Request(r)) => assert_eq!(r.id, 1),
            other => panic!("expected Request, got {other:?}"),
        }

        let notif = serde_json::json!({"jsonrpc":"2.0","method":"notifications/initialized"});
        match InboundMessage::classify(notif) {
            Some(InboundMessage::Notification(n)) => assert_eq!(n.method, "notifications/initialized"),
            other => panic!("expected Notification, got {other:?}"),
        }
    }

    #[test]
    fn classify_response() {
        let resp = serde_json::json!({"jsonrpc":"2.0","id":5,"result":{}});
        match InboundMessage::classify(resp) {
            Some(InboundMessage::Response(r)) => assert_eq!(r.id, 5),
            other => panic!("expected Response, got {other:?}"),
        }
    }

    #[test]
    fn classify_garbage_is_none() {
        let garbage = serde_json::json!({"foo": "bar"});
        assert!(InboundMessage::classify(garbage).is_none());
    }
}

impl std::fmt::Debug for InboundMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InboundMessage::Request(r) => write!(f, "Request({})", r.method),
            InboundMessage::Notification(n) => write!(f, "Notification({})", n.method),
            InboundMessage::Response(r) => write!(f, "Response(id={})", r.id),
        }
    }
}
