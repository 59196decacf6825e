//! MCP-specific payload types layered on top of the JSON-RPC envelope.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// MCP protocol version this broker speaks to downstreams and advertises
/// to external clients.
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// Identity the broker presents to downstream servers and to external
/// clients during the `initialize` handshake.
pub const BROKER_NAME: &str = "McpBroker";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientCapabilities {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experimental: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sampling: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    pub name: String,
    pub version: String,
}

impl Default for ClientInfo {
    fn default() -> Self {
        Self {
            name: BROKER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerCapabilities {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolsCapability>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompts: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experimental: Option<Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolsCapability {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_changed: Option<bool>,
}

/// Params the broker sends a downstream (or an external client sends the
/// broker) in an `initialize` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    pub protocol_version: String,
    pub capabilities: ClientCapabilities,
    pub client_info: ClientInfo,
}

impl Default for InitializeParams {
    fn default() -> Self {
        Self {
            protocol_version: MCP_PROTOCOL_VERSION.to_string(),
            capabilities: ClientCapabilities::default(),
            client_info: ClientInfo::default(),
        }
    }
}

/// Downstream servers declare `resources` and `prompts` capabilities too;
/// the broker's own `initialize` request advertises all three so a
/// downstream never has reason to withhold part of its capability set.
pub fn broker_client_capabilities() -> ClientCapabilities {
    ClientCapabilities {
        experimental: Some(serde_json::json!({"resources": {}, "prompts": {}})),
        sampling: None,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: String,
    #[serde(default)]
    pub capabilities: ServerCapabilities,
    pub server_info: ServerInfo,
}

/// A tool definition exactly as one downstream server reports it. Field
/// names accept either `inputSchema` (MCP's own casing) or `input_schema`,
/// since downstream servers are inconsistent about which one they send.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTool {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, alias = "input_schema", rename = "inputSchema")]
    pub input_schema: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ListToolsResult {
    #[serde(default)]
    pub tools: Vec<RawTool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallToolParams {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    Text {
        text: String,
    },
    Image {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    Resource {
        uri: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none", rename = "mimeType")]
        mime_type: Option<String>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallToolResult {
    #[serde(default)]
    pub content: Vec<ToolContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl CallToolResult {
    pub fn is_error(&self) -> bool {
        self.is_error.unwrap_or(false)
    }

    pub fn text(&self) -> Option<String> {
        let joined: Vec<&str> = self
            .content
            .iter()
            .filter_map(|c| match c {
                ToolContent::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        if joined.is_empty() {
            None
        } else {
            Some(joined.join("\n"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_tool_accepts_snake_case_schema() {
        let json = serde_json::json!({"name": "t", "input_schema": {"type": "object"}});
        let tool: RawTool = serde_json::from_value(json).unwrap();
        assert!(tool.input_schema.is_some());
    }

    #[test]
    fn raw_tool_accepts_camel_case_schema() {
        let json = serde_json::json!({"name": "t", "inputSchema": {"type": "object"}});
        let tool: RawTool = serde_json::from_value(json).unwrap();
        assert!(tool.input_schema.is_some());
    }

    #[test]
    fn raw_tool_missing_schema_is_none() {
        let json = serde_json::json!({"name": "t"});
        let tool: RawTool = serde_json::from_value(json).unwrap();
        assert!(tool.input_schema.is_none());
    }

    #[test]
    fn call_tool_result_text_joins_text_parts_only() {
        let result = CallToolResult {
            content: vec![
                ToolContent::Text { text: "hi".into() },
                ToolContent::Image {
                    data: "abc".into(),
                    mime_type: "image/png".into(),
                },
                ToolContent::Text { text: "there".into() },
            ],
            is_error: None,
        };
        assert_eq!(result.text(), Some("hi\nthere".to_string()));
        assert!(!result.is_error());
    }
}
