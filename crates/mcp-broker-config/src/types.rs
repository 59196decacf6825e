//! Config record types: one validated [`ServerConfig`] per downstream, plus
//! the broker-wide [`BrokerConfig`] that owns the whole set.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::validate;

/// Transport used to reach a downstream server. Only `stdio` is supported;
/// the field exists so a config file can name its transport explicitly and
/// so an unsupported value fails loudly instead of being silently assumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    #[default]
    Stdio,
}

fn default_type() -> TransportKind {
    TransportKind::Stdio
}

/// One downstream definition, as declared in `mcpServers`. Validated and
/// immutable once constructed — [`ServerConfig::validated`] is the only way
/// to produce one outside of tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(skip)]
    pub name: String,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default = "default_type", rename = "type")]
    pub transport: TransportKind,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ServerConfig {
    /// Construct and validate a server config in one step. `name` is not
    /// part of the JSON record (it's the `mcpServers` map key) so it's
    /// supplied by the caller.
    pub fn validated(name: impl Into<String>, mut raw: ServerConfig) -> Result<Self> {
        let name = name.into();
        raw.name = name.clone();
        raw.command = validate::tilde_expand(&raw.command);
        raw.args = raw.args.iter().map(|a| validate::tilde_expand(a)).collect();

        validate::command(&name, &raw.command)?;
        validate::args(&name, &raw.args)?;
        validate::env(&name, &raw.env)?;

        Ok(raw)
    }

    pub fn tag_set(&self) -> HashSet<String> {
        self.tags.iter().cloned().collect()
    }
}

/// Top-level `{"mcpServers": {...}}` config file shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub mcp_servers: HashMap<String, ServerConfig>,
}

// Accept the exact camelCase key on disk regardless of serde's rename_all
// defaults elsewhere in the crate.
impl RawConfigFile {
    const KEY: &'static str = "mcpServers";

    pub fn from_json(raw: &serde_json::Value) -> Result<Self> {
        let servers = raw
            .get(Self::KEY)
            .cloned()
            .unwrap_or_else(|| serde_json::json!({}));
        let map: HashMap<String, ServerConfig> = serde_json::from_value(servers)?;
        Ok(Self { mcp_servers: map })
    }
}

/// Fully validated broker configuration: the downstream pool definition
/// plus broker-wide switches that aren't part of the on-disk schema.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    pub servers: HashMap<String, ServerConfig>,
    /// When `false`, unauthenticated sessions run in development mode
    /// (every tool visible, a warning logged). Defaults to `true` so a
    /// broker started with no explicit opt-out is safe by default — see
    /// the design note on the development-mode bypass.
    pub require_auth: bool,
}

impl BrokerConfig {
    pub fn from_raw(raw: RawConfigFile) -> Result<Self> {
        let mut servers = HashMap::with_capacity(raw.mcp_servers.len());
        for (name, entry) in raw.mcp_servers {
            let validated = ServerConfig::validated(name.clone(), entry)?;
            servers.insert(name, validated);
        }
        Ok(Self {
            servers,
            require_auth: true,
        })
    }

    pub fn empty() -> Self {
        Self {
            servers: HashMap::new(),
            require_auth: true,
        }
    }
}

impl TryFrom<RawConfigFile> for BrokerConfig {
    type Error = ConfigError;

    fn try_from(raw: RawConfigFile) -> Result<Self> {
        BrokerConfig::from_raw(raw)
    }
}
