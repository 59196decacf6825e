//! Client-session token discovery.
//!
//! The broker speaks stdio to exactly one external client per process
//! invocation, so there is no bearer-token header to read off a request —
//! the token has to come from the process's own environment. Two sources
//! are tried in order; if neither yields a token the session starts
//! unauthenticated (`BrokerSession::context` stays `None`) and falls back
//! to whatever `BrokerConfig.require_auth` dictates.

use std::path::PathBuf;

use serde::Deserialize;
use tracing::debug;

const CLIENT_JWT_ENV: &str = "MCP_CLIENT_JWT";
const CLIENT_CONFIG_FILENAME: &str = ".mcp/client.json";

#[derive(Deserialize)]
struct ClientAuthFile {
    jwt: String,
}

/// Look for a bearer token the current process was launched with: first the
/// `MCP_CLIENT_JWT` environment variable, then `~/.mcp/client.json`.
pub fn discover_client_token() -> Option<String> {
    if let Ok(token) = std::env::var(CLIENT_JWT_ENV) {
        if !token.is_empty() {
            debug!("found client token via {CLIENT_JWT_ENV}");
            return Some(token);
        }
    }

    let path: PathBuf = dirs::home_dir()?.join(CLIENT_CONFIG_FILENAME);
    let contents = std::fs::read_to_string(&path).ok()?;
    let parsed: ClientAuthFile = serde_json::from_str(&contents).ok()?;
    debug!(path = %path.display(), "found client token via client.json");
    Some(parsed.jwt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_var_takes_precedence() {
        // SAFETY: test process is single-threaded for this assertion, same
        // assumption mcp-broker-config's own env-var test makes.
        unsafe { std::env::set_var(CLIENT_JWT_ENV, "tok-123") };
        let found = discover_client_token();
        unsafe { std::env::remove_var(CLIENT_JWT_ENV) };
        assert_eq!(found, Some("tok-123".to_string()));
    }

    #[test]
    fn empty_env_var_is_ignored() {
        unsafe { std::env::set_var(CLIENT_JWT_ENV, "") };
        let found = discover_client_token();
        unsafe { std::env::remove_var(CLIENT_JWT_ENV) };
        assert_ne!(found, Some(String::new()));
    }
}
