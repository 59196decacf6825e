//! Config file discovery.
//!
//! Resolution order:
//! 1. `$MCP_CONFIG_PATH`, if set.
//! 2. `$XDG_CONFIG_HOME/mcp_broker/config.json`.
//! 3. `~/.config/mcp_broker/config.json`.
//! 4. `./config.json`.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{ConfigError, Result};
use crate::types::{BrokerConfig, RawConfigFile};

const CONFIG_PATH_ENV: &str = "MCP_CONFIG_PATH";
const APP_NAME: &str = "mcp_broker";
const CONFIG_FILENAME: &str = "config.json";

/// Find the config file path following the discovery order, without
/// reading it. Returns `None` if no candidate exists on disk.
pub fn discover_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.is_empty() {
            debug!(path, "using MCP_CONFIG_PATH override");
            return Some(PathBuf::from(path));
        }
    }

    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        if !xdg.is_empty() {
            let candidate = PathBuf::from(xdg).join(APP_NAME).join(CONFIG_FILENAME);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
    }

    if let Some(home) = dirs::home_dir() {
        let candidate = home.join(".config").join(APP_NAME).join(CONFIG_FILENAME);
        if candidate.is_file() {
            return Some(candidate);
        }
    }

    let cwd_candidate = PathBuf::from(CONFIG_FILENAME);
    if cwd_candidate.is_file() {
        return Some(cwd_candidate);
    }

    None
}

/// Load and validate the broker config from the first discovered path.
/// An empty, valid pool (no config file found anywhere) is not an error —
/// the broker is allowed to run with no tools.
pub fn load_config() -> Result<BrokerConfig> {
    match discover_config_path() {
        Some(path) => load_config_file(&path),
        None => {
            info!("no config file found in any discovery location; starting with an empty pool");
            Ok(BrokerConfig::empty())
        }
    }
}

/// Load and validate the broker config from an explicit path.
pub fn load_config_file(path: &Path) -> Result<BrokerConfig> {
    if !path.is_file() {
        return Err(ConfigError::ConfigFileNotFound(path.display().to_string()));
    }

    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    let raw_value: serde_json::Value = serde_json::from_str(&contents)?;
    let raw = RawConfigFile::from_json(&raw_value)?;
    BrokerConfig::from_raw(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn loads_valid_config_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"mcpServers": {"echo": {"command": "python", "args": ["-m", "echo"]}}}"#,
        )
        .unwrap();

        let config = load_config_file(&path).unwrap();
        assert!(config.servers.contains_key("echo"));
    }

    #[test]
    fn missing_file_is_config_file_not_found() {
        let err = load_config_file(Path::new("/nonexistent/config.json")).unwrap_err();
        assert!(matches!(err, ConfigError::ConfigFileNotFound(_)));
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "not json {{{{").unwrap();
        let err = load_config_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn config_path_env_override_wins() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("custom.json");
        fs::write(&path, r#"{"mcpServers": {}}"#).unwrap();

        // SAFETY: relies on this test process being single-threaded, same
        // as the other env-var tests in this crate.
        unsafe { std::env::set_var(CONFIG_PATH_ENV, path.to_str().unwrap()) };
        let discovered = discover_config_path();
        unsafe { std::env::remove_var(CONFIG_PATH_ENV) };

        assert_eq!(discovered, Some(path));
    }
}
