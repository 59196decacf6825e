//! Command, argument, and environment validation for downstream server
//! definitions. A malicious or malformed config must never result in an
//! arbitrary shell invocation.

use std::collections::HashMap;

use crate::error::{ConfigError, Result};

const MAX_ARGS: usize = 50;
const MAX_ENV_ENTRIES: usize = 20;

/// Interpreter names that may appear bare (resolved via `PATH`).
const INTERPRETER_WHITELIST: &[&str] = &["uvx", "python", "python3", "node", "npx"];

/// Prefixes an absolute command path must fall under.
const ABSOLUTE_PATH_PREFIXES: &[&str] = &["/usr/bin/", "/usr/local/bin/"];

/// Characters that would let a config entry break out of argv-style
/// invocation into shell interpretation.
const SHELL_METACHARACTERS: &[char] = &['&', '|', ';', '`', '$', '(', ')', '<', '>'];

pub fn command(server: &str, command: &str) -> Result<()> {
    if command.is_empty() {
        return Err(ConfigError::InvalidCommand {
            server: server.to_string(),
            command: command.to_string(),
            reason: "command is empty".to_string(),
        });
    }

    let is_whitelisted_interpreter = INTERPRETER_WHITELIST.contains(&command);
    let is_whitelisted_absolute_path = command.starts_with('/')
        && ABSOLUTE_PATH_PREFIXES
            .iter()
            .any(|prefix| command.starts_with(prefix));

    if !is_whitelisted_interpreter && !is_whitelisted_absolute_path {
        return Err(ConfigError::InvalidCommand {
            server: server.to_string(),
            command: command.to_string(),
            reason: "not an interpreter on the whitelist or an absolute path under a whitelisted prefix".to_string(),
        });
    }

    Ok(())
}

pub fn args(server: &str, args: &[String]) -> Result<()> {
    if args.len() > MAX_ARGS {
        return Err(ConfigError::InvalidArgs {
            server: server.to_string(),
            reason: format!("{} args exceeds the limit of {MAX_ARGS}", args.len()),
        });
    }

    for arg in args {
        if let Some(bad) = arg.chars().find(|c| SHELL_METACHARACTERS.contains(c)) {
            return Err(ConfigError::InvalidArgs {
                server: server.to_string(),
                reason: format!("argument '{arg}' contains disallowed character '{bad}'"),
            });
        }
    }

    Ok(())
}

pub fn env(server: &str, env: &HashMap<String, String>) -> Result<()> {
    if env.len() > MAX_ENV_ENTRIES {
        return Err(ConfigError::InvalidEnv {
            server: server.to_string(),
            reason: format!(
                "{} env entries exceeds the limit of {MAX_ENV_ENTRIES}",
                env.len()
            ),
        });
    }

    for name in env.keys() {
        if !is_valid_env_name(name) {
            return Err(ConfigError::InvalidEnv {
                server: server.to_string(),
                reason: format!("env var name '{name}' does not match ^[A-Z_][A-Z0-9_]*$"),
            });
        }
    }

    Ok(())
}

fn is_valid_env_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_uppercase() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

/// Expand a leading `~` or `~/` to the user's home directory. Applied to
/// `command` and every element of `args`, per the config file contract.
pub fn tilde_expand(value: &str) -> String {
    if let Some(rest) = value.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest).to_string_lossy().into_owned();
        }
    } else if value == "~"
        && let Some(home) = dirs::home_dir()
    {
        return home.to_string_lossy().into_owned();
    }
    value.to_string()
}
