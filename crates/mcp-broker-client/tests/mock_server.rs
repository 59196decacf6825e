//! Mock downstream MCP server for integration testing.
//!
//! Speaks newline-delimited JSON-RPC on stdio, the same framing the real
//! broker uses against a downstream, unlike the Content-Length framing an
//! LSP-style server would use.
//!
//! Usage:
//!   mock-mcp-server [--delay-ms N] [--crash-on TOOL] [--slow-tool TOOL:MS]
//!
//! Options:
//!   --delay-ms N       Add N ms delay to every response
//!   --crash-on TOOL    Exit with code 1 when TOOL is called
//!   --slow-tool T:MS   Add MS delay when tool T is called

#![allow(dead_code)]

use std::env;
use std::io::{BufRead, BufReader, Write};
use std::thread;
use std::time::Duration;

use serde_json::{json, Value};

struct ServerConfig {
    delay_ms: u64,
    crash_on: Option<String>,
    slow_tools: Vec<(String, u64)>,
}

impl ServerConfig {
    fn from_args() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut config = Self {
            delay_ms: 0,
            crash_on: None,
            slow_tools: Vec::new(),
        };

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--delay-ms" => {
                    if i + 1 < args.len() {
                        config.delay_ms = args[i + 1].parse().unwrap_or(0);
                        i += 2;
                    } else {
                        i += 1;
                    }
                }
                "--crash-on" => {
                    if i + 1 < args.len() {
                        config.crash_on = Some(args[i + 1].clone());
                        i += 2;
                    } else {
                        i += 1;
                    }
                }
                "--slow-tool" => {
                    if i + 1 < args.len() {
                        if let Some((tool, ms)) = args[i + 1].split_once(':')
                            && let Ok(ms) = ms.parse()
                        {
                            config.slow_tools.push((tool.to_string(), ms));
                        }
                        i += 2;
                    } else {
                        i += 1;
                    }
                }
                _ => i += 1,
            }
        }

        config
    }

    fn get_tool_delay(&self, tool_name: &str) -> u64 {
        self.slow_tools
            .iter()
            .find(|(tool, _)| tool == tool_name)
            .map(|(_, ms)| *ms)
            .unwrap_or(0)
    }
}

fn main() {
    let config = ServerConfig::from_args();
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    let mut reader = BufReader::new(stdin.lock());
    let mut line = String::new();

    loop {
        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) => return,
            Ok(_) => {}
            Err(_) => return,
        }

        let trimmed = line.trim();
        if trimmed.is_empty() || !trimmed.starts_with('{') {
            continue;
        }

        let request: Value = match serde_json::from_str(trimmed) {
            Ok(v) => v,
            Err(_) => continue,
        };

        // Notifications (no "id") get no reply.
        let Some(id) = request.get("id").and_then(Value::as_i64) else {
            continue;
        };

        if config.delay_ms > 0 {
            thread::sleep(Duration::from_millis(config.delay_ms));
        }

        let method = request.get("method").and_then(Value::as_str).unwrap_or("");
        let params = request.get("params").cloned();
        let response = handle_request(id, method, params.as_ref(), &config);

        let response_json = serde_json::to_string(&response).unwrap();
        writeln!(stdout, "{response_json}").unwrap();
        stdout.flush().unwrap();
    }
}

fn handle_request(id: i64, method: &str, params: Option<&Value>, config: &ServerConfig) -> Value {
    match method {
        "initialize" => json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": {
                "protocolVersion": "2024-11-05",
                "capabilities": {"tools": {}},
                "serverInfo": {"name": "mock-mcp-server", "version": "1.0.0"}
            }
        }),
        "tools/list" => json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": {
                "tools": [
                    {
                        "name": "echo",
                        "description": "Echo back the input",
                        "inputSchema": {
                            "type": "object",
                            "properties": {"message": {"type": "string"}},
                            "required": ["message"]
                        }
                    },
                    {
                        "name": "add",
                        "description": "Add two numbers",
                        "inputSchema": {
                            "type": "object",
                            "properties": {
                                "a": {"type": "number"},
                                "b": {"type": "number"}
                            },
                            "required": ["a", "b"]
                        }
                    },
                    {
                        "name": "slow",
                        "description": "A slow tool for testing timeouts",
                        "inputSchema": {
                            "type": "object",
                            "properties": {"delay_ms": {"type": "number"}}
                        }
                    },
                    {
                        "name": "crash",
                        "description": "Crashes the server",
                        "inputSchema": {"type": "object", "properties": {}}
                    }
                ]
            }
        }),
        "tools/call" => {
            let params = match params {
                Some(p) => p,
                None => return error_response(id, -32602, "missing params"),
            };
            let tool_name = params.get("name").and_then(Value::as_str).unwrap_or("");
            let args = params.get("arguments").cloned().unwrap_or(json!({}));

            if config.crash_on.as_deref() == Some(tool_name) {
                std::process::exit(1);
            }

            let delay = config.get_tool_delay(tool_name);
            if delay > 0 {
                thread::sleep(Duration::from_millis(delay));
            }

            let result = match tool_name {
                "echo" => {
                    let message = args.get("message").and_then(Value::as_str).unwrap_or("");
                    json!({"content": [{"type": "text", "text": message}]})
                }
                "add" => {
                    let a = args.get("a").and_then(Value::as_f64).unwrap_or(0.0);
                    let b = args.get("b").and_then(Value::as_f64).unwrap_or(0.0);
                    json!({"content": [{"type": "text", "text": format!("{}", a + b)}]})
                }
                "slow" => {
                    let ms = args.get("delay_ms").and_then(Value::as_u64).unwrap_or(1000);
                    thread::sleep(Duration::from_millis(ms));
                    json!({"content": [{"type": "text", "text": format!("slept {ms} ms")}]})
                }
                "crash" => std::process::exit(1),
                _ => json!({
                    "content": [{"type": "text", "text": format!("unknown tool: {tool_name}")}],
                    "isError": true
                }),
            };

            json!({"jsonrpc": "2.0", "id": id, "result": result})
        }
        other => error_response(id, -32601, &format!("method not found: {other}")),
    }
}

fn error_response(id: i64, code: i64, message: &str) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "error": {"code": code, "message": message}})
}
