//! Default stdio transport: one external client per process invocation,
//! reading newline-delimited JSON-RPC from stdin and writing responses to
//! stdout.

use mcp_broker_protocol::{encode_line, JsonRpcError, JSONRPC_VERSION};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, error, info};

use crate::session::BrokerSession;

/// Drive one session to completion. Returns `Ok(())` on a clean EOF, `Err`
/// on a stream error — callers map this straight onto the process exit
/// code (0 / 1).
pub async fn run_stdio(mut session: BrokerSession) -> std::io::Result<()> {
    let stdin = tokio::io::stdin();
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(stdin).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                info!("stdin closed, ending session");
                return Ok(());
            }
            Err(error) => {
                error!(%error, "error reading stdin");
                return Err(error);
            }
        };

        let Some(response) = process_line(&line, &mut session).await else {
            continue;
        };

        let bytes = encode_line(&response).expect("an already-valid Value always encodes");
        stdout.write_all(&bytes).await?;
        stdout.flush().await?;
    }
}

/// Parse and dispatch one line from the external client, returning the
/// response to write back (if any).
///
/// Unlike the tolerant child-facing parser in
/// [`mcp_broker_protocol::parse_line`] — which silently drops whatever isn't
/// valid JSON, because a downstream's merged stderr can land on the same
/// stream — a client talking to the broker directly gets a real JSON-RPC
/// `-32700 Parse error` for a malformed line. A blank line is not an error,
/// just ignored.
pub async fn process_line(line: &str, session: &mut BrokerSession) -> Option<Value> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    let value: Value = match serde_json::from_str(trimmed) {
        Ok(value) => value,
        Err(error) => {
            debug!(%error, "malformed JSON on stdin, replying with parse error");
            return Some(serde_json::json!({
                "jsonrpc": JSONRPC_VERSION,
                "id": Value::Null,
                "error": {
                    "code": JsonRpcError::PARSE_ERROR,
                    "message": "Parse error",
                },
            }));
        }
    };

    let response = session.handle(value).await?;
    Some(serde_json::to_value(response).expect("JsonRpcResponse always serializes"))
}
