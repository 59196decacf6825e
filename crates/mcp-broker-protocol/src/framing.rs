//! Newline-delimited JSON-RPC line assembly.
//!
//! Both a downstream child process's stdout and an external client's stdin
//! are consumed as an unstructured byte stream that may split a JSON-RPC
//! message across reads, or interleave non-JSON noise (a child's merged
//! stderr, in particular). [`LineAssembler`] turns that byte stream into a
//! sequence of parsed [`serde_json::Value`]s, never treating a malformed or
//! non-JSON line as fatal.

use serde_json::Value;
use tracing::debug;

/// Accumulates bytes from a stream and yields complete lines.
///
/// Partial data with no trailing newline is held in an internal buffer and
/// prepended to the next chunk, so a line split across two reads still
/// comes out whole.
#[derive(Debug, Default)]
pub struct LineAssembler {
    buffer: Vec<u8>,
}

impl LineAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of bytes, returning every complete line found (including
    /// ones spanning this chunk and previously buffered data). Trailing
    /// partial data is retained internally.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Vec<u8>> {
        self.buffer.extend_from_slice(chunk);

        let mut lines = Vec::new();
        loop {
            let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') else {
                break;
            };
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            // Drop the trailing '\n' (and a preceding '\r' if present).
            let mut line = line;
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            lines.push(line);
        }
        lines
    }
}

/// Parse one assembled line into a JSON value. Lines that don't start with
/// `{` are logged at debug and ignored (this is how child stderr merged
/// onto stdout is tolerated); malformed JSON is logged and dropped, never
/// fatal.
pub fn parse_line(line: &[u8]) -> Option<Value> {
    let trimmed = trim_ascii_whitespace(line);
    if trimmed.is_empty() {
        return None;
    }
    if trimmed[0] != b'{' {
        debug!(
            line = %String::from_utf8_lossy(trimmed),
            "ignoring non-JSON line on child output"
        );
        return None;
    }
    match serde_json::from_slice::<Value>(trimmed) {
        Ok(value) => Some(value),
        Err(err) => {
            debug!(
                error = %err,
                line = %String::from_utf8_lossy(trimmed),
                "dropping malformed JSON-RPC line"
            );
            None
        }
    }
}

fn trim_ascii_whitespace(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|b| !b.is_ascii_whitespace()).unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map(|i| i + 1)
        .unwrap_or(0);
    if start >= end {
        &[]
    } else {
        &bytes[start..end]
    }
}

/// Serialize a JSON-RPC message as a single newline-terminated line, the
/// wire format this broker writes to both downstream child stdin and its
/// own external-facing stdout.
pub fn encode_line(value: &Value) -> Result<Vec<u8>, serde_json::Error> {
    let mut bytes = serde_json::to_vec(value)?;
    bytes.push(b'\n');
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_single_complete_line() {
        let mut asm = LineAssembler::new();
        let lines = asm.feed(b"{\"a\":1}\n");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0], b"{\"a\":1}");
    }

    #[test]
    fn feed_splits_partial_line_across_calls() {
        let mut asm = LineAssembler::new();
        assert!(asm.feed(b"{\"a\":").is_empty());
        let lines = asm.feed(b"1}\n");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0], b"{\"a\":1}");
    }

    #[test]
    fn feed_handles_multiple_lines_in_one_chunk() {
        let mut asm = LineAssembler::new();
        let lines = asm.feed(b"{\"a\":1}\n{\"b\":2}\n");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], b"{\"a\":1}");
        assert_eq!(lines[1], b"{\"b\":2}");
    }

    #[test]
    fn feed_strips_carriage_return() {
        let mut asm = LineAssembler::new();
        let lines = asm.feed(b"{\"a\":1}\r\n");
        assert_eq!(lines[0], b"{\"a\":1}");
    }

    #[test]
    fn parse_line_ignores_non_json_stderr_noise() {
        assert!(parse_line(b"Server listening on stdout...").is_none());
    }

    #[test]
    fn parse_line_drops_malformed_json_without_panicking() {
        assert!(parse_line(b"{not valid json").is_none());
    }

    #[test]
    fn parse_line_accepts_valid_json_object() {
        let value = parse_line(b"{\"jsonrpc\":\"2.0\",\"id\":1,\"result\":{}}").unwrap();
        assert_eq!(value["id"], 1);
    }

    #[test]
    fn encode_line_is_newline_terminated() {
        let bytes = encode_line(&serde_json::json!({"a": 1})).unwrap();
        assert_eq!(bytes.last(), Some(&b'\n'));
    }
}
