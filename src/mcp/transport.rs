//! stdio transport for the MCP server.
//!
//! - Messages are UTF-8 encoded JSON-RPC
//! - Messages are delimited by newlines
//! - Messages must not contain embedded newlines
//! - stdin: receives messages from the client
//! - stdout: sends messages to the client
//! - stderr: may be used for logging (never MCP messages)

use std::io;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::mcp::protocol::OutgoingMessage;

/// A stdio-based MCP transport.
///
/// Reads newline-delimited requests from stdin and writes one reply line
/// per answered request to stdout.
pub struct StdioTransport {
    /// Buffered reader for stdin.
    reader: BufReader<tokio::io::Stdin>,
    /// Handle for stdout.
    writer: tokio::io::Stdout,
}

impl StdioTransport {
    /// Creates a new stdio transport.
    #[must_use]
    pub fn new() -> Self {
        Self {
            reader: BufReader::new(tokio::io::stdin()),
            writer: tokio::io::stdout(),
        }
    }

    /// Reads the next message line from stdin.
    ///
    /// Returns `None` if stdin is closed (EOF).
    ///
    /// # Errors
    ///
    /// Returns an error if reading from stdin fails.
    pub async fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        let bytes_read = self.reader.read_line(&mut line).await?;

        if bytes_read == 0 {
            return Ok(None);
        }

        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }

        Ok(Some(line))
    }

    /// Writes a response or error envelope to stdout.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation or writing fails.
    pub async fn write_message(&mut self, message: &OutgoingMessage) -> io::Result<()> {
        let json = encode_line(message)?;
        self.write_raw(&json).await
    }

    /// Writes a raw JSON string to stdout with newline termination.
    async fn write_raw(&mut self, json: &str) -> io::Result<()> {
        debug_assert!(
            !json.contains('\n'),
            "JSON message must not contain embedded newlines"
        );

        self.writer.write_all(json.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;

        Ok(())
    }
}

impl Default for StdioTransport {
    fn default() -> Self {
        Self::new()
    }
}

/// Serialises a message as a single line (no trailing newline).
///
/// # Errors
///
/// Returns an error if serialisation fails.
pub fn encode_line(message: &OutgoingMessage) -> io::Result<String> {
    serde_json::to_string(message).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::protocol::{JsonRpcError, JsonRpcResponse, RequestId};

    #[test]
    fn transport_default() {
        let _transport = StdioTransport::default();
    }

    #[test]
    fn encoded_response_has_no_newlines() {
        let response: OutgoingMessage = JsonRpcResponse::success(
            RequestId::Number(1),
            serde_json::json!({
                "message": "line one\nline two",
                "nested": {"key": "value"}
            }),
        )
        .into();

        let json = encode_line(&response).unwrap();
        assert!(!json.contains('\n'), "Serialised JSON should not contain newlines");
    }

    #[test]
    fn encoded_error_keeps_id() {
        let error: OutgoingMessage =
            JsonRpcError::method_not_found(RequestId::String("abc".into()), "test/method").into();

        let json = encode_line(&error).unwrap();
        assert!(json.contains(r#""id":"abc""#));
        assert!(json.contains("-32601"));
    }
}
