//! MCP request dispatch and the stdio server loop.
//!
//! [`Dispatcher`] turns one incoming line into at most one outgoing message.
//! It owns the tool registry and the tool context, so it holds every piece
//! of mutable state a server instance has. Transports ([`McpServer`] for
//! stdio, [`crate::mcp::http`] for HTTP) only move bytes in and out.
//!
//! Handler failures never escape dispatch: tool errors become JSON-RPC
//! errors and panics are caught and reported as internal errors.

use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::time::{Interval, MissedTickBehavior};

use crate::mcp::protocol::{
    parse_message, ErrorCode, IncomingMessage, JsonRpcError, JsonRpcErrorData,
    JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, OutgoingMessage, RequestId,
    MCP_PROTOCOL_VERSION, SERVER_NAME,
};
use crate::mcp::registry::ToolRegistry;
use crate::mcp::transport::StdioTransport;
use crate::search::suggest;
use crate::tools::{default_registry, ToolContext, ToolError};

/// Server capabilities advertised during initialisation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ServerCapabilities {
    /// Tool-related capabilities.
    pub tools: ToolCapabilities,
}

/// Tool-specific capabilities.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ToolCapabilities {
    /// Whether the tool list can change during the session.
    #[serde(rename = "listChanged", skip_serializing_if = "is_false")]
    pub list_changed: bool,
}

#[allow(clippy::trivially_copy_pass_by_ref)] // serde's skip_serializing_if requires a predicate fn(&T) -> bool
const fn is_false(b: &bool) -> bool {
    !*b
}

/// Server information for the initialisation response.
#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    /// Server name.
    pub name: String,
    /// Server version.
    pub version: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: SERVER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Client information received during initialisation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    /// Client name.
    pub name: String,
    /// Client version.
    #[serde(default)]
    pub version: Option<String>,
}

/// Parameters for the initialize request. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// Protocol version requested by the client.
    #[serde(default)]
    pub protocol_version: Option<String>,
    /// Client capabilities.
    #[serde(default)]
    pub capabilities: Value,
    /// Client information.
    #[serde(default)]
    pub client_info: Option<ClientInfo>,
}

/// Parameters for a tools/call request.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallParams {
    /// Name of the tool to call.
    pub name: String,
    /// Arguments for the tool. Absent or `null` means `{}`.
    #[serde(default)]
    pub arguments: Value,
}

/// Content item in a tool call response.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    /// Text content.
    Text {
        /// The text content.
        text: String,
    },
}

/// Result of a successful tool call.
#[derive(Debug, Clone, Serialize)]
pub struct ToolCallResult {
    /// Content returned by the tool.
    pub content: Vec<ToolContent>,
}

impl ToolCallResult {
    /// Creates a single-block text result.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
        }
    }
}

/// Validates, dispatches and formats requests for one server instance.
#[derive(Debug)]
pub struct Dispatcher {
    registry: ToolRegistry,
    context: ToolContext,
}

impl Dispatcher {
    /// Creates a dispatcher over the given registry and tool state.
    #[must_use]
    pub const fn new(registry: ToolRegistry, context: ToolContext) -> Self {
        Self { registry, context }
    }

    /// The tool registry.
    #[must_use]
    pub const fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Mutable access to the registry, for registering extra tools.
    pub fn registry_mut(&mut self) -> &mut ToolRegistry {
        &mut self.registry
    }

    /// The tool context.
    #[must_use]
    pub const fn context(&self) -> &ToolContext {
        &self.context
    }

    /// Mutable access to the tool context.
    pub fn context_mut(&mut self) -> &mut ToolContext {
        &mut self.context
    }

    /// Reloads the corpus from its source.
    ///
    /// A failed reload is logged and the current snapshot keeps serving.
    /// Returns `true` when a new snapshot was swapped in.
    pub fn refresh_corpus(&mut self) -> bool {
        match self.context.refresh_corpus() {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Corpus refresh failed, keeping previous snapshot");
                false
            }
        }
    }

    /// Handles one raw message.
    ///
    /// Returns `None` for accepted notifications, which get no reply.
    pub fn handle_line(&mut self, line: &str) -> Option<OutgoingMessage> {
        match parse_message(line) {
            Ok(message) => self.handle_message(message),
            Err(error) => {
                tracing::debug!(code = error.error.code, "Rejected message");
                Some(error.into())
            }
        }
    }

    /// Handles a parsed incoming message.
    pub fn handle_message(&mut self, message: IncomingMessage) -> Option<OutgoingMessage> {
        match message {
            IncomingMessage::Request(req) => Some(self.handle_request(&req)),
            IncomingMessage::Notification(ref notif) => {
                Self::handle_notification(notif);
                None
            }
        }
    }

    /// Handles a validated request.
    pub fn handle_request(&mut self, req: &JsonRpcRequest) -> OutgoingMessage {
        tracing::debug!(id = %req.id, method = %req.method, "Handling request");

        let response = match req.method.as_str() {
            "initialize" => Ok(Self::handle_initialize(req)),
            "tools/list" => Ok(self.handle_tools_list(req)),
            "tools/call" => self.handle_tools_call(req),
            "ping" => Ok(Self::handle_ping(req)),
            _ => Err(JsonRpcError::method_not_found(req.id.clone(), &req.method)),
        };

        let message: OutgoingMessage = match response {
            Ok(resp) => resp.into(),
            Err(error) => error.into(),
        };
        message.with_version_field(req.version_field)
    }

    fn handle_notification(notif: &JsonRpcNotification) {
        tracing::debug!(method = %notif.method, "Accepted notification");
    }

    fn handle_initialize(req: &JsonRpcRequest) -> JsonRpcResponse {
        let params: InitializeParams = req
            .params
            .clone()
            .and_then(|p| serde_json::from_value(p).ok())
            .unwrap_or_default();

        if let Some(client) = &params.client_info {
            tracing::info!(
                client = %client.name,
                version = client.version.as_deref().unwrap_or("unknown"),
                requested_protocol = params.protocol_version.as_deref().unwrap_or("unspecified"),
                "Client initialised"
            );
        }

        JsonRpcResponse::success(
            req.id.clone(),
            json!({
                "protocolVersion": MCP_PROTOCOL_VERSION,
                "capabilities": ServerCapabilities::default(),
                "serverInfo": ServerInfo::default(),
            }),
        )
    }

    fn handle_tools_list(&self, req: &JsonRpcRequest) -> JsonRpcResponse {
        JsonRpcResponse::success(
            req.id.clone(),
            json!({
                "tools": self.registry.list(),
            }),
        )
    }

    fn handle_tools_call(&mut self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        let id = &req.id;

        let params = req
            .params
            .as_ref()
            .filter(|p| !p.is_null())
            .ok_or_else(|| JsonRpcError::invalid_params(id.clone(), "Missing tool call params"))?;
        let params: ToolCallParams = serde_json::from_value(params.clone()).map_err(|e| {
            JsonRpcError::invalid_params(id.clone(), format!("Invalid tool call params: {e}"))
        })?;

        let Some(tool) = self.registry.get(&params.name) else {
            let suggestions = suggest(&params.name, &self.registry.names());
            tracing::debug!(tool = %params.name, ?suggestions, "Unknown tool");
            return Err(JsonRpcError::tool_not_found(
                id.clone(),
                &params.name,
                &suggestions,
            ));
        };

        let arguments = match params.arguments {
            Value::Null => json!({}),
            args @ Value::Object(_) => args,
            _ => {
                return Err(JsonRpcError::invalid_params(
                    id.clone(),
                    "Tool arguments must be an object",
                ))
            }
        };

        let started = Instant::now();
        let context = &mut self.context;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| tool.invoke(context, &arguments)));
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        match outcome {
            Ok(Ok(result)) => {
                tracing::info!(tool = %params.name, elapsed_ms, "Tool call succeeded");
                let text = serde_json::to_string(&result).map_err(|e| {
                    JsonRpcError::internal_error(id.clone(), format!("Failed to serialise result: {e}"))
                })?;
                let result_value = serde_json::to_value(ToolCallResult::text(text)).map_err(|e| {
                    tracing::error!(error = %e, "Failed to serialise tool call result");
                    JsonRpcError::internal_error(id.clone(), "Internal error: failed to serialise result")
                })?;
                Ok(JsonRpcResponse::success(id.clone(), result_value))
            }
            Ok(Err(error)) => {
                tracing::info!(tool = %params.name, elapsed_ms, error = %error, "Tool call failed");
                Err(tool_error_response(id.clone(), error))
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!(tool = %params.name, panic = %message, "Tool handler panicked");
                Err(JsonRpcError::internal_error(id.clone(), message))
            }
        }
    }

    fn handle_ping(req: &JsonRpcRequest) -> JsonRpcResponse {
        JsonRpcResponse::success(req.id.clone(), json!({}))
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(default_registry(), ToolContext::default())
    }
}

/// Maps a handler error onto the JSON-RPC error taxonomy.
fn tool_error_response(id: RequestId, error: ToolError) -> JsonRpcError {
    match error {
        ToolError::InvalidArguments(message) => JsonRpcError::invalid_params(id, message),
        ToolError::NotFound {
            message,
            suggestions,
        } => JsonRpcError::new(
            Some(id),
            JsonRpcErrorData::with_message(ErrorCode::InternalError, message)
                .with_data(json!({ "suggestions": suggestions })),
        ),
        ToolError::Failed(message) => JsonRpcError::internal_error(id, message),
    }
}

/// A corpus refresh timer whose first tick is one full `period` away.
pub(crate) fn refresh_interval(period: Duration) -> Interval {
    let now = tokio::time::Instant::now();
    let first = now.checked_add(period).unwrap_or(now);
    let mut interval = tokio::time::interval_at(first, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

/// Waits for the next refresh tick, forever when refreshing is off.
async fn next_refresh(refresh: &mut Option<Interval>) {
    match refresh {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "tool handler panicked".to_string())
}

/// The MCP server over stdio.
pub struct McpServer {
    dispatcher: Dispatcher,
    transport: StdioTransport,
    refresh_every: Option<Duration>,
}

impl McpServer {
    /// Creates a stdio server around `dispatcher`.
    #[must_use]
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            transport: StdioTransport::new(),
            refresh_every: None,
        }
    }

    /// Reloads the corpus every `period` while serving. `None` or zero
    /// disables reloading.
    #[must_use]
    pub fn with_refresh(mut self, period: Option<Duration>) -> Self {
        self.refresh_every = period.filter(|p| !p.is_zero());
        self
    }

    /// The request dispatcher.
    #[must_use]
    pub const fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Runs the MCP server main loop with graceful shutdown handling.
    ///
    /// # Errors
    ///
    /// Returns an error if transport I/O fails.
    pub async fn run(&mut self) -> std::io::Result<()> {
        self.run_with_shutdown().await
    }

    /// Runs the main loop and handles shutdown.
    #[cfg(unix)]
    async fn run_with_shutdown(&mut self) -> std::io::Result<()> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt()).map_err(std::io::Error::other)?;
        let mut sigterm = signal(SignalKind::terminate()).map_err(std::io::Error::other)?;
        let mut refresh = self.refresh_every.map(refresh_interval);

        loop {
            tokio::select! {
                () = next_refresh(&mut refresh) => {
                    self.dispatcher.refresh_corpus();
                }

                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT, initiating graceful shutdown");
                    return Ok(());
                }

                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM, initiating graceful shutdown");
                    return Ok(());
                }

                line_result = self.transport.read_line() => {
                    if self.handle_transport_result(line_result).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Runs the main loop and handles shutdown.
    #[cfg(windows)]
    async fn run_with_shutdown(&mut self) -> std::io::Result<()> {
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);
        let mut refresh = self.refresh_every.map(refresh_interval);

        loop {
            tokio::select! {
                () = next_refresh(&mut refresh) => {
                    self.dispatcher.refresh_corpus();
                }

                _ = &mut ctrl_c => {
                    tracing::info!("Received Ctrl+C, initiating graceful shutdown");
                    return Ok(());
                }

                line_result = self.transport.read_line() => {
                    if self.handle_transport_result(line_result).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Handles the result from a transport read.
    ///
    /// Returns `true` if the server should shut down.
    async fn handle_transport_result(
        &mut self,
        line_result: std::io::Result<Option<String>>,
    ) -> std::io::Result<bool> {
        let Some(line) = line_result? else {
            tracing::info!("stdin closed, shutting down");
            return Ok(true);
        };

        if line.trim().is_empty() {
            return Ok(false);
        }

        if let Some(message) = self.dispatcher.handle_line(&line) {
            self.transport.write_message(&message).await?;
        }
        Ok(false)
    }
}
