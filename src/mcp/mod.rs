//! Model Context Protocol (MCP) server implementation.
//!
//! Exposes the documentation tools to AI assistants as JSON-RPC 2.0 methods.
//! Two transports share one [`server::Dispatcher`]: newline-delimited stdio
//! and a stateless HTTP endpoint with per-client rate limiting.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         MCP Server                          │
//! │                                                             │
//! │   ┌─────────────┐    ┌─────────────┐    ┌─────────────┐    │
//! │   │  Transport  │───▶│ Dispatcher  │───▶│  Registry   │    │
//! │   │(stdio/http) │    │  (routing)  │    │   (tools)   │    │
//! │   └─────────────┘    └─────────────┘    └─────────────┘    │
//! │          │                  │                  │            │
//! │          ▼                  ▼                  ▼            │
//! │   ┌─────────────────────────────────────────────────┐      │
//! │   │              JSON-RPC Messages                  │      │
//! │   └─────────────────────────────────────────────────┘      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Protocol Version
//!
//! This implementation targets MCP protocol version 2024-11-05.

pub mod http;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod transport;

pub use protocol::{
    JsonRpcError, JsonRpcRequest, JsonRpcResponse, OutgoingMessage, VersionField,
    MCP_PROTOCOL_VERSION,
};
pub use registry::{Tool, ToolDefinition, ToolRegistry};
pub use server::{Dispatcher, McpServer};
pub use transport::StdioTransport;
