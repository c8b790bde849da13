//! doc-corpus-mcp: MCP server exposing a documentation corpus as tools
//!
//! This library lets AI assistants search, browse and cross-link a corpus of
//! documentation pages over JSON-RPC 2.0.
//!
//! # Architecture
//!
//! A request flows transport → [`mcp::server::Dispatcher`] →
//! [`mcp::registry::ToolRegistry`] → tool handler → response envelope. Tools
//! run against a [`tools::ToolContext`] that owns the corpus snapshot and the
//! shared state:
//!
//! - **Result cache**: LRU + TTL over canonicalised tool arguments
//! - **Term linker**: turns glossary vocabulary into Markdown links
//! - **Advisor sessions**: short multi-step conversations with expiry
//!
//! The HTTP transport adds a per-client fixed-window rate limiter.
//!
//! # Modules
//!
//! - [`cache`]: LRU + TTL result cache
//! - [`config`]: Configuration loading and validation
//! - [`corpus`]: Documents, glossary and their loader
//! - [`error`]: Process-level error types
//! - [`linker`]: Glossary term linking
//! - [`mcp`]: MCP protocol implementation and transports
//! - [`pagination`]: Opaque cursor pagination
//! - [`rate_limit`]: Fixed-window rate limiter
//! - [`search`]: Fuzzy matching and ranked search
//! - [`session`]: Session store with expiry
//! - [`tools`]: The documentation tools

pub mod cache;
pub mod config;
pub mod corpus;
pub mod error;
pub mod linker;
pub mod mcp;
pub mod pagination;
pub mod rate_limit;
pub mod search;
pub mod session;
pub mod tools;
