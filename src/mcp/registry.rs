//! Named tool registry.
//!
//! Tools are registered once at startup and listed in registration order.
//! Registering a name twice replaces the earlier tool but keeps its
//! position in the listing.

use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use crate::tools::{ToolContext, ToolError};

/// The callable half of a tool.
pub type ToolHandler =
    Box<dyn Fn(&mut ToolContext, &Value) -> Result<Value, ToolError> + Send + Sync>;

/// A tool definition for the `tools/list` response.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON Schema for the tool's arguments.
    pub input_schema: Value,
}

/// A registered tool: its public definition plus its handler.
pub struct Tool {
    name: String,
    description: String,
    input_schema: Value,
    handler: ToolHandler,
}

impl Tool {
    /// Creates a tool.
    pub fn new<F>(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
        handler: F,
    ) -> Self
    where
        F: Fn(&mut ToolContext, &Value) -> Result<Value, ToolError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
            handler: Box::new(handler),
        }
    }

    /// Tool name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Tool description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The definition advertised by `tools/list`.
    #[must_use]
    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema.clone(),
        }
    }

    /// Runs the handler.
    ///
    /// # Errors
    ///
    /// Returns whatever error the handler returns.
    pub fn invoke(&self, context: &mut ToolContext, arguments: &Value) -> Result<Value, ToolError> {
        (self.handler)(context, arguments)
    }
}

impl fmt::Debug for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Tools keyed by name, in registration order.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: IndexMap<String, Tool>,
}

impl ToolRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `tool`, replacing any tool of the same name in place.
    pub fn register(&mut self, tool: Tool) {
        if self.tools.contains_key(tool.name()) {
            tracing::debug!(tool = %tool.name(), "Replacing registered tool");
        }
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Registers each tool in turn.
    pub fn register_many(&mut self, tools: impl IntoIterator<Item = Tool>) {
        for tool in tools {
            self.register(tool);
        }
    }

    /// Looks a tool up by exact name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.get(name)
    }

    /// Definitions of every tool, in registration order.
    #[must_use]
    pub fn list(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(Tool::definition).collect()
    }

    /// Every registered name, in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    /// Number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns `true` if no tools are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Removes every tool.
    pub fn clear(&mut self) {
        self.tools.clear();
    }
}
