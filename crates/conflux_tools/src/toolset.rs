//! The per-request tool mapping.
//!
//! A [`ToolSet`] maps tool names to [`Tool`]s. Orchestrators advertise its
//! [`definitions`](ToolSet::definitions) to the model and route the model's
//! tool calls through [`execute`](ToolSet::execute), which validates the call's
//! arguments against the tool's parameter schema before running it.

use crate::error::ToolError;
use crate::tool::Tool;
use conflux_models::llm::{ToolCall, ToolDefinition};
use conflux_models::schema;
use indexmap::IndexMap;
use serde_json::Value;
use std::sync::Arc;

/// Tools available to one generation request, in registration order.
///
/// Cloning is cheap; clones share the tool instances.
#[derive(Clone, Default)]
pub struct ToolSet {
    tools: IndexMap<String, Arc<dyn Tool>>,
}

impl core::fmt::Debug for ToolSet {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ToolSet")
            .field("tools", &self.names())
            .finish()
    }
}

impl ToolSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tool and returns the set.
    ///
    /// # Panics
    ///
    /// Panics if a tool with the same name is already registered.
    #[must_use]
    pub fn with(mut self, tool: impl Tool) -> Self {
        self.register(tool);
        self
    }

    /// Registers a tool.
    ///
    /// # Panics
    ///
    /// Panics if a tool with the same name is already registered.
    pub fn register(&mut self, tool: impl Tool) {
        self.register_shared(Arc::new(tool));
    }

    /// Registers a shared tool instance.
    ///
    /// # Panics
    ///
    /// Panics if a tool with the same name is already registered.
    pub fn register_shared(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.definition().name;
        assert!(
            !self.tools.contains_key(&name),
            "Tool '{name}' is already registered"
        );
        self.tools.insert(name, tool);
    }

    /// Checks a call against the named tool's parameter schema.
    ///
    /// # Errors
    ///
    /// - [`ToolError::UnknownTool`] if no tool has that name.
    /// - [`ToolError::ArgumentValidation`] listing every schema violation.
    pub fn validate(&self, name: &str, args: &Value) -> Result<Arc<dyn Tool>, ToolError> {
        let tool = self
            .tools
            .get(name)
            .cloned()
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        schema::validate(&tool.definition().parameters, args).map_err(|errors| {
            ToolError::ArgumentValidation {
                tool: name.to_string(),
                errors,
            }
        })?;
        Ok(tool)
    }

    /// Validates and executes a tool call.
    ///
    /// # Errors
    ///
    /// Returns the validation errors of [`validate`](Self::validate), or the
    /// executor's own error.
    pub async fn execute(&self, call: &ToolCall) -> Result<Value, ToolError> {
        let tool = self.validate(&call.name, &call.arguments)?;
        tracing::debug!(tool = %call.name, call_id = %call.id, "executing tool");
        tool.execute(call.arguments.clone()).await
    }

    /// Returns tool definitions for all registered tools.
    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|tool| tool.definition()).collect()
    }

    /// Returns a tool by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.tools.get(name).map(AsRef::as_ref)
    }

    /// Returns whether a tool with the given name is registered.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Returns the names of all registered tools.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    /// Number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns whether no tool is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
