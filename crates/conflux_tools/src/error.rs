//! Error types for tool lookup and execution.

use thiserror::Error;

/// Errors that can occur while dispatching or running a tool.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The model asked for a tool that is not declared.
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// The call's arguments do not satisfy the tool's parameter schema.
    #[error("invalid arguments for tool '{tool}': {}", errors.join("; "))]
    ArgumentValidation {
        /// Tool name.
        tool: String,
        /// One message per schema violation.
        errors: Vec<String>,
    },

    /// A parameter could not be read from the arguments.
    #[error("parameter error: {0}")]
    Parameter(String),

    /// The executor failed.
    #[error("execution error: {0}")]
    Execution(String),

    /// JSON serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ToolError {
    /// Creates a [`Parameter`](Self::Parameter) error.
    pub fn parameter(msg: impl Into<String>) -> Self {
        Self::Parameter(msg.into())
    }

    /// Creates an [`Execution`](Self::Execution) error.
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution(msg.into())
    }

    /// Returns whether the call was rejected before the executor ran.
    #[must_use]
    pub fn is_rejected_call(&self) -> bool {
        matches!(self, Self::UnknownTool(_) | Self::ArgumentValidation { .. })
    }
}
