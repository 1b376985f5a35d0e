//! Error types for model operations.

use super::capability::Capability;

/// Errors raised by a model while generating, streaming or embedding.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// The model does not advertise the capability the caller invoked.
    #[error("model '{model}' does not support {capability}")]
    CapabilityUnsupported {
        /// The capability that was requested.
        capability: Capability,
        /// The model identifier.
        model: String,
    },

    /// The call was cancelled by the caller.
    #[error("request cancelled")]
    Cancelled,

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The request could not be built for this provider.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The provider answered with something that could not be interpreted.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Error returned by the model provider.
    #[error("provider error: {message}")]
    Provider {
        /// HTTP status code if available.
        status: Option<u16>,
        /// Error message.
        message: String,
        /// The underlying error source.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl GenerationError {
    /// Creates a [`Provider`](Self::Provider) error from a message.
    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            status: None,
            message: message.into(),
            source: None,
        }
    }

    /// Creates a [`CapabilityUnsupported`](Self::CapabilityUnsupported) error.
    pub fn unsupported(capability: Capability, model: impl Into<String>) -> Self {
        Self::CapabilityUnsupported {
            capability,
            model: model.into(),
        }
    }
}
