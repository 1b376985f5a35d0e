//! Error types for the model registry.

/// Error looking up or registering a model provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Invalid model ID format.
    #[error("invalid model id '{0}': expected format 'provider/model'")]
    InvalidModelId(String),

    /// The specified provider was not found in the registry.
    #[error("provider not found: {0}")]
    ProviderNotFound(String),

    /// The provider does not list the requested model.
    #[error("model '{model}' is not available from provider '{provider}'")]
    ModelNotAvailable {
        /// The provider that was asked.
        provider: String,
        /// The missing model id.
        model: String,
    },

    /// A provider with this name is already registered.
    #[error("provider '{0}' is already registered")]
    DuplicateProvider(String),
}
