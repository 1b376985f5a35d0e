//! The model contract and the descriptor handed out by the registry.

use super::capability::{Capability, CapabilitySet};
use super::error::GenerationError;
use super::types::{EmbeddingResponse, GenerationRequest, GenerationResponse};
use crate::stream::BoxChunkStream;
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// The operations every language or embedding model exposes.
///
/// A model only implements the operations matching its advertised
/// [`capabilities`](Self::capabilities); the defaults fail with
/// [`GenerationError::CapabilityUnsupported`].
///
/// Streams returned by [`do_stream`](Self::do_stream) follow the chunk
/// protocol described in [`crate::stream`]: zero or more deltas followed by
/// exactly one terminal chunk.
#[async_trait]
pub trait LanguageModel: Send + Sync + 'static {
    /// Name of the backend serving this model.
    fn provider(&self) -> &str;

    /// Provider-specific model identifier.
    fn model_id(&self) -> &str;

    /// Capabilities this model serves.
    fn capabilities(&self) -> CapabilitySet;

    /// Generates a complete response.
    async fn do_generate(
        &self,
        _request: GenerationRequest,
    ) -> Result<GenerationResponse, GenerationError> {
        Err(GenerationError::unsupported(
            Capability::TextGeneration,
            self.model_id(),
        ))
    }

    /// Generates a response incrementally.
    async fn do_stream(&self, _request: GenerationRequest) -> Result<BoxChunkStream, GenerationError> {
        Err(GenerationError::unsupported(
            Capability::Streaming,
            self.model_id(),
        ))
    }

    /// Embeds a batch of values, returning vectors in input order.
    async fn do_embed(
        &self,
        _values: Vec<String>,
        _cancellation: CancellationToken,
    ) -> Result<EmbeddingResponse, GenerationError> {
        Err(GenerationError::unsupported(
            Capability::Embedding,
            self.model_id(),
        ))
    }
}

/// Fails with [`GenerationError::CapabilityUnsupported`] unless `model`
/// advertises `capability`.
///
/// # Errors
///
/// Returns an error when the capability is missing.
pub fn ensure_capability(
    model: &dyn LanguageModel,
    capability: Capability,
) -> Result<(), GenerationError> {
    if model.capabilities().supports(capability) {
        Ok(())
    } else {
        Err(GenerationError::unsupported(capability, model.model_id()))
    }
}

/// A model obtained from the [`ModelRegistry`](crate::ModelRegistry).
///
/// The descriptor carries the provider name, model id and capability set, and
/// itself satisfies [`LanguageModel`]: every operation checks the advertised
/// capabilities before dispatching to the bound instance.
#[derive(Clone)]
pub struct ModelDescriptor {
    provider: String,
    model_id: String,
    capabilities: CapabilitySet,
    model: Arc<dyn LanguageModel>,
}

impl core::fmt::Debug for ModelDescriptor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ModelDescriptor")
            .field("provider", &self.provider)
            .field("model_id", &self.model_id)
            .field("capabilities", &self.capabilities)
            .finish()
    }
}

impl ModelDescriptor {
    /// Binds a model instance under a provider name.
    #[must_use]
    pub fn new(provider: impl Into<String>, model: Arc<dyn LanguageModel>) -> Self {
        Self {
            provider: provider.into(),
            model_id: model.model_id().to_string(),
            capabilities: model.capabilities(),
            model,
        }
    }

    /// Returns the registered provider name.
    #[must_use]
    pub fn provider_name(&self) -> &str {
        &self.provider
    }

    /// Returns whether `capability` is advertised.
    #[must_use]
    pub fn supports(&self, capability: Capability) -> bool {
        self.capabilities.supports(capability)
    }

    /// Returns the bound model instance.
    #[must_use]
    pub fn model(&self) -> &Arc<dyn LanguageModel> {
        &self.model
    }

    /// Converts this descriptor into a shared model handle.
    #[must_use]
    pub fn into_shared(self) -> Arc<dyn LanguageModel> {
        Arc::new(self)
    }

    fn check(&self, capability: Capability) -> Result<(), GenerationError> {
        if self.supports(capability) {
            Ok(())
        } else {
            Err(GenerationError::unsupported(capability, &self.model_id))
        }
    }
}

#[async_trait]
impl LanguageModel for ModelDescriptor {
    fn provider(&self) -> &str {
        &self.provider
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn capabilities(&self) -> CapabilitySet {
        self.capabilities
    }

    async fn do_generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, GenerationError> {
        self.check(Capability::TextGeneration)?;
        self.model.do_generate(request).await
    }

    async fn do_stream(&self, request: GenerationRequest) -> Result<BoxChunkStream, GenerationError> {
        self.check(Capability::Streaming)?;
        self.model.do_stream(request).await
    }

    async fn do_embed(
        &self,
        values: Vec<String>,
        cancellation: CancellationToken,
    ) -> Result<EmbeddingResponse, GenerationError> {
        self.check(Capability::Embedding)?;
        self.model.do_embed(values, cancellation).await
    }
}
