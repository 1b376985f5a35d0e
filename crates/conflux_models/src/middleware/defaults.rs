use super::Middleware;
use crate::llm::{CallSettings, GenerationError, GenerationRequest, GenerationResponse, LanguageModel};
use crate::stream::BoxChunkStream;
use async_trait::async_trait;
use std::sync::Arc;

/// Fills call settings the caller left unset.
///
/// Values set on the request always win; only `None` fields take the
/// configured defaults.
#[derive(Debug, Clone, Default)]
pub struct DefaultSettings {
    defaults: CallSettings,
}

impl DefaultSettings {
    /// Creates the middleware from a set of default settings.
    #[must_use]
    pub fn new(defaults: CallSettings) -> Self {
        Self { defaults }
    }

    fn apply(&self, mut request: GenerationRequest) -> GenerationRequest {
        request.settings.fill_defaults(&self.defaults);
        request
    }
}

#[async_trait]
impl Middleware for DefaultSettings {
    fn name(&self) -> &'static str {
        "default-settings"
    }

    async fn generate(
        &self,
        request: GenerationRequest,
        next: Arc<dyn LanguageModel>,
    ) -> Result<GenerationResponse, GenerationError> {
        next.do_generate(self.apply(request)).await
    }

    async fn stream(
        &self,
        request: GenerationRequest,
        next: Arc<dyn LanguageModel>,
    ) -> Result<BoxChunkStream, GenerationError> {
        next.do_stream(self.apply(request)).await
    }
}
