//! Middleware composition for [`LanguageModel`]s.
//!
//! A [`Middleware`] intercepts the contract operations of the model it wraps.
//! Each hook receives the request and the next layer; it may delegate,
//! rewrite the request first, post-process the result, or answer without
//! delegating at all. [`wrap_model`] applies an ordered list of middleware,
//! and the result is again a [`LanguageModel`].
//!
//! # Ordering
//!
//! The list is outermost-first: `wrap_model(base, [a, b])` behaves as
//! `a(b(base))`, so `a` sees every call first and sees results last.
//!
//! Order matters. [`SmoothStreaming`] re-buffers a chunk sequence, so the
//! layer beneath it must already stream; place it before (outside)
//! [`SimulateStreaming`] when the base model only generates:
//!
//! ```ignore
//! let model = wrap_model(base, [
//!     Arc::new(SmoothStreaming::new(SmoothBoundary::Word)) as Arc<dyn Middleware>,
//!     Arc::new(SimulateStreaming::new()),
//! ]);
//! ```
//!
//! Built-in middleware:
//!
//! | Middleware | Effect |
//! |------------|--------|
//! | [`DefaultSettings`] | Fills call settings the caller left unset |
//! | [`ExtractReasoning`] | Attaches a reasoning/answer split as metadata |
//! | [`SimulateStreaming`] | Streams a generate-only model by slicing its output |
//! | [`SmoothStreaming`] | Aligns text deltas to word, line or sentence boundaries |

mod defaults;
mod reasoning;
mod simulate;
mod smooth;

pub use defaults::DefaultSettings;
pub use reasoning::ExtractReasoning;
pub use simulate::{ChunkStrategy, SimulateStreaming};
pub use smooth::{SmoothBoundary, SmoothStreaming};

use crate::llm::{
    Capability, CapabilitySet, EmbeddingResponse, GenerationError, GenerationRequest,
    GenerationResponse, LanguageModel, ensure_capability,
};
use crate::stream::BoxChunkStream;
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// A behavior layer around a [`LanguageModel`].
///
/// Every hook defaults to plain delegation, so a middleware only overrides
/// what it changes. Middleware must not keep request-scoped state between
/// calls; anything a call needs lives inside that call.
#[async_trait]
pub trait Middleware: Send + Sync + 'static {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Capabilities of the wrapped model as seen from outside this layer.
    fn capabilities(&self, inner: CapabilitySet) -> CapabilitySet {
        inner
    }

    /// Intercepts [`LanguageModel::do_generate`].
    async fn generate(
        &self,
        request: GenerationRequest,
        next: Arc<dyn LanguageModel>,
    ) -> Result<GenerationResponse, GenerationError> {
        next.do_generate(request).await
    }

    /// Intercepts [`LanguageModel::do_stream`].
    async fn stream(
        &self,
        request: GenerationRequest,
        next: Arc<dyn LanguageModel>,
    ) -> Result<BoxChunkStream, GenerationError> {
        next.do_stream(request).await
    }

    /// Intercepts [`LanguageModel::do_embed`].
    async fn embed(
        &self,
        values: Vec<String>,
        cancellation: CancellationToken,
        next: Arc<dyn LanguageModel>,
    ) -> Result<EmbeddingResponse, GenerationError> {
        next.do_embed(values, cancellation).await
    }
}

/// A model wrapped in one middleware layer.
pub struct Layered {
    middleware: Arc<dyn Middleware>,
    inner: Arc<dyn LanguageModel>,
    capabilities: CapabilitySet,
}

impl Layered {
    /// Wraps `inner` with `middleware`.
    #[must_use]
    pub fn new(middleware: Arc<dyn Middleware>, inner: Arc<dyn LanguageModel>) -> Self {
        let capabilities = middleware.capabilities(inner.capabilities());
        Self {
            middleware,
            inner,
            capabilities,
        }
    }
}

#[async_trait]
impl LanguageModel for Layered {
    fn provider(&self) -> &str {
        self.inner.provider()
    }

    fn model_id(&self) -> &str {
        self.inner.model_id()
    }

    fn capabilities(&self) -> CapabilitySet {
        self.capabilities
    }

    async fn do_generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, GenerationError> {
        ensure_capability(self, Capability::TextGeneration)?;
        tracing::trace!(middleware = self.middleware.name(), "generate");
        self.middleware
            .generate(request, Arc::clone(&self.inner))
            .await
    }

    async fn do_stream(&self, request: GenerationRequest) -> Result<BoxChunkStream, GenerationError> {
        ensure_capability(self, Capability::Streaming)?;
        tracing::trace!(middleware = self.middleware.name(), "stream");
        self.middleware.stream(request, Arc::clone(&self.inner)).await
    }

    async fn do_embed(
        &self,
        values: Vec<String>,
        cancellation: CancellationToken,
    ) -> Result<EmbeddingResponse, GenerationError> {
        ensure_capability(self, Capability::Embedding)?;
        tracing::trace!(middleware = self.middleware.name(), "embed");
        self.middleware
            .embed(values, cancellation, Arc::clone(&self.inner))
            .await
    }
}

/// Applies `middleware` to `model`, outermost first.
///
/// An empty list returns `model` unchanged.
#[must_use]
pub fn wrap_model<I>(model: Arc<dyn LanguageModel>, middleware: I) -> Arc<dyn LanguageModel>
where
    I: IntoIterator<Item = Arc<dyn Middleware>>,
    I::IntoIter: DoubleEndedIterator,
{
    middleware.into_iter().rev().fold(model, |inner, layer| {
        tracing::debug!(
            middleware = layer.name(),
            model = inner.model_id(),
            "wrapping model"
        );
        Arc::new(Layered::new(layer, inner)) as Arc<dyn LanguageModel>
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{CallSettings, Usage};
    use crate::testing::ScriptedModel;
    use parking_lot::Mutex;

    /// Records the order in which layers see a call.
    struct Trace {
        label: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Middleware for Trace {
        fn name(&self) -> &'static str {
            self.label
        }

        async fn generate(
            &self,
            request: GenerationRequest,
            next: Arc<dyn LanguageModel>,
        ) -> Result<GenerationResponse, GenerationError> {
            self.log.lock().push(format!("{}:before", self.label));
            let response = next.do_generate(request).await;
            self.log.lock().push(format!("{}:after", self.label));
            response
        }
    }

    /// Answers without delegating.
    struct Canned;

    #[async_trait]
    impl Middleware for Canned {
        fn name(&self) -> &'static str {
            "canned"
        }

        async fn generate(
            &self,
            _request: GenerationRequest,
            _next: Arc<dyn LanguageModel>,
        ) -> Result<GenerationResponse, GenerationError> {
            Ok(GenerationResponse::text_response("cached", Usage::default()))
        }
    }

    #[tokio::test]
    async fn first_middleware_is_outermost() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let base = Arc::new(ScriptedModel::new("m").with_text("ok"));
        let model = wrap_model(
            base,
            [
                Arc::new(Trace { label: "a", log: log.clone() }) as Arc<dyn Middleware>,
                Arc::new(Trace { label: "b", log: log.clone() }),
            ],
        );

        model.do_generate(GenerationRequest::new("hi")).await.unwrap();

        assert_eq!(
            *log.lock(),
            vec!["a:before", "b:before", "b:after", "a:after"]
        );
    }

    #[tokio::test]
    async fn middleware_can_short_circuit() {
        let base = Arc::new(ScriptedModel::new("m").with_text("real"));
        let model = wrap_model(base.clone(), [Arc::new(Canned) as Arc<dyn Middleware>]);

        let response = model.do_generate(GenerationRequest::new("hi")).await.unwrap();

        assert_eq!(response.text(), "cached");
        assert_eq!(base.generate_calls(), 0);
    }

    #[tokio::test]
    async fn empty_list_leaves_model_untouched() {
        let base = Arc::new(ScriptedModel::new("m").with_text("ok"));
        let model = wrap_model(base, Vec::new());

        assert_eq!(model.model_id(), "m");
        let response = model.do_generate(GenerationRequest::new("hi")).await.unwrap();
        assert_eq!(response.text(), "ok");
    }

    #[tokio::test]
    async fn layered_checks_capabilities_before_dispatch() {
        let base = Arc::new(ScriptedModel::new("m").with_capabilities(CapabilitySet::TEXT));
        let model = wrap_model(
            base,
            [Arc::new(DefaultSettings::new(CallSettings::new())) as Arc<dyn Middleware>],
        );

        let err = model
            .do_embed(vec!["x".into()], CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, GenerationError::CapabilityUnsupported { .. }));
    }
}
