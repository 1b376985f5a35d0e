//! The [`ModelProvider`] trait implemented by backends.

use super::model::LanguageModel;
use std::sync::Arc;

/// A backend that serves one or more models.
///
/// Providers are registered with the [`ModelRegistry`](crate::ModelRegistry)
/// under a name. Each provider owns its own transport; the registry only asks
/// which models it serves and how to obtain an instance for one of them.
pub trait ModelProvider: Send + Sync + 'static {
    /// Lists the model ids this provider serves.
    fn model_ids(&self) -> Vec<String>;

    /// Builds a model instance for `model_id`.
    ///
    /// Only called with ids returned by [`model_ids`](Self::model_ids). Returning
    /// `None` is reported to the caller as a missing model.
    fn language_model(&self, model_id: &str) -> Option<Arc<dyn LanguageModel>>;
}
