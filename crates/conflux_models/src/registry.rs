//! Model provider registry.

use crate::error::RegistryError;
use crate::llm::{LanguageModel, ModelDescriptor, ModelProvider};
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Registry mapping provider names to [`ModelProvider`] implementations.
///
/// # For Consumers
///
/// Look models up by provider and model id, or with the `"provider/model"`
/// shorthand. See [`model()`](Self::model) for details.
///
/// # For Provider Authors
///
/// Register the provider once at startup. Registration takes `&self`, so a
/// registry shared behind an [`Arc`] can also accept providers at runtime;
/// concurrent lookups see either the previous or the new set of providers,
/// never a partially registered one. Registered entries are never replaced.
///
/// ```
/// use conflux_models::ModelRegistry;
/// use conflux_models::llm::{CapabilitySet, LanguageModel};
/// use conflux_models::registry::StaticProvider;
/// use std::sync::Arc;
///
/// struct Echo;
///
/// #[async_trait::async_trait]
/// impl LanguageModel for Echo {
///     fn provider(&self) -> &str { "local" }
///     fn model_id(&self) -> &str { "echo" }
///     fn capabilities(&self) -> CapabilitySet { CapabilitySet::TEXT }
/// }
///
/// let registry = ModelRegistry::new();
/// registry
///     .register_provider("local", Arc::new(StaticProvider::new().with_model(Arc::new(Echo))))
///     .unwrap();
///
/// let model = registry.model("local", "echo").unwrap();
/// assert_eq!(model.provider_name(), "local");
/// assert!(registry.model("local", "missing").is_err());
/// ```
#[derive(Default)]
pub struct ModelRegistry {
    providers: RwLock<HashMap<String, Arc<dyn ModelProvider>>>,
    // Descriptors built so far, per (provider, model).
    descriptors: Mutex<HashMap<(String, String), ModelDescriptor>>,
}

impl core::fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ModelRegistry")
            .field("providers", &self.provider_names())
            .finish()
    }
}

impl ModelRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a provider and returns the registry, for startup chains.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateProvider`] if the name is taken.
    pub fn with_provider<P: ModelProvider>(
        self,
        name: impl Into<String>,
        provider: Arc<P>,
    ) -> Result<Self, RegistryError> {
        self.register_provider(name, provider)?;
        Ok(self)
    }

    /// Registers a provider under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateProvider`] if a provider with the same
    /// name is already registered.
    pub fn register_provider<P: ModelProvider>(
        &self,
        name: impl Into<String>,
        provider: Arc<P>,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        let mut providers = self.providers.write();
        if providers.contains_key(&name) {
            return Err(RegistryError::DuplicateProvider(name));
        }
        tracing::debug!(provider = %name, "registered model provider");
        providers.insert(name, provider as Arc<dyn ModelProvider>);
        Ok(())
    }

    /// Returns a descriptor for `model_id` served by `provider_name`.
    ///
    /// Descriptors are built lazily and cached per pair; repeated calls return
    /// descriptors bound to the same instance.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::ProviderNotFound`] if no provider has that name.
    /// - [`RegistryError::ModelNotAvailable`] if the provider does not list the model.
    pub fn model(
        &self,
        provider_name: &str,
        model_id: &str,
    ) -> Result<ModelDescriptor, RegistryError> {
        let provider = self
            .get_provider(provider_name)
            .ok_or_else(|| RegistryError::ProviderNotFound(provider_name.to_string()))?;

        let not_available = || RegistryError::ModelNotAvailable {
            provider: provider_name.to_string(),
            model: model_id.to_string(),
        };

        if !provider.model_ids().iter().any(|id| id == model_id) {
            return Err(not_available());
        }

        let key = (provider_name.to_string(), model_id.to_string());
        let mut descriptors = self.descriptors.lock();
        if let Some(descriptor) = descriptors.get(&key) {
            return Ok(descriptor.clone());
        }

        let model: Arc<dyn LanguageModel> =
            provider.language_model(model_id).ok_or_else(not_available)?;
        let descriptor = ModelDescriptor::new(provider_name, model);
        tracing::debug!(
            provider = %provider_name,
            model = %model_id,
            capabilities = ?descriptor.capabilities(),
            "created model descriptor"
        );
        descriptors.insert(key, descriptor.clone());
        Ok(descriptor)
    }

    /// Looks up a model with a `"provider/model"` identifier.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidModelId`] if the identifier has no `/`,
    /// otherwise the errors of [`model()`](Self::model).
    pub fn model_by_id(&self, id: impl AsRef<str>) -> Result<ModelDescriptor, RegistryError> {
        let id = id.as_ref();
        let (provider_name, model_id) = id
            .split_once('/')
            .ok_or_else(|| RegistryError::InvalidModelId(id.to_string()))?;
        self.model(provider_name, model_id)
    }

    /// Returns every provider's advertised model ids.
    #[must_use]
    pub fn list_available_models(&self) -> BTreeMap<String, Vec<String>> {
        self.providers
            .read()
            .iter()
            .map(|(name, provider)| (name.clone(), provider.model_ids()))
            .collect()
    }

    /// Returns a provider by name.
    #[must_use]
    pub fn get_provider(&self, name: impl AsRef<str>) -> Option<Arc<dyn ModelProvider>> {
        self.providers.read().get(name.as_ref()).cloned()
    }

    /// Checks if a provider is registered.
    #[must_use]
    pub fn has_provider(&self, name: impl AsRef<str>) -> bool {
        self.providers.read().contains_key(name.as_ref())
    }

    /// Lists registered provider names.
    #[must_use]
    pub fn provider_names(&self) -> Vec<String> {
        self.providers.read().keys().cloned().collect()
    }
}

/// A provider serving a fixed set of model instances.
///
/// Useful for in-process models and test doubles.
#[derive(Default, Clone)]
pub struct StaticProvider {
    models: Vec<Arc<dyn LanguageModel>>,
}

impl StaticProvider {
    /// Creates a provider with no models.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a model, served under its own [`model_id`](LanguageModel::model_id).
    #[must_use]
    pub fn with_model(mut self, model: Arc<dyn LanguageModel>) -> Self {
        self.models.push(model);
        self
    }
}

impl ModelProvider for StaticProvider {
    fn model_ids(&self) -> Vec<String> {
        self.models
            .iter()
            .map(|model| model.model_id().to_string())
            .collect()
    }

    fn language_model(&self, model_id: &str) -> Option<Arc<dyn LanguageModel>> {
        self.models
            .iter()
            .find(|model| model.model_id() == model_id)
            .cloned()
    }
}
