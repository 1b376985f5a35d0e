//! Model contract, provider registry and middleware for conflux.
//!
//! Provides a unified interface for model access, decoupling callers from the
//! backends that serve them.
//!
//! # Overview
//!
//! - Provider-agnostic: callers depend on the [`LanguageModel`](llm::LanguageModel)
//!   contract and never on a concrete backend.
//!
//! - Capability-checked: models advertise what they serve; an operation a
//!   model does not serve fails with
//!   [`GenerationError::CapabilityUnsupported`](llm::GenerationError::CapabilityUnsupported)
//!   before any backend work.
//!
//! - Composable: [`middleware`] layers wrap a model and are themselves models,
//!   so behaviors stack without changing the contract.
//!
//! - Streaming with a protocol: [`stream::GenerationStream`] guarantees ordered
//!   delivery, exactly one terminal chunk and prompt cancellation.
//!
//! # Example
//!
//! ```ignore
//! use conflux_models::ModelRegistry;
//! use conflux_models::llm::{GenerationRequest, LanguageModel};
//!
//! let registry = ModelRegistry::new();
//! registry.register_provider("local", Arc::new(my_provider))?;
//!
//! let model = registry.model_by_id("local/echo")?;
//! let response = model
//!     .do_generate(GenerationRequest::with_system("You are helpful", "Hello!"))
//!     .await?;
//! ```

pub mod clock;
pub mod error;
pub mod llm;
pub mod middleware;
pub mod registry;
pub mod schema;
pub mod stream;
#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use error::RegistryError;
pub use middleware::wrap_model;
pub use registry::ModelRegistry;
