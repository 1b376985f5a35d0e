//! Model contract and generation types.
//!
//! This module provides the core traits and types shared by every backend:
//!
//! - [`LanguageModel`], the contract (generate, stream, embed)
//! - [`ModelProvider`], the backend handle held by the registry
//! - [`ModelDescriptor`], the capability-checked handle callers receive
//! - conversation, request and response types

mod capability;
mod error;
mod model;
mod provider;
mod types;

pub use capability::{Capability, CapabilitySet};
pub use error::GenerationError;
pub use model::{LanguageModel, ModelDescriptor, ensure_capability};
pub use provider::ModelProvider;
pub use types::{
    CallSettings, ContentPart, Embedding, EmbeddingResponse, EmbeddingUsage, FinishReason,
    GenerationRequest, GenerationResponse, Message, ReasoningSplit, Role, ToolCall, ToolChoice,
    ToolDefinition, ToolResult, ToolResultStatus, Usage,
};
