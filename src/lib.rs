//! Provider-agnostic model invocation for Rust.
//!
//! Text, structured objects, streams and embeddings from interchangeable
//! models, behind one composable model contract.
//!
//! | Crate | Contents |
//! |-------|----------|
//! | [`models`] | model contract, registry, middleware, streaming engine |
//! | [`tools`] | tool definitions, executors and argument validation |
//! | [`generate`] | the orchestrators: `generate_text`, `stream_text`, `generate_object`, `stream_object`, `embed`, `embed_many` |
//! | [`runtime`] | runtime configuration and tracing setup |

pub use conflux_core as runtime;
pub use conflux_generate as generate;
pub use conflux_models as models;
pub use conflux_tools as tools;

/// Re-export all common types for easy access.
pub mod prelude {
    pub use conflux_core::{RuntimeConfig, TracingConfig, TracingFormat};
    pub use conflux_generate::{
        EmbedError, EmbedOptions, GenerateError, GenerateOptions, GenerateTextResult, ObjectChunk,
        embed, embed_many, generate_object, generate_object_as, generate_text, stream_object,
        stream_text,
    };
    pub use conflux_models::llm::{
        CallSettings, Capability, CapabilitySet, GenerationError, GenerationRequest,
        GenerationResponse, LanguageModel, Message, ModelDescriptor, ModelProvider, Usage,
    };
    pub use conflux_models::middleware::{
        DefaultSettings, ExtractReasoning, Middleware, SimulateStreaming, SmoothStreaming,
    };
    pub use conflux_models::stream::{GenerationStream, StreamChunk};
    pub use conflux_models::{ModelRegistry, RegistryError, wrap_model};
    pub use conflux_tools::{FunctionTool, Tool, ToolError, ToolSet};
}
