//! Generation orchestrators for conflux.
//!
//! The public entry points a caller uses to get text, structured objects,
//! streams and embeddings out of any [`LanguageModel`](conflux_models::llm::LanguageModel):
//!
//! | Operation | Returns |
//! |-----------|---------|
//! | [`generate_text`] | final text, per-step results, summed usage |
//! | [`stream_text`] | a [`GenerationStream`](conflux_models::stream::GenerationStream) |
//! | [`generate_object`] / [`generate_object_as`] | a schema-validated value |
//! | [`stream_object`] | partial snapshots, then the validated value |
//! | [`embed`] / [`embed_many`] | vectors in input order |
//!
//! Text orchestrators run tool calls from the [`ToolSet`](conflux_tools::ToolSet)
//! in [`GenerateOptions`] and feed the results back to the model, up to
//! [`max_steps`](GenerateOptions::max_steps) invocations.
//!
//! # Example
//!
//! ```ignore
//! use conflux_generate::{GenerateOptions, generate_text};
//! use conflux_models::llm::Message;
//!
//! let model = registry.model_by_id("local/chat")?;
//! let result = generate_text(
//!     &model,
//!     vec![Message::user("What's the weather in Oslo?")],
//!     GenerateOptions::new().with_tools(tools).with_max_steps(3),
//! )
//! .await?;
//! println!("{} ({:?} tokens)", result.text, result.usage.total_tokens());
//! ```

pub mod embed;
pub mod error;
pub mod object;
pub mod options;
pub mod partial_json;
pub mod stream;
pub mod text;
mod tool_loop;

pub use embed::{EmbedManyResult, EmbedResult, embed, embed_many};
pub use error::{EmbedError, GenerateError};
pub use object::{
    GenerateObjectResult, ObjectChunk, ObjectStream, generate_object, generate_object_as,
    stream_object,
};
pub use options::{EmbedOptions, GenerateOptions};
pub use stream::stream_text;
pub use text::{GenerateTextResult, StepResult, generate_text};
