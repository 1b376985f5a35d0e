//! Error types for the generation orchestrators.

use conflux_models::llm::GenerationError;
use conflux_tools::ToolError;
use thiserror::Error;

/// Error from [`generate_text`](crate::generate_text) and the object
/// orchestrators.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// The model call failed.
    #[error(transparent)]
    Generation(GenerationError),

    /// The caller cancelled the call.
    #[error("generation was cancelled")]
    Cancelled,

    /// A tool executor failed and error forwarding is disabled.
    #[error("tool '{tool}' failed: {source}")]
    ToolExecution {
        /// Tool name.
        tool: String,
        /// The executor's error.
        #[source]
        source: ToolError,
    },

    /// The model's output does not satisfy the requested schema.
    #[error("output does not match schema: {}", errors.join("; "))]
    SchemaValidation {
        /// The unparsed model output.
        raw: String,
        /// One message per violation, or the parse failure.
        errors: Vec<String>,
    },

    /// The model returned no content where content was required.
    #[error("model returned no content")]
    NoContent,
}

impl From<GenerationError> for GenerateError {
    fn from(err: GenerationError) -> Self {
        match err {
            GenerationError::Cancelled => Self::Cancelled,
            other => Self::Generation(other),
        }
    }
}

/// Error from [`embed`](crate::embed) and [`embed_many`](crate::embed_many).
#[derive(Debug, Error)]
pub enum EmbedError {
    /// The model returned no vectors for a non-empty input.
    #[error("no embeddings returned")]
    NoEmbeddingsReturned,

    /// The model call failed.
    #[error("embedding generation failed: {0}")]
    EmbeddingGenerationFailed(#[source] GenerationError),

    /// The model returned a different number of vectors than inputs.
    #[error("expected {expected} embeddings, got {actual}")]
    EmbeddingCountMismatch {
        /// Number of input values.
        expected: usize,
        /// Number of returned vectors.
        actual: usize,
    },

    /// The caller cancelled the call.
    #[error("embedding was cancelled")]
    Cancelled,
}

impl From<GenerationError> for EmbedError {
    fn from(err: GenerationError) -> Self {
        match err {
            GenerationError::Cancelled => Self::Cancelled,
            other => Self::EmbeddingGenerationFailed(other),
        }
    }
}
