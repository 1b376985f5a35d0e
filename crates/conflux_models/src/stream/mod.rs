//! Streaming chunk protocol and engine.
//!
//! A model stream is an ordered sequence of [`StreamChunk`] values: zero or
//! more text or tool-call deltas followed by exactly one terminal chunk
//! (`Finish` or `Error`). Nothing follows the terminal chunk.
//!
//! [`GenerationStream`] wraps a raw model stream and enforces that protocol
//! for consumers, including cancellation.

mod engine;

pub use engine::{GenerationStream, StreamState, StreamedText};

use crate::llm::{FinishReason, GenerationError, ReasoningSplit, ToolCall, Usage};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A boxed stream of chunks, as returned by [`LanguageModel::do_stream`](crate::llm::LanguageModel::do_stream).
pub type BoxChunkStream = BoxStream<'static, StreamChunk>;

/// One unit of a streamed generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum StreamChunk {
    /// A fragment of generated text.
    TextDelta {
        /// The fragment.
        text: String,
    },
    /// A fragment of a tool invocation.
    ToolCallDelta(ToolCallDelta),
    /// Terminal: generation completed.
    Finish(StreamFinish),
    /// Terminal: generation failed.
    Error {
        /// Failure detail.
        message: String,
    },
}

impl StreamChunk {
    /// Creates a text delta.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::TextDelta { text: text.into() }
    }

    /// Creates a finish chunk without reasoning metadata.
    #[must_use]
    pub fn finish(finish_reason: FinishReason, usage: Usage) -> Self {
        Self::Finish(StreamFinish {
            finish_reason,
            usage,
            reasoning: None,
        })
    }

    /// Creates an error chunk.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Returns whether this chunk ends the stream.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finish(_) | Self::Error { .. })
    }
}

impl From<GenerationError> for StreamChunk {
    fn from(err: GenerationError) -> Self {
        Self::error(err.to_string())
    }
}

/// Payload of the terminal `Finish` chunk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamFinish {
    /// Why the model stopped.
    pub finish_reason: FinishReason,
    /// Token usage for the whole generation.
    pub usage: Usage,
    /// Reasoning split of the streamed text, when a reasoning extractor ran.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<ReasoningSplit>,
}

/// A fragment of a tool invocation.
///
/// Fragments sharing an `id` concatenate into the call's JSON arguments. The
/// fragment with `done` set completes the call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallDelta {
    /// Call identifier.
    pub id: String,
    /// Tool name.
    pub name: String,
    /// Next fragment of the JSON-encoded arguments.
    pub arguments_delta: String,
    /// Whether this fragment completes the call.
    pub done: bool,
}

impl ToolCallDelta {
    /// Creates a single delta carrying a complete call.
    ///
    /// # Errors
    ///
    /// Fails if the arguments cannot be serialized.
    pub fn complete(call: &ToolCall) -> Result<Self, GenerationError> {
        Ok(Self {
            id: call.id.clone(),
            name: call.name.clone(),
            arguments_delta: serde_json::to_string(&call.arguments)?,
            done: true,
        })
    }
}

/// Reassembles [`ToolCallDelta`] fragments into complete [`ToolCall`]s.
#[derive(Debug, Default)]
pub struct ToolCallAssembler {
    pending: HashMap<String, (String, String)>,
}

impl ToolCallAssembler {
    /// Creates an empty assembler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one fragment, returning the call once it is complete.
    ///
    /// Empty argument text is read as `{}`.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::InvalidResponse`] if the assembled arguments
    /// are not valid JSON.
    pub fn push(&mut self, delta: &ToolCallDelta) -> Result<Option<ToolCall>, GenerationError> {
        let entry = self
            .pending
            .entry(delta.id.clone())
            .or_insert_with(|| (delta.name.clone(), String::new()));
        entry.1.push_str(&delta.arguments_delta);

        if !delta.done {
            return Ok(None);
        }

        let (name, raw) = self.pending.remove(&delta.id).unwrap_or_default();
        let arguments = if raw.trim().is_empty() {
            serde_json::Value::Object(serde_json::Map::new())
        } else {
            serde_json::from_str(&raw).map_err(|err| {
                GenerationError::InvalidResponse(format!(
                    "tool call '{}' has malformed arguments: {err}",
                    delta.id
                ))
            })?
        };
        Ok(Some(ToolCall::new(delta.id.clone(), name, arguments)))
    }

    /// Returns whether any call is still incomplete.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}
