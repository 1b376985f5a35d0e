//! In-process models for tests.
//!
//! Enabled with the `test-utils` feature. Nothing here performs I/O.

pub use crate::clock::MockClock;

use crate::llm::{
    CapabilitySet, ContentPart, Embedding, EmbeddingResponse, EmbeddingUsage, GenerationError,
    GenerationRequest, GenerationResponse, LanguageModel, Usage,
};
use crate::stream::{BoxChunkStream, StreamChunk, StreamFinish, ToolCallAssembler, ToolCallDelta};
use async_trait::async_trait;
use futures::StreamExt;
use futures::stream;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio_util::sync::CancellationToken;

/// One scripted reaction to a generate or stream call.
#[derive(Debug)]
enum Turn {
    Response(GenerationResponse),
    Stream(Vec<StreamChunk>),
    HangingStream(Vec<StreamChunk>),
    Pending,
    Error(GenerationError),
}

impl Turn {
    /// Copies the turn for replay. Errors are not replayable.
    fn replay(&self) -> Option<Self> {
        match self {
            Self::Response(response) => Some(Self::Response(response.clone())),
            Self::Stream(chunks) => Some(Self::Stream(chunks.clone())),
            Self::HangingStream(chunks) => Some(Self::HangingStream(chunks.clone())),
            Self::Pending => Some(Self::Pending),
            Self::Error(_) => None,
        }
    }
}

/// A model that replays a script of responses.
///
/// Each call to `do_generate` or `do_stream` consumes the next scripted turn.
/// The last turn is sticky: once only one remains it answers every further
/// call, except a scripted error, which is consumed. Calls beyond the script
/// fail with [`GenerationError::InvalidRequest`].
///
/// A streaming call on a response turn replays the response as one text delta,
/// complete tool-call deltas and a finish chunk. A generate call on a stream
/// turn assembles the text and tool-call deltas.
///
/// Every request is recorded.
#[derive(Debug)]
pub struct ScriptedModel {
    model_id: String,
    capabilities: CapabilitySet,
    turns: Mutex<VecDeque<Turn>>,
    requests: Mutex<Vec<GenerationRequest>>,
    generate_calls: AtomicUsize,
    stream_calls: AtomicUsize,
}

impl ScriptedModel {
    /// Creates a model with generation and streaming capabilities and an empty script.
    #[must_use]
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            capabilities: CapabilitySet::CHAT,
            turns: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            generate_calls: AtomicUsize::new(0),
            stream_calls: AtomicUsize::new(0),
        }
    }

    /// Replaces the advertised capabilities.
    #[must_use]
    pub fn with_capabilities(mut self, capabilities: CapabilitySet) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Appends a text response.
    #[must_use]
    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.with_response(GenerationResponse::text_response(
            text,
            Usage::default(),
        ))
    }

    /// Appends a complete response.
    #[must_use]
    pub fn with_response(self, response: GenerationResponse) -> Self {
        self.push(Turn::Response(response))
    }

    /// Appends a raw chunk sequence, delivered as scripted.
    #[must_use]
    pub fn with_stream(self, chunks: Vec<StreamChunk>) -> Self {
        self.push(Turn::Stream(chunks))
    }

    /// Appends a chunk sequence that never ends after its last chunk.
    #[must_use]
    pub fn with_hanging_stream(self, chunks: Vec<StreamChunk>) -> Self {
        self.push(Turn::HangingStream(chunks))
    }

    /// Appends a turn that never answers until the request is cancelled.
    #[must_use]
    pub fn with_pending(self) -> Self {
        self.push(Turn::Pending)
    }

    /// Appends a failure.
    #[must_use]
    pub fn with_error(self, error: GenerationError) -> Self {
        self.push(Turn::Error(error))
    }

    fn push(self, turn: Turn) -> Self {
        self.turns.lock().push_back(turn);
        self
    }

    /// Requests received so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().clone()
    }

    /// Number of `do_generate` calls.
    #[must_use]
    pub fn generate_calls(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }

    /// Number of `do_stream` calls.
    #[must_use]
    pub fn stream_calls(&self) -> usize {
        self.stream_calls.load(Ordering::SeqCst)
    }

    fn next_turn(&self, request: &GenerationRequest) -> Result<Turn, GenerationError> {
        self.requests.lock().push(request.clone());
        let mut turns = self.turns.lock();
        let turn = if turns.len() > 1 {
            turns.pop_front()
        } else {
            match turns.front().and_then(Turn::replay) {
                Some(turn) => Some(turn),
                None => turns.pop_front(),
            }
        };
        turn.ok_or_else(|| {
            GenerationError::InvalidRequest(format!("'{}' has no scripted turn left", self.model_id))
        })
    }
}

/// Folds a chunk sequence into the response a generate call would return.
fn assemble(chunks: &[StreamChunk]) -> Result<GenerationResponse, GenerationError> {
    let mut text = String::new();
    let mut assembler = ToolCallAssembler::new();
    let mut calls = Vec::new();
    let mut finish = None;
    for chunk in chunks {
        match chunk {
            StreamChunk::TextDelta { text: delta } => text.push_str(delta),
            StreamChunk::ToolCallDelta(delta) => calls.extend(assembler.push(delta)?),
            StreamChunk::Finish(last) => {
                finish = Some(last.clone());
                break;
            }
            StreamChunk::Error { message } => return Err(GenerationError::provider(message.clone())),
        }
    }

    let mut content = Vec::with_capacity(calls.len() + 1);
    if !text.is_empty() || calls.is_empty() {
        content.push(ContentPart::Text(text));
    }
    content.extend(calls.into_iter().map(ContentPart::ToolCall));
    let finish = finish.unwrap_or_default();
    Ok(GenerationResponse {
        content,
        usage: finish.usage,
        finish_reason: finish.finish_reason,
        reasoning: finish.reasoning,
    })
}

fn replay(response: &GenerationResponse) -> Result<Vec<StreamChunk>, GenerationError> {
    let mut chunks = Vec::new();
    let text = response.text();
    if !text.is_empty() {
        chunks.push(StreamChunk::text(text));
    }
    for call in response.tool_calls() {
        chunks.push(StreamChunk::ToolCallDelta(ToolCallDelta::complete(call)?));
    }
    chunks.push(StreamChunk::Finish(StreamFinish {
        finish_reason: response.finish_reason,
        usage: response.usage,
        reasoning: response.reasoning.clone(),
    }));
    Ok(chunks)
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    fn provider(&self) -> &str {
        "scripted"
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn capabilities(&self) -> CapabilitySet {
        self.capabilities
    }

    async fn do_generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, GenerationError> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        match self.next_turn(&request)? {
            Turn::Response(response) => Ok(response),
            Turn::Stream(chunks) | Turn::HangingStream(chunks) => assemble(&chunks),
            Turn::Pending => {
                request.cancellation.cancelled().await;
                Err(GenerationError::Cancelled)
            }
            Turn::Error(err) => Err(err),
        }
    }

    async fn do_stream(&self, request: GenerationRequest) -> Result<BoxChunkStream, GenerationError> {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);
        match self.next_turn(&request)? {
            Turn::Response(response) => Ok(stream::iter(replay(&response)?).boxed()),
            Turn::Stream(chunks) => Ok(stream::iter(chunks).boxed()),
            Turn::HangingStream(chunks) => {
                Ok(stream::iter(chunks).chain(stream::pending()).boxed())
            }
            Turn::Pending => Ok(stream::pending().boxed()),
            Turn::Error(err) => Err(err),
        }
    }
}

/// An embedding model returning fixed vectors, counting its calls.
///
/// By default each value embeds to `[len, index]`, where `len` is the value's
/// length in bytes and `index` its position in the batch.
#[derive(Debug, Default)]
pub struct StaticEmbeddingModel {
    fixed: Option<Vec<Embedding>>,
    calls: AtomicUsize,
    batches: Mutex<Vec<Vec<String>>>,
}

impl StaticEmbeddingModel {
    /// Creates a model computing vectors from the input.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `embeddings` for every call, whatever the input.
    #[must_use]
    pub fn returning(embeddings: Vec<Embedding>) -> Self {
        Self {
            fixed: Some(embeddings),
            ..Self::default()
        }
    }

    /// Number of `do_embed` calls.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Input batches received so far.
    #[must_use]
    pub fn batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().clone()
    }
}

#[async_trait]
impl LanguageModel for StaticEmbeddingModel {
    fn provider(&self) -> &str {
        "scripted"
    }

    fn model_id(&self) -> &str {
        "static-embedding"
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::EMBEDDING
    }

    async fn do_embed(
        &self,
        values: Vec<String>,
        cancellation: CancellationToken,
    ) -> Result<EmbeddingResponse, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if cancellation.is_cancelled() {
            return Err(GenerationError::Cancelled);
        }
        self.batches.lock().push(values.clone());

        let embeddings = self.fixed.clone().unwrap_or_else(|| {
            values
                .iter()
                .enumerate()
                .map(|(index, value)| vec![value.len() as f32, index as f32])
                .collect()
        });
        let tokens = values.iter().map(|value| value.len() as u64).sum();
        Ok(EmbeddingResponse {
            embeddings,
            usage: Some(EmbeddingUsage { tokens }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{FinishReason, ToolCall};
    use serde_json::json;

    #[tokio::test]
    async fn generate_on_a_stream_turn_keeps_tool_calls() {
        let call = ToolCall::new("c1", "lookup", json!({ "q": "rust" }));
        let mut first = ToolCallDelta::complete(&call).unwrap();
        let rest = first.arguments_delta.split_off(4);
        first.done = false;
        let second = ToolCallDelta {
            arguments_delta: rest,
            done: true,
            ..first.clone()
        };
        let model = ScriptedModel::new("m").with_stream(vec![
            StreamChunk::text("Looking "),
            StreamChunk::text("it up."),
            StreamChunk::ToolCallDelta(first),
            StreamChunk::ToolCallDelta(second),
            StreamChunk::finish(FinishReason::ToolCalls, Usage::new(2, 3)),
        ]);

        let response = model.do_generate(GenerationRequest::new("q")).await.unwrap();

        assert_eq!(response.text(), "Looking it up.");
        assert_eq!(response.tool_calls(), vec![&call]);
        assert_eq!(response.finish_reason, FinishReason::ToolCalls);
        assert_eq!(response.usage, Usage::new(2, 3));
    }

    #[tokio::test]
    async fn generate_on_an_error_stream_fails() {
        let model = ScriptedModel::new("m")
            .with_stream(vec![StreamChunk::text("par"), StreamChunk::error("cut off")]);

        let err = model.do_generate(GenerationRequest::new("q")).await.unwrap_err();

        assert!(err.to_string().contains("cut off"));
    }
}
