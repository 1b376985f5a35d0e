use super::Middleware;
use crate::clock::Clock;
use crate::llm::{Capability, CapabilitySet, GenerationError, GenerationRequest, LanguageModel};
use crate::stream::{BoxChunkStream, StreamChunk, StreamFinish, ToolCallDelta};
use async_trait::async_trait;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;

/// How simulated streaming slices a complete response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChunkStrategy {
    /// Fixed-size slices of at most `n` characters. Zero is read as one.
    Characters(usize),
    /// One slice per word, each carrying its trailing whitespace.
    #[default]
    Words,
}

impl ChunkStrategy {
    /// Slices `text`. Concatenating the slices yields `text`.
    #[must_use]
    pub fn split<'a>(&self, text: &'a str) -> Vec<&'a str> {
        match *self {
            Self::Characters(n) => split_characters(text, n.max(1)),
            Self::Words => split_words(text),
        }
    }
}

fn split_characters(text: &str, n: usize) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    for (count, (index, _)) in text.char_indices().enumerate() {
        if count > 0 && count % n == 0 {
            pieces.push(&text[start..index]);
            start = index;
        }
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

fn split_words(text: &str) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut previous_whitespace = false;
    for (index, ch) in text.char_indices() {
        let whitespace = ch.is_whitespace();
        let word_before = !text[start..index].trim().is_empty();
        if previous_whitespace && !whitespace && word_before {
            pieces.push(&text[start..index]);
            start = index;
        }
        previous_whitespace = whitespace;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }
    pieces
}

/// Serves streaming requests from a model that can only generate.
///
/// The inner model's complete response is sliced per [`ChunkStrategy`] and
/// replayed as text deltas, with `delay` between consecutive deltas. Tool
/// calls follow as complete [`ToolCallDelta`]s, and the terminal chunk carries
/// the original finish reason and usage. Generation passes through untouched.
///
/// The wrapped model advertises [`Capability::Streaming`] whenever the inner
/// model advertises [`Capability::TextGeneration`].
#[derive(Debug, Clone)]
pub struct SimulateStreaming {
    strategy: ChunkStrategy,
    delay: Duration,
    clock: Clock,
}

impl Default for SimulateStreaming {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulateStreaming {
    /// Word slicing with no delay.
    #[must_use]
    pub fn new() -> Self {
        Self {
            strategy: ChunkStrategy::default(),
            delay: Duration::ZERO,
            clock: Clock::system(),
        }
    }

    /// Sets the slicing strategy.
    #[must_use]
    pub fn with_strategy(mut self, strategy: ChunkStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Sets the pause between consecutive deltas.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Sets the clock used for pacing.
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }
}

#[async_trait]
impl Middleware for SimulateStreaming {
    fn name(&self) -> &'static str {
        "simulate-streaming"
    }

    fn capabilities(&self, inner: CapabilitySet) -> CapabilitySet {
        if inner.supports(Capability::TextGeneration) {
            inner.with(Capability::Streaming)
        } else {
            inner
        }
    }

    async fn stream(
        &self,
        request: GenerationRequest,
        next: Arc<dyn LanguageModel>,
    ) -> Result<BoxChunkStream, GenerationError> {
        let cancellation = request.cancellation.clone();
        let response = next.do_generate(request).await?;
        let strategy = self.strategy;
        let delay = self.delay;
        let clock = self.clock.clone();

        Ok(async_stream::stream! {
            let text = response.text();
            for (index, piece) in strategy.split(&text).into_iter().enumerate() {
                if cancellation.is_cancelled() {
                    return;
                }
                if index > 0 {
                    clock.sleep(delay).await;
                }
                yield StreamChunk::text(piece);
            }

            for call in response.tool_calls() {
                match ToolCallDelta::complete(call) {
                    Ok(delta) => yield StreamChunk::ToolCallDelta(delta),
                    Err(err) => {
                        yield StreamChunk::from(err);
                        return;
                    }
                }
            }

            yield StreamChunk::Finish(StreamFinish {
                finish_reason: response.finish_reason,
                usage: response.usage,
                reasoning: response.reasoning.clone(),
            });
        }
        .boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;
    use crate::llm::{ContentPart, FinishReason, GenerationResponse, ToolCall, Usage};
    use crate::middleware::wrap_model;
    use crate::testing::ScriptedModel;
    use proptest::prelude::*;
    use serde_json::json;
    use std::time::Instant;

    #[test]
    fn words_keep_trailing_whitespace() {
        assert_eq!(
            ChunkStrategy::Words.split("  Hello big\nworld"),
            vec!["  Hello ", "big\n", "world"]
        );
        assert!(ChunkStrategy::Words.split("").is_empty());
    }

    #[test]
    fn characters_respect_char_boundaries() {
        assert_eq!(
            ChunkStrategy::Characters(2).split("héllo"),
            vec!["hé", "ll", "o"]
        );
        assert_eq!(ChunkStrategy::Characters(0).split("ab"), vec!["a", "b"]);
    }

    proptest! {
        #[test]
        fn slicing_preserves_text(text in "\\PC{0,64}", n in 0usize..8) {
            prop_assert_eq!(ChunkStrategy::Characters(n).split(&text).concat(), text.clone());
            prop_assert_eq!(ChunkStrategy::Words.split(&text).concat(), text);
        }
    }

    #[tokio::test]
    async fn adds_streaming_capability_to_text_models() {
        let base = Arc::new(ScriptedModel::new("m").with_capabilities(CapabilitySet::TEXT));
        let model = wrap_model(base, [Arc::new(SimulateStreaming::new()) as Arc<dyn Middleware>]);

        assert!(model.capabilities().supports(Capability::Streaming));
    }

    #[tokio::test]
    async fn replays_generated_text_with_delay() {
        let mock = Arc::new(MockClock::new(Instant::now()));
        let base = Arc::new(
            ScriptedModel::new("m")
                .with_capabilities(CapabilitySet::TEXT)
                .with_response(GenerationResponse {
                    content: vec![ContentPart::Text("one two three".into())],
                    usage: Usage::new(5, 3),
                    finish_reason: FinishReason::Length,
                    reasoning: None,
                }),
        );
        let model = wrap_model(
            base,
            [Arc::new(
                SimulateStreaming::new()
                    .with_delay(Duration::from_millis(10))
                    .with_clock(Clock::with_provider(mock.clone())),
            ) as Arc<dyn Middleware>],
        );

        let chunks: Vec<_> = model
            .do_stream(GenerationRequest::new("q"))
            .await
            .unwrap()
            .collect()
            .await;

        assert_eq!(
            chunks[..3],
            [
                StreamChunk::text("one "),
                StreamChunk::text("two "),
                StreamChunk::text("three")
            ]
        );
        assert_eq!(
            chunks[3],
            StreamChunk::finish(FinishReason::Length, Usage::new(5, 3))
        );
        assert_eq!(mock.total_slept(), Duration::from_millis(20));
    }

    #[tokio::test]
    async fn tool_calls_become_complete_deltas() {
        let call = ToolCall::new("c1", "lookup", json!({ "q": "rust" }));
        let base = Arc::new(
            ScriptedModel::new("m")
                .with_capabilities(CapabilitySet::TEXT)
                .with_response(GenerationResponse {
                    content: vec![ContentPart::ToolCall(call.clone())],
                    usage: Usage::default(),
                    finish_reason: FinishReason::ToolCalls,
                    reasoning: None,
                }),
        );
        let model = wrap_model(base, [Arc::new(SimulateStreaming::new()) as Arc<dyn Middleware>]);

        let chunks: Vec<_> = model
            .do_stream(GenerationRequest::new("q"))
            .await
            .unwrap()
            .collect()
            .await;

        assert_eq!(chunks.len(), 2);
        assert_eq!(
            chunks[0],
            StreamChunk::ToolCallDelta(ToolCallDelta::complete(&call).unwrap())
        );
        assert!(matches!(
            &chunks[1],
            StreamChunk::Finish(StreamFinish { finish_reason: FinishReason::ToolCalls, .. })
        ));
    }

    #[tokio::test]
    async fn inner_failure_surfaces_before_any_chunk() {
        let base = Arc::new(
            ScriptedModel::new("m")
                .with_capabilities(CapabilitySet::TEXT)
                .with_error(GenerationError::provider("down")),
        );
        let model = wrap_model(base, [Arc::new(SimulateStreaming::new()) as Arc<dyn Middleware>]);

        let err = model.do_stream(GenerationRequest::new("q")).await.err().unwrap();
        assert!(err.to_string().contains("down"));
    }
}
