use super::Middleware;
use crate::llm::{
    GenerationError, GenerationRequest, GenerationResponse, LanguageModel, ReasoningSplit,
};
use crate::stream::{BoxChunkStream, StreamChunk};
use async_trait::async_trait;
use futures::StreamExt;
use std::sync::Arc;

/// Splits model output into reasoning and answer segments.
///
/// Reasoning is text enclosed in `<tag>` ... `</tag>` markers. The split is
/// attached as metadata: [`GenerationResponse::reasoning`] for generation and
/// [`StreamFinish::reasoning`](crate::stream::StreamFinish::reasoning) on the
/// terminal chunk for streaming. Text payloads pass through unaltered, so
/// callers unaware of the split still see the model's raw output.
///
/// Output without any marker gets no split.
#[derive(Debug, Clone)]
pub struct ExtractReasoning {
    open: String,
    close: String,
    separator: String,
    start_with_reasoning: bool,
}

impl ExtractReasoning {
    /// Extracts segments enclosed in `<tag>` and `</tag>`.
    #[must_use]
    pub fn new(tag: &str) -> Self {
        Self {
            open: format!("<{tag}>"),
            close: format!("</{tag}>"),
            separator: "\n".to_string(),
            start_with_reasoning: false,
        }
    }

    /// Sets the text joining multiple reasoning segments and the answer pieces
    /// around a removed segment. Defaults to a newline.
    #[must_use]
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Treats the output as starting inside a reasoning segment, for models
    /// that omit the opening marker.
    #[must_use]
    pub fn start_with_reasoning(mut self, enabled: bool) -> Self {
        self.start_with_reasoning = enabled;
        self
    }

    /// Splits `text`, returning `None` when it holds no reasoning segment.
    ///
    /// An opening marker without a closing one takes the rest of the text as
    /// reasoning.
    ///
    /// ```
    /// use conflux_models::middleware::ExtractReasoning;
    ///
    /// let split = ExtractReasoning::new("think")
    ///     .split("<think>check units</think>42 km")
    ///     .unwrap();
    /// assert_eq!(split.reasoning, "check units");
    /// assert_eq!(split.answer, "42 km");
    /// ```
    #[must_use]
    pub fn split(&self, text: &str) -> Option<ReasoningSplit> {
        let owned;
        let mut rest = if self.start_with_reasoning {
            owned = format!("{}{text}", self.open);
            owned.as_str()
        } else {
            text
        };

        let mut reasoning = Vec::new();
        let mut answer = Vec::new();
        loop {
            let Some(start) = rest.find(&self.open) else {
                answer.push(rest);
                break;
            };
            answer.push(&rest[..start]);
            let inside = &rest[start + self.open.len()..];
            match inside.find(&self.close) {
                Some(end) => {
                    reasoning.push(&inside[..end]);
                    rest = &inside[end + self.close.len()..];
                }
                None => {
                    reasoning.push(inside);
                    break;
                }
            }
        }

        if reasoning.is_empty() {
            return None;
        }

        let answer: Vec<&str> = answer
            .into_iter()
            .map(str::trim)
            .filter(|piece| !piece.is_empty())
            .collect();
        Some(ReasoningSplit {
            reasoning: reasoning
                .into_iter()
                .map(str::trim)
                .collect::<Vec<_>>()
                .join(self.separator.as_str()),
            answer: answer.join(self.separator.as_str()),
        })
    }
}

#[async_trait]
impl Middleware for ExtractReasoning {
    fn name(&self) -> &'static str {
        "extract-reasoning"
    }

    async fn generate(
        &self,
        request: GenerationRequest,
        next: Arc<dyn LanguageModel>,
    ) -> Result<GenerationResponse, GenerationError> {
        let mut response = next.do_generate(request).await?;
        response.reasoning = self.split(&response.text());
        Ok(response)
    }

    async fn stream(
        &self,
        request: GenerationRequest,
        next: Arc<dyn LanguageModel>,
    ) -> Result<BoxChunkStream, GenerationError> {
        let mut inner = next.do_stream(request).await?;
        let extractor = self.clone();

        Ok(async_stream::stream! {
            let mut text = String::new();
            while let Some(chunk) = inner.next().await {
                match chunk {
                    StreamChunk::TextDelta { text: delta } => {
                        text.push_str(&delta);
                        yield StreamChunk::TextDelta { text: delta };
                    }
                    StreamChunk::Finish(mut finish) => {
                        finish.reasoning = extractor.split(&text);
                        yield StreamChunk::Finish(finish);
                        break;
                    }
                    other => {
                        let terminal = other.is_terminal();
                        yield other;
                        if terminal {
                            break;
                        }
                    }
                }
            }
        }
        .boxed())
    }
}
