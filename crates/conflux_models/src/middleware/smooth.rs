use super::Middleware;
use crate::clock::Clock;
use crate::llm::{GenerationError, GenerationRequest, LanguageModel};
use crate::stream::{BoxChunkStream, StreamChunk};
use async_trait::async_trait;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;

/// Where [`SmoothStreaming`] may cut buffered text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SmoothBoundary {
    /// After a word and its trailing whitespace.
    #[default]
    Word,
    /// After a run of newlines.
    Line,
    /// After sentence punctuation followed by whitespace.
    Sentence,
}

impl SmoothBoundary {
    /// Byte offset just past the first complete segment of `buffer`.
    #[must_use]
    pub fn find(self, buffer: &str) -> Option<usize> {
        match self {
            Self::Word => {
                let word = buffer.find(|c: char| !c.is_whitespace())?;
                let gap = word + buffer[word..].find(char::is_whitespace)?;
                Some(skip_while(buffer, gap, char::is_whitespace))
            }
            Self::Line => {
                let newline = buffer.find('\n')?;
                Some(skip_while(buffer, newline, |c| c == '\n'))
            }
            Self::Sentence => {
                let mut chars = buffer.char_indices().peekable();
                while let Some((_, ch)) = chars.next() {
                    if matches!(ch, '.' | '!' | '?')
                        && let Some(&(next, after)) = chars.peek()
                        && after.is_whitespace()
                    {
                        return Some(skip_while(buffer, next, char::is_whitespace));
                    }
                }
                None
            }
        }
    }
}

fn skip_while(buffer: &str, from: usize, predicate: impl Fn(char) -> bool) -> usize {
    buffer[from..]
        .find(|c: char| !predicate(c))
        .map_or(buffer.len(), |offset| from + offset)
}

/// Re-chunks streamed text along word, line or sentence boundaries.
///
/// Text deltas are buffered and released one complete segment at a time, with
/// `delay` after each release. Any non-text chunk first flushes the buffer,
/// so ordering relative to tool calls and the terminal chunk is preserved.
/// Concatenated text is unchanged; only chunk boundaries move.
///
/// The layer beneath must stream. Generation passes through untouched.
#[derive(Debug, Clone)]
pub struct SmoothStreaming {
    boundary: SmoothBoundary,
    delay: Duration,
    clock: Clock,
}

impl SmoothStreaming {
    /// Smooths along `boundary` with no delay.
    #[must_use]
    pub fn new(boundary: SmoothBoundary) -> Self {
        Self {
            boundary,
            delay: Duration::ZERO,
            clock: Clock::system(),
        }
    }

    /// Sets the pause after each released segment.
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
impl Middleware for SmoothStreaming {
    fn name(&self) -> &'static str {
        "smooth-streaming"
    }

    async fn stream(
        &self,
        request: GenerationRequest,
        next: Arc<dyn LanguageModel>,
    ) -> Result<BoxChunkStream, GenerationError> {
        let mut inner = next.do_stream(request).await?;
        let boundary = self.boundary;
        let delay = self.delay;
        let clock = self.clock.clone();

        Ok(async_stream::stream! {
            let mut buffer = String::new();
            while let Some(chunk) = inner.next().await {
                if let StreamChunk::TextDelta { text } = chunk {
                    buffer.push_str(&text);
                    while let Some(end) = boundary.find(&buffer) {
                        let segment: String = buffer.drain(..end).collect();
                        yield StreamChunk::text(segment);
                        clock.sleep(delay).await;
                    }
                    continue;
                }

                if !buffer.is_empty() {
                    yield StreamChunk::text(std::mem::take(&mut buffer));
                }
                let terminal = chunk.is_terminal();
                yield chunk;
                if terminal {
                    return;
                }
            }
            // upstream ended without a terminal chunk
            if !buffer.is_empty() {
                yield StreamChunk::text(buffer);
            }
        }
        .boxed())
    }
}
