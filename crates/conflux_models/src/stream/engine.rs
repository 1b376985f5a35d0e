//! Pull-based stream engine with cancellation.

use super::{BoxChunkStream, StreamChunk, StreamFinish};
use crate::llm::GenerationError;
use core::pin::Pin;
use core::task::{Context, Poll};
use futures::stream::{FusedStream, Stream, StreamExt};
use std::future::Future;
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

/// Lifecycle of an in-flight streaming request.
///
/// ```text
/// Pending ──▶ Emitting ──▶ Finished
///    │           │    └──▶ Errored
///    └───────────┴───────▶ Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// No chunk delivered yet.
    Pending,
    /// At least one delta delivered, no terminal chunk yet.
    Emitting,
    /// A `Finish` chunk was delivered.
    Finished,
    /// An `Error` chunk was delivered.
    Errored,
    /// The caller cancelled before a terminal chunk.
    Cancelled,
}

impl StreamState {
    /// Returns whether no further chunks can be delivered.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Errored | Self::Cancelled)
    }
}

/// A chunk stream that enforces the streaming protocol for its consumer.
///
/// - Chunks are delivered in the order the model produced them.
/// - Exactly one terminal chunk is delivered, always last. A model stream that
///   ends without one yields a synthesized `Error` chunk.
/// - Once the cancellation token fires, no further chunk is delivered, the
///   upstream stream is dropped and the state becomes [`StreamState::Cancelled`].
///
/// Consumption is pull-based: the upstream stream is only polled when the
/// consumer asks for the next chunk, and at most one chunk is held at a time.
pub struct GenerationStream {
    inner: BoxChunkStream,
    state: StreamState,
    cancellation: CancellationToken,
    cancelled: Pin<Box<WaitForCancellationFutureOwned>>,
}

impl core::fmt::Debug for GenerationStream {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GenerationStream")
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl GenerationStream {
    /// Wraps a raw model stream.
    #[must_use]
    pub fn new(inner: BoxChunkStream, cancellation: CancellationToken) -> Self {
        let cancelled = Box::pin(cancellation.clone().cancelled_owned());
        Self {
            inner,
            state: StreamState::Pending,
            cancellation,
            cancelled,
        }
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Cancels the stream. No chunk is delivered after this call.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Returns the token controlling this stream.
    #[must_use]
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Drains the stream, concatenating text deltas.
    ///
    /// # Errors
    ///
    /// - [`GenerationError::Cancelled`] if the stream was cancelled.
    /// - [`GenerationError::Provider`] carrying the detail of an `Error` chunk.
    pub async fn into_text(mut self) -> Result<StreamedText, GenerationError> {
        let mut text = String::new();
        while let Some(chunk) = self.next().await {
            match chunk {
                StreamChunk::TextDelta { text: delta } => text.push_str(&delta),
                StreamChunk::ToolCallDelta(_) => {}
                StreamChunk::Finish(finish) => return Ok(StreamedText { text, finish }),
                StreamChunk::Error { message } => return Err(GenerationError::provider(message)),
            }
        }
        Err(GenerationError::Cancelled)
    }

    fn settle(&mut self, state: StreamState) {
        self.state = state;
        self.inner = futures::stream::empty().boxed();
    }
}

impl Stream for GenerationStream {
    type Item = StreamChunk;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;

        if this.state.is_terminal() {
            return Poll::Ready(None);
        }
        if this.cancellation.is_cancelled() || this.cancelled.as_mut().poll(cx).is_ready() {
            tracing::debug!("stream cancelled by caller");
            this.settle(StreamState::Cancelled);
            return Poll::Ready(None);
        }

        match this.inner.as_mut().poll_next(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(None) => {
                tracing::warn!("model stream ended without a terminal chunk");
                this.settle(StreamState::Errored);
                Poll::Ready(Some(StreamChunk::error(
                    "stream ended without a terminal chunk",
                )))
            }
            Poll::Ready(Some(chunk)) => {
                match &chunk {
                    StreamChunk::Finish(_) => this.settle(StreamState::Finished),
                    StreamChunk::Error { .. } => this.settle(StreamState::Errored),
                    StreamChunk::TextDelta { .. } | StreamChunk::ToolCallDelta(_) => {
                        this.state = StreamState::Emitting;
                    }
                }
                Poll::Ready(Some(chunk))
            }
        }
    }
}

impl FusedStream for GenerationStream {
    fn is_terminated(&self) -> bool {
        self.state.is_terminal()
    }
}

/// Text collected from a completed stream.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamedText {
    /// Concatenated text deltas.
    pub text: String,
    /// The terminal chunk's payload.
    pub finish: StreamFinish,
}
