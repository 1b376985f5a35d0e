//! Streaming text generation.

use crate::error::GenerateError;
use crate::options::GenerateOptions;
use crate::tool_loop::{assistant_message, run_tool_calls};
use conflux_models::llm::{Capability, LanguageModel, Message, Usage, ensure_capability};
use conflux_models::stream::{GenerationStream, StreamChunk, StreamFinish, ToolCallAssembler};
use futures::StreamExt;
use std::sync::Arc;

/// Streams a generation as ordered chunks.
///
/// Text and tool-call deltas are forwarded as the model produces them. When
/// the model calls tools and [`max_steps`](GenerateOptions::max_steps) allows
/// a continuation, the tools run once the step finishes and the next step's
/// chunks follow on the same stream; intermediate `Finish` chunks are
/// withheld, and the single final `Finish` carries usage summed over all
/// steps. Any failure ends the stream with one `Error` chunk.
///
/// Cancelling the options' token settles the returned stream in
/// [`StreamState::Cancelled`](conflux_models::stream::StreamState::Cancelled)
/// and stops any further model call or tool execution.
///
/// # Errors
///
/// Fails immediately with [`GenerateError::Generation`] if the model does not
/// advertise [`Capability::Streaming`].
pub fn stream_text(
    model: Arc<dyn LanguageModel>,
    messages: Vec<Message>,
    options: GenerateOptions,
) -> Result<GenerationStream, GenerateError> {
    ensure_capability(model.as_ref(), Capability::Streaming)?;
    let cancellation = options.cancellation.clone();

    let chunks = async_stream::stream! {
        let step_limit = options.step_limit();
        let mut conversation = messages;
        let mut usage = Usage::default();
        let mut step = 0;

        loop {
            step += 1;
            tracing::debug!(model = model.model_id(), step, "streaming");
            let opened = tokio::select! {
                biased;
                () = options.cancellation.cancelled() => return,
                opened = model.do_stream(options.request(conversation.clone())) => opened,
            };
            let mut upstream = match opened {
                Ok(upstream) => upstream,
                Err(err) => {
                    yield StreamChunk::from(err);
                    return;
                }
            };

            let mut assembler = ToolCallAssembler::new();
            let mut text = String::new();
            let mut tool_calls = Vec::new();
            let mut finish: Option<StreamFinish> = None;

            while let Some(chunk) = upstream.next().await {
                match chunk {
                    StreamChunk::TextDelta { text: delta } => {
                        text.push_str(&delta);
                        yield StreamChunk::TextDelta { text: delta };
                    }
                    StreamChunk::ToolCallDelta(delta) => {
                        match assembler.push(&delta) {
                            Ok(Some(call)) => tool_calls.push(call),
                            Ok(None) => {}
                            Err(err) => {
                                yield StreamChunk::from(err);
                                return;
                            }
                        }
                        yield StreamChunk::ToolCallDelta(delta);
                    }
                    StreamChunk::Finish(step_finish) => {
                        finish = Some(step_finish);
                        break;
                    }
                    error @ StreamChunk::Error { .. } => {
                        yield error;
                        return;
                    }
                }
            }
            drop(upstream);

            let Some(step_finish) = finish else {
                yield StreamChunk::error("model stream ended without a terminal chunk");
                return;
            };
            usage = usage.add(step_finish.usage);

            if tool_calls.is_empty() || options.tools.is_empty() || step >= step_limit {
                yield StreamChunk::Finish(StreamFinish { usage, ..step_finish });
                return;
            }

            let results = match run_tool_calls(
                &options.tools,
                &tool_calls,
                options.forward_tool_errors,
                &options.cancellation,
            )
            .await
            {
                Ok(results) => results,
                Err(GenerateError::Cancelled) => return,
                Err(err) => {
                    yield StreamChunk::error(err.to_string());
                    return;
                }
            };
            conversation.push(assistant_message(&text, &tool_calls));
            conversation.push(Message::tool_results(results));
        }
    };

    Ok(GenerationStream::new(chunks.boxed(), cancellation))
}
