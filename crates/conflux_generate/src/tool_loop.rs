//! Tool-call execution shared by the text orchestrators.

use crate::error::GenerateError;
use conflux_models::llm::{ContentPart, Message, ToolCall, ToolResult};
use conflux_tools::ToolSet;
use tokio_util::sync::CancellationToken;

/// Runs `calls` in order and returns one result per call.
///
/// Rejected calls (unknown tool, invalid arguments) always become error
/// results. Executor failures become error results when `forward_errors` is
/// set and fail the batch otherwise. No call starts after cancellation.
pub(crate) async fn run_tool_calls(
    tools: &ToolSet,
    calls: &[ToolCall],
    forward_errors: bool,
    cancellation: &CancellationToken,
) -> Result<Vec<ToolResult>, GenerateError> {
    let mut results = Vec::with_capacity(calls.len());
    for call in calls {
        let outcome = tokio::select! {
            biased;
            () = cancellation.cancelled() => return Err(GenerateError::Cancelled),
            outcome = tools.execute(call) => outcome,
        };

        match outcome {
            Ok(output) => results.push(ToolResult::success(call, output)),
            Err(err) if err.is_rejected_call() || forward_errors => {
                tracing::warn!(tool = %call.name, call_id = %call.id, error = %err, "tool call failed, reporting to model");
                results.push(ToolResult::error(call, err.to_string()));
            }
            Err(err) => {
                return Err(GenerateError::ToolExecution {
                    tool: call.name.clone(),
                    source: err,
                });
            }
        }
    }
    Ok(results)
}

/// The assistant message recording one step's text and tool calls.
pub(crate) fn assistant_message(text: &str, calls: &[ToolCall]) -> Message {
    let mut parts = Vec::with_capacity(calls.len() + 1);
    if !text.is_empty() {
        parts.push(ContentPart::Text(text.to_string()));
    }
    parts.extend(calls.iter().cloned().map(ContentPart::ToolCall));
    Message::assistant_parts(parts)
}
