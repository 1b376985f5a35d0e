//! Text generation with tool calling.

use crate::error::GenerateError;
use crate::options::GenerateOptions;
use crate::tool_loop::{assistant_message, run_tool_calls};
use conflux_models::llm::{
    Capability, FinishReason, GenerationResponse, LanguageModel, Message, ReasoningSplit,
    ToolCall, ToolResult, Usage, ensure_capability,
};

/// One model invocation within a [`generate_text`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    /// Text generated in this step.
    pub text: String,
    /// Tool calls the model requested in this step.
    pub tool_calls: Vec<ToolCall>,
    /// Results of executing those calls. Empty when no tool ran.
    pub tool_results: Vec<ToolResult>,
    /// Token usage of this step.
    pub usage: Usage,
    /// Why the model stopped in this step.
    pub finish_reason: FinishReason,
}

/// Outcome of [`generate_text`].
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateTextResult {
    /// Text of every step, concatenated in order.
    pub text: String,
    /// Tool calls of the final step.
    pub tool_calls: Vec<ToolCall>,
    /// Tool results of the final step.
    pub tool_results: Vec<ToolResult>,
    /// Usage summed over all steps.
    pub usage: Usage,
    /// Finish reason of the final step.
    pub finish_reason: FinishReason,
    /// Reasoning split of the final step, when a reasoning extractor ran.
    pub reasoning: Option<ReasoningSplit>,
    /// Every step, in order.
    pub steps: Vec<StepResult>,
    /// Messages produced during the call: assistant turns and tool results.
    /// Append them to the conversation to continue it.
    pub response_messages: Vec<Message>,
}

/// Generates text, executing tool calls and continuing until the model stops
/// calling tools or [`max_steps`](GenerateOptions::max_steps) is reached.
///
/// # Errors
///
/// - [`GenerateError::Cancelled`] once the options' token fires. No tool
///   execution or continuation starts afterwards.
/// - [`GenerateError::Generation`] if the model does not advertise
///   [`Capability::TextGeneration`] or a model call fails.
/// - [`GenerateError::ToolExecution`] if an executor fails and
///   [`forward_tool_errors`](GenerateOptions::forward_tool_errors) is off.
pub async fn generate_text(
    model: &dyn LanguageModel,
    messages: Vec<Message>,
    options: GenerateOptions,
) -> Result<GenerateTextResult, GenerateError> {
    ensure_capability(model, Capability::TextGeneration)?;
    let cancellation = options.cancellation.clone();
    let step_limit = options.step_limit();
    let mut conversation = messages;
    let mut response_messages = Vec::new();
    let mut steps: Vec<StepResult> = Vec::new();
    let mut usage = Usage::default();
    let mut full_text = String::new();

    loop {
        tracing::debug!(model = model.model_id(), step = steps.len() + 1, "generating");
        let request = options.request(conversation.clone());
        let response: GenerationResponse = tokio::select! {
            biased;
            () = cancellation.cancelled() => return Err(GenerateError::Cancelled),
            response = model.do_generate(request) => response?,
        };
        usage = usage.add(response.usage);

        let text = response.text();
        full_text.push_str(&text);
        let tool_calls: Vec<ToolCall> = response.tool_calls().into_iter().cloned().collect();
        let assistant = assistant_message(&text, &tool_calls);
        conversation.push(assistant.clone());
        response_messages.push(assistant);

        let tool_results = if tool_calls.is_empty() || options.tools.is_empty() {
            Vec::new()
        } else {
            run_tool_calls(
                &options.tools,
                &tool_calls,
                options.forward_tool_errors,
                &cancellation,
            )
            .await?
        };
        if !tool_results.is_empty() {
            let results = Message::tool_results(tool_results.clone());
            conversation.push(results.clone());
            response_messages.push(results);
        }

        steps.push(StepResult {
            text: text.clone(),
            tool_calls: tool_calls.clone(),
            tool_results: tool_results.clone(),
            usage: response.usage,
            finish_reason: response.finish_reason,
        });

        if tool_results.is_empty() || steps.len() >= step_limit {
            tracing::debug!(
                model = model.model_id(),
                steps = steps.len(),
                finish_reason = ?response.finish_reason,
                "generation finished"
            );
            return Ok(GenerateTextResult {
                text: full_text,
                tool_calls,
                tool_results,
                usage,
                finish_reason: response.finish_reason,
                reasoning: response.reasoning,
                steps,
                response_messages,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use conflux_models::llm::{
        CapabilitySet, ContentPart, GenerationError, GenerationRequest, ToolResultStatus,
    };
    use conflux_models::middleware::{Middleware, wrap_model};
    use conflux_models::testing::ScriptedModel;
    use conflux_tools::{FunctionMetadata, FunctionTool, ParameterInfo, ToolError, ToolSet};
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    fn calls_tool(calls: Vec<ToolCall>, usage: Usage) -> GenerationResponse {
        GenerationResponse {
            content: calls.into_iter().map(ContentPart::ToolCall).collect(),
            usage,
            finish_reason: FinishReason::ToolCalls,
            reasoning: None,
        }
    }

    fn weather_tools() -> ToolSet {
        ToolSet::new().with(FunctionTool::new(
            FunctionMetadata::new("weather").with_parameter(ParameterInfo::of::<String>("city")),
            |args| async move {
                let city: String = args.get("city")?;
                if city == "Atlantis" {
                    return Err(ToolError::execution("no station"));
                }
                Ok(json!({ "city": city, "sky": "clear" }))
            },
        ))
    }

    /// Cancels the token once the model has answered.
    struct CancelOnAnswer(CancellationToken);

    #[async_trait]
    impl Middleware for CancelOnAnswer {
        fn name(&self) -> &'static str {
            "cancel-on-answer"
        }

        async fn generate(
            &self,
            request: GenerationRequest,
            next: Arc<dyn LanguageModel>,
        ) -> Result<GenerationResponse, GenerationError> {
            let response = next.do_generate(request).await;
            self.0.cancel();
            response
        }
    }

    #[tokio::test]
    async fn plain_text_takes_one_step() {
        let model = ScriptedModel::new("m").with_response(GenerationResponse::text_response(
            "hello",
            Usage::new(3, 1),
        ));

        let result = generate_text(&model, vec![Message::user("hi")], GenerateOptions::new())
            .await
            .unwrap();

        assert_eq!(result.text, "hello");
        assert_eq!(result.steps.len(), 1);
        assert_eq!(result.usage, Usage::new(3, 1));
        assert_eq!(result.response_messages, vec![Message::assistant("hello")]);
    }

    #[tokio::test]
    async fn tool_results_feed_the_continuation() {
        let model = ScriptedModel::new("m")
            .with_response(calls_tool(
                vec![ToolCall::new("c1", "weather", json!({ "city": "Oslo" }))],
                Usage::new(10, 2),
            ))
            .with_response(GenerationResponse::text_response("Clear in Oslo.", Usage::new(20, 4)));
        let options = GenerateOptions::new()
            .with_tools(weather_tools())
            .with_max_steps(3);

        let result = generate_text(&model, vec![Message::user("weather?")], options)
            .await
            .unwrap();

        assert_eq!(result.text, "Clear in Oslo.");
        assert_eq!(result.steps.len(), 2);
        assert_eq!(result.steps[0].text, "");
        assert_eq!(result.usage, Usage::new(30, 6));
        assert_eq!(result.steps[0].tool_results[0].output["sky"], "clear");

        let second = &model.requests()[1];
        assert_eq!(second.messages.len(), 3);
        assert!(second.tools.as_ref().is_some_and(|tools| tools[0].name == "weather"));
        let ContentPart::ToolResult(result) = &second.messages[2].content[0] else {
            panic!("expected tool result");
        };
        assert_eq!(result.call_id, "c1");
    }

    #[tokio::test]
    async fn invalid_arguments_fail_the_call_not_the_request() {
        let model = ScriptedModel::new("m")
            .with_response(calls_tool(
                vec![ToolCall::new("c1", "weather", json!({ "city": 42 }))],
                Usage::default(),
            ))
            .with_text("sorry");
        let options = GenerateOptions::new()
            .with_tools(weather_tools())
            .with_max_steps(2)
            .forward_tool_errors(false);

        let result = generate_text(&model, vec![Message::user("q")], options)
            .await
            .unwrap();

        let forwarded = &result.steps[0].tool_results[0];
        assert_eq!(forwarded.status, ToolResultStatus::Error);
        assert!(forwarded.output["error"].as_str().unwrap().contains("invalid arguments"));
        assert_eq!(result.text, "sorry");
    }

    #[tokio::test]
    async fn executor_failure_is_forwarded_by_default() {
        let model = ScriptedModel::new("m")
            .with_response(calls_tool(
                vec![ToolCall::new("c1", "weather", json!({ "city": "Atlantis" }))],
                Usage::default(),
            ))
            .with_text("no data");
        let options = GenerateOptions::new()
            .with_tools(weather_tools())
            .with_max_steps(2);

        let result = generate_text(&model, vec![Message::user("q")], options)
            .await
            .unwrap();

        assert!(result.steps[0].tool_results[0].is_error());
        assert_eq!(result.text, "no data");
    }

    #[tokio::test]
    async fn executor_failure_is_fatal_without_forwarding() {
        let model = ScriptedModel::new("m").with_response(calls_tool(
            vec![ToolCall::new("c1", "weather", json!({ "city": "Atlantis" }))],
            Usage::default(),
        ));
        let options = GenerateOptions::new()
            .with_tools(weather_tools())
            .with_max_steps(2)
            .forward_tool_errors(false);

        let err = generate_text(&model, vec![Message::user("q")], options)
            .await
            .unwrap_err();

        assert!(matches!(err, GenerateError::ToolExecution { tool, .. } if tool == "weather"));
        assert_eq!(model.generate_calls(), 1);
    }

    #[tokio::test]
    async fn step_limit_stops_continuations() {
        let model = ScriptedModel::new("m").with_response(calls_tool(
            vec![ToolCall::new("c1", "weather", json!({ "city": "Oslo" }))],
            Usage::new(1, 1),
        ));
        let options = GenerateOptions::new()
            .with_tools(weather_tools())
            .with_max_steps(2);

        let result = generate_text(&model, vec![Message::user("q")], options)
            .await
            .unwrap();

        assert_eq!(model.generate_calls(), 2);
        assert_eq!(result.finish_reason, FinishReason::ToolCalls);
        assert_eq!(result.tool_results.len(), 1);
        assert_eq!(result.usage, Usage::new(2, 2));
    }

    #[tokio::test]
    async fn cancellation_interrupts_a_pending_call() {
        let token = CancellationToken::new();
        let model = ScriptedModel::new("m").with_pending();
        let canceller = {
            let token = token.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                token.cancel();
            })
        };

        let err = generate_text(
            &model,
            vec![Message::user("q")],
            GenerateOptions::new().with_cancellation(token),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, GenerateError::Cancelled));
        canceller.await.unwrap();
    }

    #[tokio::test]
    async fn text_spans_every_step() {
        let model = ScriptedModel::new("m")
            .with_response(GenerationResponse {
                content: vec![
                    ContentPart::Text("Checking. ".into()),
                    ContentPart::ToolCall(ToolCall::new("c1", "weather", json!({ "city": "Oslo" }))),
                ],
                usage: Usage::default(),
                finish_reason: FinishReason::ToolCalls,
                reasoning: None,
            })
            .with_text("Clear in Oslo.");
        let options = GenerateOptions::new()
            .with_tools(weather_tools())
            .with_max_steps(2);

        let result = generate_text(&model, vec![Message::user("weather?")], options)
            .await
            .unwrap();

        assert_eq!(result.text, "Checking. Clear in Oslo.");
        assert_eq!(result.steps[0].text, "Checking. ");
        assert_eq!(result.steps[1].text, "Clear in Oslo.");
    }

    #[tokio::test]
    async fn models_without_text_generation_are_rejected() {
        let model = ScriptedModel::new("emb")
            .with_capabilities(CapabilitySet::EMBEDDING)
            .with_text("hi");

        let err = generate_text(&model, vec![Message::user("q")], GenerateOptions::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            GenerateError::Generation(GenerationError::CapabilityUnsupported {
                capability: Capability::TextGeneration,
                ..
            })
        ));
        assert_eq!(model.generate_calls(), 0);
    }

    #[tokio::test]
    async fn cancellation_after_a_tool_step_runs_nothing_more() {
        let runs = Arc::new(AtomicUsize::new(0));
        let tools = ToolSet::new().with(FunctionTool::new(FunctionMetadata::new("echo"), {
            let runs = Arc::clone(&runs);
            move |args| {
                runs.fetch_add(1, Ordering::SeqCst);
                async move { Ok(args.into_value()) }
            }
        }));
        let token = CancellationToken::new();
        let base = Arc::new(
            ScriptedModel::new("m")
                .with_response(calls_tool(
                    vec![ToolCall::new("c1", "echo", json!({ "word": "ping" }))],
                    Usage::default(),
                ))
                .with_text("unreachable"),
        );
        let model = wrap_model(
            base.clone(),
            [Arc::new(CancelOnAnswer(token.clone())) as Arc<dyn Middleware>],
        );
        let options = GenerateOptions::new()
            .with_tools(tools)
            .with_max_steps(3)
            .with_cancellation(token);

        let err = generate_text(model.as_ref(), vec![Message::user("q")], options)
            .await
            .unwrap_err();

        assert!(matches!(err, GenerateError::Cancelled));
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert_eq!(base.generate_calls(), 1);
    }

    #[tokio::test]
    async fn model_failure_is_surfaced() {
        let model = ScriptedModel::new("m").with_error(GenerationError::provider("overloaded"));
        let err = generate_text(&model, vec![Message::user("q")], GenerateOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, GenerateError::Generation(_)));
    }
}
