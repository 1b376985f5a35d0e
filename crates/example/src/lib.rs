//! In-process models and wiring for the conflux demo.
//!
//! Nothing here talks to a network: [`AssistantModel`] is a rule-based chat
//! model that calls the `forecast` tool when asked about a known city, and
//! [`HashEmbedder`] produces deterministic character-histogram vectors. Both
//! are served by a registry built with [`build_registry`], the chat model
//! behind a middleware stack:
//!
//! ```text
//! DefaultSettings ─▶ ExtractReasoning("think") ─▶ SimulateStreaming ─▶ AssistantModel
//! ```

pub mod tools;

use async_trait::async_trait;
use conflux_core::{ConfigError, RuntimeConfig};
use conflux_generate::{EmbedError, GenerateError};
use conflux_models::llm::{
    CallSettings, Capability, CapabilitySet, ContentPart, Embedding, EmbeddingResponse,
    EmbeddingUsage, FinishReason, GenerationError, GenerationRequest, GenerationResponse,
    LanguageModel, Message, Role, ToolCall, Usage,
};
use conflux_models::middleware::{DefaultSettings, ExtractReasoning, Middleware, SimulateStreaming};
use conflux_models::registry::StaticProvider;
use conflux_models::{ModelRegistry, RegistryError, wrap_model};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Provider name the demo models are registered under.
pub const PROVIDER: &str = "local";
/// Chat model id.
pub const CHAT_MODEL: &str = "assistant";
/// Embedding model id.
pub const EMBEDDING_MODEL: &str = "hash-embedder";

/// Anything that can stop the demo.
#[derive(Debug, thiserror::Error)]
pub enum DemoError {
    /// Invalid environment configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// Model lookup failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// A generation failed.
    #[error(transparent)]
    Generate(#[from] GenerateError),
    /// An embedding call failed.
    #[error(transparent)]
    Embed(#[from] EmbedError),
    /// A stream ended with an error chunk.
    #[error("stream failed: {0}")]
    Stream(String),
    /// Writing to the terminal failed.
    #[error("output failed: {0}")]
    Io(#[from] std::io::Error),
}

/// A trip plan, requested as a structured object.
#[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
pub struct TripPlan {
    /// Destination city.
    pub city: String,
    /// Length of the stay in days.
    pub days: u32,
    /// What to pack.
    pub packing: Vec<String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// AssistantModel
// ─────────────────────────────────────────────────────────────────────────────

/// Rule-based chat model.
///
/// - After a tool result, it summarizes the tool output.
/// - When tools are offered and the last user message names a known city, it
///   calls `forecast` for that city.
/// - When an output schema is requested, it answers with a [`TripPlan`].
/// - Otherwise it echoes the user.
///
/// Every text answer starts with a `<think>` block.
#[derive(Debug, Default)]
pub struct AssistantModel;

impl AssistantModel {
    fn last_user_text(request: &GenerationRequest) -> String {
        request
            .messages
            .iter()
            .rev()
            .find(|message| message.role == Role::User)
            .map(Message::text)
            .unwrap_or_default()
    }

    fn mentioned_city(text: &str) -> Option<&'static str> {
        let lowered = text.to_lowercase();
        tools::known_cities().find(|city| lowered.contains(&city.to_lowercase()))
    }

    fn summarize_tool_results(message: &Message) -> String {
        let lines: Vec<String> = message
            .content
            .iter()
            .filter_map(|part| match part {
                ContentPart::ToolResult(result) if result.is_error() => {
                    Some(format!("The {} tool failed: {}", result.name, result.output))
                }
                ContentPart::ToolResult(result) => Some(format!(
                    "It is {}°C with {} in {}.",
                    result.output["celsius"],
                    result.output["conditions"].as_str().unwrap_or("unknown skies"),
                    result.output["city"].as_str().unwrap_or("that city"),
                )),
                _ => None,
            })
            .collect();
        format!(
            "<think>The tools answered, so I can reply.</think>{}",
            lines.join(" ")
        )
    }

    fn usage_for(request: &GenerationRequest, output: &str) -> Usage {
        let input: usize = request.messages.iter().map(|m| m.text().len()).sum();
        Usage::new(estimate_tokens(input), estimate_tokens(output.len()))
    }
}

/// Rough token estimate: one token per four bytes.
fn estimate_tokens(bytes: usize) -> u64 {
    u64::try_from(bytes.div_ceil(4)).unwrap_or(u64::MAX)
}

#[async_trait]
impl LanguageModel for AssistantModel {
    fn provider(&self) -> &str {
        PROVIDER
    }

    fn model_id(&self) -> &str {
        CHAT_MODEL
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::TEXT.with(Capability::ObjectGeneration)
    }

    async fn do_generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, GenerationError> {
        if request.cancellation.is_cancelled() {
            return Err(GenerationError::Cancelled);
        }

        if request.output_schema.is_some() {
            let city = Self::mentioned_city(&Self::last_user_text(&request)).unwrap_or("Lisbon");
            let plan = json!({ "city": city, "days": 3, "packing": ["umbrella", "walking shoes"] });
            let text = plan.to_string();
            let usage = Self::usage_for(&request, &text);
            return Ok(GenerationResponse::text_response(text, usage));
        }

        if let Some(last) = request.messages.last()
            && last.role == Role::Tool
        {
            let text = Self::summarize_tool_results(last);
            let usage = Self::usage_for(&request, &text);
            return Ok(GenerationResponse::text_response(text, usage));
        }

        let user = Self::last_user_text(&request);
        let offers_forecast = request
            .tools
            .as_ref()
            .is_some_and(|tools| tools.iter().any(|tool| tool.name == "forecast"));
        if offers_forecast && let Some(city) = Self::mentioned_city(&user) {
            let call = ToolCall::new("call_forecast", "forecast", json!({ "city": city }));
            return Ok(GenerationResponse {
                content: vec![ContentPart::ToolCall(call)],
                usage: Self::usage_for(&request, city),
                finish_reason: FinishReason::ToolCalls,
                reasoning: None,
            });
        }

        let text = format!("<think>Nothing to look up.</think>You said: {user}");
        let usage = Self::usage_for(&request, &text);
        Ok(GenerationResponse::text_response(text, usage))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HashEmbedder
// ─────────────────────────────────────────────────────────────────────────────

/// Embeds text as a normalized histogram of its lowercase letters, bucketed
/// into `dimensions` slots.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimensions: usize,
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self { dimensions: 16 }
    }
}

impl HashEmbedder {
    /// Creates an embedder producing vectors of `dimensions` entries.
    #[must_use]
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    fn embed_one(&self, value: &str) -> Embedding {
        let mut vector = vec![0.0_f32; self.dimensions];
        for ch in value.chars().filter(|ch| ch.is_alphanumeric()) {
            let bucket = ch.to_lowercase().map(u32::from).sum::<u32>() as usize % self.dimensions;
            vector[bucket] += 1.0;
        }
        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        vector
    }
}

#[async_trait]
impl LanguageModel for HashEmbedder {
    fn provider(&self) -> &str {
        PROVIDER
    }

    fn model_id(&self) -> &str {
        EMBEDDING_MODEL
    }

    fn capabilities(&self) -> CapabilitySet {
        CapabilitySet::EMBEDDING
    }

    async fn do_embed(
        &self,
        values: Vec<String>,
        cancellation: CancellationToken,
    ) -> Result<EmbeddingResponse, GenerationError> {
        if cancellation.is_cancelled() {
            return Err(GenerationError::Cancelled);
        }
        let tokens = values.iter().map(|value| estimate_tokens(value.len())).sum();
        Ok(EmbeddingResponse {
            embeddings: values.iter().map(|value| self.embed_one(value)).collect(),
            usage: Some(EmbeddingUsage { tokens }),
        })
    }
}

/// Cosine similarity of two vectors. Zero when either is all zeros.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Wiring
// ─────────────────────────────────────────────────────────────────────────────

/// The middleware stack applied to the chat model, outermost first.
#[must_use]
pub fn chat_middleware(config: &RuntimeConfig) -> Vec<Arc<dyn Middleware>> {
    let mut defaults = CallSettings::new().with_max_tokens(512);
    if let Some(temperature) = config.default_temperature {
        defaults = defaults.with_temperature(temperature);
    }
    vec![
        Arc::new(DefaultSettings::new(defaults)),
        Arc::new(ExtractReasoning::new("think")),
        Arc::new(SimulateStreaming::new().with_delay(config.stream_delay)),
    ]
}

/// Builds a registry serving the demo models under [`PROVIDER`].
///
/// # Errors
///
/// Returns [`RegistryError`] if registration fails.
pub fn build_registry(config: &RuntimeConfig) -> Result<ModelRegistry, RegistryError> {
    let chat = wrap_model(Arc::new(AssistantModel), chat_middleware(config));
    let provider = StaticProvider::new()
        .with_model(chat)
        .with_model(Arc::new(HashEmbedder::default()));
    ModelRegistry::new().with_provider(PROVIDER, Arc::new(provider))
}

#[cfg(test)]
mod tests {
    use super::*;
    use conflux_generate::{EmbedOptions, GenerateOptions, embed_many, generate_object_as, generate_text};

    fn registry() -> ModelRegistry {
        build_registry(&RuntimeConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn weather_question_runs_the_forecast_tool() {
        let chat = registry().model(PROVIDER, CHAT_MODEL).unwrap();
        let options = GenerateOptions::new()
            .with_tools(tools::demo_tools())
            .with_max_steps(3);

        let result = generate_text(
            &chat,
            vec![Message::user("What's the weather in Oslo?")],
            options,
        )
        .await
        .unwrap();

        assert_eq!(result.steps.len(), 2);
        assert_eq!(result.steps[0].tool_calls[0].name, "forecast");
        let split = result.reasoning.unwrap();
        assert_eq!(split.answer, "It is 4°C with light rain in Oslo.");
        assert!(result.text.starts_with("<think>"));
    }

    #[tokio::test]
    async fn trip_plan_is_a_valid_object() {
        let chat = registry().model_by_id("local/assistant").unwrap();
        let plan = generate_object_as::<TripPlan>(
            &chat,
            vec![Message::user("Plan three days in Nairobi")],
            GenerateOptions::new(),
        )
        .await
        .unwrap();
        assert_eq!(plan.object.city, "Nairobi");
        assert_eq!(plan.object.days, 3);
    }

    #[test]
    fn terminal_write_failures_are_reported() {
        let err = DemoError::from(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "stdout closed",
        ));
        assert!(matches!(err, DemoError::Io(_)));
        assert_eq!(err.to_string(), "output failed: stdout closed");
    }

    #[tokio::test]
    async fn similar_texts_rank_higher() {
        let embedder = registry().model(PROVIDER, EMBEDDING_MODEL).unwrap();
        let values = vec![
            "rain in oslo".to_string(),
            "oslo rain".to_string(),
            "zzz".to_string(),
        ];
        let result = embed_many(&embedder, values, EmbedOptions::new())
            .await
            .unwrap();

        let close = cosine_similarity(&result.embeddings[0], &result.embeddings[1]);
        let far = cosine_similarity(&result.embeddings[0], &result.embeddings[2]);
        assert!(close > far);
    }
}
