//! End-to-end tests: registry lookup, middleware stacks and orchestrators.

use conflux_generate::{
    EmbedError, EmbedOptions, GenerateError, GenerateOptions, ObjectChunk, embed, embed_many,
    generate_object, generate_text, stream_object, stream_text,
};
use conflux_models::clock::Clock;
use conflux_models::llm::{
    CallSettings, Capability, FinishReason, GenerationResponse, LanguageModel, Message, Usage,
};
use conflux_models::middleware::{DefaultSettings, ExtractReasoning, Middleware, SimulateStreaming};
use conflux_models::registry::StaticProvider;
use conflux_models::stream::StreamChunk;
use conflux_models::testing::{MockClock, ScriptedModel, StaticEmbeddingModel};
use conflux_models::{ModelRegistry, RegistryError, wrap_model};
use futures::StreamExt;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};

fn texts(chunks: &[StreamChunk]) -> String {
    chunks
        .iter()
        .filter_map(|chunk| match chunk {
            StreamChunk::TextDelta { text } => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

// ─────────────────────────────────────────────────────────────────────
// 1. Registry
// ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn registry_serves_models_to_orchestrators() {
    let chat = Arc::new(ScriptedModel::new("chat").with_text("hi there"));
    let registry = ModelRegistry::new()
        .with_provider(
            "local",
            Arc::new(
                StaticProvider::new()
                    .with_model(chat.clone())
                    .with_model(Arc::new(StaticEmbeddingModel::new())),
            ),
        )
        .unwrap();

    let descriptor = registry.model_by_id("local/chat").unwrap();
    assert!(descriptor.supports(Capability::Streaming));
    assert!(!descriptor.supports(Capability::Embedding));

    let result = generate_text(
        &descriptor,
        vec![Message::user("hello")],
        GenerateOptions::new(),
    )
    .await
    .unwrap();
    assert_eq!(result.text, "hi there");
    assert_eq!(chat.generate_calls(), 1);

    let embedder = registry.model("local", "static-embedding").unwrap();
    let embedded = embed(&embedder, "abc", EmbedOptions::new())
        .await
        .unwrap();
    assert_eq!(embedded.embedding, vec![3.0, 0.0]);

    assert!(matches!(
        registry.model_by_id("remote/chat"),
        Err(RegistryError::ProviderNotFound(name)) if name == "remote"
    ));
    assert!(matches!(
        registry.model_by_id("local/missing"),
        Err(RegistryError::ModelNotAvailable { .. })
    ));
}

// ─────────────────────────────────────────────────────────────────────
// 2. Middleware stacks
// ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn simulated_stream_matches_generate() {
    let text = "Streaming is simulated from one complete response.";
    let base: Arc<dyn LanguageModel> = Arc::new(
        ScriptedModel::new("plain")
            .with_capabilities(conflux_models::llm::CapabilitySet::TEXT)
            .with_response(GenerationResponse::text_response(text, Usage::new(6, 8))),
    );
    let clock = Arc::new(MockClock::new(Instant::now()));
    let layers: Vec<Arc<dyn Middleware>> = vec![Arc::new(
        SimulateStreaming::new()
            .with_delay(Duration::from_millis(5))
            .with_clock(Clock::with_provider(clock.clone())),
    )];
    let model = wrap_model(base, layers);
    assert!(model.capabilities().supports(Capability::Streaming));

    let generated = generate_text(model.as_ref(), vec![Message::user("q")], GenerateOptions::new())
        .await
        .unwrap();
    let chunks: Vec<_> = stream_text(model, vec![Message::user("q")], GenerateOptions::new())
        .unwrap()
        .collect()
        .await;

    assert_eq!(texts(&chunks), generated.text);
    assert!(chunks.len() > 2);
    assert_eq!(
        chunks.last(),
        Some(&StreamChunk::finish(FinishReason::Stop, Usage::new(6, 8)))
    );
    assert!(clock.total_slept() > Duration::ZERO);
}

#[tokio::test]
async fn stacked_middleware_applies_defaults_and_extracts_reasoning() {
    let base = Arc::new(ScriptedModel::new("thinker").with_text("<think>2+2</think>It is 4."));
    let layers: Vec<Arc<dyn Middleware>> = vec![
        Arc::new(DefaultSettings::new(CallSettings::new().with_temperature(0.1))),
        Arc::new(ExtractReasoning::new("think")),
    ];
    let model = wrap_model(base.clone(), layers);

    let result = generate_text(model.as_ref(), vec![Message::user("sum?")], GenerateOptions::new())
        .await
        .unwrap();

    let reasoning = result.reasoning.unwrap();
    assert_eq!(reasoning.reasoning, "2+2");
    assert_eq!(reasoning.answer, "It is 4.");
    assert_eq!(base.requests()[0].settings.temperature, Some(0.1));
}

// ─────────────────────────────────────────────────────────────────────
// 3. Structured output
// ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn object_schema_failure_keeps_raw_payload() {
    let model = ScriptedModel::new("m").with_text(r#"{"x":"not-a-number"}"#);
    let schema = json!({
        "type": "object",
        "properties": { "x": { "type": "number" } },
        "required": ["x"]
    });

    let err = generate_object(&model, vec![Message::user("q")], schema, GenerateOptions::new())
        .await
        .unwrap_err();

    assert!(
        matches!(&err, GenerateError::SchemaValidation { raw, .. } if raw == r#"{"x":"not-a-number"}"#),
        "unexpected error: {err:?}"
    );
}

#[tokio::test]
async fn object_stream_over_simulated_streaming() {
    let base: Arc<dyn LanguageModel> = Arc::new(
        ScriptedModel::new("plain")
            .with_capabilities(conflux_models::llm::CapabilitySet::TEXT)
            .with_text(r#"{"city": "Oslo", "temps": [3, 5, 4]}"#),
    );
    let model = wrap_model(base, [Arc::new(SimulateStreaming::new()) as Arc<dyn Middleware>]);
    let schema = json!({
        "type": "object",
        "properties": {
            "city": { "type": "string" },
            "temps": { "type": "array", "items": { "type": "integer" } }
        },
        "required": ["city", "temps"]
    });

    let chunks: Vec<_> = stream_object(model, vec![], schema, GenerateOptions::new())
        .unwrap()
        .collect()
        .await;

    let partials: Vec<_> = chunks
        .iter()
        .filter(|chunk| matches!(chunk, ObjectChunk::Partial(_)))
        .collect();
    assert!(partials.len() > 1);
    for pair in partials.windows(2) {
        assert_ne!(pair[0], pair[1]);
    }
    assert_eq!(
        chunks.last(),
        Some(&ObjectChunk::Finish {
            object: json!({ "city": "Oslo", "temps": [3, 5, 4] }),
            usage: Usage::default(),
            finish_reason: FinishReason::Stop,
        })
    );
}

// ─────────────────────────────────────────────────────────────────────
// 4. Embeddings
// ─────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn empty_batch_never_reaches_the_model() {
    let model = StaticEmbeddingModel::new();
    let result = embed_many(&model, Vec::new(), EmbedOptions::new())
        .await
        .unwrap();
    assert!(result.embeddings.is_empty());
    assert_eq!(model.calls(), 0);
}

#[tokio::test]
async fn batch_length_and_order_match_input() {
    let model = StaticEmbeddingModel::new();
    let values: Vec<String> = ["one", "three", "fifteen", "x"]
        .into_iter()
        .map(String::from)
        .collect();

    let result = embed_many(&model, values.clone(), EmbedOptions::new())
        .await
        .unwrap();

    assert_eq!(result.embeddings.len(), values.len());
    for (index, (value, embedding)) in values.iter().zip(&result.embeddings).enumerate() {
        assert_eq!(embedding, &vec![value.len() as f32, index as f32]);
    }
}

#[tokio::test]
async fn empty_provider_answer_is_an_error() {
    let model = StaticEmbeddingModel::returning(vec![]);
    let err = embed(&model, "hello", EmbedOptions::new()).await.unwrap_err();
    assert!(matches!(err, EmbedError::NoEmbeddingsReturned));
    assert_eq!(model.calls(), 1);
}
