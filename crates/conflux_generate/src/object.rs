//! Structured object generation.
//!
//! The requested JSON Schema travels to the model as
//! [`GenerationRequest::output_schema`]. Models that do not advertise
//! [`Capability::ObjectGeneration`] additionally receive the schema as a
//! system-prompt instruction and their text output is parsed, after
//! unwrapping a fenced ```` ```json ```` block if present.
//!
//! Every returned object has been validated against the schema. Invalid
//! output fails with [`GenerateError::SchemaValidation`], carrying the raw
//! text.

use crate::error::GenerateError;
use crate::options::GenerateOptions;
use crate::partial_json::{deep_merge, parse_partial};
use conflux_models::llm::{
    Capability, FinishReason, GenerationRequest, LanguageModel, Message, Usage, ensure_capability,
};
use conflux_models::schema::validate;
use conflux_models::stream::{GenerationStream, StreamChunk};
use futures::StreamExt;
use futures::stream::BoxStream;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

/// Outcome of [`generate_object`] and [`generate_object_as`].
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateObjectResult<T = Value> {
    /// The validated object.
    pub object: T,
    /// The model output the object was parsed from.
    pub raw: String,
    /// Token usage.
    pub usage: Usage,
    /// Why the model stopped.
    pub finish_reason: FinishReason,
}

/// One item of an [`ObjectStream`].
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectChunk {
    /// The object as far as it has been received. Not validated.
    Partial(Value),
    /// The complete, validated object. Always the last chunk on success.
    Finish {
        /// The validated object.
        object: Value,
        /// Token usage.
        usage: Usage,
        /// Why the model stopped.
        finish_reason: FinishReason,
    },
    /// The stream failed. Always the last chunk on failure.
    Error {
        /// What went wrong.
        message: String,
        /// The model output received so far, for schema failures.
        raw: Option<String>,
    },
}

/// A stream of partial object snapshots ending in one terminal chunk.
pub type ObjectStream = BoxStream<'static, ObjectChunk>;

/// Generates a value conforming to `schema`.
///
/// Tools and [`max_steps`](GenerateOptions::max_steps) in `options` are
/// ignored.
///
/// # Errors
///
/// - [`GenerateError::NoContent`] if the model output is empty.
/// - [`GenerateError::SchemaValidation`] if the output is not JSON or does not
///   satisfy `schema`.
/// - [`GenerateError::Cancelled`] once the options' token fires.
/// - [`GenerateError::Generation`] if the model does not advertise
///   [`Capability::TextGeneration`] or the model call fails.
pub async fn generate_object(
    model: &dyn LanguageModel,
    messages: Vec<Message>,
    schema: Value,
    options: GenerateOptions,
) -> Result<GenerateObjectResult, GenerateError> {
    ensure_capability(model, Capability::TextGeneration)?;
    let request = object_request(model, &options, messages, &schema);
    let response = tokio::select! {
        biased;
        () = options.cancellation.cancelled() => return Err(GenerateError::Cancelled),
        response = model.do_generate(request) => response?,
    };

    let raw = response.text();
    let object = parse_and_validate(&schema, &raw)?;
    tracing::debug!(model = model.model_id(), "object generated");
    Ok(GenerateObjectResult {
        object,
        raw,
        usage: response.usage,
        finish_reason: response.finish_reason,
    })
}

/// Generates a `T`, deriving the schema from its [`JsonSchema`] impl.
///
/// # Errors
///
/// As [`generate_object`]. Output that validates but does not deserialize
/// into `T` is also reported as [`GenerateError::SchemaValidation`].
pub async fn generate_object_as<T>(
    model: &dyn LanguageModel,
    messages: Vec<Message>,
    options: GenerateOptions,
) -> Result<GenerateObjectResult<T>, GenerateError>
where
    T: JsonSchema + DeserializeOwned,
{
    let schema = serde_json::to_value(schemars::schema_for!(T)).map_err(|err| {
        GenerateError::SchemaValidation {
            raw: String::new(),
            errors: vec![format!("schema generation failed: {err}")],
        }
    })?;
    let result = generate_object(model, messages, schema, options).await?;

    let object = serde_json::from_value(result.object).map_err(|err| {
        GenerateError::SchemaValidation {
            raw: result.raw.clone(),
            errors: vec![err.to_string()],
        }
    })?;
    Ok(GenerateObjectResult {
        object,
        raw: result.raw,
        usage: result.usage,
        finish_reason: result.finish_reason,
    })
}

/// Streams snapshots of a value conforming to `schema`.
///
/// Each text delta is parsed as a JSON prefix and merged into the previous
/// snapshot with [`deep_merge`]; a [`ObjectChunk::Partial`] is emitted when
/// the snapshot changes. When the model finishes, the complete output is
/// validated and the stream ends with [`ObjectChunk::Finish`] or
/// [`ObjectChunk::Error`]. A cancelled stream ends without a terminal chunk.
///
/// # Errors
///
/// Fails immediately with [`GenerateError::Generation`] if the model does not
/// advertise [`Capability::Streaming`].
pub fn stream_object(
    model: Arc<dyn LanguageModel>,
    messages: Vec<Message>,
    schema: Value,
    options: GenerateOptions,
) -> Result<ObjectStream, GenerateError> {
    ensure_capability(model.as_ref(), Capability::Streaming)?;
    let request = object_request(model.as_ref(), &options, messages, &schema);
    let cancellation = options.cancellation;

    let chunks = async_stream::stream! {
        let opened = tokio::select! {
            biased;
            () = cancellation.cancelled() => return,
            opened = model.do_stream(request) => opened,
        };
        let mut upstream = match opened {
            Ok(upstream) => GenerationStream::new(upstream, cancellation.clone()),
            Err(err) => {
                yield ObjectChunk::Error { message: err.to_string(), raw: None };
                return;
            }
        };

        let mut raw = String::new();
        let mut snapshot: Option<Value> = None;
        while let Some(chunk) = upstream.next().await {
            match chunk {
                StreamChunk::TextDelta { text } => {
                    raw.push_str(&text);
                    let Some(parsed) = parse_partial(strip_fences(&raw)) else {
                        continue;
                    };
                    let merged = match &snapshot {
                        Some(previous) => deep_merge(previous.clone(), parsed),
                        None => parsed,
                    };
                    if snapshot.as_ref() == Some(&merged) {
                        continue;
                    }
                    snapshot = Some(merged.clone());
                    yield ObjectChunk::Partial(merged);
                }
                StreamChunk::ToolCallDelta(_) => {}
                StreamChunk::Finish(finish) => {
                    let terminal = match parse_and_validate(&schema, &raw) {
                        Ok(object) => ObjectChunk::Finish {
                            object,
                            usage: finish.usage,
                            finish_reason: finish.finish_reason,
                        },
                        Err(err) => {
                            tracing::debug!(error = %err, "streamed object rejected");
                            ObjectChunk::Error {
                                message: err.to_string(),
                                raw: Some(raw.clone()),
                            }
                        }
                    };
                    yield terminal;
                    return;
                }
                StreamChunk::Error { message } => {
                    yield ObjectChunk::Error { message, raw: None };
                    return;
                }
            }
        }
    };

    Ok(chunks.boxed())
}

fn object_request(
    model: &dyn LanguageModel,
    options: &GenerateOptions,
    messages: Vec<Message>,
    schema: &Value,
) -> GenerationRequest {
    let mut request = options.request(messages);
    request.tools = None;
    request.tool_choice = None;

    if !model.capabilities().supports(Capability::ObjectGeneration) {
        let instruction = format!(
            "Respond only with a JSON value that conforms to this JSON Schema:\n{schema}"
        );
        request.system = Some(match request.system.take() {
            Some(system) => format!("{system}\n\n{instruction}"),
            None => instruction,
        });
    }
    request.output_schema = Some(schema.clone());
    request
}

/// Returns the body of a fenced code block, or the trimmed text.
fn strip_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn parse_and_validate(schema: &Value, raw: &str) -> Result<Value, GenerateError> {
    let body = strip_fences(raw);
    if body.is_empty() {
        return Err(GenerateError::NoContent);
    }

    let object: Value =
        serde_json::from_str(body).map_err(|err| GenerateError::SchemaValidation {
            raw: raw.to_string(),
            errors: vec![format!("output is not valid JSON: {err}")],
        })?;
    validate(schema, &object).map_err(|errors| GenerateError::SchemaValidation {
        raw: raw.to_string(),
        errors,
    })?;
    Ok(object)
}

#[cfg(test)]
mod tests {
    use super::*;
    use conflux_models::llm::{CapabilitySet, GenerationError, GenerationResponse};
    use conflux_models::testing::ScriptedModel;
    use serde::Deserialize;
    use serde_json::json;

    fn point_schema() -> Value {
        json!({
            "type": "object",
            "properties": { "x": { "type": "number" } },
            "required": ["x"]
        })
    }

    #[test]
    fn fences_are_unwrapped() {
        assert_eq!(strip_fences("```json\n{\"x\": 1}\n```"), "{\"x\": 1}");
        assert_eq!(strip_fences("```\n[1]\n```"), "[1]");
        assert_eq!(strip_fences("  {\"x\": 1} "), "{\"x\": 1}");
    }

    #[tokio::test]
    async fn valid_output_is_returned() {
        let model = ScriptedModel::new("m").with_response(GenerationResponse::text_response(
            "```json\n{\"x\": 2.5}\n```",
            Usage::new(7, 4),
        ));

        let result = generate_object(
            &model,
            vec![Message::user("a point")],
            point_schema(),
            GenerateOptions::new(),
        )
        .await
        .unwrap();

        assert_eq!(result.object, json!({ "x": 2.5 }));
        assert_eq!(result.usage, Usage::new(7, 4));
        assert_eq!(result.finish_reason, FinishReason::Stop);
    }

    #[tokio::test]
    async fn schema_violation_carries_raw_output() {
        let model = ScriptedModel::new("m").with_text(r#"{"x": "not-a-number"}"#);

        let err = generate_object(
            &model,
            vec![Message::user("a point")],
            point_schema(),
            GenerateOptions::new(),
        )
        .await
        .unwrap_err();

        let GenerateError::SchemaValidation { raw, errors } = err else {
            panic!("expected a schema validation error, got {err:?}");
        };
        assert!(raw.contains(r#""x": "not-a-number""#));
        assert_eq!(errors.len(), 1);
    }

    #[tokio::test]
    async fn malformed_and_empty_output_fail() {
        let model = ScriptedModel::new("m").with_text("{\"x\": ").with_text("  ");

        let malformed = generate_object(&model, vec![], point_schema(), GenerateOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(malformed, GenerateError::SchemaValidation { .. }));

        let empty = generate_object(&model, vec![], point_schema(), GenerateOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(empty, GenerateError::NoContent));
    }

    #[tokio::test]
    async fn schema_instruction_only_without_native_support() {
        let fallback = ScriptedModel::new("plain").with_text(r#"{"x": 1}"#);
        let native = ScriptedModel::new("native")
            .with_capabilities(CapabilitySet::CHAT.with(Capability::ObjectGeneration))
            .with_text(r#"{"x": 1}"#);
        let options = GenerateOptions::new().with_system("Be exact.");

        generate_object(&fallback, vec![], point_schema(), options.clone())
            .await
            .unwrap();
        generate_object(&native, vec![], point_schema(), options)
            .await
            .unwrap();

        let fallback_request = &fallback.requests()[0];
        let system = fallback_request.system.as_deref().unwrap();
        assert!(system.starts_with("Be exact.\n\n"));
        assert!(system.contains("\"required\":[\"x\"]"));
        assert_eq!(fallback_request.output_schema, Some(point_schema()));

        let native_request = &native.requests()[0];
        assert_eq!(native_request.system.as_deref(), Some("Be exact."));
        assert_eq!(native_request.output_schema, Some(point_schema()));
    }

    #[tokio::test]
    async fn models_without_text_generation_are_rejected() {
        let model = ScriptedModel::new("emb")
            .with_capabilities(CapabilitySet::EMBEDDING)
            .with_text(r#"{"x": 1}"#);

        let err = generate_object(&model, vec![], point_schema(), GenerateOptions::new())
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

    #[derive(Debug, Deserialize, JsonSchema, PartialEq)]
    struct Contact {
        name: String,
        age: u32,
    }

    #[tokio::test]
    async fn typed_generation_deserializes() {
        let model = ScriptedModel::new("m").with_text(r#"{"name": "Ada", "age": 36}"#);

        let result = generate_object_as::<Contact>(&model, vec![], GenerateOptions::new())
            .await
            .unwrap();

        assert_eq!(
            result.object,
            Contact {
                name: "Ada".into(),
                age: 36
            }
        );
        let schema = model.requests()[0].output_schema.clone().unwrap();
        assert_eq!(schema["properties"]["age"]["type"], "integer");
    }

    #[tokio::test]
    async fn stream_emits_growing_snapshots_then_validated_object() {
        let model = Arc::new(ScriptedModel::new("m").with_stream(vec![
            StreamChunk::text(r#"{"name": "Ad"#),
            StreamChunk::text(r#"a", "tags": ["x""#),
            StreamChunk::text(r#", "y"]}"#),
            StreamChunk::finish(FinishReason::Stop, Usage::new(3, 9)),
        ]));
        let schema = json!({
            "type": "object",
            "properties": {
                "name": { "type": "string" },
                "tags": { "type": "array", "items": { "type": "string" } }
            },
            "required": ["name", "tags"]
        });

        let chunks: Vec<_> = stream_object(model, vec![], schema, GenerateOptions::new())
            .unwrap()
            .collect()
            .await;

        assert_eq!(
            chunks,
            vec![
                ObjectChunk::Partial(json!({ "name": "Ad" })),
                ObjectChunk::Partial(json!({ "name": "Ada", "tags": ["x"] })),
                ObjectChunk::Partial(json!({ "name": "Ada", "tags": ["x", "y"] })),
                ObjectChunk::Finish {
                    object: json!({ "name": "Ada", "tags": ["x", "y"] }),
                    usage: Usage::new(3, 9),
                    finish_reason: FinishReason::Stop,
                },
            ]
        );
    }

    #[tokio::test]
    async fn stream_ends_with_error_on_invalid_object() {
        let model = Arc::new(ScriptedModel::new("m").with_stream(vec![
            StreamChunk::text(r#"{"x": "#),
            StreamChunk::text(r#""nope"}"#),
            StreamChunk::finish(FinishReason::Stop, Usage::default()),
        ]));

        let chunks: Vec<_> = stream_object(model, vec![], point_schema(), GenerateOptions::new())
            .unwrap()
            .collect()
            .await;

        assert!(chunks.contains(&ObjectChunk::Partial(json!({ "x": "nope" }))));
        let Some(ObjectChunk::Error { raw, .. }) = chunks.last() else {
            panic!("expected a terminal error, got {chunks:?}");
        };
        assert_eq!(raw.as_deref(), Some(r#"{"x": "nope"}"#));
    }
}
