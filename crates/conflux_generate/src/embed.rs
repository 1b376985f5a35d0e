//! Embedding orchestrators.

use crate::error::EmbedError;
use crate::options::EmbedOptions;
use conflux_models::llm::{Capability, Embedding, EmbeddingUsage, LanguageModel, ensure_capability};

/// Outcome of [`embed`].
#[derive(Debug, Clone, PartialEq)]
pub struct EmbedResult {
    /// The embedded value.
    pub value: String,
    /// Its vector.
    pub embedding: Embedding,
    /// Token usage, if the provider reports it.
    pub usage: Option<EmbeddingUsage>,
}

/// Outcome of [`embed_many`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EmbedManyResult {
    /// The embedded values.
    pub values: Vec<String>,
    /// One vector per value, in the same order.
    pub embeddings: Vec<Embedding>,
    /// Token usage, if the provider reports it.
    pub usage: Option<EmbeddingUsage>,
}

/// Embeds a single value.
///
/// # Errors
///
/// - [`EmbedError::NoEmbeddingsReturned`] if the model returns no vector.
/// - Otherwise as [`embed_many`].
pub async fn embed(
    model: &dyn LanguageModel,
    value: impl Into<String>,
    options: EmbedOptions,
) -> Result<EmbedResult, EmbedError> {
    let result = embed_many(model, vec![value.into()], options).await?;
    let usage = result.usage;
    let (Some(value), Some(embedding)) = (
        result.values.into_iter().next(),
        result.embeddings.into_iter().next(),
    ) else {
        return Err(EmbedError::NoEmbeddingsReturned);
    };
    Ok(EmbedResult {
        value,
        embedding,
        usage,
    })
}

/// Embeds a batch of values in one model call.
///
/// An empty batch returns an empty result without calling the model.
///
/// # Errors
///
/// - [`EmbedError::EmbeddingGenerationFailed`] if the model lacks
///   [`Capability::Embedding`] or the call fails.
/// - [`EmbedError::NoEmbeddingsReturned`] if the model returns no vectors.
/// - [`EmbedError::EmbeddingCountMismatch`] if it returns a different number
///   of vectors than values.
/// - [`EmbedError::Cancelled`] once the options' token fires.
pub async fn embed_many(
    model: &dyn LanguageModel,
    values: Vec<String>,
    options: EmbedOptions,
) -> Result<EmbedManyResult, EmbedError> {
    if values.is_empty() {
        return Ok(EmbedManyResult::default());
    }
    ensure_capability(model, Capability::Embedding)?;

    tracing::debug!(model = model.model_id(), count = values.len(), "embedding");
    let cancellation = options.cancellation;
    let response = tokio::select! {
        biased;
        () = cancellation.cancelled() => return Err(EmbedError::Cancelled),
        response = model.do_embed(values.clone(), cancellation.clone()) => response?,
    };

    if response.embeddings.is_empty() {
        return Err(EmbedError::NoEmbeddingsReturned);
    }
    if response.embeddings.len() != values.len() {
        return Err(EmbedError::EmbeddingCountMismatch {
            expected: values.len(),
            actual: response.embeddings.len(),
        });
    }
    Ok(EmbedManyResult {
        values,
        embeddings: response.embeddings,
        usage: response.usage,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use conflux_models::testing::{ScriptedModel, StaticEmbeddingModel};
    use tokio_util::sync::CancellationToken;

    #[tokio::test]
    async fn batch_keeps_input_order() {
        let model = StaticEmbeddingModel::new();
        let values = vec!["a".to_string(), "bbb".to_string(), "cc".to_string()];

        let result = embed_many(&model, values.clone(), EmbedOptions::new())
            .await
            .unwrap();

        assert_eq!(result.values, values);
        assert_eq!(
            result.embeddings,
            vec![vec![1.0, 0.0], vec![3.0, 1.0], vec![2.0, 2.0]]
        );
        assert_eq!(result.usage, Some(EmbeddingUsage { tokens: 6 }));
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn single_value_unwraps() {
        let model = StaticEmbeddingModel::new();
        let result = embed(&model, "hello", EmbedOptions::new()).await.unwrap();
        assert_eq!(result.value, "hello");
        assert_eq!(result.embedding, vec![5.0, 0.0]);
        assert_eq!(model.batches(), vec![vec!["hello".to_string()]]);
    }

    #[tokio::test]
    async fn count_mismatch_is_reported() {
        let model = StaticEmbeddingModel::returning(vec![vec![0.5]]);
        let err = embed_many(&model, vec!["a".into(), "b".into()], EmbedOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EmbedError::EmbeddingCountMismatch {
                expected: 2,
                actual: 1
            }
        ));
    }

    #[tokio::test]
    async fn models_without_embedding_fail() {
        let model = ScriptedModel::new("chat");
        let err = embed(&model, "x", EmbedOptions::new()).await.unwrap_err();
        assert!(matches!(err, EmbedError::EmbeddingGenerationFailed(_)));
    }

    #[tokio::test]
    async fn cancelled_before_call() {
        let model = StaticEmbeddingModel::new();
        let token = CancellationToken::new();
        token.cancel();

        let err = embed(&model, "x", EmbedOptions::new().with_cancellation(token))
            .await
            .unwrap_err();

        assert!(matches!(err, EmbedError::Cancelled));
        assert_eq!(model.calls(), 0);
    }
}
