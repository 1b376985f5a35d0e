//! The [`Tool`] trait and the closure-backed [`FunctionTool`].

use crate::error::ToolError;
use crate::param::ToolArguments;
use crate::schema::FunctionMetadata;
use conflux_models::llm::ToolDefinition;
use futures::future::BoxFuture;
use schemars::JsonSchema;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// A tool the model can call during generation.
///
/// Tools expose a [`ToolDefinition`] (name, description, JSON schema) for the
/// model and an async [`execute`](Tool::execute) method. Arguments reaching
/// `execute` through a [`ToolSet`](crate::ToolSet) have already been validated
/// against the definition's schema.
pub trait Tool: Send + Sync + 'static {
    /// Returns the model-facing tool definition with JSON schema.
    fn definition(&self) -> ToolDefinition;

    /// Executes the tool with JSON arguments.
    fn execute(
        &self,
        args: Value,
    ) -> Pin<Box<dyn Future<Output = Result<Value, ToolError>> + Send + '_>>;
}

type Handler = dyn Fn(ToolArguments) -> BoxFuture<'static, Result<Value, ToolError>> + Send + Sync;

/// A tool backed by an async closure.
///
/// ```
/// use conflux_tools::{FunctionMetadata, FunctionTool, ParameterInfo, Tool};
/// use serde_json::json;
///
/// let tool = FunctionTool::new(
///     FunctionMetadata::new("shout")
///         .with_description("Upper-cases text.")
///         .with_parameter(ParameterInfo::of::<String>("text")),
///     |args| async move {
///         let text: String = args.get("text")?;
///         Ok(json!(text.to_uppercase()))
///     },
/// );
/// assert_eq!(tool.definition().name, "shout");
/// ```
#[derive(Clone)]
pub struct FunctionTool {
    metadata: FunctionMetadata,
    handler: Arc<Handler>,
}

impl core::fmt::Debug for FunctionTool {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FunctionTool")
            .field("name", &self.metadata.name)
            .finish_non_exhaustive()
    }
}

impl FunctionTool {
    /// Creates a tool from metadata and a handler receiving the raw arguments.
    pub fn new<F, Fut>(metadata: FunctionMetadata, handler: F) -> Self
    where
        F: Fn(ToolArguments) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, ToolError>> + Send + 'static,
    {
        Self {
            metadata,
            handler: Arc::new(
                move |args| -> BoxFuture<'static, Result<Value, ToolError>> {
                    Box::pin(handler(args))
                },
            ),
        }
    }

    /// Creates a tool whose arguments deserialize into `A` and whose output
    /// serializes from `R`. The parameter schema is derived from `A`.
    pub fn typed<A, R, F, Fut>(
        name: impl Into<String>,
        description: impl Into<String>,
        handler: F,
    ) -> Self
    where
        A: JsonSchema + DeserializeOwned + Send + 'static,
        R: Serialize + 'static,
        F: Fn(A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, ToolError>> + Send + 'static,
    {
        let metadata = FunctionMetadata::from_type::<A>(name).with_description(description);
        Self::new(metadata, typed_handler(handler))
    }

    /// Returns the tool's metadata.
    #[must_use]
    pub fn metadata(&self) -> &FunctionMetadata {
        &self.metadata
    }
}

fn typed_handler<A, R, F, Fut>(
    handler: F,
) -> impl Fn(ToolArguments) -> BoxFuture<'static, Result<Value, ToolError>> + Send + Sync + 'static
where
    A: DeserializeOwned + Send + 'static,
    R: Serialize + 'static,
    F: Fn(A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, ToolError>> + Send + 'static,
{
    let handler = Arc::new(handler);
    move |args: ToolArguments| -> BoxFuture<'static, Result<Value, ToolError>> {
        let handler = Arc::clone(&handler);
        Box::pin(async move {
            let input: A = args.parse()?;
            let output = handler(input).await?;
            Ok(serde_json::to_value(output)?)
        })
    }
}

impl Tool for FunctionTool {
    fn definition(&self) -> ToolDefinition {
        self.metadata.to_tool_definition()
    }

    fn execute(
        &self,
        args: Value,
    ) -> Pin<Box<dyn Future<Output = Result<Value, ToolError>> + Send + '_>> {
        let handler = Arc::clone(&self.handler);
        Box::pin(async move {
            let args = ToolArguments::from_value(args)?;
            handler(args).await
        })
    }
}
