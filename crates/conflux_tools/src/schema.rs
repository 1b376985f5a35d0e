//! Parameter schema builders.
//!
//! [`ParameterInfo`] describes one parameter; [`FunctionMetadata`] collects
//! parameters into the object schema sent to the model as part of a
//! [`ToolDefinition`].

use conflux_models::llm::ToolDefinition;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Schema information for a single tool parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterInfo {
    /// Parameter name.
    pub name: String,
    /// Description shown to the model.
    pub description: Option<String>,
    /// JSON Schema for this parameter's type.
    pub schema: Value,
    /// Whether this parameter is required.
    pub required: bool,
    /// Default value for optional parameters.
    pub default_value: Option<Value>,
}

impl ParameterInfo {
    /// Creates a required parameter with an explicit schema.
    pub fn new(name: impl Into<String>, schema: Value) -> Self {
        Self {
            name: name.into(),
            description: None,
            schema,
            required: true,
            default_value: None,
        }
    }

    /// Creates a required parameter whose schema is derived from `T`.
    ///
    /// ```
    /// use conflux_tools::ParameterInfo;
    ///
    /// let info = ParameterInfo::of::<u32>("days");
    /// assert_eq!(info.schema["type"], "integer");
    /// ```
    pub fn of<T: JsonSchema>(name: impl Into<String>) -> Self {
        let mut generator = schemars::SchemaGenerator::default();
        let schema = serde_json::to_value(T::json_schema(&mut generator)).unwrap_or_else(|_| json!({}));
        Self::new(name, strip_annotations(schema))
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Marks the parameter as optional.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Sets a default value. Parameters with a default are never required.
    #[must_use]
    pub fn with_default(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }
}

/// Name, description and parameters of a tool.
///
/// ```
/// use conflux_tools::{FunctionMetadata, ParameterInfo};
///
/// let metadata = FunctionMetadata::new("forecast")
///     .with_description("Weather forecast for a city.")
///     .with_parameter(ParameterInfo::of::<String>("city"))
///     .with_parameter(ParameterInfo::of::<u32>("days").with_default(1.into()));
///
/// assert_eq!(metadata.schema()["required"], serde_json::json!(["city"]));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionMetadata {
    /// Function name.
    pub name: String,
    /// Function description.
    pub description: Option<String>,
    /// Model-visible parameters.
    pub parameters: Vec<ParameterInfo>,
    /// Object schema derived from `parameters`. Use [`Self::schema()`] to read.
    schema: Value,
}

impl FunctionMetadata {
    /// Creates metadata for a function with no parameters.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            parameters: Vec::new(),
            schema: json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
        }
    }

    /// Creates metadata whose parameter schema is derived from the struct `T`.
    ///
    /// `T`'s fields become the tool's parameters.
    pub fn from_type<T: JsonSchema>(name: impl Into<String>) -> Self {
        let schema = serde_json::to_value(schemars::schema_for!(T)).unwrap_or_else(|_| json!({}));
        Self {
            name: name.into(),
            description: None,
            parameters: Vec::new(),
            schema: strip_annotations(schema),
        }
    }

    /// Sets the function description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds a parameter and rebuilds the schema.
    #[must_use]
    pub fn with_parameter(mut self, param: ParameterInfo) -> Self {
        self.parameters.push(param);
        self.rebuild_schema();
        self
    }

    /// Returns the JSON Schema for the function's parameters.
    #[must_use]
    pub fn schema(&self) -> &Value {
        &self.schema
    }

    /// Converts this metadata into a [`ToolDefinition`].
    pub fn to_tool_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: self.description.clone().unwrap_or_default(),
            parameters: self.schema.clone(),
        }
    }

    fn rebuild_schema(&mut self) {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for param in &self.parameters {
            let mut schema = param.schema.clone();
            if let Some(obj) = schema.as_object_mut() {
                if let Some(desc) = &param.description {
                    obj.insert("description".to_string(), Value::String(desc.clone()));
                }
                if let Some(default) = &param.default_value {
                    obj.insert("default".to_string(), default.clone());
                }
            }
            properties.insert(param.name.clone(), schema);

            if param.required && param.default_value.is_none() {
                required.push(param.name.clone());
            }
        }

        self.schema = json!({
            "type": "object",
            "properties": properties,
            "required": required
        });
    }
}

/// Removes the root `$schema` and `title` keys schemars emits.
fn strip_annotations(mut schema: Value) -> Value {
    if let Some(obj) = schema.as_object_mut() {
        obj.remove("$schema");
        obj.remove("title");
    }
    schema
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(JsonSchema)]
    #[expect(dead_code, reason = "only the schema is used")]
    struct Lookup {
        /// Search terms.
        query: String,
        limit: Option<u32>,
    }

    #[test]
    fn schema_from_type_lists_fields() {
        let metadata = FunctionMetadata::from_type::<Lookup>("lookup");
        let schema = metadata.schema();

        assert_eq!(schema["type"], "object");
        assert!(schema["properties"]["query"].is_object());
        assert_eq!(schema["required"], json!(["query"]));
        assert!(schema.get("$schema").is_none());
        assert!(schema.get("title").is_none());
    }

    #[test]
    fn optional_and_defaulted_parameters_are_not_required() {
        let metadata = FunctionMetadata::new("f")
            .with_parameter(ParameterInfo::of::<String>("a").with_description("first"))
            .with_parameter(ParameterInfo::of::<String>("b").optional())
            .with_parameter(ParameterInfo::of::<bool>("c").with_default(json!(true)));

        let schema = metadata.schema();
        assert_eq!(schema["required"], json!(["a"]));
        assert_eq!(schema["properties"]["a"]["description"], "first");
        assert_eq!(schema["properties"]["c"]["default"], true);
        assert_eq!(metadata.to_tool_definition().description, "");
    }
}
