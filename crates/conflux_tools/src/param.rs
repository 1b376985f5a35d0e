//! Typed access to a tool call's JSON arguments.

use crate::error::ToolError;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// The arguments of one tool call, as a JSON object.
///
/// ```
/// use conflux_tools::ToolArguments;
/// use serde_json::json;
///
/// let args = ToolArguments::from_value(json!({ "city": "Oslo", "days": 3 })).unwrap();
/// let city: String = args.get("city").unwrap();
/// let unit: Option<String> = args.get_optional("unit").unwrap();
/// assert_eq!(city, "Oslo");
/// assert_eq!(unit, None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ToolArguments {
    values: Map<String, Value>,
}

impl ToolArguments {
    /// Wraps a JSON object.
    ///
    /// `null` is read as an empty object.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Parameter`] if `value` is neither an object nor null.
    pub fn from_value(value: Value) -> Result<Self, ToolError> {
        match value {
            Value::Object(values) => Ok(Self { values }),
            Value::Null => Ok(Self::default()),
            other => Err(ToolError::parameter(format!(
                "arguments must be a JSON object, got {other}"
            ))),
        }
    }

    /// Deserializes a required parameter.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Parameter`] if the parameter is missing or has the
    /// wrong shape.
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> Result<T, ToolError> {
        let value = self
            .values
            .get(name)
            .ok_or_else(|| ToolError::parameter(format!("missing parameter: {name}")))?;
        Self::decode(name, value)
    }

    /// Deserializes an optional parameter. Missing and `null` both read as `None`.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Parameter`] if the parameter has the wrong shape.
    pub fn get_optional<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, ToolError> {
        match self.values.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => Self::decode(name, value).map(Some),
        }
    }

    /// Deserializes the whole argument object into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Parameter`] if the object does not match `T`.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, ToolError> {
        serde_json::from_value(Value::Object(self.values.clone()))
            .map_err(|err| ToolError::parameter(format!("invalid arguments: {err}")))
    }

    /// Returns the underlying JSON object.
    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.values)
    }

    fn decode<T: DeserializeOwned>(name: &str, value: &Value) -> Result<T, ToolError> {
        serde_json::from_value(value.clone())
            .map_err(|err| ToolError::parameter(format!("invalid parameter '{name}': {err}")))
    }
}
