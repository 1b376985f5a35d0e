//! JSON Schema validation shared by tool arguments and structured output.

use serde_json::Value;

/// Validates `instance` against `schema`.
///
/// Returns one message per violation. An invalid schema is reported as a
/// single violation.
///
/// # Errors
///
/// Returns the list of violations when validation fails.
///
/// ```
/// use serde_json::json;
///
/// let schema = json!({ "type": "object", "properties": { "x": { "type": "number" } } });
/// assert!(conflux_models::schema::validate(&schema, &json!({ "x": 1 })).is_ok());
/// assert!(conflux_models::schema::validate(&schema, &json!({ "x": "no" })).is_err());
/// ```
pub fn validate(schema: &Value, instance: &Value) -> Result<(), Vec<String>> {
    let validator = jsonschema::validator_for(schema)
        .map_err(|err| vec![format!("invalid schema: {err}")])?;

    let errors: Vec<String> = validator
        .iter_errors(instance)
        .map(|err| ToString::to_string(&err))
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
