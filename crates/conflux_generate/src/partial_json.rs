//! Best-effort parsing of truncated JSON and snapshot merging.
//!
//! [`parse_partial`] closes whatever the prefix left open and parses the
//! result. [`deep_merge`] folds a newer snapshot into an older one.

use serde_json::Value;

/// Parses the longest usable value from a possibly truncated JSON document.
///
/// Open strings, arrays and objects are closed before parsing. Returns `None`
/// when the repaired text is still not JSON, e.g. while a literal or a key is
/// only half received.
///
/// ```
/// use conflux_generate::partial_json::parse_partial;
/// use serde_json::json;
///
/// assert_eq!(
///     parse_partial(r#"{"name": "Ada", "langs": ["en", "fr"#),
///     Some(json!({ "name": "Ada", "langs": ["en", "fr"] }))
/// );
/// assert_eq!(parse_partial(""), None);
/// ```
#[must_use]
pub fn parse_partial(input: &str) -> Option<Value> {
    if input.trim().is_empty() {
        return None;
    }
    let repaired = partial_json_fixer::fix_json(input);
    serde_json::from_str(&repaired).ok()
}

/// Merges `next` into `previous`.
///
/// Objects merge key-wise and recursively, keeping keys only `previous` has.
/// Arrays merge index-wise and recursively; the result is as long as the
/// longer input. Any other pair, including a change of type, takes `next`.
#[must_use]
pub fn deep_merge(previous: Value, next: Value) -> Value {
    match (previous, next) {
        (Value::Object(mut merged), Value::Object(next)) => {
            for (key, value) in next {
                match merged.get_mut(&key) {
                    Some(slot) => *slot = deep_merge(slot.take(), value),
                    None => {
                        merged.insert(key, value);
                    }
                }
            }
            Value::Object(merged)
        }
        (Value::Array(previous), Value::Array(next)) => {
            let mut previous = previous.into_iter();
            let mut next = next.into_iter();
            let mut merged = Vec::new();
            loop {
                match (previous.next(), next.next()) {
                    (Some(old), Some(new)) => merged.push(deep_merge(old, new)),
                    (Some(item), None) | (None, Some(item)) => merged.push(item),
                    (None, None) => break,
                }
            }
            Value::Array(merged)
        }
        (_, next) => next,
    }
}
