//! Relative URI building for the helper traits

use std::fmt::Display;

use serde::Serialize;
use serde_json::Value;
use url::form_urlencoded;

use crate::error::FixtureError;

/// Percent-escape one path segment (`/`, `?`, `#` and spaces included).
#[must_use]
pub fn escape_segment(segment: &str) -> String {
    form_urlencoded::byte_serialize(segment.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

/// `entity/{escaped id}`
#[must_use]
pub fn entity_path(entity: &str, id: impl Display) -> String {
    format!(
        "{}/{}",
        entity.trim_end_matches('/'),
        escape_segment(&id.to_string())
    )
}

/// Append `query` to `path` as form-encoded pairs.
///
/// `query` must serialize to a JSON object (or `null` for no query). Array
/// members repeat the key, `null` members are skipped.
///
/// # Errors
///
/// Returns [`FixtureError::Serialize`] if `query` is not an object.
pub fn with_query<Q: Serialize + ?Sized>(path: &str, query: &Q) -> Result<String, FixtureError> {
    let value = serde_json::to_value(query).map_err(|e| FixtureError::Serialize(e.to_string()))?;
    let members = match value {
        Value::Object(members) => members,
        Value::Null => return Ok(path.to_string()),
        other => {
            return Err(FixtureError::Serialize(format!(
                "query must serialize to an object, got {other}"
            )));
        }
    };

    let mut encoded = form_urlencoded::Serializer::new(String::new());
    for (key, value) in &members {
        match value {
            Value::Null => {}
            Value::Array(items) => {
                for item in items {
                    encoded.append_pair(key, &query_text(item));
                }
            }
            other => {
                encoded.append_pair(key, &query_text(other));
            }
        }
    }
    let query = encoded.finish();

    if query.is_empty() {
        Ok(path.to_string())
    } else if path.contains('?') {
        Ok(format!("{path}&{query}"))
    } else {
        Ok(format!("{path}?{query}"))
    }
}

fn query_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
