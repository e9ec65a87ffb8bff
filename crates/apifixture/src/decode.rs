//! Body deserializers for result assertions

use apifixture_core::AssertionFailure;
use apifixture_core::snapshot::truncate_body;
use serde::de::DeserializeOwned;

/// Deserialize a JSON body into `T`.
///
/// # Errors
///
/// Returns a failure naming `T`, the parse error and the body.
pub fn json<T: DeserializeOwned>(body: &str) -> Result<T, AssertionFailure> {
    serde_json::from_str(body).map_err(|e| {
        AssertionFailure::unlocated(format!(
            "cannot deserialize response body as {}: {e}\nbody: {}",
            std::any::type_name::<T>(),
            if body.is_empty() {
                "<empty>".to_string()
            } else {
                truncate_body(body)
            }
        ))
    })
}

/// The body as-is.
///
/// # Errors
///
/// Never fails; the signature matches the other deserializers.
pub fn raw(body: &str) -> Result<String, AssertionFailure> {
    Ok(body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, serde::Deserialize, PartialEq)]
    struct Widget {
        id: u64,
    }

    #[test]
    fn json_parses_typed_body() {
        assert_eq!(json::<Widget>(r#"{"id": 7}"#).unwrap(), Widget { id: 7 });
    }

    #[test]
    fn json_failure_names_the_type_and_body() {
        let failure = json::<Widget>("not json").unwrap_err();
        assert!(failure.message().contains("Widget"));
        assert!(failure.message().ends_with("body: not json"));
        assert!(failure.location().is_none());
    }

    #[test]
    fn json_failure_on_empty_body() {
        let failure = json::<Widget>("").unwrap_err();
        assert!(failure.message().ends_with("body: <empty>"));
    }
}
