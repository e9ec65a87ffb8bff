//! Assertions on the act response

use apifixture_core::{AssertionFailure, AssertionResult, check, json_equivalent};
use reqwest::StatusCode;
use schemars::JsonSchema;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::decode::{json, raw};
use crate::fixture::{ApiFixture, ResultAssertion};
use crate::http::{HttpResponse, status_text};

/// Schema violations reported per response.
const MAX_SCHEMA_ERRORS: usize = 5;

pub trait AssertionExt: ApiFixture {
    #[must_use]
    fn should_return_successful_status(self) -> Self {
        self.assert_response(HttpResponse::ensure_success)
    }

    #[must_use]
    fn should_return_status(self, expected: StatusCode) -> Self {
        self.assert_response(move |response| expect_status(response, expected))
    }

    #[must_use]
    fn should_return_bad_request(self) -> Self {
        self.should_return_status(StatusCode::BAD_REQUEST)
    }

    #[must_use]
    fn should_return_unauthorized(self) -> Self {
        self.should_return_status(StatusCode::UNAUTHORIZED)
    }

    #[must_use]
    fn should_return_forbidden(self) -> Self {
        self.should_return_status(StatusCode::FORBIDDEN)
    }

    #[must_use]
    fn should_return_not_found(self) -> Self {
        self.should_return_status(StatusCode::NOT_FOUND)
    }

    #[must_use]
    fn should_return_internal_server_error(self) -> Self {
        self.should_return_status(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// `302 Found` with the given `Location`.
    #[must_use]
    fn should_return_redirect(self, location: impl Into<String>) -> Self {
        self.should_return_redirect_with(StatusCode::FOUND, location)
    }

    /// `301 Moved Permanently` with the given `Location`.
    #[must_use]
    fn should_return_permanent_redirect(self, location: impl Into<String>) -> Self {
        self.should_return_redirect_with(StatusCode::MOVED_PERMANENTLY, location)
    }

    /// `303 See Other` with the given `Location`.
    #[must_use]
    fn should_return_see_other(self, location: impl Into<String>) -> Self {
        self.should_return_redirect_with(StatusCode::SEE_OTHER, location)
    }

    /// `307 Temporary Redirect` with the given `Location`.
    #[must_use]
    fn should_return_temporary_redirect(self, location: impl Into<String>) -> Self {
        self.should_return_redirect_with(StatusCode::TEMPORARY_REDIRECT, location)
    }

    /// Status and `Location` are checked as two separate assertions.
    #[must_use]
    fn should_return_redirect_with(self, status: StatusCode, location: impl Into<String>) -> Self {
        let expected = location.into();
        self.should_return_status(status)
            .assert_response(move |response| match response.location() {
                Some(actual) if actual == expected => Ok(()),
                Some(actual) => Err(AssertionFailure::unlocated(format!(
                    "expected Location '{expected}', got '{actual}'"
                ))),
                None => Err(AssertionFailure::unlocated(format!(
                    "expected Location '{expected}', but the response has no Location header"
                ))),
            })
    }

    /// Body equals `expected` exactly.
    #[must_use]
    fn should_return_raw(self, expected: impl Into<String>) -> Self {
        let expected = expected.into();
        self.assert_result(raw, move |body: &String| {
            check!(
                *body == expected,
                "expected body {expected:?}, got {body:?}"
            )
        })
    }

    #[must_use]
    fn should_return_raw_with<A>(self, assertion: A) -> Self
    where
        A: FnOnce(&String) -> AssertionResult + 'static,
    {
        self.assert_result(raw, assertion)
    }

    /// Deserialize the body as `T` and check it.
    #[must_use]
    fn should_return_json<T, A>(self, assertion: A) -> Self
    where
        T: DeserializeOwned + 'static,
        A: FnOnce(&T) -> AssertionResult + 'static,
    {
        self.assert_result(json::<T>, assertion)
    }

    /// Deserialize the body as `T` once and run every assertion on it.
    #[must_use]
    fn should_return_json_each<T>(self, assertions: Vec<ResultAssertion<T>>) -> Self
    where
        T: DeserializeOwned + 'static,
    {
        self.assert_result_each(json::<T>, assertions)
    }

    /// Body is structurally equivalent to `expected`; extra members are ignored.
    #[must_use]
    fn should_return_equivalent_json<T: Serialize + ?Sized>(self, expected: &T) -> Self {
        let expected = serde_json::to_value(expected);
        self.assert_result(json::<Value>, move |actual: &Value| {
            let expected = expected.map_err(|e| {
                AssertionFailure::unlocated(format!("cannot serialize expected value: {e}"))
            })?;
            equivalent(actual, &expected)
        })
    }

    /// Body deserializes as `R` and, re-serialized, is equivalent to `expected`.
    #[must_use]
    fn should_return_equivalent_json_as<R, T>(self, expected: &T) -> Self
    where
        R: DeserializeOwned + Serialize + 'static,
        T: Serialize + ?Sized,
    {
        let expected = serde_json::to_value(expected);
        self.assert_result(json::<R>, move |actual: &R| {
            let expected = expected.map_err(|e| {
                AssertionFailure::unlocated(format!("cannot serialize expected value: {e}"))
            })?;
            let actual = serde_json::to_value(actual).map_err(|e| {
                AssertionFailure::unlocated(format!(
                    "cannot serialize {}: {e}",
                    std::any::type_name::<R>()
                ))
            })?;
            equivalent(&actual, &expected)
        })
    }

    #[must_use]
    fn should_return_empty_json_collection(self) -> Self {
        self.should_return_json_collection_of_length(0)
    }

    #[must_use]
    fn should_return_json_collection_of_length(self, expected: usize) -> Self {
        self.assert_result(json::<Vec<Value>>, move |items: &Vec<Value>| {
            check!(
                items.len() == expected,
                "expected a JSON collection of {expected} items, got {}",
                items.len()
            )
        })
    }

    /// Body validates against a JSON Schema document.
    #[must_use]
    fn should_match_json_schema(self, schema: Value) -> Self {
        self.assert_result(json::<Value>, move |body: &Value| {
            let validator = jsonschema::validator_for(&schema).map_err(|e| {
                AssertionFailure::unlocated(format!("invalid JSON Schema: {e}"))
            })?;
            let errors: Vec<String> = validator
                .iter_errors(body)
                .take(MAX_SCHEMA_ERRORS)
                .map(|e| e.to_string())
                .collect();
            if errors.is_empty() {
                Ok(())
            } else {
                Err(AssertionFailure::unlocated(format!(
                    "response body does not match schema:\n{}",
                    errors.join("\n")
                )))
            }
        })
    }

    /// Body validates against the JSON Schema `schemars` derives for `T`.
    #[must_use]
    fn should_match_schema_of<T: JsonSchema>(self) -> Self {
        self.should_match_json_schema(schemars::schema_for!(T).as_value().clone())
    }
}

impl<F: ApiFixture> AssertionExt for F {}

fn expect_status(response: &HttpResponse, expected: StatusCode) -> AssertionResult {
    let actual = response.status();
    if actual == expected {
        Ok(())
    } else {
        Err(AssertionFailure::unlocated(format!(
            "expected status {}, got {}",
            status_text(expected),
            status_text(actual)
        )))
    }
}

fn equivalent(actual: &Value, expected: &Value) -> AssertionResult {
    json_equivalent(actual, expected).map_err(|diffs| {
        AssertionFailure::unlocated(format!(
            "response body is not equivalent to the expected value:\n{}",
            diffs.join("\n")
        ))
    })
}
