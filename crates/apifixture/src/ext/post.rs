//! Post-phase helpers: follow-up calls that verify the act's side effects

use apifixture_core::{AggregateFailure, AssertionFailure, AssertionResult, aggregate};
use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::decode::{json, raw};
use crate::fixture::{ApiFixture, ResultAssertion};
use crate::http::{HttpResponse, RequestBody};
use crate::uri::with_query;

pub trait PostExt: ApiFixture {
    /// Post call with an optional JSON body that must succeed.
    #[must_use]
    fn should_satisfy_request<B: Serialize + ?Sized>(
        self,
        method: Method,
        uri: &str,
        body: Option<&B>,
    ) -> Self {
        self.should_satisfy_request_with(method, uri, body, HttpResponse::ensure_success)
    }

    #[must_use]
    fn should_satisfy_request_with<B, A>(
        self,
        method: Method,
        uri: &str,
        body: Option<&B>,
        assertion: A,
    ) -> Self
    where
        B: Serialize + ?Sized,
        A: FnOnce(&HttpResponse) -> AssertionResult + 'static,
    {
        let body = body.map(RequestBody::json).transpose();
        let uri = uri.to_string();
        self.try_assert_post_request_with(
            move |request| {
                request.method = method;
                request.uri = uri;
                request.body = body?;
                Ok(())
            },
            assertion,
        )
    }

    /// `GET uri`; must succeed, then every assertion runs on the raw body.
    #[must_use]
    fn should_satisfy_raw_get_request(
        self,
        uri: &str,
        assertions: Vec<ResultAssertion<String>>,
    ) -> Self {
        self.should_satisfy_request_with(Method::GET, uri, None::<&()>, move |response| {
            satisfy(response, raw, assertions)
        })
    }

    #[must_use]
    fn should_satisfy_raw_get_request_with_query<Q: Serialize + ?Sized>(
        self,
        path: &str,
        query: &Q,
        assertions: Vec<ResultAssertion<String>>,
    ) -> Self {
        let uri = with_query(path, query);
        self.try_assert_post_request_with(
            move |request| {
                request.method = Method::GET;
                request.uri = uri?;
                Ok(())
            },
            move |response| satisfy(response, raw, assertions),
        )
    }

    /// `GET uri`; must succeed, then every assertion runs on the body as `T`.
    #[must_use]
    fn should_satisfy_json_get_request<T>(
        self,
        uri: &str,
        assertions: Vec<ResultAssertion<T>>,
    ) -> Self
    where
        T: DeserializeOwned + 'static,
    {
        self.should_satisfy_request_with(Method::GET, uri, None::<&()>, move |response| {
            satisfy(response, json::<T>, assertions)
        })
    }

    #[must_use]
    fn should_satisfy_json_get_request_with_query<T, Q>(
        self,
        path: &str,
        query: &Q,
        assertions: Vec<ResultAssertion<T>>,
    ) -> Self
    where
        T: DeserializeOwned + 'static,
        Q: Serialize + ?Sized,
    {
        let uri = with_query(path, query);
        self.try_assert_post_request_with(
            move |request| {
                request.method = Method::GET;
                request.uri = uri?;
                Ok(())
            },
            move |response| satisfy(response, json::<T>, assertions),
        )
    }

    /// `POST uri` with a JSON body; must succeed, then every assertion runs on
    /// the response body as `T`.
    #[must_use]
    fn should_satisfy_json_post_request<T, B>(
        self,
        uri: &str,
        body: &B,
        assertions: Vec<ResultAssertion<T>>,
    ) -> Self
    where
        T: DeserializeOwned + 'static,
        B: Serialize + ?Sized,
    {
        self.should_satisfy_request_with(Method::POST, uri, Some(body), move |response| {
            satisfy(response, json::<T>, assertions)
        })
    }

    #[must_use]
    fn should_satisfy_raw_post_request<B: Serialize + ?Sized>(
        self,
        uri: &str,
        body: &B,
        assertions: Vec<ResultAssertion<String>>,
    ) -> Self {
        self.should_satisfy_request_with(Method::POST, uri, Some(body), move |response| {
            satisfy(response, raw, assertions)
        })
    }
}

impl<F: ApiFixture> PostExt for F {}

/// Success status, then the assertions in their own aggregation scope.
fn satisfy<T, D>(
    response: &HttpResponse,
    deserialize: D,
    assertions: Vec<ResultAssertion<T>>,
) -> AssertionResult
where
    D: FnOnce(&str) -> Result<T, AssertionFailure>,
{
    response.ensure_success()?;
    let value = deserialize(response.body())?;
    aggregate(|agg| {
        for assertion in assertions {
            agg.capture(|| assertion(&value));
        }
        Ok::<(), AggregateFailure>(())
    })
    .map_err(|composite| AssertionFailure::unlocated(composite.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FixtureError, Phase};
    use crate::ext::RestExt;
    use crate::fixture::tests::{MockTransport, fixture};
    use apifixture_core::{check, check_eq};
    use reqwest::StatusCode;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Widget {
        id: u64,
        name: String,
    }

    fn api() -> MockTransport {
        MockTransport::new(|req| {
            let body = match (req.method().as_str(), req.url().path()) {
                ("GET", "/widgets/7") => r#"{"id": 7, "name": "renamed"}"#,
                ("GET", "/widgets") => r#"[{"id": 7, "name": "renamed"}]"#,
                ("POST", "/widgets/search") => r#"{"id": 7, "name": "renamed"}"#,
                ("GET", "/health") => "ok",
                ("PUT", "/widgets/7") => "",
                _ => return Ok(HttpResponse::new(StatusCode::NOT_FOUND, "")),
            };
            Ok(HttpResponse::new(StatusCode::OK, body))
        })
    }

    #[test]
    fn post_calls_verify_side_effects() {
        let transport = api();
        fixture()
            .when_updating("widgets", 7, &json!({"name": "renamed"}))
            .should_satisfy_json_get_request::<Widget>(
                "widgets/7",
                vec![
                    Box::new(|w: &Widget| check_eq!(w.id, 7)),
                    Box::new(|w: &Widget| check_eq!(w.name, "renamed")),
                ],
            )
            .should_satisfy_json_get_request_with_query::<Vec<Widget>, _>(
                "widgets",
                &json!({"name": "renamed"}),
                vec![Box::new(|ws: &Vec<Widget>| check_eq!(ws.len(), 1))],
            )
            .should_satisfy_raw_get_request(
                "health",
                vec![Box::new(|b: &String| check_eq!(b, "ok"))],
            )
            .should_satisfy_json_post_request::<Widget, _>(
                "widgets/search",
                &json!({"q": "renamed"}),
                vec![Box::new(|w: &Widget| check!(w.id == 7))],
            )
            .run_with(transport.clone())
            .unwrap();
        assert_eq!(
            transport.sent(),
            vec![
                "PUT /widgets/7",
                "GET /widgets/7",
                "GET /widgets?name=renamed",
                "GET /health",
                "POST /widgets/search",
            ]
        );
    }

    #[test]
    fn post_assertions_are_aggregated_within_the_call() {
        let err = fixture()
            .when_updating("widgets", 7, &json!({"name": "renamed"}))
            .should_satisfy_json_get_request::<Widget>(
                "widgets/7",
                vec![
                    Box::new(|w: &Widget| check_eq!(w.id, 8)),
                    Box::new(|w: &Widget| check_eq!(w.name, "original")),
                ],
            )
            .run_with(api())
            .unwrap_err();
        match err {
            FixtureError::Request {
                phase: Phase::Post,
                index: 1,
                failure,
                ..
            } => assert!(failure.message().starts_with("2 assertions failed:")),
            other => panic!("expected post failure, got {other:?}"),
        }
    }

    #[test]
    fn post_call_requires_success_before_assertions() {
        let unreachable = |_: &String| -> AssertionResult { panic!("must not run") };
        let err = fixture()
            .when_updating("widgets", 7, &json!({}))
            .should_satisfy_raw_get_request_with_query(
                "missing",
                &json!({"x": 1}),
                vec![Box::new(unreachable)],
            )
            .run_with(api())
            .unwrap_err();
        match err {
            FixtureError::Request { url, failure, .. } => {
                assert_eq!(url, "http://api.test/missing?x=1");
                assert!(failure.message().contains("404 Not Found"));
            }
            other => panic!("expected post failure, got {other:?}"),
        }
    }

    #[test]
    fn should_satisfy_request_sends_body() {
        let transport = api();
        fixture()
            .when_getting("widgets/7")
            .should_satisfy_request(Method::PUT, "widgets/7", Some(&json!({"name": "x"})))
            .should_satisfy_raw_post_request("widgets/search", &json!({}), vec![])
            .run_with(transport.clone())
            .unwrap();
        assert_eq!(
            transport.sent(),
            vec!["GET /widgets/7", "PUT /widgets/7", "POST /widgets/search"]
        );
    }
}
