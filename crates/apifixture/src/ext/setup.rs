//! Setup-phase helpers

use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;

use apifixture_core::AssertionResult;

use crate::captured::Captured;
use crate::decode::json;
use crate::fixture::ApiFixture;
use crate::http::{HttpResponse, RequestBody};
use crate::uri::with_query;

pub trait SetupExt: ApiFixture {
    /// Setup call that must succeed.
    #[must_use]
    fn having_previously_sent_request(
        self,
        method: Method,
        uri: impl Into<String>,
        body: Option<RequestBody>,
    ) -> Self {
        self.having_previously_sent_request_with(method, uri, body, HttpResponse::ensure_success)
    }

    #[must_use]
    fn having_previously_sent_request_with<A>(
        self,
        method: Method,
        uri: impl Into<String>,
        body: Option<RequestBody>,
        assertion: A,
    ) -> Self
    where
        A: FnOnce(&HttpResponse) -> AssertionResult + 'static,
    {
        let uri = uri.into();
        self.setup_request_with(
            |request| {
                request.method = method;
                request.uri = uri;
                request.body = body;
            },
            assertion,
        )
    }

    /// Setup call with an optional JSON body; must succeed.
    #[must_use]
    fn having_previously_sent_json_request<B: Serialize + ?Sized>(
        self,
        method: Method,
        uri: &str,
        body: Option<&B>,
    ) -> Self {
        self.try_setup_request_with(
            |request| {
                request.method = method;
                request.uri = uri.to_string();
                request.body = body.map(RequestBody::json).transpose()?;
                Ok(())
            },
            HttpResponse::ensure_success,
        )
    }

    /// `POST path` with a JSON body; must succeed.
    #[must_use]
    fn having_previously_created<B: Serialize + ?Sized>(self, path: &str, body: &B) -> Self {
        self.having_previously_sent_json_request(Method::POST, path, Some(body))
    }

    /// `POST path` with a JSON body, storing the deserialized response in `into`.
    #[must_use]
    fn having_previously_created_into<B, T>(self, path: &str, body: &B, into: &Captured<T>) -> Self
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned + 'static,
    {
        let into = into.clone();
        self.try_setup_request_with(
            |request| {
                request.method = Method::POST;
                request.uri = path.to_string();
                request.set_json(body)
            },
            move |response| capture_json(response, &into),
        )
    }

    /// `GET path`, storing the deserialized response in `into`.
    #[must_use]
    fn having_previously_retrieved<T>(self, path: &str, into: &Captured<T>) -> Self
    where
        T: DeserializeOwned + 'static,
    {
        let into = into.clone();
        self.setup_request_with(
            |request| {
                request.method = Method::GET;
                request.uri = path.to_string();
            },
            move |response| capture_json(response, &into),
        )
    }

    /// `GET path?query`, storing the deserialized response in `into`.
    #[must_use]
    fn having_previously_retrieved_with_query<T, Q>(
        self,
        path: &str,
        query: &Q,
        into: &Captured<T>,
    ) -> Self
    where
        T: DeserializeOwned + 'static,
        Q: Serialize + ?Sized,
    {
        let into = into.clone();
        self.try_setup_request_with(
            |request| {
                request.method = Method::GET;
                request.uri = with_query(path, query)?;
                Ok(())
            },
            move |response| capture_json(response, &into),
        )
    }
}

impl<F: ApiFixture> SetupExt for F {}

fn capture_json<T: DeserializeOwned>(
    response: &HttpResponse,
    into: &Captured<T>,
) -> AssertionResult {
    response.ensure_success()?;
    into.set(json::<T>(response.body())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FixtureError, Phase};
    use crate::ext::{AssertionExt, RestExt};
    use crate::fixture::tests::{MockTransport, fixture};
    use apifixture_core::check_eq;
    use reqwest::StatusCode;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Clone, Deserialize)]
    struct Widget {
        id: u64,
        name: String,
    }

    fn widgets_api() -> MockTransport {
        MockTransport::new(|req| {
            let body = match (req.method().as_str(), req.url().path()) {
                ("POST", "/widgets") => r#"{"id": 41, "name": "a"}"#,
                ("GET", "/widgets/41") => r#"{"id": 41, "name": "a"}"#,
                ("GET", "/widgets") => r#"[{"id": 41, "name": "a"}]"#,
                _ => return Ok(HttpResponse::new(StatusCode::NOT_FOUND, "")),
            };
            Ok(HttpResponse::new(StatusCode::OK, body))
        })
    }

    fn widget_uri(widget: Captured<Widget>) -> impl FnOnce() -> Result<String, FixtureError> {
        move || Ok(format!("widgets/{}", widget.get()?.id))
    }

    #[test]
    fn created_value_threads_into_the_act_request() {
        let created: Captured<Widget> = Captured::new("created widget");
        let id = created.clone();
        let transport = widgets_api();
        fixture()
            .having_previously_created_into("widgets", &json!({"name": "a"}), &created)
            .when_with(Method::GET, widget_uri(id), None)
            .should_return_json(|w: &Widget| check_eq!(w.name, "a"))
            .run_with(transport.clone())
            .unwrap();
        assert_eq!(transport.sent(), vec!["POST /widgets", "GET /widgets/41"]);
        assert_eq!(created.get().unwrap().id, 41);
    }

    #[test]
    fn retrieved_value_is_captured() {
        let existing: Captured<Vec<Widget>> = Captured::new("existing widgets");
        let transport = widgets_api();
        fixture()
            .having_previously_retrieved("widgets", &existing)
            .when_getting("widgets/41")
            .run_with(transport)
            .unwrap();
        assert_eq!(existing.get().unwrap().len(), 1);
    }

    #[test]
    fn retrieve_with_query_and_failed_capture_aborts() {
        let existing: Captured<Vec<Widget>> = Captured::new("existing widgets");
        let transport = widgets_api();
        let err = fixture()
            .having_previously_retrieved_with_query("widgets/41", &json!({"full": true}), &existing)
            .when_getting("widgets")
            .run_with(transport.clone())
            .unwrap_err();
        // the single widget does not deserialize as a list
        assert!(matches!(
            err,
            FixtureError::Request {
                phase: Phase::Setup,
                index: 1,
                ..
            }
        ));
        assert_eq!(transport.sent(), vec!["GET /widgets/41?full=true"]);
        assert!(!existing.is_ready());
    }

    #[test]
    fn reading_a_capture_too_early_is_not_ready() {
        let created: Captured<Widget> = Captured::new("created widget");
        let id = created.clone();
        // the act URI is built only at run time; reading it now fails
        assert!(matches!(id.get(), Err(FixtureError::NotReady(_))));
        fixture()
            .having_previously_created_into("widgets", &json!({"name": "a"}), &created)
            .when_with(Method::GET, widget_uri(id), None)
            .run_with(widgets_api())
            .unwrap();
    }

    #[test]
    fn sent_request_default_requires_success() {
        let transport = widgets_api();
        let err = fixture()
            .having_previously_sent_request(Method::DELETE, "widgets/9", None)
            .when_getting("widgets")
            .run_with(transport)
            .unwrap_err();
        assert!(matches!(
            err,
            FixtureError::Request {
                phase: Phase::Setup,
                ..
            }
        ));
    }

    #[test]
    fn sent_request_with_custom_assertion() {
        fixture()
            .having_previously_sent_request_with(Method::DELETE, "widgets/9", None, |r| {
                check_eq!(r.status(), StatusCode::NOT_FOUND)
            })
            .having_previously_created("widgets", &json!({"name": "b"}))
            .having_previously_sent_json_request::<()>(Method::GET, "widgets", None)
            .when_getting("widgets")
            .run_with(widgets_api())
            .unwrap();
    }
}
