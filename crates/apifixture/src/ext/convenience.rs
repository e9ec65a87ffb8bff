//! Shorthands for common fixture configuration

use std::time::Duration;

use schemars::JsonSchema;
use serde::de::DeserializeOwned;

use crate::captured::Captured;
use crate::datagen::ModelFactory;
use crate::error::FixtureError;
use crate::fixture::ApiFixture;

pub trait ConvenienceExt: ApiFixture {
    /// Run `action` now, in the middle of the chain.
    #[must_use]
    fn having<F: FnOnce()>(self, action: F) -> Self {
        action();
        self
    }

    #[must_use]
    fn having_base_url(self, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        self.configure_client(move |settings| settings.set_base_url(base_url))
    }

    /// Header sent with every request of the run.
    #[must_use]
    fn having_default_header(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let (name, value) = (name.into(), value.into());
        self.configure_client(move |settings| settings.set_default_header(name, value))
    }

    #[must_use]
    fn having_timeout(self, timeout: Duration) -> Self {
        self.configure_client(move |settings| settings.timeout = Some(timeout))
    }

    #[must_use]
    fn having_follow_redirects(self, follow: bool) -> Self {
        self.configure_client(move |settings| settings.follow_redirects = follow)
    }

    /// `Authorization: Bearer {token}` on the act request only.
    #[must_use]
    fn having_bearer_token(self, token: impl Into<String>) -> Self {
        let value = format!("Bearer {}", token.into());
        self.configure_act_request(move |request| request.set_header("Authorization", value))
    }

    /// Apply `step` `times` times.
    #[must_use]
    fn having_repeated<F>(self, times: usize, mut step: F) -> Self
    where
        F: FnMut(Self) -> Self,
    {
        (0..times).fold(self, |fixture, _| step(fixture))
    }

    /// Generate a random `T` now and store it in `into`.
    #[must_use]
    fn having_model<T>(self, into: &Captured<T>) -> Self
    where
        T: JsonSchema + DeserializeOwned,
    {
        self.try_using_models(|models| store(into, models.create::<T>()?))
    }

    /// Generate `count` random `T`s now and store them in `into`.
    #[must_use]
    fn having_models<T>(self, count: usize, into: &Captured<Vec<T>>) -> Self
    where
        T: JsonSchema + DeserializeOwned,
    {
        self.try_using_models(|models| store(into, models.create_many::<T>(count)?))
    }

    /// Store a random element of `items` in `into`.
    #[must_use]
    fn having_random<T: Clone>(self, items: &[T], into: &Captured<T>) -> Self {
        self.try_using_models(|models| {
            let item = models.pick(items).cloned().ok_or_else(|| {
                FixtureError::Configuration("no items to pick a random value from".to_string())
            })?;
            store(into, item)
        })
    }

    /// Store whatever `produce` builds from the model factory in `into`.
    #[must_use]
    fn having_value<R, F>(self, produce: F, into: &Captured<R>) -> Self
    where
        F: FnOnce(&mut ModelFactory) -> R,
    {
        self.try_using_models(|models| store(into, produce(models)))
    }
}

impl<F: ApiFixture> ConvenienceExt for F {}

fn store<T>(into: &Captured<T>, value: T) -> Result<(), FixtureError> {
    let outcome = into.set(value);
    outcome.map_err(|failure| FixtureError::Configuration(failure.message().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ext::{RestExt, SetupExt};
    use crate::fixture::tests::{MockTransport, fixture};
    use crate::http::HttpResponse;
    use apifixture_core::{MemorySink, check_eq};
    use rand::Rng;
    use reqwest::StatusCode;
    use serde::Deserialize;
    use serde_json::json;
    use std::cell::Cell;
    use std::rc::Rc;

    #[derive(Debug, Clone, PartialEq, Deserialize, JsonSchema)]
    struct Widget {
        name: String,
        count: u32,
    }

    #[test]
    fn client_shorthands_reach_the_transport() {
        let transport = MockTransport::ok();
        crate::Fixture::with_sink(Box::new(MemorySink::new()))
            .having_base_url("http://api.test/")
            .having_default_header("X-Api-Key", "k")
            .having_timeout(Duration::from_secs(3))
            .having_follow_redirects(true)
            .when_getting("date")
            .run_with(transport.clone())
            .unwrap();
        let settings = transport.settings().unwrap();
        assert_eq!(settings.base_url.as_deref(), Some("http://api.test/"));
        assert_eq!(
            settings.default_headers,
            vec![("X-Api-Key".to_string(), "k".to_string())]
        );
        assert_eq!(settings.timeout, Some(Duration::from_secs(3)));
        assert!(settings.follow_redirects);
    }

    #[test]
    fn bearer_token_applies_to_act_request_only() {
        let transport = MockTransport::new(|req| {
            let auth = req
                .headers()
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-")
                .to_string();
            Ok(HttpResponse::new(StatusCode::OK, auth))
        });
        let seen = Rc::new(std::cell::RefCell::new(Vec::new()));
        let setup_seen = Rc::clone(&seen);
        fixture()
            .having_previously_sent_request_with(reqwest::Method::GET, "seed", None, move |r| {
                setup_seen.borrow_mut().push(r.body().to_string());
                Ok(())
            })
            .having_bearer_token("t0ken")
            .when_getting("me")
            .assert_response(|r| check_eq!(r.body(), "Bearer t0ken"))
            .run_with(transport)
            .unwrap();
        assert_eq!(*seen.borrow(), vec!["-".to_string()]);
    }

    #[test]
    fn having_repeated_registers_each_step() {
        let transport = MockTransport::ok();
        let body = json!({"n": 1});
        fixture()
            .having_repeated(3, |f| f.having_previously_created("widgets", &body))
            .when_getting("widgets")
            .run_with(transport.clone())
            .unwrap();
        assert_eq!(
            transport.sent(),
            vec![
                "POST /widgets",
                "POST /widgets",
                "POST /widgets",
                "GET /widgets"
            ]
        );
    }

    #[test]
    fn having_runs_immediately() {
        let ran = Rc::new(Cell::new(false));
        let flag = Rc::clone(&ran);
        let fixture = fixture().having(move || flag.set(true));
        assert!(ran.get());
        drop(fixture);
    }

    #[test]
    fn having_model_stores_before_run() {
        let widget: Captured<Widget> = Captured::new("widget");
        let fixture = fixture()
            .with_models(ModelFactory::seeded(5))
            .having_model(&widget);
        assert!(widget.is_ready());
        drop(fixture);
    }

    #[test]
    fn having_model_feeds_the_act_request() {
        let widget: Captured<Widget> = Captured::new("widget");
        let name = widget.clone();
        let transport = MockTransport::ok();
        fixture()
            .with_models(ModelFactory::seeded(5))
            .having_model(&widget)
            .when_with(
                reqwest::Method::GET,
                move || Ok(format!("widgets/{}", name.get()?.count)),
                None,
            )
            .run_with(transport.clone())
            .unwrap();
        let expected = format!("GET /widgets/{}", widget.get().unwrap().count);
        assert_eq!(transport.sent(), vec![expected]);
    }

    #[test]
    fn seeded_models_are_reproducible() {
        let first: Captured<Widget> = Captured::new("first");
        let second: Captured<Widget> = Captured::new("second");
        drop(fixture().with_models(ModelFactory::seeded(9)).having_model(&first));
        drop(fixture().with_models(ModelFactory::seeded(9)).having_model(&second));
        assert_eq!(first.value().unwrap(), second.value().unwrap());
    }

    #[test]
    fn having_models_stores_count_models() {
        let widgets: Captured<Vec<Widget>> = Captured::new("widgets");
        drop(fixture().having_models(4, &widgets));
        assert_eq!(widgets.get().unwrap().len(), 4);
    }

    #[test]
    fn having_random_picks_one_of_the_items() {
        let colors = ["red", "green", "blue"];
        let color: Captured<&str> = Captured::new("color");
        drop(fixture().having_random(&colors, &color));
        assert!(colors.contains(color.get().unwrap()));
    }

    #[test]
    fn having_random_without_items_fails_before_any_call() {
        let transport = MockTransport::ok();
        let color: Captured<String> = Captured::new("color");
        let err = fixture()
            .having_random(&[], &color)
            .when_getting("widgets")
            .run_with(transport.clone())
            .unwrap_err();
        assert!(matches!(err, FixtureError::Configuration(_)));
        assert!(transport.sent().is_empty());
        assert!(!color.is_ready());
    }

    #[test]
    fn having_value_uses_the_fixture_factory() {
        let roll: Captured<u32> = Captured::new("roll");
        drop(fixture().having_value(|models| models.rng().gen_range(1..=6), &roll));
        assert!((1..=6).contains(roll.get().unwrap()));
    }

    #[test]
    fn capturing_twice_fails_the_run() {
        let transport = MockTransport::ok();
        let widget: Captured<Widget> = Captured::new("widget");
        let err = fixture()
            .having_model(&widget)
            .having_model(&widget)
            .when_getting("widgets")
            .run_with(transport.clone())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "fixture misconfigured: 'widget' was captured more than once"
        );
        assert!(transport.sent().is_empty());
    }
}
