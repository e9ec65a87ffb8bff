//! Fixture builder and the setup → act → verify → post run
//!
//! A [`Fixture`] collects configurators and assertions without doing any I/O.
//! [`ApiFixture::run`] then executes, strictly in order:
//!
//! 1. client configuration
//! 2. setup calls, each checked on its own (first failure aborts the run)
//! 3. the act request, built from every act configurator
//! 4. every response and result assertion, aggregated into one report
//! 5. post calls, each checked on its own (first failure aborts the rest)

use std::panic::{self, AssertUnwindSafe};

use apifixture_core::{
    Aggregator, AssertionFailure, AssertionResult, ExchangeLog, FixtureConfig, LogSink,
    StderrSink, aggregate,
};

use crate::datagen::ModelFactory;
use crate::error::{FixtureError, Phase};
use crate::http::{ClientSettings, HttpRequest, HttpResponse, PreparedRequest};
use crate::transport::{BlockingTransport, Transport};

/// Assertion over a deserialized result
pub type ResultAssertion<T> = Box<dyn FnOnce(&T) -> AssertionResult>;

type ClientConfigurator = Box<dyn FnOnce(&mut ClientSettings)>;
type RequestConfigurator = Box<dyn FnOnce(&mut HttpRequest) -> Result<(), FixtureError>>;
type ResponseAssertion = Box<dyn FnOnce(&HttpResponse) -> AssertionResult>;
type ResultCheck = Box<dyn FnOnce(&str, &mut Aggregator)>;

/// Configuration surface of a fixture.
///
/// Every method consumes and returns the fixture so calls chain. Nothing is
/// sent until [`run`](Self::run).
pub trait ApiFixture: Sized {
    /// Adjust client-wide settings (base URL, default headers, timeout).
    #[must_use]
    fn configure_client<F>(self, configure: F) -> Self
    where
        F: FnOnce(&mut ClientSettings) + 'static;

    /// Add a setup call. `configure` runs now; `assertion` runs on the response.
    #[must_use]
    fn try_setup_request_with<C, A>(self, configure: C, assertion: A) -> Self
    where
        C: FnOnce(&mut HttpRequest) -> Result<(), FixtureError>,
        A: FnOnce(&HttpResponse) -> AssertionResult + 'static;

    /// Add a step to building the act request. Applied during `run`.
    #[must_use]
    fn try_configure_act_request<F>(self, configure: F) -> Self
    where
        F: FnOnce(&mut HttpRequest) -> Result<(), FixtureError> + 'static;

    /// Check the act response.
    #[must_use]
    fn assert_response<A>(self, assertion: A) -> Self
    where
        A: FnOnce(&HttpResponse) -> AssertionResult + 'static;

    /// Add a post call. `configure` runs after the act phase passed.
    #[must_use]
    fn try_assert_post_request_with<C, A>(self, configure: C, assertion: A) -> Self
    where
        C: FnOnce(&mut HttpRequest) -> Result<(), FixtureError> + 'static,
        A: FnOnce(&HttpResponse) -> AssertionResult + 'static;

    /// Deserialize the act body once and check it with every assertion.
    ///
    /// A deserialization failure is reported and its assertions are skipped;
    /// other entries still run.
    #[must_use]
    fn assert_result_each<T, D>(self, deserialize: D, assertions: Vec<ResultAssertion<T>>) -> Self
    where
        T: 'static,
        D: FnOnce(&str) -> Result<T, AssertionFailure> + 'static;

    /// Use the fixture's [`ModelFactory`] now, while the chain is built.
    ///
    /// An error is kept and returned by `run` before any request is sent.
    #[must_use]
    fn try_using_models<F>(self, action: F) -> Self
    where
        F: FnOnce(&mut ModelFactory) -> Result<(), FixtureError>;

    /// Execute the fixture.
    ///
    /// # Errors
    ///
    /// See [`FixtureError`]; setup and post failures are fatal, act-phase
    /// failures are reported together.
    fn run(self) -> Result<(), FixtureError>;

    /// Add a setup call that must return a success status.
    #[must_use]
    fn setup_request<C>(self, configure: C) -> Self
    where
        C: FnOnce(&mut HttpRequest),
    {
        self.setup_request_with(configure, HttpResponse::ensure_success)
    }

    #[must_use]
    fn setup_request_with<C, A>(self, configure: C, assertion: A) -> Self
    where
        C: FnOnce(&mut HttpRequest),
        A: FnOnce(&HttpResponse) -> AssertionResult + 'static,
    {
        self.try_setup_request_with(
            |request| {
                configure(request);
                Ok(())
            },
            assertion,
        )
    }

    #[must_use]
    fn configure_act_request<F>(self, configure: F) -> Self
    where
        F: FnOnce(&mut HttpRequest) + 'static,
    {
        self.try_configure_act_request(move |request| {
            configure(request);
            Ok(())
        })
    }

    /// Add a post call that must return a success status.
    #[must_use]
    fn assert_post_request<C>(self, configure: C) -> Self
    where
        C: FnOnce(&mut HttpRequest) + 'static,
    {
        self.assert_post_request_with(configure, HttpResponse::ensure_success)
    }

    #[must_use]
    fn assert_post_request_with<C, A>(self, configure: C, assertion: A) -> Self
    where
        C: FnOnce(&mut HttpRequest) + 'static,
        A: FnOnce(&HttpResponse) -> AssertionResult + 'static,
    {
        self.try_assert_post_request_with(
            move |request| {
                configure(request);
                Ok(())
            },
            assertion,
        )
    }

    #[must_use]
    fn assert_result<T, D, A>(self, deserialize: D, assertion: A) -> Self
    where
        T: 'static,
        D: FnOnce(&str) -> Result<T, AssertionFailure> + 'static,
        A: FnOnce(&T) -> AssertionResult + 'static,
    {
        self.assert_result_each(deserialize, vec![Box::new(assertion)])
    }
}

struct SetupCall {
    request: Result<HttpRequest, FixtureError>,
    assertion: ResponseAssertion,
}

struct PostCall {
    configure: RequestConfigurator,
    assertion: ResponseAssertion,
}

/// An HTTP API test fixture
pub struct Fixture {
    log: ExchangeLog,
    models: ModelFactory,
    model_errors: Vec<FixtureError>,
    client_configurators: Vec<ClientConfigurator>,
    setup_calls: Vec<SetupCall>,
    act_configurators: Vec<RequestConfigurator>,
    response_assertions: Vec<ResponseAssertion>,
    result_checks: Vec<ResultCheck>,
    post_calls: Vec<PostCall>,
}

impl Default for Fixture {
    fn default() -> Self {
        Self::new()
    }
}

impl Fixture {
    /// Fixture logging to stderr. The log clock starts now.
    #[must_use]
    pub fn new() -> Self {
        Self::with_sink(Box::new(StderrSink))
    }

    #[must_use]
    pub fn with_sink(sink: Box<dyn LogSink>) -> Self {
        Self {
            log: ExchangeLog::new(sink),
            models: ModelFactory::default(),
            model_errors: Vec::new(),
            client_configurators: Vec::new(),
            setup_calls: Vec::new(),
            act_configurators: Vec::new(),
            response_assertions: Vec::new(),
            result_checks: Vec::new(),
            post_calls: Vec::new(),
        }
    }

    /// Fixture preconfigured from a [`FixtureConfig`].
    #[must_use]
    pub fn from_config(config: &FixtureConfig) -> Self {
        let mut fixture = Self::new();
        fixture.log.set_masking(config.mask_headers);
        fixture.apply_config(config)
    }

    /// Register client configurators for `config`'s settings.
    #[must_use]
    pub fn apply_config(self, config: &FixtureConfig) -> Self {
        let config = config.clone();
        self.configure_client(move |settings| {
            settings.set_base_url(config.base_url);
            for (name, value) in config.headers {
                settings.set_default_header(name, value);
            }
            if let Some(secs) = config.timeout_secs.filter(|s| s.is_finite() && *s > 0.0) {
                settings.timeout = Some(std::time::Duration::from_secs_f64(secs));
            }
            settings.follow_redirects = config.follow_redirects;
        })
    }

    #[must_use]
    pub fn with_models(mut self, models: ModelFactory) -> Self {
        self.models = models;
        self
    }

    #[must_use]
    pub fn with_log_masking(mut self, mask_headers: bool) -> Self {
        self.log.set_masking(mask_headers);
        self
    }

    /// Model factory for building request bodies.
    pub fn models(&mut self) -> &mut ModelFactory {
        &mut self.models
    }

    /// Execute the fixture over `transport`.
    ///
    /// # Errors
    ///
    /// See [`ApiFixture::run`].
    pub fn run_with<T: Transport>(self, mut transport: T) -> Result<(), FixtureError> {
        let Self {
            log,
            model_errors,
            client_configurators,
            setup_calls,
            act_configurators,
            response_assertions,
            result_checks,
            post_calls,
            ..
        } = self;

        if let Some(error) = model_errors.into_iter().next() {
            return Err(error);
        }

        if act_configurators.is_empty() {
            return Err(FixtureError::Configuration(
                "no act request configured; add one with a when_* helper".to_string(),
            ));
        }

        let mut settings = ClientSettings::default();
        for configure in client_configurators {
            configure(&mut settings);
        }
        transport
            .configure(&settings)
            .map_err(|e| FixtureError::Configuration(e.to_string()))?;

        let mut runner = Runner {
            transport,
            settings,
            log: &log,
        };

        let setup_total = setup_calls.len();
        for (i, call) in setup_calls.into_iter().enumerate() {
            log.note(&format!("setup {}/{setup_total}", i + 1));
            runner.checked_call(Phase::Setup, i + 1, call.request?, call.assertion)?;
        }

        log.note("act");
        let mut request = HttpRequest::default();
        for configure in act_configurators {
            configure(&mut request)?;
        }
        let (_, response) = runner.exchange(Phase::Act, 1, request)?;

        aggregate(|agg| {
            for assertion in response_assertions {
                agg.capture(|| assertion(&response));
            }
            for check in result_checks {
                check(response.body(), &mut *agg);
            }
            Ok::<(), FixtureError>(())
        })?;

        let post_total = post_calls.len();
        for (i, call) in post_calls.into_iter().enumerate() {
            log.note(&format!("post {}/{post_total}", i + 1));
            let mut request = HttpRequest::default();
            (call.configure)(&mut request)?;
            runner.checked_call(Phase::Post, i + 1, request, call.assertion)?;
        }

        Ok(())
    }
}

impl ApiFixture for Fixture {
    fn configure_client<F>(mut self, configure: F) -> Self
    where
        F: FnOnce(&mut ClientSettings) + 'static,
    {
        self.client_configurators.push(Box::new(configure));
        self
    }

    fn try_setup_request_with<C, A>(mut self, configure: C, assertion: A) -> Self
    where
        C: FnOnce(&mut HttpRequest) -> Result<(), FixtureError>,
        A: FnOnce(&HttpResponse) -> AssertionResult + 'static,
    {
        let mut request = HttpRequest::default();
        let request = configure(&mut request).map(|()| request);
        self.setup_calls.push(SetupCall {
            request,
            assertion: Box::new(assertion),
        });
        self
    }

    fn try_configure_act_request<F>(mut self, configure: F) -> Self
    where
        F: FnOnce(&mut HttpRequest) -> Result<(), FixtureError> + 'static,
    {
        self.act_configurators.push(Box::new(configure));
        self
    }

    fn assert_response<A>(mut self, assertion: A) -> Self
    where
        A: FnOnce(&HttpResponse) -> AssertionResult + 'static,
    {
        self.response_assertions.push(Box::new(assertion));
        self
    }

    fn try_assert_post_request_with<C, A>(mut self, configure: C, assertion: A) -> Self
    where
        C: FnOnce(&mut HttpRequest) -> Result<(), FixtureError> + 'static,
        A: FnOnce(&HttpResponse) -> AssertionResult + 'static,
    {
        self.post_calls.push(PostCall {
            configure: Box::new(configure),
            assertion: Box::new(assertion),
        });
        self
    }

    fn assert_result_each<T, D>(
        mut self,
        deserialize: D,
        assertions: Vec<ResultAssertion<T>>,
    ) -> Self
    where
        T: 'static,
        D: FnOnce(&str) -> Result<T, AssertionFailure> + 'static,
    {
        let check = move |body: &str, agg: &mut Aggregator| {
            if let Some(value) = agg.capture_value(|| deserialize(body)) {
                for assertion in assertions {
                    agg.capture(|| assertion(&value));
                }
            }
        };
        self.result_checks.push(Box::new(check));
        self
    }

    fn try_using_models<F>(mut self, action: F) -> Self
    where
        F: FnOnce(&mut ModelFactory) -> Result<(), FixtureError>,
    {
        if let Err(error) = action(&mut self.models) {
            self.model_errors.push(error);
        }
        self
    }

    fn run(self) -> Result<(), FixtureError> {
        self.run_with(BlockingTransport::new())
    }
}

impl std::fmt::Debug for Fixture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fixture")
            .field("client_configurators", &self.client_configurators.len())
            .field("setup_calls", &self.setup_calls.len())
            .field("act_configurators", &self.act_configurators.len())
            .field("response_assertions", &self.response_assertions.len())
            .field("result_checks", &self.result_checks.len())
            .field("post_calls", &self.post_calls.len())
            .finish_non_exhaustive()
    }
}

/// Sends and logs the calls of one run.
struct Runner<'a, T> {
    transport: T,
    settings: ClientSettings,
    log: &'a ExchangeLog,
}

impl<T: Transport> Runner<'_, T> {
    fn exchange(
        &mut self,
        phase: Phase,
        index: usize,
        request: HttpRequest,
    ) -> Result<(PreparedRequest, HttpResponse), FixtureError> {
        let prepared = PreparedRequest::prepare(request, &self.settings)?;
        self.log.request(&prepared.snapshot());
        let response = self
            .transport
            .send(&prepared)
            .map_err(|e| FixtureError::Transport {
                phase,
                index,
                message: e.to_string(),
            })?;
        self.log.response(&response.snapshot());
        Ok((prepared, response))
    }

    /// Send one setup or post call; a failed assertion is fatal.
    fn checked_call(
        &mut self,
        phase: Phase,
        index: usize,
        request: HttpRequest,
        assertion: ResponseAssertion,
    ) -> Result<(), FixtureError> {
        let (prepared, response) = self.exchange(phase, index, request)?;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| assertion(&response)))
            .unwrap_or_else(|payload| Err(AssertionFailure::from_panic(payload.as_ref())));
        outcome.map_err(|failure| FixtureError::Request {
            phase,
            index,
            method: prepared.method().to_string(),
            url: prepared.url().to_string(),
            failure,
        })
    }
}
