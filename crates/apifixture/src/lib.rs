//! apifixture: fluent setup/act/verify fixtures for black-box HTTP API tests
//!
//! A test builds a [`Fixture`], registers setup calls, one act request,
//! assertions on the act response and follow-up post calls, then calls
//! [`run`](ApiFixture::run). Setup and post failures stop the run at the
//! failing call; act-phase assertions all run and are reported together.
//!
//! ```no_run
//! use apifixture::prelude::*;
//!
//! #[derive(serde::Deserialize)]
//! struct DateResponse {
//!     utc_now: String,
//! }
//!
//! # fn main() -> Result<(), FixtureError> {
//! Fixture::from_config(&FixtureConfig::load_default().unwrap_or_default())
//!     .when_getting("date")
//!     .should_return_successful_status()
//!     .should_return_json(|d: &DateResponse| check!(!d.utc_now.is_empty()))
//!     .run()
//! # }
//! ```

mod captured;
mod datagen;
mod decode;
mod error;
mod ext;
mod fixture;
mod http;
mod transport;
pub mod uri;

pub use apifixture_core::{
    AggregateFailure, Aggregator, AssertionFailure, AssertionResult, ConfigError, ExchangeLog,
    FixtureConfig, Location, LogSink, MemorySink, StderrSink, aggregate, check, check_eq, check_ne,
    json_equivalent,
};
pub use captured::Captured;
pub use datagen::{DatagenError, ModelFactory};
pub use decode::{json, raw};
pub use error::{FixtureError, Phase};
pub use ext::{AssertionExt, ConvenienceExt, PostExt, RestExt, SetupExt};
pub use fixture::{ApiFixture, Fixture, ResultAssertion};
pub use http::{ClientSettings, HttpRequest, HttpResponse, PreparedRequest, RequestBody};
pub use transport::{BlockingTransport, Transport, TransportError};

pub use reqwest::{Method, StatusCode};

/// Everything a test needs: `use apifixture::prelude::*;`
pub mod prelude {
    pub use crate::{
        ApiFixture, AssertionExt, AssertionResult, Captured, ConvenienceExt, Fixture,
        FixtureConfig, FixtureError, HttpRequest, HttpResponse, Method, ModelFactory, PostExt,
        RequestBody, RestExt, ResultAssertion, SetupExt, StatusCode, check, check_eq, check_ne,
        json, raw,
    };
}
