//! apifixture-core: failure aggregation, exchange logging and configuration
//!
//! This crate holds the pieces of an API test fixture that do not depend on
//! an HTTP client: assertion failures and the aggregation scope that collects
//! them, the request/response log, and fixture configuration.

pub mod aggregate;
pub mod config;
pub mod equivalence;
pub mod failure;
pub mod log;
pub mod snapshot;

pub use aggregate::{AggregateFailure, Aggregator, aggregate};
pub use config::{ConfigError, FixtureConfig};
pub use equivalence::json_equivalent;
pub use failure::{AssertionFailure, AssertionResult, Location};
pub use log::{ExchangeLog, LogSink, MemorySink, StderrSink};
pub use snapshot::{RequestSnapshot, ResponseSnapshot};
