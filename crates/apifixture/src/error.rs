//! Errors returned by [`Fixture::run`](crate::Fixture::run)

use std::fmt;

use apifixture_core::{AggregateFailure, AssertionFailure};

use crate::datagen::DatagenError;

/// Phase of a fixture run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Setup,
    Act,
    Post,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Setup => "setup",
            Self::Act => "act",
            Self::Post => "post",
        })
    }
}

/// Why a fixture run failed.
///
/// `index` is the 1-based position of the call within its phase.
#[derive(Debug, thiserror::Error)]
pub enum FixtureError {
    #[error("fixture misconfigured: {0}")]
    Configuration(String),

    #[error("{phase} request #{index} could not be completed: {message}")]
    Transport {
        phase: Phase,
        index: usize,
        message: String,
    },

    #[error("{phase} request #{index} ({method} {url}) failed: {failure}")]
    Request {
        phase: Phase,
        index: usize,
        method: String,
        url: String,
        failure: AssertionFailure,
    },

    #[error(transparent)]
    Aggregate(#[from] AggregateFailure),

    #[error("value not captured yet: {0}")]
    NotReady(String),

    #[error("cannot serialize request body: {0}")]
    Serialize(String),

    #[error("cannot build model: {0}")]
    Model(#[from] DatagenError),
}

impl FixtureError {
    /// The failing phase, for errors raised while a call was in flight.
    #[must_use]
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Self::Transport { phase, .. } | Self::Request { phase, .. } => Some(*phase),
            Self::Aggregate(_) => Some(Phase::Act),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_error_names_the_call() {
        let err = FixtureError::Request {
            phase: Phase::Setup,
            index: 2,
            method: "POST".into(),
            url: "http://localhost:5000/widgets".into(),
            failure: AssertionFailure::unlocated("expected a success status, got 409 Conflict"),
        };
        insta::assert_snapshot!(
            err.to_string(),
            @"setup request #2 (POST http://localhost:5000/widgets) failed: expected a success status, got 409 Conflict"
        );
        assert_eq!(err.phase(), Some(Phase::Setup));
    }

    #[test]
    fn configuration_error_has_no_phase() {
        let err = FixtureError::Configuration("no act request configured".into());
        assert_eq!(err.phase(), None);
    }

    #[test]
    fn model_error_names_the_type() {
        let err = FixtureError::from(DatagenError::Deserialize {
            type_name: "widgets::Widget",
            message: "invalid length 0".into(),
        });
        assert_eq!(
            err.to_string(),
            "cannot build model: generated value does not fit widgets::Widget: invalid length 0"
        );
        assert_eq!(err.phase(), None);
    }
}
