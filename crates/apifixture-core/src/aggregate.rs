//! Exception aggregation: evaluate independent checks exhaustively
//!
//! [`aggregate`] opens a scope and hands the body an [`Aggregator`]. Every
//! check run through [`Aggregator::capture`] is evaluated even when an
//! earlier one failed. When the scope ends, all captured failures are
//! reported together as one [`AggregateFailure`].
//!
//! ```
//! use apifixture_core::{aggregate, check_eq, AggregateFailure};
//!
//! let result: Result<(), AggregateFailure> = aggregate(|agg| {
//!     agg.capture(|| check_eq!(1, 2));
//!     agg.capture(|| check_eq!("a", "b"));
//!     Ok(())
//! });
//! assert_eq!(result.unwrap_err().failures().len(), 2);
//! ```

use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use crate::failure::{AssertionFailure, AssertionResult};

/// Collects failures inside one aggregation scope.
#[derive(Debug, Default)]
pub struct Aggregator {
    failures: Vec<AssertionFailure>,
}

impl Aggregator {
    /// Run `action`, capturing an `Err` or a panic instead of propagating it.
    ///
    /// Returns `true` if the action passed.
    pub fn capture<F>(&mut self, action: F) -> bool
    where
        F: FnOnce() -> AssertionResult,
    {
        match panic::catch_unwind(AssertUnwindSafe(action)) {
            Ok(Ok(())) => true,
            Ok(Err(failure)) => {
                self.failures.push(failure);
                false
            }
            Err(payload) => {
                self.failures
                    .push(AssertionFailure::from_panic(payload.as_ref()));
                false
            }
        }
    }

    /// Like [`capture`](Self::capture) for an action that produces a value.
    ///
    /// Returns `None` when the action failed; the failure is recorded.
    pub fn capture_value<T, F>(&mut self, action: F) -> Option<T>
    where
        F: FnOnce() -> Result<T, AssertionFailure>,
    {
        match panic::catch_unwind(AssertUnwindSafe(action)) {
            Ok(Ok(value)) => Some(value),
            Ok(Err(failure)) => {
                self.failures.push(failure);
                None
            }
            Err(payload) => {
                self.failures
                    .push(AssertionFailure::from_panic(payload.as_ref()));
                None
            }
        }
    }

    /// Record a failure that was captured elsewhere.
    pub fn add(&mut self, failure: AssertionFailure) {
        self.failures.push(failure);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    #[must_use]
    pub fn failures(&self) -> &[AssertionFailure] {
        &self.failures
    }

    fn finish(self) -> Result<(), AggregateFailure> {
        if self.failures.is_empty() {
            Ok(())
        } else {
            Err(AggregateFailure {
                failures: self.failures,
            })
        }
    }
}

/// Run `body` in an aggregation scope.
///
/// On exit:
/// - nothing captured, body `Ok(v)` → `Ok(v)`
/// - failures captured → `Err(AggregateFailure)` converted into `E`
/// - body `Err(e)` (or panic) with nothing captured → `e` (or the panic)
///   propagates unchanged
/// - body `Err(e)` (or panic) with failures captured → `e` is appended as the
///   last entry of the composite
///
/// # Errors
///
/// Returns the composite failure or the body's own error as described above.
pub fn aggregate<T, E, F>(body: F) -> Result<T, E>
where
    F: FnOnce(&mut Aggregator) -> Result<T, E>,
    E: From<AggregateFailure> + fmt::Display,
{
    let mut aggregator = Aggregator::default();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| body(&mut aggregator)));

    match outcome {
        Ok(Ok(value)) => aggregator.finish().map(|()| value).map_err(E::from),
        Ok(Err(error)) => {
            if aggregator.is_empty() {
                return Err(error);
            }
            aggregator.add(AssertionFailure::unlocated(error.to_string()));
            match aggregator.finish() {
                Err(composite) => Err(E::from(composite)),
                Ok(()) => Err(error),
            }
        }
        Err(payload) => {
            if aggregator.is_empty() {
                panic::resume_unwind(payload);
            }
            aggregator.add(AssertionFailure::from_panic(payload.as_ref()));
            match aggregator.finish() {
                Err(composite) => Err(E::from(composite)),
                Ok(()) => panic::resume_unwind(payload),
            }
        }
    }
}

/// Every failure captured in one aggregation scope
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateFailure {
    failures: Vec<AssertionFailure>,
}

impl AggregateFailure {
    #[must_use]
    pub fn failures(&self) -> &[AssertionFailure] {
        &self.failures
    }

    #[must_use]
    pub fn into_failures(self) -> Vec<AssertionFailure> {
        self.failures
    }
}

impl fmt::Display for AggregateFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.failures.len();
        let plural = if n == 1 { "" } else { "s" };
        write!(f, "{n} assertion{plural} failed:")?;
        for (i, failure) in self.failures.iter().enumerate() {
            let mut lines = failure.message().lines();
            write!(f, "\n  {}) {}", i + 1, lines.next().unwrap_or(""))?;
            for line in lines {
                write!(f, "\n     {line}")?;
            }
            if let Some(loc) = failure.location() {
                write!(f, "\n     at {loc}")?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for AggregateFailure {}
