//! Assertion failures and the `check!` family of macros
//!
//! Assertions in a fixture return [`AssertionResult`]. A failure carries its
//! message and, when known, the source location that produced it, so a
//! composite report can point at every failing line at once.

use std::any::Any;
use std::fmt;

/// Source location of a failed check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl Location {
    /// Location of the caller (requires `#[track_caller]` up the stack).
    #[track_caller]
    #[must_use]
    pub fn caller() -> Self {
        let loc = std::panic::Location::caller();
        Self {
            file: loc.file().to_string(),
            line: loc.line(),
            column: loc.column(),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// A single failed assertion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionFailure {
    message: String,
    location: Option<Location>,
}

/// Outcome of one assertion
pub type AssertionResult = Result<(), AssertionFailure>;

impl AssertionFailure {
    /// Create a failure located at the caller.
    #[track_caller]
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: Some(Location::caller()),
        }
    }

    /// Create a failure at an explicit location. Used by the `check!` macros.
    #[must_use]
    pub fn at(message: impl Into<String>, file: &str, line: u32, column: u32) -> Self {
        Self {
            message: message.into(),
            location: Some(Location {
                file: file.to_string(),
                line,
                column,
            }),
        }
    }

    /// Create a failure with no known location (errors from collaborators).
    #[must_use]
    pub fn unlocated(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: None,
        }
    }

    /// Convert a caught panic payload into a failure.
    ///
    /// `assert!`/`assert_eq!` payloads are `&str` or `String`; anything else
    /// is reported generically.
    #[must_use]
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "assertion panicked with a non-string payload".to_string()
        };
        Self::unlocated(format!("panicked: {message}"))
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }
}

impl fmt::Display for AssertionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(loc) => write!(f, "{} (at {loc})", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for AssertionFailure {}

/// Check a condition, producing an [`AssertionResult`].
///
/// ```
/// use apifixture_core::{check, AssertionResult};
///
/// fn positive(n: i32) -> AssertionResult {
///     check!(n > 0, "expected a positive number, got {n}")
/// }
/// assert!(positive(1).is_ok());
/// assert!(positive(-1).is_err());
/// ```
#[macro_export]
macro_rules! check {
    ($cond:expr $(,)?) => {
        $crate::check!($cond, "check failed: {}", stringify!($cond))
    };
    ($cond:expr, $($arg:tt)+) => {
        if $cond {
            ::core::result::Result::Ok(())
        } else {
            ::core::result::Result::Err($crate::AssertionFailure::at(
                format!($($arg)+),
                file!(),
                line!(),
                column!(),
            ))
        }
    };
}

/// Check two values for equality, producing an [`AssertionResult`].
#[macro_export]
macro_rules! check_eq {
    ($left:expr, $right:expr $(,)?) => {
        match (&$left, &$right) {
            (left, right) => {
                if *left == *right {
                    ::core::result::Result::Ok(())
                } else {
                    ::core::result::Result::Err($crate::AssertionFailure::at(
                        format!(
                            "check_eq failed: `{}` == `{}`\n  left: {:?}\n right: {:?}",
                            stringify!($left),
                            stringify!($right),
                            left,
                            right
                        ),
                        file!(),
                        line!(),
                        column!(),
                    ))
                }
            }
        }
    };
    ($left:expr, $right:expr, $($arg:tt)+) => {
        match (&$left, &$right) {
            (left, right) => {
                if *left == *right {
                    ::core::result::Result::Ok(())
                } else {
                    ::core::result::Result::Err($crate::AssertionFailure::at(
                        format!(
                            "{}\n  left: {:?}\n right: {:?}",
                            format_args!($($arg)+),
                            left,
                            right
                        ),
                        file!(),
                        line!(),
                        column!(),
                    ))
                }
            }
        }
    };
}

/// Check two values for inequality, producing an [`AssertionResult`].
#[macro_export]
macro_rules! check_ne {
    ($left:expr, $right:expr $(,)?) => {
        match (&$left, &$right) {
            (left, right) => {
                if *left != *right {
                    ::core::result::Result::Ok(())
                } else {
                    ::core::result::Result::Err($crate::AssertionFailure::at(
                        format!(
                            "check_ne failed: `{}` != `{}`\n  both: {:?}",
                            stringify!($left),
                            stringify!($right),
                            left
                        ),
                        file!(),
                        line!(),
                        column!(),
                    ))
                }
            }
        }
    };
}
