//! Values captured by the setup phase for use in later phases

use std::cell::OnceCell;
use std::fmt;
use std::rc::Rc;

use apifixture_core::{AssertionFailure, AssertionResult};

use crate::error::FixtureError;

/// Handle to a value filled in while the fixture runs.
///
/// Clones share the same slot. Register the handle with a setup helper, then
/// read it from a lazily applied act or post configurator:
///
/// ```no_run
/// use apifixture::prelude::*;
/// # #[derive(serde::Deserialize)] struct Widget { id: u64 }
///
/// let created: Captured<Widget> = Captured::new("created widget");
/// let id = created.clone();
/// Fixture::new()
///     .having_base_url("http://localhost:5000/")
///     .having_previously_created_into("widgets", &serde_json::json!({"name": "a"}), &created)
///     .when_with(Method::GET, move || Ok(format!("widgets/{}", id.get()?.id)), None)
///     .should_return_successful_status()
///     .run()
///     .unwrap();
/// ```
pub struct Captured<T> {
    name: Rc<str>,
    slot: Rc<OnceCell<T>>,
}

impl<T> Captured<T> {
    /// Empty handle; `name` appears in not-ready errors.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: Rc::from(name),
            slot: Rc::new(OnceCell::new()),
        }
    }

    /// The captured value.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::NotReady`] until the setup step stored it.
    pub fn get(&self) -> Result<&T, FixtureError> {
        self.slot.get().ok_or_else(|| {
            FixtureError::NotReady(format!(
                "'{}' is only available after the setup step that captures it has run",
                self.name
            ))
        })
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.slot.get().is_some()
    }

    /// Store the value.
    ///
    /// # Errors
    ///
    /// Fails if a value was already stored.
    pub fn set(&self, value: T) -> AssertionResult {
        self.slot.set(value).map_err(|_| {
            AssertionFailure::unlocated(format!("'{}' was captured more than once", self.name))
        })
    }
}

impl<T: Clone> Captured<T> {
    /// Clone of the captured value.
    ///
    /// # Errors
    ///
    /// Returns [`FixtureError::NotReady`] until the setup step stored it.
    pub fn value(&self) -> Result<T, FixtureError> {
        self.get().cloned()
    }
}

impl<T> Clone for Captured<T> {
    fn clone(&self) -> Self {
        Self {
            name: Rc::clone(&self.name),
            slot: Rc::clone(&self.slot),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Captured<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Captured")
            .field("name", &self.name)
            .field("value", &self.slot.get())
            .finish()
    }
}
