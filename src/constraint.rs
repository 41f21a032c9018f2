use std::fmt;
use std::sync::Arc;

use regex::Regex;

use crate::values::CompoundConfigValue;

type Test<T> = Arc<dyn Fn(&T) -> Option<String> + Send + Sync>;

/// A named predicate over a value.
///
/// The test returns `None` when the value passes, or a failure message.
pub struct Constraint<T> {
    description: String,
    test: Test<T>,
}

impl<T> Clone for Constraint<T> {
    fn clone(&self) -> Self {
        Self {
            description: self.description.clone(),
            test: Arc::clone(&self.test),
        }
    }
}

impl<T> fmt::Debug for Constraint<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Constraint").field(&self.description).finish()
    }
}

impl<T: 'static> Constraint<T> {
    pub fn new<F>(description: impl Into<String>, test: F) -> Self
    where
        F: Fn(&T) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            description: description.into(),
            test: Arc::new(test),
        }
    }

    pub fn test(&self, value: &T) -> Option<String> {
        (self.test)(value)
    }

    pub fn describe(&self) -> &str {
        &self.description
    }

    /// Inclusive bounds.
    pub fn range(min: T, max: T) -> Self
    where
        T: PartialOrd + fmt::Display + Send + Sync,
    {
        let description = format!("range: {min} to {max}");
        Self::new(description, move |value: &T| {
            (value < &min || value > &max)
                .then(|| format!("{value} is not between {min} and {max}"))
        })
    }

    /// Apply `inner` to every element of a compound value.
    pub fn all<E>(inner: Constraint<E>) -> Self
    where
        T: CompoundConfigValue<Element = E>,
        E: 'static,
    {
        let description = format!("all: {}", inner.describe());
        Self::new(description, move |value: &T| {
            let failures: Vec<String> = value
                .positioned()
                .into_iter()
                .filter_map(|(position, element)| {
                    inner.test(element).map(|msg| format!("{position}: {msg}"))
                })
                .collect();
            (!failures.is_empty()).then(|| failures.join(", "))
        })
    }
}

impl Constraint<String> {
    /// The whole string must match `pattern`.
    pub fn matching(pattern: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(&format!("^(?:{pattern})$"))?;
        let description = format!("matching: {pattern}");
        let pattern = pattern.to_string();
        Ok(Self::new(description, move |value: &String| {
            (!regex.is_match(value)).then(|| format!("'{value}' does not match {pattern}"))
        }))
    }
}
