//! Homogeneous compound values.
//!
//! A [`ValueList`] or [`ValueMap`] carries a default element alongside its
//! contents. Every element read from a document is coerced against that
//! default, so all elements share one shape even when the collection starts
//! out empty.
//!
//! Compounds held by a tracked value are plain values: mutate them through
//! [`Config::update`](crate::Config::update) so that the owner validates,
//! saves and notifies.

use std::ops::Deref;

use indexmap::IndexMap;

use crate::error::CoercionError;
use crate::fragment::{Document, Fragment};
use crate::marshal::{ConfigValue, TypeWrappers, mismatch};

/// A value made of elements of one type.
pub trait CompoundConfigValue: ConfigValue {
    type Element: ConfigValue;

    fn element_default(&self) -> &Self::Element;

    /// Elements paired with a human-readable position.
    fn positioned(&self) -> Vec<(String, &Self::Element)>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValueList<E> {
    default: E,
    values: Vec<E>,
}

impl<E: ConfigValue> ValueList<E> {
    /// An empty list whose elements are shaped like `default`.
    pub fn new(default: E) -> Self {
        Self {
            default,
            values: Vec::new(),
        }
    }

    pub fn of(default: E, values: impl IntoIterator<Item = E>) -> Self {
        Self {
            default,
            values: values.into_iter().collect(),
        }
    }

    pub fn default_element(&self) -> &E {
        &self.default
    }

    pub fn push(&mut self, value: E) {
        self.values.push(value);
    }

    pub fn insert(&mut self, index: usize, value: E) {
        self.values.insert(index, value);
    }

    pub fn remove(&mut self, index: usize) -> Option<E> {
        (index < self.values.len()).then(|| self.values.remove(index))
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut E> {
        self.values.get_mut(index)
    }
}

impl<E> Deref for ValueList<E> {
    type Target = [E];

    fn deref(&self) -> &[E] {
        &self.values
    }
}

impl<E: ConfigValue> ConfigValue for ValueList<E> {
    fn coerce(
        fragment: &Fragment,
        template: &Self,
        wrappers: &TypeWrappers,
    ) -> Result<Self, CoercionError> {
        let Fragment::List(items) = fragment else {
            return Err(mismatch("list", fragment));
        };
        let values = items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                E::coerce(item, &template.default, wrappers)
                    .map_err(|e| CoercionError::at(format!("[{i}]"), e))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            default: template.default.clone(),
            values,
        })
    }

    fn to_fragment(&self, wrappers: &TypeWrappers) -> Result<Fragment, CoercionError> {
        self.values
            .iter()
            .map(|v| v.to_fragment(wrappers))
            .collect::<Result<Vec<_>, _>>()
            .map(Fragment::List)
    }

    fn check_supported(&self, wrappers: &TypeWrappers) -> Result<(), CoercionError> {
        self.default.check_supported(wrappers)
    }

    fn enum_options(&self) -> Option<Vec<&'static str>> {
        self.default.enum_options()
    }

    fn is_compound(&self) -> bool {
        true
    }
}

impl<E: ConfigValue> CompoundConfigValue for ValueList<E> {
    type Element = E;

    fn element_default(&self) -> &E {
        &self.default
    }

    fn positioned(&self) -> Vec<(String, &E)> {
        self.values
            .iter()
            .enumerate()
            .map(|(i, v)| (format!("[{i}]"), v))
            .collect()
    }
}

/// String-keyed elements in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueMap<E> {
    default: E,
    entries: IndexMap<String, E>,
}

impl<E: ConfigValue> ValueMap<E> {
    pub fn new(default: E) -> Self {
        Self {
            default,
            entries: IndexMap::new(),
        }
    }

    pub fn of<K: Into<String>>(default: E, entries: impl IntoIterator<Item = (K, E)>) -> Self {
        Self {
            default,
            entries: entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn default_element(&self) -> &E {
        &self.default
    }

    /// Insert or replace; a replaced key keeps its position.
    pub fn put(&mut self, key: impl Into<String>, value: E) -> Option<E> {
        self.entries.insert(key.into(), value)
    }

    pub fn remove(&mut self, key: &str) -> Option<E> {
        self.entries.shift_remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&E> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut E> {
        self.entries.get_mut(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &E)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<E: ConfigValue> ConfigValue for ValueMap<E> {
    fn coerce(
        fragment: &Fragment,
        template: &Self,
        wrappers: &TypeWrappers,
    ) -> Result<Self, CoercionError> {
        let Fragment::Map(map) = fragment else {
            return Err(mismatch("map", fragment));
        };
        let entries = map
            .iter()
            .map(|(key, item)| {
                E::coerce(item, &template.default, wrappers)
                    .map(|v| (key.clone(), v))
                    .map_err(|e| CoercionError::at(key, e))
            })
            .collect::<Result<IndexMap<_, _>, _>>()?;
        Ok(Self {
            default: template.default.clone(),
            entries,
        })
    }

    fn to_fragment(&self, wrappers: &TypeWrappers) -> Result<Fragment, CoercionError> {
        let mut doc = Document::new();
        for (key, value) in &self.entries {
            doc.insert(key.clone(), value.to_fragment(wrappers)?);
        }
        Ok(Fragment::Map(doc))
    }

    fn check_supported(&self, wrappers: &TypeWrappers) -> Result<(), CoercionError> {
        self.default.check_supported(wrappers)
    }

    fn enum_options(&self) -> Option<Vec<&'static str>> {
        self.default.enum_options()
    }

    fn is_compound(&self) -> bool {
        true
    }
}

impl<E: ConfigValue> CompoundConfigValue for ValueMap<E> {
    type Element = E;

    fn element_default(&self) -> &E {
        &self.default
    }

    fn positioned(&self) -> Vec<(String, &E)> {
        self.entries.iter().map(|(k, v)| (k.clone(), v)).collect()
    }
}
