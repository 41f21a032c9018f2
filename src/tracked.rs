//! Tracked values: the leaves of a config tree.
//!
//! A [`TrackedValue`] holds three states. The *default* is fixed at
//! construction and must pass every constraint. The *real* value is what gets
//! persisted. An optional *override* shadows the real value without being
//! saved, for example while a command-line flag is in effect.
//!
//! Configs store their values type-erased. [`UntypedValue`] is the read-only
//! view codecs and tree walks use; typed access goes through a
//! [`ValueHandle`].

use std::any::{Any, type_name};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::constraint::Constraint;
use crate::error::{CoercionError, TrackfigError};
use crate::fragment::Fragment;
use crate::key::Key;
use crate::marshal::{ConfigValue, TypeWrappers};
use crate::metadata::MetadataMap;

pub type ValueCallback<T> = Arc<dyn Fn(&TrackedValue<T>) + Send + Sync>;

pub struct TrackedValue<T: ConfigValue> {
    key: Key,
    default: T,
    real: T,
    override_value: Option<T>,
    constraints: Vec<Constraint<T>>,
    callbacks: Vec<ValueCallback<T>>,
    metadata: MetadataMap,
}

impl<T: ConfigValue> TrackedValue<T> {
    /// Fails with [`TrackfigError::InvalidValue`] if `default` breaks a constraint.
    pub(crate) fn new(
        key: Key,
        default: T,
        constraints: Vec<Constraint<T>>,
        callbacks: Vec<ValueCallback<T>>,
        metadata: MetadataMap,
    ) -> Result<Self, TrackfigError> {
        let value = Self {
            key,
            real: default.clone(),
            default,
            override_value: None,
            constraints,
            callbacks,
            metadata,
        };
        value.validate(&value.default)?;
        Ok(value)
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    /// The override if one is active, else the real value.
    pub fn value(&self) -> &T {
        self.override_value.as_ref().unwrap_or(&self.real)
    }

    pub fn real_value(&self) -> &T {
        &self.real
    }

    pub fn default_value(&self) -> &T {
        &self.default
    }

    pub fn override_value(&self) -> Option<&T> {
        self.override_value.as_ref()
    }

    pub fn is_overridden(&self) -> bool {
        self.override_value.is_some()
    }

    pub fn metadata(&self) -> &MetadataMap {
        &self.metadata
    }

    pub fn constraints(&self) -> &[Constraint<T>] {
        &self.constraints
    }

    /// Messages of every constraint `value` fails, or `None` if it passes.
    pub fn check_for_failing_constraints(&self, value: &T) -> Option<Vec<String>> {
        let failures: Vec<String> = self
            .constraints
            .iter()
            .filter_map(|constraint| constraint.test(value))
            .collect();
        (!failures.is_empty()).then_some(failures)
    }

    pub(crate) fn validate(&self, value: &T) -> Result<(), TrackfigError> {
        match self.check_for_failing_constraints(value) {
            None => Ok(()),
            Some(reasons) => Err(TrackfigError::InvalidValue {
                key: self.key.clone(),
                reasons,
            }),
        }
    }

    pub(crate) fn replace_real(&mut self, value: T) -> T {
        std::mem::replace(&mut self.real, value)
    }

    pub(crate) fn replace_override(&mut self, value: Option<T>) -> Option<T> {
        std::mem::replace(&mut self.override_value, value)
    }

    pub(crate) fn add_callback(&mut self, callback: ValueCallback<T>) {
        self.callbacks.push(callback);
    }
}

impl<T: ConfigValue> fmt::Debug for TrackedValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackedValue")
            .field("key", &self.key)
            .field("default", &self.default)
            .field("real", &self.real)
            .field("override", &self.override_value)
            .field("constraints", &self.constraints)
            .field("callbacks", &self.callbacks.len())
            .finish()
    }
}

/// Read-only, type-erased view of a tracked value.
pub trait UntypedValue: Send + Sync {
    fn key(&self) -> &Key;

    fn metadata(&self) -> &MetadataMap;

    /// Rust type name of the held value.
    fn type_name(&self) -> &'static str;

    fn is_overridden(&self) -> bool;

    fn real_fragment(&self, wrappers: &TypeWrappers) -> Result<Fragment, CoercionError>;

    fn default_fragment(&self, wrappers: &TypeWrappers) -> Result<Fragment, CoercionError>;

    fn constraint_descriptions(&self) -> Vec<String>;

    fn enum_options(&self) -> Option<Vec<&'static str>>;

    fn is_compound(&self) -> bool;
}

impl<T: ConfigValue> UntypedValue for TrackedValue<T> {
    fn key(&self) -> &Key {
        &self.key
    }

    fn metadata(&self) -> &MetadataMap {
        &self.metadata
    }

    fn type_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn is_overridden(&self) -> bool {
        self.override_value.is_some()
    }

    fn real_fragment(&self, wrappers: &TypeWrappers) -> Result<Fragment, CoercionError> {
        self.real.to_fragment(wrappers)
    }

    fn default_fragment(&self, wrappers: &TypeWrappers) -> Result<Fragment, CoercionError> {
        self.default.to_fragment(wrappers)
    }

    fn constraint_descriptions(&self) -> Vec<String> {
        self.constraints
            .iter()
            .map(|c| c.describe().to_string())
            .collect()
    }

    fn enum_options(&self) -> Option<Vec<&'static str>> {
        self.default.enum_options()
    }

    fn is_compound(&self) -> bool {
        self.default.is_compound()
    }
}

/// Operations a config needs on its stored values.
pub(crate) trait ErasedValue: UntypedValue {
    fn as_untyped(&self) -> &dyn UntypedValue;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn metadata_mut(&mut self) -> &mut MetadataMap;

    fn check_supported(&self, wrappers: &TypeWrappers) -> Result<(), TrackfigError>;

    /// Coerce `fragment` against the default, validate, and store it as the
    /// real value. The previous value stays on failure.
    fn load_fragment(
        &mut self,
        fragment: &Fragment,
        wrappers: &TypeWrappers,
    ) -> Result<(), TrackfigError>;

    fn invoke_local_callbacks(&self);
}

impl<T: ConfigValue> ErasedValue for TrackedValue<T> {
    fn as_untyped(&self) -> &dyn UntypedValue {
        self
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn metadata_mut(&mut self) -> &mut MetadataMap {
        &mut self.metadata
    }

    fn check_supported(&self, wrappers: &TypeWrappers) -> Result<(), TrackfigError> {
        self.default
            .check_supported(wrappers)
            .map_err(|_| TrackfigError::UnsupportedType {
                key: self.key.clone(),
                type_name: type_name::<T>(),
            })
    }

    fn load_fragment(
        &mut self,
        fragment: &Fragment,
        wrappers: &TypeWrappers,
    ) -> Result<(), TrackfigError> {
        let value = T::coerce(fragment, &self.default, wrappers).map_err(|source| {
            TrackfigError::Coercion {
                key: self.key.clone(),
                source,
            }
        })?;
        self.validate(&value)?;
        self.real = value;
        Ok(())
    }

    fn invoke_local_callbacks(&self) {
        for callback in &self.callbacks {
            callback(self);
        }
    }
}

/// A typed index into one config's values.
pub struct ValueHandle<T> {
    pub(crate) config_id: u64,
    pub(crate) index: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ValueHandle<T> {
    pub(crate) fn new(config_id: u64, index: usize) -> Self {
        Self {
            config_id,
            index,
            _marker: PhantomData,
        }
    }
}

impl<T> Clone for ValueHandle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ValueHandle<T> {}

impl<T> fmt::Debug for ValueHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueHandle")
            .field("config", &self.config_id)
            .field("index", &self.index)
            .finish()
    }
}

impl<T> PartialEq for ValueHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.config_id == other.config_id && self.index == other.index
    }
}

impl<T> Eq for ValueHandle<T> {}
