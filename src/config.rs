//! A built configuration: the tree, its values and their lifecycle.
//!
//! A [`Config`] is created by a [`ConfigBuilder`](crate::ConfigBuilder) and is
//! read and written through the typed [`ValueHandle`]s the builder returned.
//!
//! # Update cycle
//!
//! [`set_value`](Config::set_value) and [`update`](Config::update) validate the
//! new value against every constraint, commit it as the real value, save the
//! whole config if it persists, then notify: config-wide callbacks first,
//! then the value's own, each in registration order. While an override is
//! active, changes to the real value are not announced, since the effective
//! value did not move. Setting or removing an override always notifies and
//! never saves.
//!
//! A failed save does not undo the in-memory change. Callbacks still run and
//! the error is returned afterwards.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, trace, warn};

use crate::builder::ConfigBuilder;
use crate::codec::Codec;
use crate::error::TrackfigError;
use crate::file;
use crate::fragment::{self, Document, PathLookup};
use crate::key::Key;
use crate::marshal::{ConfigValue, TypeWrappers};
use crate::metadata::MetadataMap;
use crate::resolve;
use crate::tracked::{ErasedValue, TrackedValue, UntypedValue, ValueHandle};
use crate::tree::{NodeRef, SectionRef, Trie};

pub type ConfigCallback = Arc<dyn Fn(&Config) + Send + Sync>;

static NEXT_CONFIG_ID: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_config_id() -> u64 {
    NEXT_CONFIG_ID.fetch_add(1, Ordering::Relaxed)
}

/// Where and how a config is written on save.
#[derive(Clone)]
pub(crate) struct Persistence {
    pub(crate) path: PathBuf,
    pub(crate) codec: Arc<dyn Codec>,
}

pub struct Config {
    family: String,
    id: String,
    config_id: u64,
    trie: Trie,
    values: Vec<Box<dyn ErasedValue>>,
    callbacks: Vec<ConfigCallback>,
    wrappers: TypeWrappers,
    persistence: Option<Persistence>,
}

impl Config {
    pub fn builder(family: &str, id: &str) -> ConfigBuilder {
        ConfigBuilder::new(family, id)
    }

    pub(crate) fn from_parts(
        family: String,
        id: String,
        config_id: u64,
        trie: Trie,
        values: Vec<Box<dyn ErasedValue>>,
        callbacks: Vec<ConfigCallback>,
        wrappers: TypeWrappers,
    ) -> Self {
        Self {
            family,
            id,
            config_id,
            trie,
            values,
            callbacks,
            wrappers,
            persistence: None,
        }
    }

    pub(crate) fn attach(&mut self, persistence: Persistence) {
        self.persistence = Some(persistence);
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Config-wide metadata, held by the root section.
    pub fn metadata(&self) -> &MetadataMap {
        &self.trie.root.metadata
    }

    pub fn wrappers(&self) -> &TypeWrappers {
        &self.wrappers
    }

    /// The file this config saves to, if it persists.
    pub fn path(&self) -> Option<&Path> {
        self.persistence.as_ref().map(|p| p.path.as_path())
    }

    pub fn root(&self) -> SectionRef<'_> {
        SectionRef::new(&self.trie.root, &self.values)
    }

    pub fn node(&self, key: impl Into<Key>) -> Result<NodeRef<'_>, TrackfigError> {
        let key = key.into();
        self.trie
            .get(&key)
            .and_then(|node| NodeRef::from_node(node, &self.values))
            .ok_or_else(|| TrackfigError::KeyNotFound(key.to_string()))
    }

    /// Every tracked value, depth first in declaration order.
    pub fn values(&self) -> impl Iterator<Item = &dyn UntypedValue> + '_ {
        self.trie
            .value_indices()
            .into_iter()
            .filter_map(|index| self.values.get(index).map(|v| v.as_untyped()))
    }

    /// The canonical document path of the node at `key`.
    pub fn serialized_path(&self, key: &Key) -> Result<Vec<String>, TrackfigError> {
        let lineage = self
            .trie
            .lineage(&self.values, key)
            .ok_or_else(|| TrackfigError::KeyNotFound(key.to_string()))?;
        Ok(resolve::serialized_path(key.components(), &lineage))
    }

    fn index_of<T>(&self, handle: &ValueHandle<T>) -> Result<usize, TrackfigError> {
        if handle.config_id != self.config_id || handle.index >= self.values.len() {
            return Err(TrackfigError::ForeignHandle);
        }
        Ok(handle.index)
    }

    pub fn tracked<T: ConfigValue>(
        &self,
        handle: &ValueHandle<T>,
    ) -> Result<&TrackedValue<T>, TrackfigError> {
        let index = self.index_of(handle)?;
        self.values[index]
            .as_any()
            .downcast_ref::<TrackedValue<T>>()
            .ok_or(TrackfigError::ForeignHandle)
    }

    fn tracked_mut<T: ConfigValue>(
        &mut self,
        handle: &ValueHandle<T>,
    ) -> Result<&mut TrackedValue<T>, TrackfigError> {
        let index = self.index_of(handle)?;
        self.values[index]
            .as_any_mut()
            .downcast_mut::<TrackedValue<T>>()
            .ok_or(TrackfigError::ForeignHandle)
    }

    /// The effective value: the override if set, else the real value.
    pub fn value<T: ConfigValue>(&self, handle: &ValueHandle<T>) -> Result<&T, TrackfigError> {
        self.tracked(handle).map(TrackedValue::value)
    }

    /// Replace the real value, returning the previous one.
    ///
    /// With `persist`, the whole config is saved before callbacks run.
    pub fn set_value<T: ConfigValue>(
        &mut self,
        handle: &ValueHandle<T>,
        value: T,
        persist: bool,
    ) -> Result<T, TrackfigError> {
        let tracked = self.tracked_mut(handle)?;
        tracked.validate(&value)?;
        let old = tracked.replace_real(value);
        let overridden = tracked.is_overridden();

        let saved = if persist { self.save() } else { Ok(()) };
        if !overridden {
            self.notify(handle.index);
        }
        saved.map(|()| old)
    }

    /// Shadow the real value without persisting it.
    pub fn set_override<T: ConfigValue>(
        &mut self,
        handle: &ValueHandle<T>,
        value: T,
    ) -> Result<Option<T>, TrackfigError> {
        let tracked = self.tracked_mut(handle)?;
        tracked.validate(&value)?;
        let old = tracked.replace_override(Some(value));
        self.notify(handle.index);
        Ok(old)
    }

    pub fn remove_override<T: ConfigValue>(
        &mut self,
        handle: &ValueHandle<T>,
    ) -> Result<Option<T>, TrackfigError> {
        let old = self.tracked_mut(handle)?.replace_override(None);
        self.notify(handle.index);
        Ok(old)
    }

    /// Mutate a copy of the real value in place, then commit it like
    /// [`set_value`](Self::set_value) with `persist` set.
    ///
    /// This is how compound values change:
    ///
    /// ```ignore
    /// config.update(&tags, |tags| tags.push("new".to_string()))?;
    /// ```
    pub fn update<T: ConfigValue, R>(
        &mut self,
        handle: &ValueHandle<T>,
        f: impl FnOnce(&mut T) -> R,
    ) -> Result<R, TrackfigError> {
        let tracked = self.tracked_mut(handle)?;
        let mut value = tracked.real_value().clone();
        let result = f(&mut value);
        tracked.validate(&value)?;
        tracked.replace_real(value);
        let overridden = tracked.is_overridden();

        let saved = self.save();
        if !overridden {
            self.notify(handle.index);
        }
        saved.map(|()| result)
    }

    /// Run `callback` after any value in this config changes.
    pub fn register_callback<F>(&mut self, callback: F)
    where
        F: Fn(&Config) + Send + Sync + 'static,
    {
        self.callbacks.push(Arc::new(callback));
    }

    pub fn register_value_callback<T, F>(
        &mut self,
        handle: &ValueHandle<T>,
        callback: F,
    ) -> Result<(), TrackfigError>
    where
        T: ConfigValue,
        F: Fn(&TrackedValue<T>) + Send + Sync + 'static,
    {
        self.tracked_mut(handle)?.add_callback(Arc::new(callback));
        Ok(())
    }

    fn notify(&self, index: usize) {
        for callback in &self.callbacks {
            callback(self);
        }
        if let Some(value) = self.values.get(index) {
            value.invoke_local_callbacks();
        }
    }

    /// Overwrite values from a parsed document.
    ///
    /// Each value takes the first of its candidate paths present in `doc`.
    /// Values that fail to coerce or validate keep their current value and
    /// are logged; the rest still load. Returns how many values were loaded.
    pub fn load_document(&mut self, doc: &Document) -> usize {
        let mut loaded = Vec::new();

        for index in self.trie.value_indices() {
            let key = self.values[index].key().clone();
            let candidates = match self.trie.lineage(&self.values, &key) {
                Some(lineage) => resolve::candidate_paths(key.components(), &lineage),
                None => continue,
            };

            let Some(fragment) = find_fragment(doc, &key, &candidates) else {
                continue;
            };

            match self.values[index].load_fragment(fragment, &self.wrappers) {
                Ok(()) => loaded.push(index),
                Err(error) => warn!(key = %key, %error, "skipping value"),
            }
        }

        debug!(family = %self.family, id = %self.id, loaded = loaded.len(), "loaded document");
        for index in &loaded {
            if !self.values[*index].is_overridden() {
                self.notify(*index);
            }
        }
        loaded.len()
    }

    /// Parse `text` with `codec` and load it.
    pub fn read_str(&mut self, text: &str, codec: &dyn Codec) -> Result<usize, TrackfigError> {
        let doc = codec.parse(text)?;
        Ok(self.load_document(&doc))
    }

    /// The real values as a document, under their canonical paths.
    pub fn to_document(&self) -> Result<Document, TrackfigError> {
        let mut doc = Document::new();
        for index in self.trie.value_indices() {
            let value = &self.values[index];
            let key = value.key();
            let path = self.serialized_path(key)?;
            let written = value
                .real_fragment(&self.wrappers)
                .map_err(|source| TrackfigError::Coercion {
                    key: key.clone(),
                    source,
                })?;

            if fragment::get_path(&doc, &path).is_some() {
                return Err(TrackfigError::KeyResolution {
                    key: key.clone(),
                    reason: format!("'{}' is already written by another value", path.join(".")),
                });
            }
            fragment::set_path(&mut doc, &path, written).map_err(|depth| {
                TrackfigError::KeyResolution {
                    key: key.clone(),
                    reason: format!("'{}' is not a section", path[..=depth].join(".")),
                }
            })?;
        }
        Ok(doc)
    }

    /// Write the whole config to its file. A config without a file saves nothing.
    pub fn save(&self) -> Result<(), TrackfigError> {
        let Some(persistence) = &self.persistence else {
            debug!(family = %self.family, id = %self.id, "in-memory config, nothing to save");
            return Ok(());
        };
        let text = persistence.codec.write(self)?;
        file::write_document(&persistence.path, &text)?;
        debug!(path = %persistence.path.display(), "saved config");
        Ok(())
    }
}

fn find_fragment<'d>(
    doc: &'d Document,
    key: &Key,
    candidates: &[Vec<String>],
) -> Option<&'d fragment::Fragment> {
    for path in candidates {
        match fragment::lookup(doc, path) {
            PathLookup::Found(found) => {
                trace!(key = %key, path = %path.join("."), "resolved");
                return Some(found);
            }
            PathLookup::Missing => {}
            PathLookup::NotAMap { depth } => {
                let error = TrackfigError::KeyResolution {
                    key: key.clone(),
                    reason: format!("'{}' is not a table", path[..=depth].join(".")),
                };
                warn!(%error, "ignoring candidate path");
            }
        }
    }
    None
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("family", &self.family)
            .field("id", &self.id)
            .field("values", &self.values.len())
            .field("callbacks", &self.callbacks.len())
            .field("path", &self.path())
            .finish()
    }
}
