//! Typed side-information attached to tree nodes.
//!
//! A [`MetadataType<T>`] is a capability key: it names a kind of metadata and
//! fixes the Rust type of its value. A [`MetadataMap`] stores at most one value
//! per type, in insertion order. Types created with
//! [`MetadataType::inherited`] propagate from sections to descendants that have
//! no explicit value of their own (see [`inherit`](crate::inherit)).
//!
//! Types are identified by their name. Two `MetadataType`s sharing a name but
//! not a value type will shadow each other; lookups through the wrong one
//! return `None`.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;

use indexmap::IndexMap;

use crate::naming::NamingScheme;

/// Comment lines written above a node by codecs that support comments.
pub const COMMENTS: MetadataType<Comments> = MetadataType::new("comments");

/// Historical serialized names still recognized on read.
pub const ALIASES: MetadataType<Aliases> = MetadataType::new("aliases");

/// An explicit serialized name, overriding any naming convention.
pub const SERIAL_NAME: MetadataType<String> = MetadataType::new("serial_name");

/// An explicit human-readable name.
pub const DISPLAY_NAME: MetadataType<String> = MetadataType::new("display_name");

/// Naming convention applied to serialized names.
pub const NAME_CONVENTION: MetadataType<NamingScheme> = MetadataType::inherited("name_convention");

/// Naming convention applied to display names.
pub const DISPLAY_NAME_CONVENTION: MetadataType<NamingScheme> =
    MetadataType::inherited("display_name_convention");

/// A warning shown to users before they change a value.
pub const CHANGE_WARNING: MetadataType<ChangeWarning> = MetadataType::inherited("change_warning");

/// A typed metadata key.
pub struct MetadataType<T> {
    name: &'static str,
    inherited: bool,
    _marker: PhantomData<fn() -> T>,
}

impl<T> MetadataType<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            inherited: false,
            _marker: PhantomData,
        }
    }

    /// A metadata type whose values propagate to descendants.
    pub const fn inherited(name: &'static str) -> Self {
        Self {
            name,
            inherited: true,
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_inherited(&self) -> bool {
        self.inherited
    }
}

impl<T> Clone for MetadataType<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for MetadataType<T> {}

impl<T> fmt::Debug for MetadataType<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetadataType")
            .field("name", &self.name)
            .field("inherited", &self.inherited)
            .finish()
    }
}

/// Anything storable as metadata.
pub trait MetadataValue: Any + Send + Sync + fmt::Debug {
    fn clone_boxed(&self) -> Box<dyn MetadataValue>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T> MetadataValue for T
where
    T: Any + Clone + Send + Sync + fmt::Debug,
{
    fn clone_boxed(&self) -> Box<dyn MetadataValue> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

#[derive(Debug)]
pub(crate) struct MetadataEntry {
    inherited: bool,
    value: Box<dyn MetadataValue>,
}

impl Clone for MetadataEntry {
    fn clone(&self) -> Self {
        Self {
            inherited: self.inherited,
            value: self.value.as_ref().clone_boxed(),
        }
    }
}

/// Per-node metadata storage, keyed by [`MetadataType`].
#[derive(Debug, Clone, Default)]
pub struct MetadataMap {
    entries: IndexMap<&'static str, MetadataEntry>,
}

impl MetadataMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value`, replacing any previous value of the same type.
    pub fn insert<T: MetadataValue>(&mut self, ty: &MetadataType<T>, value: T) {
        self.entries.insert(
            ty.name,
            MetadataEntry {
                inherited: ty.inherited,
                value: Box::new(value),
            },
        );
    }

    pub fn get<T: MetadataValue>(&self, ty: &MetadataType<T>) -> Option<&T> {
        self.entries
            .get(ty.name)
            .and_then(|entry| entry.value.as_ref().as_any().downcast_ref::<T>())
    }

    pub fn contains<T: MetadataValue>(&self, ty: &MetadataType<T>) -> bool {
        self.get(ty).is_some()
    }

    pub fn remove<T: MetadataValue>(&mut self, ty: &MetadataType<T>) -> Option<T> {
        let entry = self.entries.shift_remove(ty.name)?;
        entry.value.into_any().downcast::<T>().ok().map(|b| *b)
    }

    /// The value of type `ty`, inserting `init()` first if absent.
    ///
    /// A value stored under the same name with another Rust type is replaced.
    pub fn get_or_insert_with<T: MetadataValue>(
        &mut self,
        ty: &MetadataType<T>,
        init: impl FnOnce() -> T,
    ) -> &mut T {
        if !self.contains(ty) {
            self.insert(ty, init());
        }
        self.entries
            .get_mut(ty.name)
            .and_then(|entry| entry.value.as_mut().as_any_mut().downcast_mut::<T>())
            .expect("metadata entry was just inserted with this type")
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names of the stored metadata types, in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }

    /// Copy every entry of `other` over `self`. Entries of `other` win.
    pub(crate) fn merge_from(&mut self, other: MetadataMap) {
        for (name, entry) in other.entries {
            self.entries.insert(name, entry);
        }
    }

    /// Entries whose type is flagged inherited.
    pub(crate) fn inheritable(&self) -> Vec<(&'static str, MetadataEntry)> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.inherited)
            .map(|(name, entry)| (*name, entry.clone()))
            .collect()
    }

    /// Put-if-absent for every supplied entry.
    pub(crate) fn adopt(&mut self, inherited: &[(&'static str, MetadataEntry)]) {
        for (name, entry) in inherited {
            if !self.entries.contains_key(name) {
                self.entries.insert(name, entry.clone());
            }
        }
    }
}

/// Comment lines, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Comments(Vec<String>);

impl Comments {
    pub fn push(&mut self, line: impl Into<String>) {
        self.0.push(line.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for Comments {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Alternative serialized names, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aliases(Vec<String>);

impl Aliases {
    pub fn push(&mut self, alias: impl Into<String>) {
        self.0.push(alias.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for Aliases {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeWarningKind {
    /// The change only applies after a restart.
    RequiresRestart,
    /// Things may break, intentionally.
    Unsafe,
    /// Things may break because the setting is not mature.
    Experimental,
    /// The message is a translation key.
    CustomTranslatable,
    /// The message is shown as-is.
    Custom,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeWarning {
    pub kind: ChangeWarningKind,
    pub message: Option<String>,
}

impl ChangeWarning {
    pub fn new(kind: ChangeWarningKind) -> Self {
        Self {
            kind,
            message: None,
        }
    }

    pub fn custom(message: impl Into<String>) -> Self {
        Self {
            kind: ChangeWarningKind::Custom,
            message: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COUNTER: MetadataType<u32> = MetadataType::new("counter");
    const SHADOW: MetadataType<String> = MetadataType::new("counter");

    #[test]
    fn insert_and_get() {
        let mut map = MetadataMap::new();
        map.insert(&SERIAL_NAME, "george".to_string());
        assert_eq!(map.get(&SERIAL_NAME).map(String::as_str), Some("george"));
        assert!(map.get(&DISPLAY_NAME).is_none());
    }

    #[test]
    fn insert_replaces() {
        let mut map = MetadataMap::new();
        map.insert(&COUNTER, 1);
        map.insert(&COUNTER, 2);
        assert_eq!(map.get(&COUNTER), Some(&2));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn wrong_value_type_reads_as_absent() {
        let mut map = MetadataMap::new();
        map.insert(&COUNTER, 7);
        assert!(map.get(&SHADOW).is_none());
        assert!(!map.contains(&SHADOW));
    }

    #[test]
    fn get_or_insert_with_accumulates() {
        let mut map = MetadataMap::new();
        map.get_or_insert_with(&COMMENTS, Comments::default).push("one");
        map.get_or_insert_with(&COMMENTS, Comments::default).push("two");
        let lines: Vec<&str> = map.get(&COMMENTS).unwrap().iter().collect();
        assert_eq!(lines, vec!["one", "two"]);
    }

    #[test]
    fn remove_returns_typed_value() {
        let mut map = MetadataMap::new();
        map.insert(&COUNTER, 5);
        assert_eq!(map.remove(&COUNTER), Some(5));
        assert!(map.is_empty());
    }

    #[test]
    fn only_inherited_types_are_inheritable() {
        let mut map = MetadataMap::new();
        map.insert(&NAME_CONVENTION, NamingScheme::SnakeCase);
        map.insert(&SERIAL_NAME, "x".into());
        let names: Vec<&str> = map.inheritable().iter().map(|(n, _)| *n).collect();
        assert_eq!(names, vec!["name_convention"]);
    }

    #[test]
    fn adopt_keeps_explicit_values() {
        let mut parent = MetadataMap::new();
        parent.insert(&NAME_CONVENTION, NamingScheme::SnakeCase);
        parent.insert(&CHANGE_WARNING, ChangeWarning::new(ChangeWarningKind::Unsafe));

        let mut child = MetadataMap::new();
        child.insert(&NAME_CONVENTION, NamingScheme::KebabCase);
        child.adopt(&parent.inheritable());

        assert_eq!(child.get(&NAME_CONVENTION), Some(&NamingScheme::KebabCase));
        assert_eq!(
            child.get(&CHANGE_WARNING).map(|w| w.kind),
            Some(ChangeWarningKind::Unsafe)
        );
    }

    #[test]
    fn clones_are_deep() {
        let mut map = MetadataMap::new();
        map.get_or_insert_with(&COMMENTS, Comments::default).push("a");
        let copy = map.clone();
        map.get_or_insert_with(&COMMENTS, Comments::default).push("b");
        assert_eq!(copy.get(&COMMENTS).unwrap().iter().count(), 1);
    }
}
