//! Tree positions.
//!
//! A [`Key`] is an ordered sequence of name components. Keys are compared
//! structurally and display as their components joined with `.`. Note that a
//! component may itself contain a dot (serialized names are free-form), so the
//! display form is for humans and logs, not for parsing back.

use std::fmt;

/// An ordered, immutable sequence of name components identifying a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Key {
    components: Vec<String>,
}

impl Key {
    /// The empty key, used for the root of a tree.
    pub fn root() -> Self {
        Self::default()
    }

    /// Build a key from its components, in order.
    pub fn new<I, S>(components: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            components: components.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn component(&self, index: usize) -> Option<&str> {
        self.components.get(index).map(String::as_str)
    }

    pub fn last_component(&self) -> Option<&str> {
        self.components.last().map(String::as_str)
    }

    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// A new key one level deeper than `self`.
    pub fn child(&self, component: impl Into<String>) -> Self {
        let mut components = self.components.clone();
        components.push(component.into());
        Self { components }
    }

    /// Append every component of `other` to a copy of `self`.
    pub fn join(&self, other: &Key) -> Self {
        let mut components = self.components.clone();
        components.extend(other.components.iter().cloned());
        Self { components }
    }

    /// The key of the enclosing node, or `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        let (_, init) = self.components.split_last()?;
        Some(Self {
            components: init.to_vec(),
        })
    }

    /// The first `len` components as a key of their own.
    pub fn prefix(&self, len: usize) -> Self {
        Self {
            components: self.components[..len.min(self.components.len())].to_vec(),
        }
    }

    /// Whether `self` is a strict extension of `ancestor`.
    pub fn is_descendant_of(&self, ancestor: &Key) -> bool {
        self.components.len() > ancestor.components.len()
            && self.components.starts_with(&ancestor.components)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.components.join("."))
    }
}

/// A bare string is a single component, never split on dots.
impl From<&str> for Key {
    fn from(component: &str) -> Self {
        Self::new([component])
    }
}

impl From<String> for Key {
    fn from(component: String) -> Self {
        Self::new([component])
    }
}

impl<const N: usize> From<[&str; N]> for Key {
    fn from(components: [&str; N]) -> Self {
        Self::new(components)
    }
}

impl From<Vec<String>> for Key {
    fn from(components: Vec<String>) -> Self {
        Self { components }
    }
}

impl From<&[&str]> for Key {
    fn from(components: &[&str]) -> Self {
        Self::new(components.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_joins_with_dots() {
        let key = Key::from(["gui", "scale"]);
        assert_eq!(key.to_string(), "gui.scale");
    }

    #[test]
    fn single_string_is_one_component() {
        let key = Key::from("a.b");
        assert_eq!(key.len(), 1);
        assert_eq!(key.last_component(), Some("a.b"));
    }

    #[test]
    fn child_extends_parent() {
        let parent = Key::from("database");
        let child = parent.child("url");
        assert_eq!(child.len(), 2);
        assert!(child.is_descendant_of(&parent));
        assert!(!parent.is_descendant_of(&child));
        assert!(!parent.is_descendant_of(&parent));
        assert_eq!(child.parent(), Some(parent));
    }

    #[test]
    fn root_has_no_parent() {
        assert_eq!(Key::root().parent(), None);
        assert!(Key::root().is_empty());
    }

    #[test]
    fn structural_equality() {
        assert_eq!(Key::from(["a", "b"]), Key::new(vec!["a".to_string(), "b".into()]));
        assert_ne!(Key::from(["a", "b"]), Key::from("a.b"));
    }

    #[test]
    fn prefix_and_component() {
        let key = Key::from(["a", "b", "c"]);
        assert_eq!(key.prefix(2), Key::from(["a", "b"]));
        assert_eq!(key.component(1), Some("b"));
        assert_eq!(key.component(3), None);
    }
}
