//! The ordered tree of sections and tracked values.
//!
//! Sections own their children in insertion order. Leaves are indices into
//! the owning config's value arena, so the tree itself is cheap to walk and
//! never borrows the values. [`NodeRef`] and [`SectionRef`] pair the two back
//! together for callers.

use indexmap::IndexMap;

use crate::error::TrackfigError;
use crate::key::Key;
use crate::metadata::MetadataMap;
use crate::resolve;
use crate::tracked::{ErasedValue, UntypedValue};

#[derive(Debug)]
pub(crate) enum Node {
    Section(Section),
    Value(usize),
}

#[derive(Debug)]
pub(crate) struct Section {
    pub(crate) key: Key,
    pub(crate) metadata: MetadataMap,
    pub(crate) children: IndexMap<String, Node>,
}

impl Section {
    fn new(key: Key) -> Self {
        Self {
            key,
            metadata: MetadataMap::new(),
            children: IndexMap::new(),
        }
    }
}

#[derive(Debug)]
pub(crate) struct Trie {
    pub(crate) root: Section,
}

fn check_key(key: &Key) -> Result<(), TrackfigError> {
    if key.components().iter().any(String::is_empty) {
        return Err(TrackfigError::InvalidKey {
            key: key.clone(),
            reason: "key components must not be empty".into(),
        });
    }
    Ok(())
}

impl Trie {
    pub(crate) fn new(root_metadata: MetadataMap) -> Self {
        let mut root = Section::new(Key::root());
        root.metadata = root_metadata;
        Self { root }
    }

    /// The section at `key`, creating it and any missing ancestors.
    ///
    /// An existing section is returned as is; a tracked value anywhere on the
    /// path is a [`TrackfigError::DuplicateKey`].
    pub(crate) fn ensure_section(&mut self, key: &Key) -> Result<&mut Section, TrackfigError> {
        check_key(key)?;
        let mut current = &mut self.root;
        for (depth, component) in key.components().iter().enumerate() {
            let node = current
                .children
                .entry(component.clone())
                .or_insert_with(|| Node::Section(Section::new(key.prefix(depth + 1))));
            current = match node {
                Node::Section(section) => section,
                Node::Value(_) => {
                    return Err(TrackfigError::DuplicateKey {
                        key: key.prefix(depth + 1),
                    });
                }
            };
        }
        Ok(current)
    }

    /// Record the value at arena slot `index` under `key`.
    pub(crate) fn put_value(&mut self, key: &Key, index: usize) -> Result<(), TrackfigError> {
        let (Some(leaf), Some(parent)) = (key.last_component(), key.parent()) else {
            return Err(TrackfigError::InvalidKey {
                key: key.clone(),
                reason: "a value needs at least one key component".into(),
            });
        };
        check_key(key)?;
        let section = self.ensure_section(&parent)?;
        if section.children.contains_key(leaf) {
            return Err(TrackfigError::DuplicateKey { key: key.clone() });
        }
        section.children.insert(leaf.to_string(), Node::Value(index));
        Ok(())
    }

    pub(crate) fn get(&self, key: &Key) -> Option<&Node> {
        let (leaf, init) = key.components().split_last()?;
        let mut current = &self.root;
        for component in init {
            match current.children.get(component)? {
                Node::Section(section) => current = section,
                Node::Value(_) => return None,
            }
        }
        current.children.get(leaf)
    }

    /// Metadata of every node along `key`, one entry per component.
    pub(crate) fn lineage<'a>(
        &'a self,
        values: &'a [Box<dyn ErasedValue>],
        key: &Key,
    ) -> Option<Vec<&'a MetadataMap>> {
        let mut lineage = Vec::with_capacity(key.len());
        let mut current = &self.root;
        for (depth, component) in key.components().iter().enumerate() {
            match current.children.get(component)? {
                Node::Section(section) => {
                    lineage.push(&section.metadata);
                    current = section;
                }
                Node::Value(index) if depth + 1 == key.len() => {
                    lineage.push(values.get(*index)?.metadata());
                }
                Node::Value(_) => return None,
            }
        }
        (lineage.len() == key.len()).then_some(lineage)
    }

    /// Arena indices of all values, depth first in insertion order.
    pub(crate) fn value_indices(&self) -> Vec<usize> {
        let mut out = Vec::new();
        collect_indices(&self.root, &mut out);
        out
    }
}

fn collect_indices(section: &Section, out: &mut Vec<usize>) {
    for node in section.children.values() {
        match node {
            Node::Section(child) => collect_indices(child, out),
            Node::Value(index) => out.push(*index),
        }
    }
}

/// A borrowed view of a section.
#[derive(Clone, Copy)]
pub struct SectionRef<'a> {
    section: &'a Section,
    values: &'a [Box<dyn ErasedValue>],
}

impl<'a> SectionRef<'a> {
    pub(crate) fn new(section: &'a Section, values: &'a [Box<dyn ErasedValue>]) -> Self {
        Self { section, values }
    }

    pub fn key(&self) -> &'a Key {
        &self.section.key
    }

    pub fn metadata(&self) -> &'a MetadataMap {
        &self.section.metadata
    }

    pub fn is_root(&self) -> bool {
        self.section.key.is_empty()
    }

    /// Direct children in insertion order.
    pub fn children(self) -> impl Iterator<Item = NodeRef<'a>> {
        let values = self.values;
        self.section
            .children
            .values()
            .filter_map(move |node| NodeRef::from_node(node, values))
    }

    /// The child whose raw key component is `name`.
    pub fn child(&self, name: &str) -> Option<NodeRef<'a>> {
        NodeRef::from_node(self.section.children.get(name)?, self.values)
    }

    pub fn len(&self) -> usize {
        self.section.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.section.children.is_empty()
    }
}

/// A borrowed view of any tree node.
#[derive(Clone, Copy)]
pub enum NodeRef<'a> {
    Section(SectionRef<'a>),
    Value(&'a dyn UntypedValue),
}

impl<'a> NodeRef<'a> {
    pub(crate) fn from_node(node: &'a Node, values: &'a [Box<dyn ErasedValue>]) -> Option<Self> {
        match node {
            Node::Section(section) => Some(NodeRef::Section(SectionRef::new(section, values))),
            Node::Value(index) => values.get(*index).map(|v| NodeRef::Value(v.as_untyped())),
        }
    }

    pub fn key(&self) -> &'a Key {
        match *self {
            NodeRef::Section(section) => section.key(),
            NodeRef::Value(value) => value.key(),
        }
    }

    pub fn metadata(&self) -> &'a MetadataMap {
        match *self {
            NodeRef::Section(section) => section.metadata(),
            NodeRef::Value(value) => value.metadata(),
        }
    }

    fn raw_name(&self) -> &'a str {
        self.key().last_component().unwrap_or("")
    }

    /// The name this node is written under.
    pub fn serialized_name(&self) -> String {
        resolve::serialized_name(self.raw_name(), self.metadata())
    }

    pub fn display_name(&self) -> String {
        resolve::display_name(self.raw_name(), self.metadata())
    }

    pub fn as_section(&self) -> Option<SectionRef<'a>> {
        match *self {
            NodeRef::Section(section) => Some(section),
            NodeRef::Value(_) => None,
        }
    }

    pub fn as_value(&self) -> Option<&'a dyn UntypedValue> {
        match *self {
            NodeRef::Value(value) => Some(value),
            NodeRef::Section(_) => None,
        }
    }
}
