//! The untyped document model shared by every codec.
//!
//! Codecs parse text into a [`Document`] and the marshalling engine converts
//! each [`Fragment`] into the shape its tracked value's default demands. There
//! is no null: JSON `null` map entries are dropped during parsing, so an absent
//! key and a null key look the same to the rest of the crate.

use std::fmt;

use indexmap::IndexMap;
use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::Serialize;

/// A string-keyed map preserving source order.
pub type Document = IndexMap<String, Fragment>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Fragment {
    Int(i64),
    Float(f64),
    Bool(bool),
    String(String),
    List(Vec<Fragment>),
    Map(Document),
}

impl Fragment {
    /// The kind name used in mismatch messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Fragment::Int(_) => "integer",
            Fragment::Float(_) => "float",
            Fragment::Bool(_) => "boolean",
            Fragment::String(_) => "string",
            Fragment::List(_) => "list",
            Fragment::Map(_) => "map",
        }
    }

    pub fn as_map(&self) -> Option<&Document> {
        match self {
            Fragment::Map(map) => Some(map),
            _ => None,
        }
    }
}

impl From<i64> for Fragment {
    fn from(value: i64) -> Self {
        Fragment::Int(value)
    }
}

impl From<f64> for Fragment {
    fn from(value: f64) -> Self {
        Fragment::Float(value)
    }
}

impl From<bool> for Fragment {
    fn from(value: bool) -> Self {
        Fragment::Bool(value)
    }
}

impl From<&str> for Fragment {
    fn from(value: &str) -> Self {
        Fragment::String(value.to_string())
    }
}

impl From<String> for Fragment {
    fn from(value: String) -> Self {
        Fragment::String(value)
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fragment::Int(i) => write!(f, "{i}"),
            // `{:?}` keeps the fraction, so `1.0` does not read as an integer.
            Fragment::Float(x) => write!(f, "{x:?}"),
            Fragment::Bool(b) => write!(f, "{b}"),
            Fragment::String(s) => f.write_str(s),
            Fragment::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Fragment::Map(map) => {
                f.write_str("{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k} = {v}")?;
                }
                f.write_str("}")
            }
        }
    }
}

struct FragmentVisitor;

impl<'de> Visitor<'de> for FragmentVisitor {
    type Value = Fragment;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a boolean, number, string, list or map")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Fragment, E> {
        Ok(Fragment::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Fragment, E> {
        Ok(Fragment::Int(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Fragment, E> {
        i64::try_from(v)
            .map(Fragment::Int)
            .map_err(|_| E::custom(format!("integer {v} is out of range")))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Fragment, E> {
        Ok(Fragment::Float(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Fragment, E> {
        Ok(Fragment::String(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Fragment, E> {
        Ok(Fragment::String(v))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Fragment, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element::<Fragment>()? {
            items.push(item);
        }
        Ok(Fragment::List(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Fragment, A::Error> {
        let mut map = Document::new();
        while let Some((key, value)) = access.next_entry::<String, Option<Fragment>>()? {
            if let Some(value) = value {
                map.insert(key, value);
            }
        }
        Ok(Fragment::Map(map))
    }
}

impl<'de> Deserialize<'de> for Fragment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Fragment, D::Error> {
        deserializer.deserialize_any(FragmentVisitor)
    }
}

/// Drop null entries from a parsed top-level map.
pub(crate) fn strip_nulls(raw: IndexMap<String, Option<Fragment>>) -> Document {
    raw.into_iter()
        .filter_map(|(key, value)| value.map(|v| (key, v)))
        .collect()
}

/// Result of descending a document along a path.
#[derive(Debug, PartialEq)]
pub enum PathLookup<'a> {
    Found(&'a Fragment),
    Missing,
    /// The component at `depth` exists but is not a map.
    NotAMap { depth: usize },
}

/// Descend `doc` one component at a time.
pub fn lookup<'a, S: AsRef<str>>(doc: &'a Document, path: &[S]) -> PathLookup<'a> {
    let Some((leaf, init)) = path.split_last() else {
        return PathLookup::Missing;
    };

    let mut current = doc;
    for (depth, segment) in init.iter().enumerate() {
        match current.get(segment.as_ref()) {
            None => return PathLookup::Missing,
            Some(Fragment::Map(map)) => current = map,
            Some(_) => return PathLookup::NotAMap { depth },
        }
    }

    match current.get(leaf.as_ref()) {
        Some(fragment) => PathLookup::Found(fragment),
        None => PathLookup::Missing,
    }
}

pub fn get_path<'a, S: AsRef<str>>(doc: &'a Document, path: &[S]) -> Option<&'a Fragment> {
    match lookup(doc, path) {
        PathLookup::Found(fragment) => Some(fragment),
        _ => None,
    }
}

/// Insert `value` at `path`, creating intermediate maps as needed.
///
/// Returns the depth of the first intermediate that exists and is not a map;
/// nothing is written in that case.
pub fn set_path<S: AsRef<str>>(
    doc: &mut Document,
    path: &[S],
    value: Fragment,
) -> Result<(), usize> {
    let Some((leaf, init)) = path.split_last() else {
        return Ok(());
    };

    let mut current = doc;
    for (depth, segment) in init.iter().enumerate() {
        let entry = current
            .entry(segment.as_ref().to_string())
            .or_insert_with(|| Fragment::Map(Document::new()));
        current = match entry {
            Fragment::Map(map) => map,
            _ => return Err(depth),
        };
    }

    current.insert(leaf.as_ref().to_string(), value);
    Ok(())
}
