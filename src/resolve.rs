//! Key resolution: how tree keys map to document keys and display names.
//!
//! Each level of a key resolves independently from its own node's metadata:
//!
//! 1. an explicit [`SERIAL_NAME`] wins,
//! 2. otherwise the node's [`NAME_CONVENTION`] is applied to the raw component,
//! 3. otherwise the raw component is used unchanged.
//!
//! Conventions are usually set once on a section and reach its descendants
//! through [inheritance](crate::inherit).
//!
//! On read, every level may also be spelled with one of its [`ALIASES`].
//! [`candidate_paths`] lists the complete paths to try: the canonical path
//! first, then every alias combination. Writes only ever use the canonical
//! path.

use indexmap::IndexSet;

use crate::metadata::{
    ALIASES, DISPLAY_NAME, DISPLAY_NAME_CONVENTION, MetadataMap, NAME_CONVENTION, SERIAL_NAME,
};

pub fn serialized_name(raw: &str, metadata: &MetadataMap) -> String {
    if let Some(name) = metadata.get(&SERIAL_NAME) {
        return name.clone();
    }
    match metadata.get(&NAME_CONVENTION) {
        Some(scheme) => scheme.coerce(raw),
        None => raw.to_string(),
    }
}

pub fn display_name(raw: &str, metadata: &MetadataMap) -> String {
    if let Some(name) = metadata.get(&DISPLAY_NAME) {
        return name.clone();
    }
    match metadata.get(&DISPLAY_NAME_CONVENTION) {
        Some(scheme) => scheme.coerce(raw),
        None => raw.to_string(),
    }
}

/// The canonical document path for `components`, given each level's metadata.
pub fn serialized_path(components: &[String], lineage: &[&MetadataMap]) -> Vec<String> {
    components
        .iter()
        .zip(lineage)
        .map(|(raw, metadata)| serialized_name(raw, metadata))
        .collect()
}

/// Every document path a value may be read from, canonical first.
///
/// Later levels vary fastest. Duplicates (an alias equal to the canonical
/// name, say) appear once.
pub fn candidate_paths(components: &[String], lineage: &[&MetadataMap]) -> Vec<Vec<String>> {
    let levels: Vec<Vec<String>> = components
        .iter()
        .zip(lineage)
        .map(|(raw, metadata)| {
            let mut names = vec![serialized_name(raw, metadata)];
            if let Some(aliases) = metadata.get(&ALIASES) {
                names.extend(aliases.iter().map(str::to_string));
            }
            names
        })
        .collect();

    let mut paths: IndexSet<Vec<String>> = IndexSet::new();
    paths.insert(Vec::new());
    for names in &levels {
        let mut next = IndexSet::with_capacity(paths.len() * names.len());
        for prefix in &paths {
            for name in names {
                let mut path = prefix.clone();
                path.push(name.clone());
                next.insert(path);
            }
        }
        paths = next;
    }

    if levels.is_empty() {
        return Vec::new();
    }
    paths.into_iter().collect()
}
