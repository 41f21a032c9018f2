//! Top-down propagation of inherited metadata.
//!
//! Each node adopts every inherited entry its parent carries and it lacks; a
//! node's own value always wins. The node then passes on everything
//! inheritable it holds, so the closest explicit value reaches each
//! descendant. Runs once, when a config is built.

use crate::metadata::MetadataEntry;
use crate::tracked::ErasedValue;
use crate::tree::{Node, Section};

pub(crate) fn propagate(root: &mut Section, values: &mut [Box<dyn ErasedValue>]) {
    let inherited = root.metadata.inheritable();
    descend(root, values, &inherited);
}

fn descend(
    section: &mut Section,
    values: &mut [Box<dyn ErasedValue>],
    inherited: &[(&'static str, MetadataEntry)],
) {
    for node in section.children.values_mut() {
        match node {
            Node::Section(child) => {
                child.metadata.adopt(inherited);
                let own = child.metadata.inheritable();
                descend(child, values, &own);
            }
            Node::Value(index) => {
                if let Some(value) = values.get_mut(*index) {
                    value.metadata_mut().adopt(inherited);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::untyped;
    use crate::key::Key;
    use crate::metadata::{
        CHANGE_WARNING, COMMENTS, ChangeWarning, ChangeWarningKind, Comments, MetadataMap,
        NAME_CONVENTION,
    };
    use crate::naming::NamingScheme;
    use crate::tree::Trie;

    fn tree() -> (Trie, Vec<Box<dyn ErasedValue>>) {
        let mut root = MetadataMap::new();
        root.insert(&NAME_CONVENTION, NamingScheme::SnakeCase);
        root.insert(&COMMENTS, Comments::from_iter(["root"]));
        let mut trie = Trie::new(root);

        trie.ensure_section(&Key::from("child"))
            .unwrap()
            .metadata
            .insert(&NAME_CONVENTION, NamingScheme::LowerCamelCase);
        trie.ensure_section(&Key::from(["child", "grandchild"])).unwrap();
        trie.put_value(&Key::from(["child", "grandchild", "leaf"]), 0)
            .unwrap();
        trie.put_value(&Key::from("top"), 1).unwrap();

        let values = vec![
            untyped(Key::from(["child", "grandchild", "leaf"]), MetadataMap::new()),
            untyped(Key::from("top"), MetadataMap::new()),
        ];
        (trie, values)
    }

    fn section<'a>(trie: &'a Trie, key: &Key) -> &'a Section {
        match trie.get(key) {
            Some(Node::Section(section)) => section,
            _ => panic!("no section at {key}"),
        }
    }

    #[test]
    fn closest_explicit_value_wins() {
        let (mut trie, mut values) = tree();
        propagate(&mut trie.root, &mut values);

        let grandchild = section(&trie, &Key::from(["child", "grandchild"]));
        assert_eq!(
            grandchild.metadata.get(&NAME_CONVENTION),
            Some(&NamingScheme::LowerCamelCase)
        );
        assert_eq!(
            values[0].metadata().get(&NAME_CONVENTION),
            Some(&NamingScheme::LowerCamelCase)
        );
        assert_eq!(
            values[1].metadata().get(&NAME_CONVENTION),
            Some(&NamingScheme::SnakeCase)
        );
    }

    #[test]
    fn non_inherited_types_stay_put() {
        let (mut trie, mut values) = tree();
        propagate(&mut trie.root, &mut values);
        assert!(!section(&trie, &Key::from("child")).metadata.contains(&COMMENTS));
        assert!(!values[1].metadata().contains(&COMMENTS));
    }

    #[test]
    fn value_keeps_its_own_entry() {
        let (mut trie, mut values) = tree();
        trie.root.metadata.insert(
            &CHANGE_WARNING,
            ChangeWarning::new(ChangeWarningKind::RequiresRestart),
        );
        values[1].metadata_mut().insert(
            &CHANGE_WARNING,
            ChangeWarning::new(ChangeWarningKind::Experimental),
        );
        propagate(&mut trie.root, &mut values);
        assert_eq!(
            values[0].metadata().get(&CHANGE_WARNING).map(|w| w.kind),
            Some(ChangeWarningKind::RequiresRestart)
        );
        assert_eq!(
            values[1].metadata().get(&CHANGE_WARNING).map(|w| w.kind),
            Some(ChangeWarningKind::Experimental)
        );
    }
}
