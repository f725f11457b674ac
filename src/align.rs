//! Sibling-list alignment: keyed LCS reorder, then positional truncate/extend
use crate::errors::{InvariantViolation, MorphError};
use crate::keys::{Key, KeyResolver};
use crate::sequence::longest_common_subsequence;
use crate::tree::{TreeMut, TreeRead};
use crate::types::{MorphStats, NodeKind};
use log::trace;
use std::collections::HashSet;
use std::hash::Hash;

pub type Keys<C, L> = KeyResolver<<C as TreeRead>::Handle, <L as TreeRead>::Handle>;

/// Brings the live child list to the candidate's length, reordering by key first
/// when both lists are keyed.
pub fn align_children<C, L>(
    candidate: &C,
    candidate_parent: C::Handle,
    live: &mut L,
    live_parent: L::Handle,
    keys: &mut Keys<C, L>,
    stats: &mut MorphStats,
) -> Result<(), MorphError>
where
    C: TreeRead,
    L: TreeMut,
{
    if is_keyed_list(candidate, candidate_parent, &*live, live_parent, keys) {
        keyed_reorder(candidate, candidate_parent, live, live_parent, keys, stats)?;
    }

    let wanted = candidate.children(candidate_parent);
    let mut current = live.children(live_parent);
    while current.len() > wanted.len() {
        if let Some(last) = current.pop() {
            live.remove_child(live_parent, last)?;
            stats.removed += 1;
        }
    }
    for extra in &wanted[current.len()..] {
        let clone = live.import_subtree(candidate, *extra)?;
        live.append_child(live_parent, clone)?;
        stats.inserted += 1;
    }
    Ok(())
}

/// Both lists are non-empty, every element child carries the key attribute, keys
/// are unique within each list and each list has at least one keyed element.
pub fn is_keyed_list<C, L>(
    candidate: &C,
    candidate_parent: C::Handle,
    live: &L,
    live_parent: L::Handle,
    keys: &mut Keys<C, L>,
) -> bool
where
    C: TreeRead,
    L: TreeRead,
{
    let candidate_children = candidate.children(candidate_parent);
    let live_children = live.children(live_parent);
    if candidate_children.is_empty() || live_children.is_empty() {
        return false;
    }
    let attribute = keys.key_attribute().to_string();

    let mut found = false;
    let mut seen = HashSet::new();
    for child in candidate_children {
        if candidate.kind(child) == NodeKind::Element {
            if !candidate.has_attribute(child, &attribute) {
                return false;
            }
            found = true;
        }
        if !seen.insert(keys.candidate_key(candidate, child)) {
            return false;
        }
    }
    if !found {
        return false;
    }

    found = false;
    seen.clear();
    for child in live_children {
        if live.kind(child) == NodeKind::Element {
            if !live.has_attribute(child, &attribute) {
                return false;
            }
            found = true;
        }
        if !seen.insert(keys.live_key(live, child)) {
            return false;
        }
    }
    found
}

/// Reorders live children to the candidate's key order, moving only the nodes
/// that fall outside the longest common subsequence of the two key sequences.
pub fn keyed_reorder<C, L>(
    candidate: &C,
    candidate_parent: C::Handle,
    live: &mut L,
    live_parent: L::Handle,
    keys: &mut Keys<C, L>,
    stats: &mut MorphStats,
) -> Result<(), MorphError>
where
    C: TreeRead,
    L: TreeMut,
{
    let candidate_children = candidate.children(candidate_parent);
    let candidate_keys: Vec<Key> = candidate_children
        .iter()
        .map(|child| keys.candidate_key(candidate, *child))
        .collect();
    let live_keys: Vec<Key> = live
        .children(live_parent)
        .iter()
        .map(|child| keys.live_key(&*live, *child))
        .collect();
    let common = longest_common_subsequence(&candidate_keys, &live_keys);

    let mut removable = HashSet::new();
    let mut j = 0;
    for key in &live_keys {
        if common.get(j) == Some(key) {
            j += 1;
        } else {
            removable.insert(key.clone());
        }
    }

    let mut j = 0;
    for (i, key) in candidate_keys.iter().enumerate() {
        if common.get(j) == Some(key) {
            j += 1;
            continue;
        }
        let picked = if removable.remove(key) {
            trace!("moving keyed node {key}");
            stats.moved += 1;
            find_keyed(&*live, live_parent, key, keys)?
        } else {
            trace!("cloning keyed node {key}");
            let clone = live.import_subtree(candidate, candidate_children[i])?;
            keys.adopt(clone, key.clone());
            stats.inserted += 1;
            clone
        };

        let anchor = if i == 0 {
            live.children(live_parent).first().copied()
        } else {
            let previous = find_keyed(&*live, live_parent, &candidate_keys[i - 1], keys)?;
            let siblings = live.children(live_parent);
            siblings
                .iter()
                .position(|s| *s == previous)
                .and_then(|index| siblings.get(index + 1).copied())
        };
        live.insert_before(live_parent, picked, anchor)?;
    }

    for key in &live_keys {
        if removable.contains(key) {
            trace!("removing keyed node {key}");
            let node = find_keyed(&*live, live_parent, key, keys)?;
            live.remove_child(live_parent, node)?;
            stats.removed += 1;
        }
    }
    Ok(())
}

fn find_keyed<H, L>(
    live: &L,
    live_parent: L::Handle,
    key: &Key,
    keys: &mut KeyResolver<H, L::Handle>,
) -> Result<L::Handle, InvariantViolation>
where
    H: Copy + Eq + Hash,
    L: TreeRead,
{
    live.children(live_parent)
        .into_iter()
        .find(|child| keys.live_key(live, *child) == *key)
        .ok_or_else(|| InvariantViolation::AnchorNotFound { key: key.clone() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Document, NodeId};

    const KEY: &str = "data-unique-key";

    fn keyed_list(items: &[&str]) -> (Document, NodeId) {
        let mut doc = Document::default();
        let ul = doc.create_element("ul");
        doc.append_child(doc.root(), ul).unwrap();
        for item in items {
            let li = doc.create_element("li");
            doc.set_attribute(li, KEY, item).unwrap();
            let text = doc.create_text(item);
            doc.append_child(li, text).unwrap();
            doc.append_child(ul, li).unwrap();
        }
        (doc, ul)
    }

    fn order(doc: &Document, parent: NodeId) -> Vec<String> {
        doc.children(parent)
            .into_iter()
            .filter_map(|c| doc.attribute(c, KEY).map(str::to_string))
            .collect()
    }

    #[test]
    fn keyed_reorder_reuses_common_nodes() {
        let (candidate, c_ul) = keyed_list(&["b", "d", "a", "e"]);
        let (mut live, l_ul) = keyed_list(&["a", "b", "c", "d"]);
        let before = live.children(l_ul);

        let mut keys = KeyResolver::new(KEY);
        let mut stats = MorphStats::default();
        align_children(&candidate, c_ul, &mut live, l_ul, &mut keys, &mut stats).unwrap();

        assert_eq!(order(&live, l_ul), ["b", "d", "a", "e"]);
        let after = live.children(l_ul);
        assert_eq!(after[0], before[1]);
        assert_eq!(after[1], before[3]);
        assert_eq!(after[2], before[0]);
        assert!(!before.contains(&after[3]));
        assert_eq!((stats.moved, stats.inserted, stats.removed), (1, 1, 1));
    }

    #[test]
    fn unkeyed_sibling_disables_reordering() {
        let (candidate, c_ul) = keyed_list(&["b", "a"]);
        let (mut live, l_ul) = keyed_list(&["a", "b"]);
        let plain = live.create_element("li");
        live.append_child(l_ul, plain).unwrap();

        let mut keys = KeyResolver::new(KEY);
        assert!(!is_keyed_list(&candidate, c_ul, &live, l_ul, &mut keys));

        let before = live.children(l_ul);
        let mut stats = MorphStats::default();
        align_children(&candidate, c_ul, &mut live, l_ul, &mut keys, &mut stats).unwrap();
        assert_eq!(live.children(l_ul), before[..2].to_vec());
        assert_eq!(stats.moved, 0);
    }

    #[test]
    fn duplicate_keys_are_not_a_keyed_list() {
        let (candidate, c_ul) = keyed_list(&["a", "a"]);
        let (live, l_ul) = keyed_list(&["a"]);
        let mut keys = KeyResolver::new(KEY);
        assert!(!is_keyed_list(&candidate, c_ul, &live, l_ul, &mut keys));
    }

    #[test]
    fn text_only_lists_are_not_keyed() {
        let mut candidate = Document::default();
        let c_text = candidate.create_text("x");
        candidate.append_child(candidate.root(), c_text).unwrap();
        let mut live = Document::default();
        let l_text = live.create_text("x");
        live.append_child(live.root(), l_text).unwrap();

        let mut keys = KeyResolver::new(KEY);
        assert!(!is_keyed_list(&candidate, candidate.root(), &live, live.root(), &mut keys));
    }

    #[test]
    fn positional_alignment_extends_with_clones() {
        let (candidate, c_ul) = keyed_list(&["a", "b", "c"]);
        let mut live = Document::default();
        let l_ul = live.create_element("ul");
        live.append_child(live.root(), l_ul).unwrap();

        let mut keys = KeyResolver::new(KEY);
        let mut stats = MorphStats::default();
        align_children(&candidate, c_ul, &mut live, l_ul, &mut keys, &mut stats).unwrap();
        assert_eq!(order(&live, l_ul), ["a", "b", "c"]);
        assert_eq!(stats.inserted, 3);
    }

    #[test]
    fn keyed_text_siblings_are_recreated() {
        let mut candidate = Document::default();
        let c_root = candidate.root();
        let mut live = Document::default();
        let l_root = live.root();
        for (doc, root) in [(&mut candidate, c_root), (&mut live, l_root)] {
            let li = doc.create_element("li");
            doc.set_attribute(li, KEY, "only").unwrap();
            doc.append_child(root, li).unwrap();
            let gap = doc.create_text(" ");
            doc.append_child(root, gap).unwrap();
        }
        let old_gap = live.children(l_root)[1];

        let mut keys = KeyResolver::new(KEY);
        let mut stats = MorphStats::default();
        align_children(&candidate, c_root, &mut live, l_root, &mut keys, &mut stats).unwrap();

        let children = live.children(l_root);
        assert_eq!(children.len(), 2);
        assert_ne!(children[1], old_gap);
        assert_eq!(live.text(children[1]), Some(" "));
    }
}
