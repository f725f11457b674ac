//! Per-call sibling keys
use crate::tree::TreeRead;
use crate::types::NodeKind;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

/// Identity of a sibling for the duration of one reconciliation call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Key(String);

impl Key {
    fn explicit(kind: NodeKind, value: &str) -> Self {
        Key(format!("{kind};{value}"))
    }

    fn synthetic(kind: NodeKind, ordinal: usize) -> Self {
        Key(format!("{kind};{ordinal}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Caches the key of every node looked at during one call. Candidate and live
/// handles live in separate maps but share the ordinal counter, so a synthetic
/// key never collides across the two trees.
#[derive(Debug)]
pub struct KeyResolver<C, L> {
    key_attribute: String,
    candidate: HashMap<C, Key>,
    live: HashMap<L, Key>,
    next_ordinal: usize,
}

impl<C: Copy + Eq + Hash, L: Copy + Eq + Hash> KeyResolver<C, L> {
    pub fn new(key_attribute: &str) -> Self {
        KeyResolver {
            key_attribute: key_attribute.to_string(),
            candidate: HashMap::new(),
            live: HashMap::new(),
            next_ordinal: 0,
        }
    }

    pub fn key_attribute(&self) -> &str {
        &self.key_attribute
    }

    pub fn candidate_key<T: TreeRead<Handle = C> + ?Sized>(&mut self, tree: &T, node: C) -> Key {
        resolve(
            &mut self.candidate,
            &mut self.next_ordinal,
            &self.key_attribute,
            tree,
            node,
        )
    }

    pub fn live_key<T: TreeRead<Handle = L> + ?Sized>(&mut self, tree: &T, node: L) -> Key {
        resolve(
            &mut self.live,
            &mut self.next_ordinal,
            &self.key_attribute,
            tree,
            node,
        )
    }

    /// Registers a live node cloned from the candidate under the candidate's key.
    pub fn adopt(&mut self, node: L, key: Key) {
        self.live.insert(node, key);
    }
}

fn resolve<T: TreeRead + ?Sized>(
    cache: &mut HashMap<T::Handle, Key>,
    next_ordinal: &mut usize,
    key_attribute: &str,
    tree: &T,
    node: T::Handle,
) -> Key {
    if let Some(key) = cache.get(&node) {
        return key.clone();
    }
    let kind = tree.kind(node);
    let explicit = match kind {
        NodeKind::Element => tree.attribute(node, key_attribute),
        NodeKind::Text => None,
    };
    let key = match explicit {
        Some(value) => Key::explicit(kind, value),
        None => {
            let ordinal = *next_ordinal;
            *next_ordinal += 1;
            Key::synthetic(kind, ordinal)
        }
    };
    cache.insert(node, key.clone());
    key
}
