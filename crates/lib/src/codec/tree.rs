//! Hierarchical node tree rebuilt from flat pairs.

use std::collections::{BTreeMap, btree_map::Entry};

use serde::{Serialize, de::DeserializeOwned};
use tracing::trace;

use super::{CodecError, de::NodeDeserializer};
use crate::{
    Value,
    constants::{KEY_DELIMITER_CHAR, PLACEHOLDER},
    kv::{KvPair, Scalar, path},
};

/// A node of the intermediate tree built while decoding.
///
/// A path is either a leaf holding a [`Scalar`] or a branch holding named
/// children, never both. Sequences have no dedicated node kind: they are
/// branches whose children are named `0`, `1`, ...
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Leaf(Scalar),
    Branch(BTreeMap<String, Node>),
}

impl Default for Node {
    fn default() -> Self {
        Node::Branch(BTreeMap::new())
    }
}

impl Node {
    /// Builds a tree from `pairs`, keyed relative to `prefix`.
    ///
    /// Pairs outside of `prefix` are skipped. A pair whose key equals `prefix`
    /// makes the root itself a leaf.
    ///
    /// # Errors
    /// [`CodecError::StructuralConflict`] when one path is used both as a
    /// value and as a directory, in either order.
    pub fn from_pairs(prefix: &str, pairs: &[KvPair]) -> Result<Self, CodecError> {
        let mut root = Node::default();
        for pair in pairs {
            match path::relative_to(prefix, &pair.key) {
                Some(relative) => root.insert(prefix, relative, pair.value.clone())?,
                None => trace!(key = %pair.key, prefix, "skipping key outside of prefix"),
            }
        }
        Ok(root)
    }

    /// Builds a tree mirroring a [`Value`].
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::List(items) => Node::Branch(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| (i.to_string(), Node::from_value(item)))
                    .collect(),
            ),
            Value::Map(entries) => Node::Branch(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), Node::from_value(v)))
                    .collect(),
            ),
            leaf => Node::Leaf(leaf.as_scalar().unwrap_or(Scalar::Null)),
        }
    }

    /// Builds a tree from any serializable value.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self, CodecError> {
        Ok(Node::from_value(&Value::from_serialize(value)?))
    }

    fn insert(&mut self, prefix: &str, relative: &str, value: Scalar) -> Result<(), CodecError> {
        let conflict = |at: &str| CodecError::StructuralConflict {
            path: path::join(prefix, at),
        };

        if relative.is_empty() {
            return match self {
                Node::Branch(children) if !children.is_empty() => Err(conflict("")),
                _ => {
                    *self = Node::Leaf(value);
                    Ok(())
                }
            };
        }

        let (interior, leaf) = match relative.rsplit_once(KEY_DELIMITER_CHAR) {
            Some((interior, leaf)) => (Some(interior), leaf),
            None => (None, relative),
        };

        let mut node = self;
        let mut walked = String::new();
        for segment in interior.into_iter().flat_map(|i| i.split(KEY_DELIMITER_CHAR)) {
            node = match node {
                Node::Branch(children) => children.entry(segment.to_string()).or_default(),
                Node::Leaf(_) => return Err(conflict(&walked)),
            };
            walked = path::join(&walked, segment);
        }

        let Node::Branch(children) = node else {
            return Err(conflict(&walked));
        };
        if matches!(children.get(leaf), Some(Node::Branch(_))) {
            return Err(conflict(&path::join(&walked, leaf)));
        }
        children.insert(leaf.to_string(), Node::Leaf(value));
        Ok(())
    }

    /// Overlays `incoming` onto this tree.
    ///
    /// Branches merge child by child. Leaves, sequences and empty containers
    /// (including a branch holding only the placeholder marker) in `incoming`
    /// replace whatever was there.
    pub fn overlay(&mut self, incoming: Node) {
        match (self, incoming) {
            (Node::Branch(existing), Node::Branch(children))
                if visible_children(&children).next().is_some() && !is_sequence(&children) =>
            {
                for (name, child) in children {
                    match existing.entry(name) {
                        Entry::Occupied(mut entry) => entry.get_mut().overlay(child),
                        Entry::Vacant(entry) => {
                            entry.insert(child);
                        }
                    }
                }
            }
            (this, incoming) => *this = incoming,
        }
    }

    /// Binds the tree onto `T`.
    pub fn bind<T: DeserializeOwned>(&self) -> Result<T, CodecError> {
        T::deserialize(NodeDeserializer::new(self))
    }

    /// Returns true for a leaf node
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }

    /// Looks up a descendant by relative path
    pub fn get(&self, relative: &str) -> Option<&Node> {
        relative
            .split(KEY_DELIMITER_CHAR)
            .filter(|s| !s.is_empty())
            .try_fold(self, |node, segment| match node {
                Node::Branch(children) => children.get(segment),
                Node::Leaf(_) => None,
            })
    }
}

/// Returns true for a placeholder leaf marking an empty container.
pub(crate) fn is_placeholder(name: &str, node: &Node) -> bool {
    name == PLACEHOLDER && matches!(node, Node::Leaf(scalar) if scalar.is_empty())
}

/// Children of a branch, without the placeholder marker.
pub(crate) fn visible_children(
    children: &BTreeMap<String, Node>,
) -> impl Iterator<Item = (&String, &Node)> {
    children
        .iter()
        .filter(|(name, node)| !is_placeholder(name, node))
}

/// Returns sequence elements ordered by index if every child is indexed.
pub(crate) fn indexed_children(children: &BTreeMap<String, Node>) -> Option<Vec<(usize, &Node)>> {
    let mut items = visible_children(children)
        .map(|(name, node)| name.parse::<usize>().ok().map(|i| (i, node)))
        .collect::<Option<Vec<_>>>()?;
    items.sort_by_key(|(i, _)| *i);
    Some(items)
}

/// Returns true if the children are exactly the indices `0..n` for some `n > 0`.
pub(crate) fn is_sequence(children: &BTreeMap<String, Node>) -> bool {
    match indexed_children(children) {
        Some(items) if !items.is_empty() => items.iter().enumerate().all(|(i, (idx, _))| i == *idx),
        _ => false,
    }
}
