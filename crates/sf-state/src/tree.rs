//! Persistent state tree
//!
//! Objects are `Arc`-shared branches; everything else (numbers, strings,
//! booleans, null, arrays) is a leaf. Writing a path copies only the
//! branches from the root down to the changed leaf, every other subtree is
//! shared with the previous version. A published tree is never mutated.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::{StateError, StateResult};

/// One node of the state tree
#[derive(Debug, Clone)]
pub enum Node {
    Leaf(Value),
    Branch(Arc<BTreeMap<String, Node>>),
}

impl Node {
    /// Empty object
    pub fn empty() -> Self {
        Node::Branch(Arc::new(BTreeMap::new()))
    }

    /// Convert a JSON value, turning every object into a fresh branch
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Node::Branch(Arc::new(
                map.into_iter()
                    .map(|(k, v)| (k, Node::from_value(v)))
                    .collect(),
            )),
            other => Node::Leaf(other),
        }
    }

    /// Deep copy out to JSON; the result shares nothing with the tree
    pub fn to_value(&self) -> Value {
        match self {
            Node::Leaf(v) => v.clone(),
            Node::Branch(children) => {
                let mut map = Map::new();
                for (k, child) in children.iter() {
                    map.insert(k.clone(), child.to_value());
                }
                Value::Object(map)
            }
        }
    }

    /// Change-detection equality: leaves by value, branches by identity
    pub fn same(&self, other: &Node) -> bool {
        match (self, other) {
            (Node::Leaf(a), Node::Leaf(b)) => a == b,
            (Node::Branch(a), Node::Branch(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Node at a path, `None` if any segment is missing
    pub fn get(&self, segments: &[String]) -> Option<&Node> {
        let mut node = self;
        for segment in segments {
            match node {
                Node::Branch(children) => node = children.get(segment)?,
                Node::Leaf(_) => return None,
            }
        }
        Some(node)
    }

    /// New tree with `value` at `segments`; missing or null intermediates
    /// become empty objects
    pub fn with(&self, segments: &[String], value: Node) -> StateResult<Node> {
        self.with_at(segments, 0, Some(value))
    }

    /// New tree without the key at `segments` (no-op if absent)
    pub fn without(&self, segments: &[String]) -> StateResult<Node> {
        if segments.is_empty() {
            return Ok(Node::empty());
        }
        self.with_at(segments, 0, None)
    }

    fn with_at(&self, segments: &[String], depth: usize, value: Option<Node>) -> StateResult<Node> {
        let Some(segment) = segments.get(depth) else {
            return Ok(value.unwrap_or_else(Node::empty));
        };

        let mut children = match self {
            Node::Branch(children) => BTreeMap::clone(children),
            Node::Leaf(Value::Null) => BTreeMap::new(),
            Node::Leaf(_) => {
                return Err(StateError::NotAnObject {
                    path: segments.join("."),
                    at: segments[..depth].join("."),
                });
            }
        };

        let is_last = depth + 1 == segments.len();
        match (is_last, value) {
            (true, None) => {
                children.remove(segment);
            }
            (true, Some(v)) => {
                children.insert(segment.clone(), v);
            }
            (false, value) => {
                let child = children
                    .get(segment)
                    .cloned()
                    .unwrap_or(Node::Leaf(Value::Null));
                if value.is_none() && child.get(&segments[depth + 1..]).is_none() {
                    // nothing to remove below here
                    return Ok(self.clone());
                }
                let updated = child.with_at(segments, depth + 1, value)?;
                children.insert(segment.clone(), updated);
            }
        }

        Ok(Node::Branch(Arc::new(children)))
    }
}

impl Default for Node {
    fn default() -> Self {
        Node::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn segs(path: &str) -> Vec<String> {
        path.split('.').map(str::to_string).collect()
    }

    fn sample() -> Node {
        Node::from_value(json!({
            "game": { "credits": 100, "lastWin": 0 },
            "features": { "freeSpins": { "active": false, "remaining": 0 } }
        }))
    }

    #[test]
    fn test_round_trip() {
        let value = json!({ "a": { "b": [1, 2, 3], "c": null }, "d": "x" });
        assert_eq!(Node::from_value(value.clone()).to_value(), value);
    }

    #[test]
    fn test_with_shares_unrelated_subtrees() {
        let before = sample();
        let after = before
            .with(&segs("game.credits"), Node::Leaf(json!(90)))
            .unwrap();

        assert_eq!(after.get(&segs("game.credits")).unwrap().to_value(), json!(90));
        assert_eq!(before.get(&segs("game.credits")).unwrap().to_value(), json!(100));

        let old_features = before.get(&segs("features")).unwrap();
        let new_features = after.get(&segs("features")).unwrap();
        assert!(old_features.same(new_features));
        assert!(!before.get(&segs("game")).unwrap().same(after.get(&segs("game")).unwrap()));
    }

    #[test]
    fn test_with_creates_intermediates() {
        let tree = Node::empty()
            .with(&segs("ui.toast.text"), Node::Leaf(json!("hi")))
            .unwrap();
        assert_eq!(tree.to_value(), json!({ "ui": { "toast": { "text": "hi" } } }));
    }

    #[test]
    fn test_with_through_primitive_fails() {
        let err = sample()
            .with(&segs("game.credits.extra"), Node::Leaf(json!(1)))
            .unwrap_err();
        assert!(matches!(err, StateError::NotAnObject { .. }));
    }

    #[test]
    fn test_without() {
        let tree = sample().without(&segs("game.lastWin")).unwrap();
        assert_eq!(tree.to_value()["game"], json!({ "credits": 100 }));

        let untouched = sample();
        let same = untouched.without(&segs("nope.deeper")).unwrap();
        assert!(same.same(&untouched));
    }

    #[test]
    fn test_same_semantics() {
        assert!(Node::Leaf(json!(5)).same(&Node::Leaf(json!(5))));
        assert!(Node::Leaf(json!([1, 2])).same(&Node::Leaf(json!([1, 2]))));
        let a = Node::from_value(json!({ "x": 1 }));
        let b = Node::from_value(json!({ "x": 1 }));
        assert!(!a.same(&b));
        assert!(a.same(&a.clone()));
    }
}
