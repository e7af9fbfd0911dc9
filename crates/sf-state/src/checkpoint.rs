//! Checkpoints — captured subtrees for all-or-nothing rollback
//!
//! A checkpoint holds the node found at each captured path (or the fact
//! that the path was absent). Because nodes are persistent, capturing is a
//! handful of `Arc` clones regardless of subtree size.

use crate::path::StatePath;
use crate::store::Change;
use crate::tree::Node;

/// Captured state for a set of paths
#[derive(Debug, Clone)]
pub struct Checkpoint {
    label: String,
    version: u64,
    entries: Vec<(StatePath, Option<Node>)>,
}

impl Checkpoint {
    pub(crate) fn new(label: &str, version: u64, entries: Vec<(StatePath, Option<Node>)>) -> Self {
        Self {
            label: label.to_string(),
            version,
            entries,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Store version at capture time
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Captured paths, in capture order
    pub fn paths(&self) -> impl Iterator<Item = &StatePath> {
        self.entries.iter().map(|(p, _)| p)
    }

    /// Whether `path` is covered by this checkpoint
    pub fn covers(&self, path: &StatePath) -> bool {
        self.entries
            .iter()
            .any(|(p, _)| p == path || p.is_ancestor_of(path))
    }

    /// Changes that put every captured path back
    pub(crate) fn changes(&self) -> Vec<(StatePath, Change)> {
        self.entries
            .iter()
            .map(|(path, node)| {
                let change = match node {
                    Some(node) => Change::Set(node.clone()),
                    None => Change::Remove,
                };
                (path.clone(), change)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::store::{StateStore, UpdateOptions};
    use serde_json::json;

    fn store() -> StateStore {
        StateStore::with_initial(json!({
            "game": { "credits": 1000, "isSpinning": false, "reelPositions": [0, 0, 0] },
            "ui": { "message": null }
        }))
    }

    #[test]
    fn test_restore_puts_values_back() {
        let store = store();
        let cp = store
            .create_checkpoint("spin", &["game.credits", "game.isSpinning", "ui.message"])
            .unwrap();

        store
            .update_many(
                [
                    ("game.credits", json!(990)),
                    ("game.isSpinning", json!(true)),
                    ("ui.message", json!("Spinning")),
                ],
                UpdateOptions::default(),
            )
            .unwrap();
        let before_restore = store.version();

        assert!(store.restore_checkpoint(&cp).unwrap());
        assert_eq!(store.version(), before_restore + 1);
        assert_eq!(store.get::<i64>("game.credits"), Some(1000));
        assert_eq!(store.get::<bool>("game.isSpinning"), Some(false));
        assert_eq!(store.select(Some("ui.message")), serde_json::Value::Null);
    }

    #[test]
    fn test_restore_without_changes_is_noop() {
        let store = store();
        let cp = store.create_checkpoint("idle", &["game"]).unwrap();
        assert!(!store.restore_checkpoint(&cp).unwrap());
        assert_eq!(store.version(), 0);
    }

    #[test]
    fn test_restore_removes_paths_absent_at_capture() {
        let store = store();
        let cp = store.create_checkpoint("pre", &["game.pending"]).unwrap();
        store
            .update("game.pending", json!(50), UpdateOptions::default())
            .unwrap();

        store.restore_checkpoint(&cp).unwrap();
        assert!(!store.contains("game.pending"));
        assert!(store.contains("game.credits"));
    }

    #[test]
    fn test_full_checkpoint() {
        let store = store();
        let cp = store.create_full_checkpoint("all");
        store
            .update("game.reelPositions", json!([3, 4, 5]), UpdateOptions::default())
            .unwrap();
        store.restore_checkpoint(&cp).unwrap();
        assert_eq!(store.select(Some("game.reelPositions")), json!([0, 0, 0]));
        assert_eq!(cp.label(), "all");
        assert_eq!(cp.version(), 0);
    }

    #[test]
    fn test_covers() {
        let store = store();
        let cp = store.create_checkpoint("c", &["game"]).unwrap();
        assert!(cp.covers(&"game.credits".parse().unwrap()));
        assert!(!cp.covers(&"ui.message".parse().unwrap()));
        assert_eq!(cp.paths().count(), 1);
    }
}
