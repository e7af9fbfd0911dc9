//! StateStore — the single source of truth for game state
//!
//! ## Guarantees
//!
//! - Readers get deep copies; nothing handed out aliases the stored tree
//! - Every committed change bumps the version by exactly one; no-op writes
//!   commit nothing
//! - `update_many` publishes all of its paths in one commit
//! - Notifications for a commit finish before the next commit's begin, even
//!   when a subscriber writes to the store from inside its callback
//! - A failing subscriber is logged and skipped; the commit stands
//!
//! ## Lifecycle
//!
//! `Uninitialized → Initialized → Disposed`. Writes are only accepted while
//! initialized.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::checkpoint::Checkpoint;
use crate::error::{StateError, StateResult};
use crate::path::StatePath;
use crate::tree::Node;

/// Subscription key that receives every change
pub const WILDCARD: &str = "*";

/// Subscriber callback: `(new_value, old_value, changed_path)`
pub type SubscriberFn = Arc<dyn Fn(&Value, &Value, &str) -> anyhow::Result<()> + Send + Sync>;

/// Store lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Uninitialized,
    Initialized,
    Disposed,
}

/// Per-update options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Commit without notifying subscribers
    pub silent: bool,
    /// Reject the update unless the store is at exactly this version
    pub expected_version: Option<u64>,
}

impl UpdateOptions {
    pub fn silent() -> Self {
        Self {
            silent: true,
            expected_version: None,
        }
    }

    pub fn expecting(version: u64) -> Self {
        Self {
            silent: false,
            expected_version: Some(version),
        }
    }
}

/// Handle returned by [`StateStore::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Debug, Clone)]
enum Scope {
    All,
    Path(StatePath),
}

struct Subscription {
    id: SubscriptionId,
    scope: Scope,
    callback: SubscriberFn,
}

/// A single path write inside a commit
#[derive(Debug, Clone)]
pub(crate) enum Change {
    Set(Node),
    Remove,
}

struct Inner {
    root: Node,
    version: u64,
    lifecycle: Lifecycle,
}

struct CommitRecord {
    old_root: Node,
    new_root: Node,
    changed: Vec<StatePath>,
}

/// Versioned, path-addressed, immutable state tree
pub struct StateStore {
    inner: RwLock<Inner>,
    subscribers: RwLock<Vec<Subscription>>,
    next_subscription: AtomicU64,
    pending: Mutex<VecDeque<CommitRecord>>,
    dispatching: AtomicBool,
}

impl StateStore {
    /// Uninitialized store
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                root: Node::empty(),
                version: 0,
                lifecycle: Lifecycle::Uninitialized,
            }),
            subscribers: RwLock::new(Vec::new()),
            next_subscription: AtomicU64::new(1),
            pending: Mutex::new(VecDeque::new()),
            dispatching: AtomicBool::new(false),
        }
    }

    /// Store initialized with `initial`
    pub fn with_initial(initial: Value) -> Self {
        let store = Self::new();
        {
            let mut inner = store.inner.write();
            inner.root = Node::from_value(initial);
            inner.lifecycle = Lifecycle::Initialized;
        }
        store
    }

    // ═══════════════════════════════════════════════════════════════════════
    // LIFECYCLE
    // ═══════════════════════════════════════════════════════════════════════

    /// Install the initial tree. Initialization is not a mutation: the
    /// version stays at 0.
    pub fn initialize(&self, initial: Value) -> StateResult<()> {
        let mut inner = self.inner.write();
        match inner.lifecycle {
            Lifecycle::Uninitialized => {
                inner.root = Node::from_value(initial);
                inner.lifecycle = Lifecycle::Initialized;
                log::debug!("[Store] initialized");
                Ok(())
            }
            Lifecycle::Initialized => Err(StateError::AlreadyInitialized),
            Lifecycle::Disposed => Err(StateError::Disposed),
        }
    }

    /// Drop subscribers and refuse further writes
    pub fn dispose(&self) {
        self.inner.write().lifecycle = Lifecycle::Disposed;
        self.subscribers.write().clear();
        self.pending.lock().clear();
        log::debug!("[Store] disposed");
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.inner.read().lifecycle
    }

    /// Current version (0 until the first committed change)
    pub fn version(&self) -> u64 {
        self.inner.read().version
    }

    // ═══════════════════════════════════════════════════════════════════════
    // READ
    // ═══════════════════════════════════════════════════════════════════════

    /// Deep copy of the value at `path`, or of the whole tree for `None`.
    /// Missing paths, invalid paths and a disposed store read as `Null`.
    pub fn select(&self, path: Option<&str>) -> Value {
        let parsed = match path {
            None => StatePath::root(),
            Some(raw) => match StatePath::parse(raw) {
                Ok(p) => p,
                Err(e) => {
                    log::debug!("[Store] select on {}", e);
                    return Value::Null;
                }
            },
        };
        let inner = self.inner.read();
        if inner.lifecycle == Lifecycle::Disposed {
            return Value::Null;
        }
        inner
            .root
            .get(parsed.segments())
            .map(Node::to_value)
            .unwrap_or(Value::Null)
    }

    /// Typed read; `None` when missing or of the wrong shape
    pub fn get<T: DeserializeOwned>(&self, path: &str) -> Option<T> {
        serde_json::from_value(self.select(Some(path))).ok()
    }

    /// Whether a value exists at `path`
    pub fn contains(&self, path: &str) -> bool {
        let Ok(parsed) = StatePath::parse(path) else {
            return false;
        };
        self.inner.read().root.get(parsed.segments()).is_some()
    }

    pub(crate) fn node_at(&self, path: &StatePath) -> Option<Node> {
        self.inner.read().root.get(path.segments()).cloned()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // WRITE
    // ═══════════════════════════════════════════════════════════════════════

    /// Set the value at `path`. Returns whether anything changed.
    pub fn update(&self, path: &str, value: Value, options: UpdateOptions) -> StateResult<bool> {
        let path = StatePath::parse(path)?;
        self.commit(options, |_| Ok(vec![(path, Change::Set(Node::from_value(value)))]))
    }

    /// Compute the new value from a copy of the current one.
    ///
    /// The updater runs while the write lock is held and must not call back
    /// into the store.
    pub fn update_with<F>(&self, path: &str, updater: F, options: UpdateOptions) -> StateResult<bool>
    where
        F: FnOnce(&Value) -> Value,
    {
        let path = StatePath::parse(path)?;
        self.commit(options, move |root| {
            let current = root
                .get(path.segments())
                .map(Node::to_value)
                .unwrap_or(Value::Null);
            let next = updater(&current);
            Ok(vec![(path, Change::Set(Node::from_value(next)))])
        })
    }

    /// Set several paths in one atomic commit
    pub fn update_many<I, S>(&self, changes: I, options: UpdateOptions) -> StateResult<bool>
    where
        I: IntoIterator<Item = (S, Value)>,
        S: AsRef<str>,
    {
        let mut parsed = Vec::new();
        for (path, value) in changes {
            parsed.push((
                StatePath::parse(path.as_ref())?,
                Change::Set(Node::from_value(value)),
            ));
        }
        self.commit(options, move |_| Ok(parsed))
    }

    pub(crate) fn apply_changes(
        &self,
        changes: Vec<(StatePath, Change)>,
        options: UpdateOptions,
    ) -> StateResult<bool> {
        self.commit(options, move |_| Ok(changes))
    }

    fn commit<F>(&self, options: UpdateOptions, build: F) -> StateResult<bool>
    where
        F: FnOnce(&Node) -> StateResult<Vec<(StatePath, Change)>>,
    {
        let mut inner = self.inner.write();
        match inner.lifecycle {
            Lifecycle::Initialized => {}
            Lifecycle::Uninitialized => return Err(StateError::NotInitialized),
            Lifecycle::Disposed => return Err(StateError::Disposed),
        }
        if let Some(expected) = options.expected_version
            && expected != inner.version
        {
            log::warn!(
                "[Store] stale update rejected (expected v{}, at v{})",
                expected,
                inner.version
            );
            return Err(StateError::StaleUpdate {
                expected,
                actual: inner.version,
            });
        }

        let old_root = inner.root.clone();
        let mut root = old_root.clone();
        let mut changed = Vec::new();

        for (path, change) in build(&old_root)? {
            let current = root.get(path.segments());
            root = match change {
                Change::Set(node) => {
                    if current.is_some_and(|c| c.same(&node)) {
                        continue;
                    }
                    root.with(path.segments(), node)?
                }
                Change::Remove => {
                    if current.is_none() {
                        continue;
                    }
                    root.without(path.segments())?
                }
            };
            changed.push(path);
        }

        if changed.is_empty() {
            return Ok(false);
        }

        inner.root = root.clone();
        inner.version += 1;
        log::trace!("[Store] v{} {:?}", inner.version, changed);

        if !options.silent {
            self.pending.lock().push_back(CommitRecord {
                old_root,
                new_root: root,
                changed,
            });
        }
        drop(inner);

        self.drain_notifications();
        Ok(true)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // CHECKPOINTS
    // ═══════════════════════════════════════════════════════════════════════

    /// Snapshot the given paths
    pub fn create_checkpoint(&self, label: &str, paths: &[&str]) -> StateResult<Checkpoint> {
        let mut entries = Vec::with_capacity(paths.len());
        for raw in paths {
            let path = StatePath::parse(raw)?;
            let node = self.node_at(&path);
            entries.push((path, node));
        }
        Ok(Checkpoint::new(label, self.version(), entries))
    }

    /// Snapshot the whole tree
    pub fn create_full_checkpoint(&self, label: &str) -> Checkpoint {
        let root = StatePath::root();
        let node = self.node_at(&root);
        Checkpoint::new(label, self.version(), vec![(root, node)])
    }

    /// Put every captured path back exactly as it was, in one commit.
    /// Returns whether anything had to change.
    pub fn restore_checkpoint(&self, checkpoint: &Checkpoint) -> StateResult<bool> {
        let restored = self.apply_changes(checkpoint.changes(), UpdateOptions::default())?;
        if restored {
            log::info!(
                "[Store] restored checkpoint '{}' (captured at v{}, now v{})",
                checkpoint.label(),
                checkpoint.version(),
                self.version()
            );
        }
        Ok(restored)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // SUBSCRIPTIONS
    // ═══════════════════════════════════════════════════════════════════════

    /// Watch a path (or `"*"` for everything)
    pub fn subscribe<F>(&self, path: &str, callback: F) -> StateResult<SubscriptionId>
    where
        F: Fn(&Value, &Value, &str) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let scope = if path == WILDCARD {
            Scope::All
        } else {
            Scope::Path(StatePath::parse(path)?)
        };
        if self.lifecycle() == Lifecycle::Disposed {
            return Err(StateError::Disposed);
        }
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.subscribers.write().push(Subscription {
            id,
            scope,
            callback: Arc::new(callback),
        });
        Ok(id)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subs = self.subscribers.write();
        let before = subs.len();
        subs.retain(|s| s.id != id);
        subs.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    fn drain_notifications(&self) {
        if self.dispatching.swap(true, Ordering::SeqCst) {
            // an outer call on this stack is already draining the queue
            return;
        }
        loop {
            let next = self.pending.lock().pop_front();
            match next {
                Some(record) => self.notify(&record),
                None => break,
            }
        }
        self.dispatching.store(false, Ordering::SeqCst);

        if !self.pending.lock().is_empty() {
            self.drain_notifications();
        }
    }

    fn notify(&self, record: &CommitRecord) {
        let targets: Vec<(SubscriptionId, Scope, SubscriberFn)> = self
            .subscribers
            .read()
            .iter()
            .map(|s| (s.id, s.scope.clone(), Arc::clone(&s.callback)))
            .collect();

        let mut whole_tree: Option<(Value, Value)> = None;

        for (id, scope, callback) in targets {
            let result = match &scope {
                Scope::All => {
                    let Some(first) = record.changed.first() else {
                        continue;
                    };
                    let (new, old) = whole_tree.get_or_insert_with(|| {
                        (record.new_root.to_value(), record.old_root.to_value())
                    });
                    callback(new, old, first.as_str())
                }
                Scope::Path(watched) => {
                    let Some(trigger) = Self::trigger_for(watched, record) else {
                        continue;
                    };
                    let new = record
                        .new_root
                        .get(watched.segments())
                        .map(Node::to_value)
                        .unwrap_or(Value::Null);
                    let old = record
                        .old_root
                        .get(watched.segments())
                        .map(Node::to_value)
                        .unwrap_or(Value::Null);
                    callback(&new, &old, trigger.as_str())
                }
            };

            if let Err(e) = result {
                log::error!("[Store] subscriber {:?} failed: {:#}", id, e);
            }
        }
    }

    /// First changed path that concerns `watched`
    fn trigger_for<'a>(watched: &StatePath, record: &'a CommitRecord) -> Option<&'a StatePath> {
        record.changed.iter().find(|changed| {
            if *changed == watched || watched.is_ancestor_of(changed) {
                return true;
            }
            if changed.is_ancestor_of(watched) {
                let old = record.old_root.get(watched.segments());
                let new = record.new_root.get(watched.segments());
                return match (old, new) {
                    (Some(a), Some(b)) => !a.same(b),
                    (None, None) => false,
                    _ => true,
                };
            }
            false
        })
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}
