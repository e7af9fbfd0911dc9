//! EventBus — ordered, fault-isolated event dispatch
//!
//! Handlers run in registration order. A handler returning an error is
//! logged and skipped; the remaining handlers still receive the event.
//! Dispatch works on a snapshot of the handler list, so handlers may
//! register, unregister or emit from inside a callback.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::event::{EventKind, GameEvent};

/// Callback signature for event handlers
pub type EventHandler = Arc<dyn Fn(&GameEvent) -> anyhow::Result<()> + Send + Sync>;

/// Handle returned by registration, used to unregister
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

/// Which events a handler receives
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventFilter {
    All,
    Kind(EventKind),
}

impl EventFilter {
    fn accepts(&self, event: &GameEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::Kind(kind) => event.kind() == *kind,
        }
    }
}

struct Registration {
    id: HandlerId,
    filter: EventFilter,
    handler: EventHandler,
}

/// Result of one dispatch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Handlers that ran successfully
    pub delivered: usize,
    /// Handlers that returned an error
    pub failed: usize,
}

/// Event bus shared by the slot core and its collaborators
pub struct EventBus {
    next_id: AtomicU64,
    handlers: RwLock<Vec<Registration>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            handlers: RwLock::new(Vec::new()),
        }
    }

    /// Register a handler for one event kind
    pub fn on<F>(&self, kind: EventKind, handler: F) -> HandlerId
    where
        F: Fn(&GameEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.register(EventFilter::Kind(kind), Arc::new(handler))
    }

    /// Register a handler for every event
    pub fn on_any<F>(&self, handler: F) -> HandlerId
    where
        F: Fn(&GameEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.register(EventFilter::All, Arc::new(handler))
    }

    /// Register with an explicit filter
    pub fn register(&self, filter: EventFilter, handler: EventHandler) -> HandlerId {
        let id = HandlerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers.write().push(Registration {
            id,
            filter,
            handler,
        });
        id
    }

    /// Unregister a handler. Returns false if it was not registered.
    pub fn off(&self, id: HandlerId) -> bool {
        let mut handlers = self.handlers.write();
        let before = handlers.len();
        handlers.retain(|r| r.id != id);
        handlers.len() != before
    }

    /// Dispatch an event to every matching handler
    pub fn emit(&self, event: GameEvent) -> DispatchReport {
        let targets: Vec<(HandlerId, EventHandler)> = self
            .handlers
            .read()
            .iter()
            .filter(|r| r.filter.accepts(&event))
            .map(|r| (r.id, Arc::clone(&r.handler)))
            .collect();

        let mut report = DispatchReport::default();
        for (id, handler) in targets {
            match handler(&event) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    report.failed += 1;
                    log::error!(
                        "[EventBus] handler {:?} failed on {}: {:#}",
                        id,
                        event.type_name(),
                        e
                    );
                }
            }
        }
        report
    }

    /// Number of registered handlers
    pub fn handler_count(&self) -> usize {
        self.handlers.read().len()
    }

    /// Drop every handler
    pub fn clear(&self) {
        self.handlers.write().clear();
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
