//! EventTrace — a recorded sequence of game events
//!
//! Used for replay checks and for asserting event order in tests.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::bus::{EventBus, HandlerId};
use crate::event::{EventKind, GameEvent};

/// One recorded event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TracedEvent {
    /// Position in the trace (0-based)
    pub sequence: u64,
    /// Wall-clock time of recording
    pub recorded_at: DateTime<Utc>,
    pub event: GameEvent,
}

/// Ordered list of events for one session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventTrace {
    pub trace_id: String,
    pub started_at: DateTime<Utc>,
    pub events: Vec<TracedEvent>,
}

impl EventTrace {
    pub fn new(trace_id: impl Into<String>) -> Self {
        Self {
            trace_id: trace_id.into(),
            started_at: Utc::now(),
            events: Vec::new(),
        }
    }

    /// Append an event
    pub fn push(&mut self, event: GameEvent) {
        let sequence = self.events.len() as u64;
        self.events.push(TracedEvent {
            sequence,
            recorded_at: Utc::now(),
            event,
        });
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Kinds in recording order
    pub fn kinds(&self) -> Vec<EventKind> {
        self.events.iter().map(|e| e.event.kind()).collect()
    }

    /// Events of one kind, in order
    pub fn of_kind(&self, kind: EventKind) -> Vec<&GameEvent> {
        self.events
            .iter()
            .map(|e| &e.event)
            .filter(|e| e.kind() == kind)
            .collect()
    }

    /// Whether any event of this kind was recorded
    pub fn contains(&self, kind: EventKind) -> bool {
        self.events.iter().any(|e| e.event.kind() == kind)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Records every event emitted on a bus
pub struct TraceRecorder {
    trace: Arc<Mutex<EventTrace>>,
    handler: HandlerId,
}

impl TraceRecorder {
    /// Start recording on `bus`
    pub fn attach(bus: &EventBus, trace_id: impl Into<String>) -> Self {
        let trace = Arc::new(Mutex::new(EventTrace::new(trace_id)));
        let sink = Arc::clone(&trace);
        let handler = bus.on_any(move |event| {
            sink.lock().push(event.clone());
            Ok(())
        });
        Self { trace, handler }
    }

    /// Copy of everything recorded so far
    pub fn snapshot(&self) -> EventTrace {
        self.trace.lock().clone()
    }

    /// Stop recording and return the trace
    pub fn detach(self, bus: &EventBus) -> EventTrace {
        bus.off(self.handler);
        self.trace.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::MessageLevel;

    #[test]
    fn test_recorder_captures_in_order() {
        let bus = EventBus::new();
        let recorder = TraceRecorder::attach(&bus, "session-1");

        bus.emit(GameEvent::SpinStarted {
            spin_id: 1,
            bet: 10.0,
            free_spin: false,
        });
        bus.emit(GameEvent::message(MessageLevel::Info, "good luck"));

        let trace = recorder.detach(&bus);
        assert_eq!(trace.kinds(), vec![EventKind::SpinStarted, EventKind::Message]);
        assert_eq!(trace.events[1].sequence, 1);
        assert_eq!(bus.handler_count(), 0);
    }

    #[test]
    fn test_of_kind() {
        let mut trace = EventTrace::new("t");
        trace.push(GameEvent::LevelUp {
            level: 2,
            bonus: 100.0,
        });
        trace.push(GameEvent::AchievementUnlocked {
            id: "first_win".into(),
        });
        assert!(trace.contains(EventKind::LevelUp));
        assert_eq!(trace.of_kind(EventKind::AchievementUnlocked).len(), 1);
        assert!(trace.to_json().unwrap().contains("first_win"));
    }
}
