//! # sf-stage — SpinForge game events
//!
//! The slot core never calls into presentation or analytics code directly
//! for bookkeeping moments; it emits typed [`GameEvent`]s on an
//! [`EventBus`].
//!
//! - **Typed kinds**: every event has an [`EventKind`] discriminant
//! - **Ordered dispatch**: handlers run in registration order
//! - **Fault isolation**: a failing handler never blocks the others
//! - **Traces**: [`TraceRecorder`] captures a session for replay checks

pub mod bus;
pub mod event;
pub mod trace;

pub use bus::*;
pub use event::*;
pub use trace::*;
