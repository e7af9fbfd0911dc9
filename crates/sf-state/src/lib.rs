//! sf-state: Game state management for SpinForge
//!
//! A single versioned, path-addressed state tree with change subscriptions,
//! optimistic-lock updates and checkpoint/rollback, plus the storage
//! backends the game saves into.

mod checkpoint;
mod error;
mod path;
mod storage;
mod store;
mod tree;

pub use checkpoint::*;
pub use error::*;
pub use path::*;
pub use storage::*;
pub use store::*;
pub use tree::*;
