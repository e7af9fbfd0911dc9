//! Game features
//!
//! Each feature owns the typed shape of its `features.<name>` subtree in the
//! state store plus the pure rules that move it forward. The cascade
//! sequencer is the one feature with its own async loop; the others are
//! driven step by step by [`crate::SlotGame`].
//!
//! ```text
//! SlotGame
//!     │
//!     ├── CascadeSequencer   (tumble loop, multiplier ladder)
//!     ├── FreeSpinsState     (awards, retriggers, win multiplier)
//!     ├── BonusState         (pick game)
//!     └── GambleState        (double or nothing)
//! ```

mod bonus;
mod cascade;
mod free_spins;
mod gamble;

pub use bonus::*;
pub use cascade::*;
pub use free_spins::*;
pub use gamble::*;
