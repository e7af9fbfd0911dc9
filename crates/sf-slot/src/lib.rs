//! # sf-slot — SpinForge slot engine
//!
//! Weighted reels, payline evaluation, cascades, features and the spin
//! orchestrator that ties them to the state store.
//!
//! ## Features
//!
//! - **Weighted RNG**: per-reel inverse-weight sampling, seedable (`ChaCha8Rng`)
//! - **Payline evaluation**: wild substitution, scatter pays, bonus detection
//! - **Cascades**: tumble loop with a multiplier ladder and an iteration ceiling
//! - **Features**: free spins with retriggers, pick bonus, double-or-nothing gamble
//! - **Progression**: levels, unlocks, achievements, daily challenges
//! - **Transactional spins**: checkpoint before the stake, rollback on failure
//! - **Timing profiles**: Normal, Turbo, Studio (instant)
//!
//! ## Architecture
//!
//! ```text
//! SlotGame
//!     │
//!     ├── SymbolGenerator   (reel strips, grid sampling)
//!     ├── PaylineEvaluator  (line + scatter pass, bonus trigger)
//!     ├── CascadeSequencer  (remove → drop → refill → re-evaluate)
//!     ├── TimerRegistry     (labelled, cancellable delays)
//!     └── Presenter         (rendering, awaited)
//!           │
//!           v
//!     StateStore (sf-state) + EventBus (sf-stage)
//! ```

pub mod anticipation;
pub mod config;
pub mod engine;
pub mod error;
pub mod features;
pub mod game_state;
pub mod paytable;
pub mod persistence;
pub mod presenter;
pub mod progression;
pub mod rng;
pub mod spin;
pub mod symbols;
pub mod timers;
pub mod timing;

pub use anticipation::*;
pub use config::*;
pub use engine::*;
pub use error::*;
pub use features::*;
pub use game_state::*;
pub use paytable::*;
pub use persistence::*;
pub use presenter::*;
pub use progression::*;
pub use rng::*;
pub use spin::*;
pub use symbols::*;
pub use timers::*;
pub use timing::*;
