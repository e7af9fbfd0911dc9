//! sf-core: Shared types for SpinForge
//!
//! The vocabulary every other SpinForge crate speaks: symbol identifiers,
//! grid coordinates and the reel grid itself.

mod error;
mod grid;

pub use error::*;
pub use grid::*;
