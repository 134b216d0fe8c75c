//! Territory model - the grid/graph structure every other system reads
//!
//! A [`Map`] is immutable once built. Per-game mutable data lives in
//! [`Territory`] records owned by the game state.

pub mod grid;
pub mod territory;
pub mod water;

pub use grid::{Map, RawGrid, WATER};
pub use territory::{lookup, lookup_mut, ResourceKind, Territory};
pub use water::WaterBody;
