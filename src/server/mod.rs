//! Game service - runs many games in parallel, one actor each
//!
//! Games share nothing mutable. The registry maps ids to actor handles; the
//! stores are the only collaborators outside the actors.

pub mod actor;
pub mod registry;
pub mod store;

pub use actor::{spawn_game, Command, GameHandle};
pub use registry::GameRegistry;
pub use store::{FileStateStore, MapStore, MemoryStateStore, StateStore, StoredMap};
