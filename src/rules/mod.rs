//! Resource, production and development rules
//!
//! Pure functions over territory and stockpile state. Combat and the phase
//! machine call into these; nothing here holds game state of its own.

pub mod development;
pub mod production;
pub mod stockpile;

pub use development::{cost_of, pay, Improvement, Payment};
pub use production::{production, territory_strength, tick_production, Yield, YieldKind};
pub use stockpile::{Resource, Stockpile};
