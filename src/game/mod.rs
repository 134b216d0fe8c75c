//! Game engine - phases, turns and the action intake for one game
//!
//! [`Game`] owns the persisted [`GameState`] plus the transient battle and
//! trade negotiators. It never blocks and never reads the clock.

pub mod action;
pub mod engine;
pub mod event;
mod handlers;
pub mod phase;
pub mod player;
pub mod shipment;
pub mod state;
mod turn;

pub use action::Action;
pub use engine::{Game, GameSetup};
pub use event::{Audience, Event, Notification};
pub use phase::Phase;
pub use player::{Player, Seat};
pub use state::{GameState, TurnState, UnitKind};
