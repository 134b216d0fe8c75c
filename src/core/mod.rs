pub mod config;
pub mod error;
pub mod types;

pub use config::{BuildCosts, CombatMode, GameConfig};
pub use error::{EngineError, ErrorKind, Rejection, Result};
pub use types::{BattleId, Cell, GameId, MapId, PlayerId, TerritoryId, TradeId, WaterBodyId};
