//! Player - one seat in a game

use serde::{Deserialize, Serialize};

use crate::alliance::AllianceSetting;
use crate::combat::CardHand;
use crate::core::types::{PlayerId, TerritoryId};
use crate::rules::stockpile::Stockpile;

/// Who takes a seat when a game is created
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seat {
    pub name: String,
    pub color: String,
    #[serde(default)]
    pub is_ai: bool,
}

impl Seat {
    pub fn human(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: color.into(),
            is_ai: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub color: String,
    pub is_ai: bool,
    /// False after surrender
    pub active: bool,
    pub stockpile: Stockpile,
    pub stockpile_territory: Option<TerritoryId>,
    pub alliance: AllianceSetting,
    /// Empty unless card combat is on
    pub cards: CardHand,
}

impl Player {
    pub fn new(id: PlayerId, seat: Seat) -> Self {
        Self {
            id,
            name: seat.name,
            color: seat.color,
            is_ai: seat.is_ai,
            active: true,
            stockpile: Stockpile::default(),
            stockpile_territory: None,
            alliance: AllianceSetting::default(),
            cards: CardHand::default(),
        }
    }
}
