//! Persisted game state
//!
//! Everything here survives a save/load through the state store. Pending
//! battles and trade proposals are transient and live on the engine.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::phase::Phase;
use super::player::Player;
use crate::core::error::{EngineError, Result};
use crate::core::types::{GameId, MapId, PlayerId, TerritoryId};
use crate::map::{lookup, lookup_mut, Territory};

/// Kinds of unit a player can ship
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    Stockpile,
    Horse,
    Boat,
}

impl UnitKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Stockpile => "stockpile",
            Self::Horse => "horse",
            Self::Boat => "boat",
        }
    }
}

/// Who has acted within the current phase
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TurnState {
    /// Turn owner; None in the simultaneous Trade phase
    pub current: Option<PlayerId>,
    /// Players finished with this phase
    pub done: BTreeSet<PlayerId>,
    /// Units the current player has already moved this turn
    pub shipped: BTreeSet<UnitKind>,
    /// Territories developed this round
    pub built: BTreeSet<TerritoryId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    pub id: GameId,
    pub map_id: MapId,
    pub phase: Phase,
    /// 1-based, only ever increases
    pub round: u32,
    pub players: BTreeMap<PlayerId, Player>,
    /// Indexed by `TerritoryId::index`
    pub territories: Vec<Territory>,
    pub turn: TurnState,
    /// Seed for card draws
    pub seed: u64,
    /// Cards drawn so far; advances the draw stream
    pub cards_drawn: u64,
}

impl GameState {
    pub fn current_player(&self) -> Option<PlayerId> {
        self.turn.current
    }

    pub fn player(&self, id: PlayerId) -> Result<&Player> {
        self.players.get(&id).ok_or(EngineError::UnknownPlayer(id))
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Result<&mut Player> {
        self.players.get_mut(&id).ok_or(EngineError::UnknownPlayer(id))
    }

    pub fn territory(&self, id: TerritoryId) -> Result<&Territory> {
        lookup(&self.territories, id).ok_or(EngineError::UnknownTerritory(id))
    }

    pub fn territory_mut(&mut self, id: TerritoryId) -> Result<&mut Territory> {
        lookup_mut(&mut self.territories, id).ok_or(EngineError::UnknownTerritory(id))
    }

    /// A territory the player owns
    pub fn owned(&self, player: PlayerId, id: TerritoryId) -> Result<&Territory> {
        let territory = self.territory(id)?;
        if !territory.is_owned_by(player) {
            return Err(EngineError::NotOwner(id));
        }
        Ok(territory)
    }

    pub fn territories_of(&self, player: PlayerId) -> impl Iterator<Item = &Territory> {
        self.territories
            .iter()
            .filter(move |t| t.is_owned_by(player))
    }

    pub fn city_count(&self, player: PlayerId) -> u32 {
        self.territories_of(player).filter(|t| t.has_city).count() as u32
    }

    pub fn unclaimed(&self) -> impl Iterator<Item = &Territory> {
        self.territories.iter().filter(|t| t.owner.is_none())
    }

    /// Active players in seat order
    pub fn active_players(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.players
            .values()
            .filter(|p| p.active)
            .map(|p| p.id)
    }

    /// Active players in this round's turn order.
    ///
    /// The starting seat moves one place each round.
    pub fn turn_order(&self) -> Vec<PlayerId> {
        let mut order: Vec<PlayerId> = self.active_players().collect();
        if !order.is_empty() {
            let shift = (self.round.saturating_sub(1) as usize) % order.len();
            order.rotate_left(shift);
        }
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::player::Seat;
    use crate::map::Map;

    fn state() -> GameState {
        let players = (1..=3)
            .map(|i| {
                let id = PlayerId(i);
                (id, Player::new(id, Seat::human(format!("P{i}"), "red")))
            })
            .collect();
        GameState {
            id: GameId::new(),
            map_id: MapId::new(),
            phase: Phase::TerritorySelection,
            round: 1,
            players,
            territories: Map::from_rows(&[vec![1, 2, 3]]).unwrap().blank_territories(),
            turn: TurnState::default(),
            seed: 0,
            cards_drawn: 0,
        }
    }

    #[test]
    fn test_turn_order_rotates_by_round() {
        let mut state = state();
        assert_eq!(state.turn_order(), vec![PlayerId(1), PlayerId(2), PlayerId(3)]);
        state.round = 2;
        assert_eq!(state.turn_order(), vec![PlayerId(2), PlayerId(3), PlayerId(1)]);

        state.player_mut(PlayerId(3)).unwrap().active = false;
        state.round = 4;
        assert_eq!(state.turn_order(), vec![PlayerId(2), PlayerId(1)]);
    }

    #[test]
    fn test_ownership_queries() {
        let mut state = state();
        state.territory_mut(TerritoryId(2)).unwrap().owner = Some(PlayerId(1));
        assert!(state.owned(PlayerId(1), TerritoryId(2)).is_ok());
        assert!(matches!(
            state.owned(PlayerId(2), TerritoryId(2)),
            Err(EngineError::NotOwner(_))
        ));
        assert!(state.territory(TerritoryId(9)).is_err());
        assert_eq!(state.unclaimed().count(), 2);
    }

    #[test]
    fn test_state_survives_json() {
        let state = state();
        let json = serde_json::to_string(&state).unwrap();
        let back: GameState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }
}
