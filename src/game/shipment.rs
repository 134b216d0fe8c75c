//! Shipment rules - where a stockpile, horse or boat may move

use std::collections::BTreeSet;

use super::state::{GameState, UnitKind};
use crate::core::error::{EngineError, Result};
use crate::core::types::{PlayerId, TerritoryId, WaterBodyId};
use crate::map::{lookup, Map, Territory};

/// True if `to` can be reached from `from` stepping only through `player`'s land
pub fn connected_through_owned(
    player: PlayerId,
    from: TerritoryId,
    to: TerritoryId,
    territories: &[Territory],
) -> bool {
    let mut visited = BTreeSet::new();
    let mut stack = vec![from];

    while let Some(id) = stack.pop() {
        if id == to {
            return true;
        }
        if !visited.insert(id) {
            continue;
        }
        let Some(territory) = lookup(territories, id) else {
            continue;
        };
        for adjacent in &territory.adjacent {
            let owned = lookup(territories, *adjacent).is_some_and(|t| t.is_owned_by(player));
            if owned {
                stack.push(*adjacent);
            }
        }
    }

    false
}

/// A validated shipment, ready to apply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shipment {
    pub unit: UnitKind,
    pub from: TerritoryId,
    pub to: TerritoryId,
    pub water: Option<WaterBodyId>,
}

impl Shipment {
    /// Check the move against current state without changing anything
    pub fn validate(&self, player: PlayerId, state: &GameState, map: &Map) -> Result<()> {
        let source = state.owned(player, self.from)?;
        let dest = state.owned(player, self.to)?;

        match self.unit {
            UnitKind::Stockpile => {
                if state.player(player)?.stockpile_territory != Some(self.from) {
                    return Err(EngineError::InvalidTarget(format!(
                        "{} does not hold your stockpile",
                        self.from
                    )));
                }
                self.check_land_route(player, state)
            }
            UnitKind::Horse => {
                if !source.has_horse {
                    return Err(EngineError::InvalidTarget(format!(
                        "{} has no horse",
                        self.from
                    )));
                }
                if dest.has_horse {
                    return Err(EngineError::AlreadyBuilt {
                        territory: self.to,
                        what: "horse",
                    });
                }
                self.check_land_route(player, state)
            }
            UnitKind::Boat => {
                let water = self
                    .water
                    .ok_or_else(|| EngineError::Malformed("boat moves need a water body".into()))?;
                if source.boats_in(water) == 0 {
                    return Err(EngineError::InvalidTarget(format!(
                        "{} has no boat in {water}",
                        self.from
                    )));
                }
                if !map.borders_water(self.to, water) {
                    return Err(EngineError::InvalidTarget(format!(
                        "{} does not border {water}",
                        self.to
                    )));
                }
                Ok(())
            }
        }
    }

    fn check_land_route(&self, player: PlayerId, state: &GameState) -> Result<()> {
        if connected_through_owned(player, self.from, self.to, &state.territories) {
            Ok(())
        } else {
            Err(EngineError::NotAdjacent(self.to))
        }
    }

    /// Move the unit. Call only after `validate` succeeded.
    pub fn apply(&self, player: PlayerId, state: &mut GameState) -> Result<()> {
        match self.unit {
            UnitKind::Stockpile => {
                state.player_mut(player)?.stockpile_territory = Some(self.to);
            }
            UnitKind::Horse => {
                state.territory_mut(self.from)?.has_horse = false;
                state.territory_mut(self.to)?.has_horse = true;
            }
            UnitKind::Boat => {
                if let Some(water) = self.water {
                    state.territory_mut(self.from)?.remove_boat(water);
                    state.territory_mut(self.to)?.add_boat(water);
                }
            }
        }
        Ok(())
    }
}
