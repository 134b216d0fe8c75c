//! Reinforcements - one extra unit committed to a single battle

use serde::{Deserialize, Serialize};

use crate::core::config::GameConfig;
use crate::core::error::{EngineError, Result};
use crate::core::types::{PlayerId, TerritoryId, WaterBodyId};
use crate::map::{lookup, lookup_mut, Map, Territory};
use crate::rules::production::{HORSE_STRENGTH, WEAPON_STRENGTH};

/// The unit an attacker brings in, with any cargo it carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "unit", rename_all = "snake_case")]
pub enum Reinforcement {
    /// A horse from a territory bordering the target
    Horse {
        from: TerritoryId,
        #[serde(default)]
        carry_weapon: bool,
    },
    /// A boat parked in a water body the target also borders
    Boat {
        from: TerritoryId,
        water: WaterBodyId,
        #[serde(default)]
        carry_horse: bool,
        #[serde(default)]
        carry_weapon: bool,
    },
}

impl Reinforcement {
    pub fn source(&self) -> TerritoryId {
        match self {
            Self::Horse { from, .. } | Self::Boat { from, .. } => *from,
        }
    }

    /// True if a horse takes part, either as the unit or as boat cargo
    pub fn brings_horse(&self) -> bool {
        matches!(
            self,
            Self::Horse { .. }
                | Self::Boat {
                    carry_horse: true,
                    ..
                }
        )
    }

    fn carries_weapon(&self) -> bool {
        match self {
            Self::Horse { carry_weapon, .. } | Self::Boat { carry_weapon, .. } => *carry_weapon,
        }
    }

    /// Strength added to the attack
    pub fn bonus(&self, config: &GameConfig) -> u32 {
        let unit = match self {
            Self::Horse { .. } => config.horse_bonus,
            Self::Boat { carry_horse, .. } => {
                config.boat_bonus + if *carry_horse { HORSE_STRENGTH } else { 0 }
            }
        };
        unit + if self.carries_weapon() {
            WEAPON_STRENGTH
        } else {
            0
        }
    }

    /// Check the attacker can commit this unit against `target`
    pub fn validate(
        &self,
        attacker: PlayerId,
        target: TerritoryId,
        territories: &[Territory],
        map: &Map,
    ) -> Result<()> {
        let from = self.source();
        let source = lookup(territories, from).ok_or(EngineError::UnknownTerritory(from))?;
        if !source.is_owned_by(attacker) {
            return Err(EngineError::NotOwner(from));
        }
        if self.carries_weapon() && !source.has_weapon {
            return Err(EngineError::InvalidReinforcement(format!(
                "{from} has no weapon to carry"
            )));
        }

        match *self {
            Self::Horse { .. } => {
                if !source.is_adjacent(target) {
                    return Err(EngineError::NotAdjacent(target));
                }
                if !source.has_horse {
                    return Err(EngineError::InvalidReinforcement(format!(
                        "{from} has no horse"
                    )));
                }
            }
            Self::Boat {
                water, carry_horse, ..
            } => {
                if source.boats_in(water) == 0 {
                    return Err(EngineError::InvalidReinforcement(format!(
                        "{from} has no boat in {water}"
                    )));
                }
                if !map.borders_water(target, water) {
                    return Err(EngineError::InvalidReinforcement(format!(
                        "{target} does not border {water}"
                    )));
                }
                if carry_horse && !source.has_horse {
                    return Err(EngineError::InvalidReinforcement(format!(
                        "{from} has no horse to carry"
                    )));
                }
            }
        }

        Ok(())
    }

    /// Remove the unit and its cargo from the source after a lost battle
    pub fn forfeit(&self, territories: &mut [Territory]) {
        let Some(source) = lookup_mut(territories, self.source()) else {
            return;
        };
        if self.carries_weapon() {
            source.has_weapon = false;
        }
        if self.brings_horse() {
            source.has_horse = false;
        }
        if let Self::Boat { water, .. } = *self {
            source.remove_boat(water);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Territories 1 and 2 share a one-cell lake, 3 runs along the bottom
    fn lake_map() -> Map {
        Map::from_rows(&[
            vec![1, 1, 2],
            vec![1, 0, 2],
            vec![1, 1, 2],
            vec![3, 3, 3],
        ])
        .unwrap()
    }

    #[test]
    fn test_horse_needs_land_border() {
        let map = lake_map();
        let mut territories = map.blank_territories();
        territories[2].owner = Some(PlayerId(1));
        territories[2].has_horse = true;
        territories[2].has_weapon = true;

        let horse = Reinforcement::Horse {
            from: TerritoryId(3),
            carry_weapon: true,
        };
        assert!(horse.validate(PlayerId(1), TerritoryId(2), &territories, &map).is_ok());
        assert_eq!(horse.bonus(&GameConfig::default()), 1 + 3);
    }

    #[test]
    fn test_boat_must_share_water_with_target() {
        let map = lake_map();
        let lake = map.water_body_at(&crate::core::types::Cell::new(1, 1)).unwrap();
        let mut territories = map.blank_territories();
        territories[0].owner = Some(PlayerId(1));
        territories[0].add_boat(lake);

        let boat = Reinforcement::Boat {
            from: TerritoryId(1),
            water: lake,
            carry_horse: false,
            carry_weapon: false,
        };
        assert!(boat.validate(PlayerId(1), TerritoryId(2), &territories, &map).is_ok());

        // Territory 3 does not touch the lake
        let err = boat
            .validate(PlayerId(1), TerritoryId(3), &territories, &map)
            .unwrap_err();
        assert_eq!(err.code(), "invalid_reinforcement");
    }

    #[test]
    fn test_zero_source_is_unknown() {
        let map = lake_map();
        let mut territories = map.blank_territories();
        territories[0].owner = Some(PlayerId(1));
        territories[0].has_horse = true;

        let horse = Reinforcement::Horse {
            from: TerritoryId(0),
            carry_weapon: false,
        };
        let err = horse
            .validate(PlayerId(1), TerritoryId(2), &territories, &map)
            .unwrap_err();
        assert_eq!(err.code(), "unknown_territory");
    }

    #[test]
    fn test_missing_cargo_rejected() {
        let map = lake_map();
        let mut territories = map.blank_territories();
        territories[2].owner = Some(PlayerId(1));
        territories[2].has_horse = true;

        let horse = Reinforcement::Horse {
            from: TerritoryId(3),
            carry_weapon: true,
        };
        assert!(horse
            .validate(PlayerId(1), TerritoryId(2), &territories, &map)
            .is_err());
    }

    #[test]
    fn test_forfeit_removes_unit_and_cargo() {
        let map = lake_map();
        let lake = map.water_bodies()[0].id;
        let mut territories = map.blank_territories();
        territories[0].add_boat(lake);
        territories[0].has_horse = true;
        territories[0].has_weapon = true;

        let boat = Reinforcement::Boat {
            from: TerritoryId(1),
            water: lake,
            carry_horse: true,
            carry_weapon: false,
        };
        boat.forfeit(&mut territories);

        assert_eq!(territories[0].total_boats(), 0);
        assert!(!territories[0].has_horse);
        assert!(territories[0].has_weapon);
    }
}
