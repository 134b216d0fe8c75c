//! Production rules - strength contributions and per-round yields
//!
//! Everything here is a pure function of territory state. The game applies
//! the returned yields; nothing in this module touches a player directly.

use serde::{Deserialize, Serialize};

use crate::core::types::{PlayerId, TerritoryId};
use crate::map::{lookup, lookup_mut, ResourceKind, Territory};
use crate::rules::stockpile::Resource;

/// Strength a city adds to its territory
pub const CITY_STRENGTH: u32 = 2;

/// Strength a weapon adds to its territory
pub const WEAPON_STRENGTH: u32 = 3;

/// Strength a horse adds to its territory
pub const HORSE_STRENGTH: u32 = 1;

/// Units a producing territory yields per round before doubling
pub const BASE_YIELD: u32 = 1;

/// Passive combat strength of a territory's improvements.
///
/// Boats never count here; they only contribute when brought into a battle.
pub fn territory_strength(territory: &Territory) -> u32 {
    let mut strength = 0;
    if territory.has_city {
        strength += CITY_STRENGTH;
    }
    if territory.has_weapon {
        strength += WEAPON_STRENGTH;
    }
    if territory.has_horse {
        strength += HORSE_STRENGTH;
    }
    strength
}

/// What one territory produced this round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum YieldKind {
    /// Added to the owner's stockpile
    Resource { resource: Resource, amount: u32 },
    /// A horse unit appeared on the territory
    Horse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Yield {
    pub territory: TerritoryId,
    pub owner: PlayerId,
    pub kind: YieldKind,
}

/// True if the territory has a city or touches a same-owner territory with one
pub fn city_influenced(territory: &Territory, territories: &[Territory]) -> bool {
    if territory.has_city {
        return true;
    }
    let Some(owner) = territory.owner else {
        return false;
    };
    territory.adjacent.iter().any(|id| {
        lookup(territories, *id).is_some_and(|n| n.has_city && n.owner == Some(owner))
    })
}

/// Yield of a single territory for one round, or None if it produces nothing.
///
/// `territories` is the full id-ordered territory list, used for the
/// neighbouring-city check.
pub fn production(territory: &Territory, territories: &[Territory]) -> Option<Yield> {
    let owner = territory.owner?;

    let kind = match territory.resource {
        ResourceKind::Grassland => return None,
        ResourceKind::Horses => {
            if territory.has_horse {
                return None;
            }
            YieldKind::Horse
        }
        other => {
            let resource = other.stockpile_resource()?;
            let amount = if city_influenced(territory, territories) {
                BASE_YIELD * 2
            } else {
                BASE_YIELD
            };
            YieldKind::Resource { resource, amount }
        }
    };

    Some(Yield {
        territory: territory.id,
        owner,
        kind,
    })
}

/// Compute every territory's yield from one snapshot, then place new horses.
///
/// Yields are decided before any horse is placed, so all territories produce
/// simultaneously. Resource yields are returned for the caller to credit.
pub fn tick_production(territories: &mut [Territory]) -> Vec<Yield> {
    let yields: Vec<Yield> = territories
        .iter()
        .filter_map(|t| production(t, territories))
        .collect();

    for y in &yields {
        if y.kind == YieldKind::Horse {
            if let Some(territory) = lookup_mut(territories, y.territory) {
                territory.has_horse = true;
            }
        }
    }

    yields
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn line(resources: &[ResourceKind]) -> Vec<Territory> {
        // Territories 1..=n in a row, each adjacent to its neighbours
        let n = resources.len() as u16;
        resources
            .iter()
            .enumerate()
            .map(|(i, r)| {
                let id = i as u16 + 1;
                let adjacent: BTreeSet<TerritoryId> = [id.wrapping_sub(1), id + 1]
                    .into_iter()
                    .filter(|a| *a >= 1 && *a <= n)
                    .map(TerritoryId)
                    .collect();
                Territory::new(TerritoryId(id), format!("T{id}"), *r, adjacent)
            })
            .collect()
    }

    #[test]
    fn test_strength_counts_improvements() {
        let mut territories = line(&[ResourceKind::Grassland]);
        let t = &mut territories[0];
        assert_eq!(territory_strength(t), 0);

        t.has_city = true;
        t.has_weapon = true;
        t.has_horse = true;
        t.add_boat(crate::core::types::WaterBodyId(0));
        assert_eq!(territory_strength(t), 6);
        assert_eq!(territory_strength(t), territory_strength(t));
    }

    #[test]
    fn test_unowned_territory_yields_nothing() {
        let territories = line(&[ResourceKind::Coal]);
        assert_eq!(production(&territories[0], &territories), None);
    }

    #[test]
    fn test_neighbouring_city_doubles_yield() {
        let mut territories = line(&[ResourceKind::Iron, ResourceKind::Grassland]);
        for t in territories.iter_mut() {
            t.owner = Some(PlayerId(1));
        }
        territories[1].has_city = true;

        let y = production(&territories[0], &territories).unwrap();
        assert_eq!(
            y.kind,
            YieldKind::Resource {
                resource: Resource::Iron,
                amount: 2
            }
        );
    }

    #[test]
    fn test_enemy_city_does_not_double() {
        let mut territories = line(&[ResourceKind::Iron, ResourceKind::Grassland]);
        territories[0].owner = Some(PlayerId(1));
        territories[1].owner = Some(PlayerId(2));
        territories[1].has_city = true;

        let y = production(&territories[0], &territories).unwrap();
        assert_eq!(
            y.kind,
            YieldKind::Resource {
                resource: Resource::Iron,
                amount: 1
            }
        );
    }

    #[test]
    fn test_grassland_never_yields() {
        let mut territories = line(&[ResourceKind::Grassland]);
        territories[0].owner = Some(PlayerId(1));
        territories[0].has_city = true;
        assert_eq!(production(&territories[0], &territories), None);
    }

    #[test]
    fn test_horses_breed_one_unit() {
        let mut territories = line(&[ResourceKind::Horses, ResourceKind::Timber]);
        for t in territories.iter_mut() {
            t.owner = Some(PlayerId(3));
        }

        let yields = tick_production(&mut territories);
        assert_eq!(yields.len(), 2);
        assert!(territories[0].has_horse);

        // Already has a horse: nothing more
        let yields = tick_production(&mut territories);
        assert_eq!(yields.len(), 1);
        assert_eq!(yields[0].territory, TerritoryId(2));
    }
}
