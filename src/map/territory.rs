//! Territory - an ownable, named land region and the units on it

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::core::types::{PlayerId, TerritoryId, WaterBodyId};
use crate::rules::stockpile::Resource;

/// What a territory produces each round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Baseline land with no bonus
    #[default]
    Grassland,
    Coal,
    Gold,
    Iron,
    Timber,
    /// Breeds a horse unit on the territory instead of a stockpile amount
    Horses,
}

impl ResourceKind {
    /// Stockpile resource this territory yields, if any
    pub fn stockpile_resource(&self) -> Option<Resource> {
        match self {
            Self::Coal => Some(Resource::Coal),
            Self::Gold => Some(Resource::Gold),
            Self::Iron => Some(Resource::Iron),
            Self::Timber => Some(Resource::Timber),
            Self::Grassland | Self::Horses => None,
        }
    }

    pub fn is_baseline(&self) -> bool {
        matches!(self, Self::Grassland)
    }
}

/// The record for `id` in dense, id-ordered storage
pub fn lookup(territories: &[Territory], id: TerritoryId) -> Option<&Territory> {
    territories.get(id.index()?).filter(|t| t.id == id)
}

pub fn lookup_mut(territories: &mut [Territory], id: TerritoryId) -> Option<&mut Territory> {
    territories.get_mut(id.index()?).filter(|t| t.id == id)
}

/// A territory in a running game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Territory {
    pub id: TerritoryId,
    pub name: String,
    pub resource: ResourceKind,
    pub owner: Option<PlayerId>,
    pub has_city: bool,
    pub has_weapon: bool,
    pub has_horse: bool,
    /// Boats parked in each bordering water body
    pub boats: BTreeMap<WaterBodyId, u32>,
    /// Copied from the map index when the game starts
    pub adjacent: BTreeSet<TerritoryId>,
}

impl Territory {
    pub fn new(
        id: TerritoryId,
        name: impl Into<String>,
        resource: ResourceKind,
        adjacent: BTreeSet<TerritoryId>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            resource,
            owner: None,
            has_city: false,
            has_weapon: false,
            has_horse: false,
            boats: BTreeMap::new(),
            adjacent,
        }
    }

    pub fn is_owned_by(&self, player: PlayerId) -> bool {
        self.owner == Some(player)
    }

    pub fn is_adjacent(&self, other: TerritoryId) -> bool {
        self.adjacent.contains(&other)
    }

    pub fn boats_in(&self, body: WaterBodyId) -> u32 {
        self.boats.get(&body).copied().unwrap_or(0)
    }

    pub fn total_boats(&self) -> u32 {
        self.boats.values().sum()
    }

    pub fn add_boat(&mut self, body: WaterBodyId) {
        *self.boats.entry(body).or_insert(0) += 1;
    }

    /// Remove one boat from a water body, returns false if none was there
    pub fn remove_boat(&mut self, body: WaterBodyId) -> bool {
        match self.boats.get_mut(&body) {
            Some(count) if *count > 0 => {
                *count -= 1;
                if *count == 0 {
                    self.boats.remove(&body);
                }
                true
            }
            _ => false,
        }
    }
}
