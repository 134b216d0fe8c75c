//! Base attack and defense strength of a proposed attack

use serde::{Deserialize, Serialize};

use crate::core::error::{EngineError, Result};
use crate::core::types::{PlayerId, TerritoryId};
use crate::map::{lookup, Territory};
use crate::rules::territory_strength;

/// Attack and defense totals for one battle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Strengths {
    pub attack: u32,
    pub defense: u32,
}

impl Strengths {
    /// Ties favour the defender
    pub fn attacker_wins(&self) -> bool {
        self.attack > self.defense
    }
}

/// Σ (1 + strength) over `player`'s territories adjacent to `target`
pub fn adjacent_strength(player: PlayerId, target: &Territory, territories: &[Territory]) -> u32 {
    adjacent_owned(player, target, territories)
        .map(|t| 1 + territory_strength(t))
        .sum()
}

/// `player`'s territories that border `target`
pub fn adjacent_owned<'a>(
    player: PlayerId,
    target: &'a Territory,
    territories: &'a [Territory],
) -> impl Iterator<Item = &'a Territory> + 'a {
    target
        .adjacent
        .iter()
        .filter_map(move |id| lookup(territories, *id))
        .filter(move |t| t.is_owned_by(player))
}

/// Defense of a territory before allies: itself plus its owner's neighbours
pub fn defense_strength(target: &Territory, territories: &[Territory]) -> u32 {
    let own = 1 + territory_strength(target);
    match target.owner {
        Some(owner) => own + adjacent_strength(owner, target, territories),
        None => own,
    }
}

/// Base strengths if `attacker` attacked `target` now.
///
/// Fails if the target is the attacker's own or the attacker has no
/// territory bordering it.
pub fn preview_attack(
    attacker: PlayerId,
    target: TerritoryId,
    territories: &[Territory],
) -> Result<Strengths> {
    let target_territory = lookup(territories, target)
        .ok_or(EngineError::UnknownTerritory(target))?;

    if target_territory.is_owned_by(attacker) {
        return Err(EngineError::InvalidTarget(format!(
            "{target} already belongs to {attacker}"
        )));
    }

    let attack = adjacent_strength(attacker, target_territory, territories);
    if attack == 0 {
        return Err(EngineError::NotAdjacent(target));
    }

    Ok(Strengths {
        attack,
        defense: defense_strength(target_territory, territories),
    })
}
