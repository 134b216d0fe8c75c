//! Battle resolution - the single authoritative strength comparison
//!
//! Strengths are recomputed from current territory state at execution time.
//! Whatever the attacker saw while planning is informational only.

use serde::{Deserialize, Serialize};

use super::cards::{attack_bonus, defense_bonus, AttackCard, CardContext, DefenseCard};
use super::reinforcement::Reinforcement;
use super::strength::{adjacent_owned, adjacent_strength, preview_attack, Strengths};
use crate::core::config::GameConfig;
use crate::core::error::{EngineError, Result};
use crate::core::types::{PlayerId, TerritoryId};
use crate::map::{lookup, lookup_mut, Map, Territory};
use crate::rules::stockpile::Stockpile;

/// Outcome of a battle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BattleOutcome {
    /// Target changes hands
    AttackerVictory,
    /// Target holds; includes ties
    DefenderVictory,
}

/// Everything that goes into one battle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Engagement {
    pub attacker: PlayerId,
    pub target: TerritoryId,
    /// Players whose adjacent strength joins the attack
    pub attacker_allies: Vec<PlayerId>,
    /// Players whose adjacent strength joins the defense
    pub defender_allies: Vec<PlayerId>,
    pub reinforcement: Option<Reinforcement>,
    pub attack_cards: Vec<AttackCard>,
    pub defense_cards: Vec<DefenseCard>,
}

impl Engagement {
    /// A bare attack with no allies, reinforcement or cards
    pub fn new(attacker: PlayerId, target: TerritoryId) -> Self {
        Self {
            attacker,
            target,
            attacker_allies: Vec::new(),
            defender_allies: Vec::new(),
            reinforcement: None,
            attack_cards: Vec::new(),
            defense_cards: Vec::new(),
        }
    }
}

/// Revealed to both sides at once when a battle resolves
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleResult {
    pub attacker: PlayerId,
    pub defender: Option<PlayerId>,
    pub target: TerritoryId,
    pub base: Strengths,
    pub attack: u32,
    pub defense: u32,
    pub attack_cards: Vec<AttackCard>,
    pub defense_cards: Vec<DefenseCard>,
    pub outcome: BattleOutcome,
    /// Resources taken from a captured stockpile
    pub seized: Stockpile,
}

impl BattleResult {
    pub fn attacker_won(&self) -> bool {
        self.outcome == BattleOutcome::AttackerVictory
    }
}

fn card_context(
    engagement: &Engagement,
    target: &Territory,
    territories: &[Territory],
) -> CardContext {
    CardContext {
        target_has_city: target.has_city,
        horse_committed: engagement
            .reinforcement
            .is_some_and(|r| r.brings_horse()),
        defender_neighbours: target
            .owner
            .map(|owner| adjacent_owned(owner, target, territories).count())
            .unwrap_or(0),
    }
}

/// Base and final strengths for an engagement against current state
pub fn final_strengths(
    engagement: &Engagement,
    territories: &[Territory],
    map: &Map,
    config: &GameConfig,
) -> Result<(Strengths, Strengths)> {
    let base = preview_attack(engagement.attacker, engagement.target, territories)?;
    let target = lookup(territories, engagement.target)
        .ok_or(EngineError::UnknownTerritory(engagement.target))?;

    let mut attack = base.attack;
    let mut defense = base.defense;

    for ally in &engagement.attacker_allies {
        attack += adjacent_strength(*ally, target, territories);
    }
    for ally in &engagement.defender_allies {
        defense += adjacent_strength(*ally, target, territories);
    }

    if let Some(reinforcement) = &engagement.reinforcement {
        reinforcement.validate(engagement.attacker, engagement.target, territories, map)?;
        attack += reinforcement.bonus(config);
    }

    let ctx = card_context(engagement, target, territories);
    attack += attack_bonus(&engagement.attack_cards, &ctx);
    defense += defense_bonus(&engagement.defense_cards, &ctx);

    Ok((base, Strengths { attack, defense }))
}

/// Resolve a battle and apply its territorial consequences.
///
/// On victory the target changes owner and keeps its improvements. On
/// defeat the committed reinforcement and its cargo are lost. Stockpile
/// seizure is left to the caller, which owns the players.
pub fn resolve(
    engagement: &Engagement,
    territories: &mut [Territory],
    map: &Map,
    config: &GameConfig,
) -> Result<BattleResult> {
    let (base, strengths) = final_strengths(engagement, territories, map, config)?;
    let target = lookup_mut(territories, engagement.target)
        .ok_or(EngineError::UnknownTerritory(engagement.target))?;
    let defender = target.owner;

    let outcome = if strengths.attacker_wins() {
        target.owner = Some(engagement.attacker);
        BattleOutcome::AttackerVictory
    } else {
        if let Some(reinforcement) = &engagement.reinforcement {
            reinforcement.forfeit(territories);
        }
        BattleOutcome::DefenderVictory
    };

    tracing::debug!(
        attacker = %engagement.attacker,
        target = %engagement.target,
        attack = strengths.attack,
        defense = strengths.defense,
        ?outcome,
        "battle resolved"
    );

    Ok(BattleResult {
        attacker: engagement.attacker,
        defender,
        target: engagement.target,
        base,
        attack: strengths.attack,
        defense: strengths.defense,
        attack_cards: engagement.attack_cards.clone(),
        defense_cards: engagement.defense_cards.clone(),
        outcome,
        seized: Stockpile::default(),
    })
}

/// Move a captured stockpile's entire contents to the winner
pub fn seize_stockpile(loser: &mut Stockpile, winner: &mut Stockpile) -> Stockpile {
    let seized = loser.take_all();
    winner.merge(&seized);
    seized
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row_map() -> Map {
        Map::from_rows(&[vec![1, 2, 3]]).unwrap()
    }

    #[test]
    fn test_allies_tip_the_balance() {
        let map = Map::from_rows(&[vec![1, 2], vec![3, 3]]).unwrap();
        let mut territories = map.blank_territories();
        territories[0].owner = Some(PlayerId(1));
        territories[1].owner = Some(PlayerId(2));
        territories[2].owner = Some(PlayerId(3));

        let alone = Engagement::new(PlayerId(1), TerritoryId(2));
        let result = resolve(&alone, &mut territories.clone(), &map, &GameConfig::default())
            .unwrap();
        assert_eq!(result.outcome, BattleOutcome::DefenderVictory);

        let allied = Engagement {
            attacker_allies: vec![PlayerId(3)],
            ..alone
        };
        let result = resolve(&allied, &mut territories, &map, &GameConfig::default()).unwrap();
        assert_eq!((result.attack, result.defense), (2, 1));
        assert!(result.attacker_won());
        assert_eq!(territories[1].owner, Some(PlayerId(1)));
    }

    #[test]
    fn test_captured_territory_keeps_improvements() {
        let map = row_map();
        let mut territories = map.blank_territories();
        territories[0].owner = Some(PlayerId(1));
        territories[0].has_weapon = true;
        territories[1].owner = Some(PlayerId(2));
        territories[1].has_city = true;

        let engagement = Engagement::new(PlayerId(1), TerritoryId(2));
        let result = resolve(&engagement, &mut territories, &map, &GameConfig::default()).unwrap();
        assert_eq!(result.defender, Some(PlayerId(2)));
        assert!(result.attacker_won());
        assert!(territories[1].has_city);
    }

    #[test]
    fn test_lost_reinforcement_is_forfeited() {
        let map = row_map();
        let mut territories = map.blank_territories();
        territories[0].owner = Some(PlayerId(1));
        territories[0].has_horse = true;
        territories[1].owner = Some(PlayerId(2));
        territories[1].has_city = true;
        territories[1].has_weapon = true;

        let engagement = Engagement {
            reinforcement: Some(Reinforcement::Horse {
                from: TerritoryId(1),
                carry_weapon: false,
            }),
            ..Engagement::new(PlayerId(1), TerritoryId(2))
        };
        let result = resolve(&engagement, &mut territories, &map, &GameConfig::default()).unwrap();
        // 1 + horse 1 + reinforcement 1 vs 1 + city 2 + weapon 3
        assert_eq!((result.attack, result.defense), (3, 6));
        assert!(!territories[0].has_horse);
        assert_eq!(territories[1].owner, Some(PlayerId(2)));
    }

    #[test]
    fn test_carried_weapon_also_counts_at_home() {
        let map = row_map();
        let mut territories = map.blank_territories();
        territories[0].owner = Some(PlayerId(1));
        territories[0].has_horse = true;
        territories[0].has_weapon = true;

        let engagement = Engagement {
            reinforcement: Some(Reinforcement::Horse {
                from: TerritoryId(1),
                carry_weapon: true,
            }),
            ..Engagement::new(PlayerId(1), TerritoryId(2))
        };
        let result = resolve(&engagement, &mut territories, &map, &GameConfig::default()).unwrap();
        // Source 1 + weapon 3 + horse 1, then the unit 1 and its weapon 3 again
        assert_eq!(result.base.attack, 5);
        assert_eq!((result.attack, result.defense), (9, 1));
    }

    #[test]
    fn test_cards_modify_before_comparison() {
        let map = row_map();
        let mut territories = map.blank_territories();
        territories[0].owner = Some(PlayerId(1));
        territories[1].owner = Some(PlayerId(2));
        territories[1].has_city = true;

        let engagement = Engagement {
            attack_cards: vec![AttackCard::Siege, AttackCard::Charge],
            defense_cards: vec![DefenseCard::Walls],
            ..Engagement::new(PlayerId(1), TerritoryId(2))
        };
        let result = resolve(&engagement, &mut territories, &map, &GameConfig::default()).unwrap();
        // attack 1 + 3 + 2 = 6, defense 3 + 3 = 6: tie holds
        assert_eq!((result.attack, result.defense), (6, 6));
        assert_eq!(result.outcome, BattleOutcome::DefenderVictory);
        assert_eq!(result.base, Strengths { attack: 1, defense: 3 });
    }

    #[test]
    fn test_seize_stockpile() {
        let mut loser = Stockpile::new(1, 2, 3, 4);
        let mut winner = Stockpile::gold(1);
        let seized = seize_stockpile(&mut loser, &mut winner);
        assert_eq!(seized.total(), 10);
        assert!(loser.is_empty());
        assert_eq!(winner, Stockpile::new(1, 3, 3, 4));
    }
}
