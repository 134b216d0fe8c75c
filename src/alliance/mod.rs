//! Alliance negotiator - timed third-party voting on pending battles
//!
//! Each planned attack becomes a [`Battle`] that waits here until every
//! neighbour has picked a side (or the vote window closes) and, in card
//! mode, the defender has picked cards. Execution happens elsewhere; this
//! module only decides who stands where.

pub mod battle;

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::combat::strength::adjacent_strength;
use crate::core::error::{EngineError, Result};
use crate::core::types::{BattleId, PlayerId};
use crate::map::{lookup, Territory};

pub use battle::{
    AllianceSetting, Ballot, Battle, BattlePlan, BattleStatus, Side, VoteRequest,
};

/// A third party entitled to vote, with the strength they would bring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub player: PlayerId,
    pub strength: u32,
    pub setting: AllianceSetting,
}

/// Neighbours of the target who may join the battle.
///
/// `participants` lists every active player with their setting. Unclaimed
/// targets still draw their neighbours in.
pub fn candidates(
    plan: &BattlePlan,
    territories: &[Territory],
    participants: &[(PlayerId, AllianceSetting)],
) -> Vec<Candidate> {
    let Some(target) = lookup(territories, plan.target) else {
        return Vec::new();
    };

    participants
        .iter()
        .filter(|(p, _)| *p != plan.attacker && Some(*p) != plan.defender)
        .filter_map(|(player, setting)| {
            let strength = adjacent_strength(*player, target, territories);
            (strength > 0).then_some(Candidate {
                player: *player,
                strength,
                setting: *setting,
            })
        })
        .collect()
}

/// Every pending battle in one game
#[derive(Debug, Default)]
pub struct Negotiator {
    battles: BTreeMap<BattleId, Battle>,
    next_id: u32,
}

impl Negotiator {
    pub fn new() -> Self {
        Self::default()
    }

    /// The attacker's pending battle, if any
    pub fn pending_for(&self, attacker: PlayerId) -> Option<&Battle> {
        self.battles.values().find(|b| b.attacker == attacker)
    }

    pub fn get(&self, id: BattleId) -> Result<&Battle> {
        self.battles.get(&id).ok_or(EngineError::StaleBattle(id))
    }

    pub fn get_mut(&mut self, id: BattleId) -> Result<&mut Battle> {
        self.battles.get_mut(&id).ok_or(EngineError::StaleBattle(id))
    }

    pub fn battles(&self) -> impl Iterator<Item = &Battle> {
        self.battles.values()
    }

    pub fn is_empty(&self) -> bool {
        self.battles.is_empty()
    }

    /// Open a battle for a plan. An attacker may only have one at a time.
    pub fn open(
        &mut self,
        plan: BattlePlan,
        candidates: &[Candidate],
        now: Instant,
        vote_timeout: Duration,
        card_timeout: Option<Duration>,
    ) -> Result<(BattleId, Vec<VoteRequest>)> {
        if self.pending_for(plan.attacker).is_some() {
            return Err(EngineError::BattlePending(plan.attacker));
        }

        self.next_id += 1;
        let id = BattleId(self.next_id);
        let mut battle = Battle::new(id, plan);
        for c in candidates {
            battle.add_candidate(c.player, c.strength, c.setting);
        }
        let requests = battle.open(now, vote_timeout, card_timeout);

        tracing::debug!(
            battle = %id,
            attacker = %battle.attacker,
            target = %battle.target,
            candidates = candidates.len(),
            asked = requests.len(),
            "battle opened"
        );

        self.battles.insert(id, battle);
        Ok((id, requests))
    }

    /// Take a battle out, for execution or cancellation
    pub fn remove(&mut self, id: BattleId) -> Result<Battle> {
        self.battles.remove(&id).ok_or(EngineError::StaleBattle(id))
    }

    /// Earliest deadline across all battles
    pub fn next_deadline(&self) -> Option<Instant> {
        self.battles.values().filter_map(Battle::deadline).min()
    }

    /// Close expired windows. Returns the battles that changed.
    pub fn expire(&mut self, now: Instant) -> Vec<BattleId> {
        self.battles
            .values_mut()
            .filter_map(|b| b.expire(now).then_some(b.id))
            .collect()
    }

    /// Drop every pending battle, returning them
    pub fn drain(&mut self) -> Vec<Battle> {
        std::mem::take(&mut self.battles).into_values().collect()
    }
}
