//! Pending battle - the vote and card windows in front of one attack

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::combat::cards::{AttackCard, DefenseCard};
use crate::combat::{Engagement, Reinforcement, Strengths};
use crate::core::error::{EngineError, Result};
use crate::core::types::{BattleId, PlayerId, TerritoryId};

/// A player's standing answer to alliance requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllianceSetting {
    /// Prompt every time
    #[default]
    Ask,
    /// Never take a side
    Neutral,
    /// Always back the defender
    Defender,
    /// Back this player whenever they fight
    Player(PlayerId),
}

/// Which side a candidate's adjacent strength goes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Attacker,
    Defender,
    Neutral,
}

impl AllianceSetting {
    /// The side this setting picks without prompting, or None for `Ask`
    pub fn standing_side(&self, attacker: PlayerId, defender: Option<PlayerId>) -> Option<Side> {
        match *self {
            Self::Ask => None,
            Self::Neutral => Some(Side::Neutral),
            Self::Defender if defender.is_some() => Some(Side::Defender),
            Self::Defender => Some(Side::Neutral),
            Self::Player(ally) if ally == attacker => Some(Side::Attacker),
            Self::Player(ally) if Some(ally) == defender => Some(Side::Defender),
            Self::Player(_) => Some(Side::Neutral),
        }
    }
}

/// Lifecycle of a pending battle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BattleStatus {
    /// Created, windows not opened yet
    Pending,
    /// Waiting on votes or defense cards
    Voting,
    /// Every answer arrived
    Resolved,
    /// A window closed with answers missing
    TimedOut,
}

/// A candidate voter and their current answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    /// Adjacent strength this voter would add
    pub strength: u32,
    /// None while an `Ask` voter has not answered
    pub side: Option<Side>,
}

/// Sent to an `Ask` candidate when a battle opens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRequest {
    pub battle: BattleId,
    pub voter: PlayerId,
    pub attacker: PlayerId,
    pub defender: Option<PlayerId>,
    pub target: TerritoryId,
    pub strength: u32,
    pub timeout_secs: u64,
}

/// Parameters for opening a battle
#[derive(Debug, Clone)]
pub struct BattlePlan {
    pub attacker: PlayerId,
    pub defender: Option<PlayerId>,
    pub target: TerritoryId,
    pub base: Strengths,
    pub reinforcement: Option<Reinforcement>,
    pub attack_cards: Vec<AttackCard>,
}

/// A planned attack waiting for its alliance and card windows
#[derive(Debug, Clone)]
pub struct Battle {
    pub id: BattleId,
    pub attacker: PlayerId,
    pub defender: Option<PlayerId>,
    pub target: TerritoryId,
    /// Strengths at planning time, shown to the attacker
    pub base: Strengths,
    pub reinforcement: Option<Reinforcement>,
    pub attack_cards: Vec<AttackCard>,
    /// None while the defender may still choose
    pub defense_cards: Option<Vec<DefenseCard>>,
    pub ballots: BTreeMap<PlayerId, Ballot>,
    status: BattleStatus,
    vote_deadline: Option<Instant>,
    card_deadline: Option<Instant>,
    timed_out: bool,
}

impl Battle {
    pub fn new(id: BattleId, plan: BattlePlan) -> Self {
        Self {
            id,
            attacker: plan.attacker,
            defender: plan.defender,
            target: plan.target,
            base: plan.base,
            reinforcement: plan.reinforcement,
            attack_cards: plan.attack_cards,
            defense_cards: Some(Vec::new()),
            ballots: BTreeMap::new(),
            status: BattleStatus::Pending,
            vote_deadline: None,
            card_deadline: None,
            timed_out: false,
        }
    }

    pub fn status(&self) -> BattleStatus {
        self.status
    }

    /// Add a candidate. Standing settings are answered on the spot.
    pub fn add_candidate(&mut self, voter: PlayerId, strength: u32, setting: AllianceSetting) {
        let side = setting.standing_side(self.attacker, self.defender);
        self.ballots.insert(voter, Ballot { strength, side });
    }

    /// Voters still owing an answer
    pub fn awaiting(&self) -> impl Iterator<Item = PlayerId> + '_ {
        self.ballots
            .iter()
            .filter(|(_, b)| b.side.is_none())
            .map(|(p, _)| *p)
    }

    /// Open the windows and move out of `Pending`.
    ///
    /// Returns the requests for `Ask` voters.
    pub fn open(
        &mut self,
        now: Instant,
        vote_timeout: Duration,
        card_timeout: Option<Duration>,
    ) -> Vec<VoteRequest> {
        let requests: Vec<VoteRequest> = self
            .ballots
            .iter()
            .filter(|(_, b)| b.side.is_none())
            .map(|(voter, b)| VoteRequest {
                battle: self.id,
                voter: *voter,
                attacker: self.attacker,
                defender: self.defender,
                target: self.target,
                strength: b.strength,
                timeout_secs: vote_timeout.as_secs(),
            })
            .collect();

        if !requests.is_empty() {
            self.vote_deadline = Some(now + vote_timeout);
        }
        if let Some(timeout) = card_timeout {
            self.defense_cards = None;
            self.card_deadline = Some(now + timeout);
        }

        self.status = BattleStatus::Voting;
        self.settle();
        requests
    }

    /// Record an `Ask` voter's answer
    pub fn vote(&mut self, voter: PlayerId, side: Side) -> Result<()> {
        if self.status != BattleStatus::Voting {
            return Err(EngineError::StaleBattle(self.id));
        }
        match self.ballots.get_mut(&voter) {
            Some(ballot) if ballot.side.is_none() => {
                ballot.side = Some(side);
            }
            _ => {
                return Err(EngineError::InvalidTarget(format!(
                    "{voter} has no open vote in {}",
                    self.id
                )))
            }
        }
        self.settle();
        Ok(())
    }

    /// Record the defender's card choice
    pub fn choose_defense_cards(
        &mut self,
        player: PlayerId,
        cards: Vec<DefenseCard>,
    ) -> Result<()> {
        if self.status != BattleStatus::Voting || self.defense_cards.is_some() {
            return Err(EngineError::StaleBattle(self.id));
        }
        if self.defender != Some(player) {
            return Err(EngineError::InvalidTarget(format!(
                "{player} is not defending in {}",
                self.id
            )));
        }
        self.defense_cards = Some(cards);
        self.settle();
        Ok(())
    }

    /// Earliest open deadline
    pub fn deadline(&self) -> Option<Instant> {
        if self.status != BattleStatus::Voting {
            return None;
        }
        let vote = self.vote_deadline.filter(|_| self.awaiting().next().is_some());
        let cards = self.card_deadline.filter(|_| self.defense_cards.is_none());
        match (vote, cards) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Close any window whose deadline has passed. Returns true if the battle changed.
    pub fn expire(&mut self, now: Instant) -> bool {
        if self.status != BattleStatus::Voting {
            return false;
        }
        let mut changed = false;

        if self.vote_deadline.is_some_and(|d| d <= now) {
            for ballot in self.ballots.values_mut() {
                if ballot.side.is_none() {
                    ballot.side = Some(Side::Neutral);
                    changed = true;
                }
            }
        }
        if self.card_deadline.is_some_and(|d| d <= now) && self.defense_cards.is_none() {
            self.defense_cards = Some(Vec::new());
            changed = true;
        }

        if changed {
            self.timed_out = true;
            self.settle();
        }
        changed
    }

    fn settle(&mut self) {
        let votes_in = self.awaiting().next().is_none();
        if votes_in && self.defense_cards.is_some() {
            self.status = if self.timed_out {
                BattleStatus::TimedOut
            } else {
                BattleStatus::Resolved
            };
        }
    }

    /// True once the attacker may execute
    pub fn is_ready(&self) -> bool {
        matches!(self.status, BattleStatus::Resolved | BattleStatus::TimedOut)
    }

    /// Players on each side: (attacker allies, defender allies)
    pub fn allies(&self) -> (Vec<PlayerId>, Vec<PlayerId>) {
        let on = |side: Side| {
            self.ballots
                .iter()
                .filter(|(_, b)| b.side == Some(side))
                .map(|(p, _)| *p)
                .collect::<Vec<_>>()
        };
        (on(Side::Attacker), on(Side::Defender))
    }

    /// Allied strength totals as they stand
    pub fn allied_totals(&self) -> Strengths {
        let sum = |side: Side| {
            self.ballots
                .values()
                .filter(|b| b.side == Some(side))
                .map(|b| b.strength)
                .sum::<u32>()
        };
        Strengths {
            attack: sum(Side::Attacker),
            defense: sum(Side::Defender),
        }
    }

    pub fn engagement(&self) -> Engagement {
        let (attacker_allies, defender_allies) = self.allies();
        Engagement {
            attacker: self.attacker,
            target: self.target,
            attacker_allies,
            defender_allies,
            reinforcement: self.reinforcement,
            attack_cards: self.attack_cards.clone(),
            defense_cards: self.defense_cards.clone().unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan() -> BattlePlan {
        BattlePlan {
            attacker: PlayerId(1),
            defender: Some(PlayerId(2)),
            target: TerritoryId(4),
            base: Strengths {
                attack: 3,
                defense: 2,
            },
            reinforcement: None,
            attack_cards: Vec::new(),
        }
    }

    #[test]
    fn test_standing_settings() {
        let (a, d) = (PlayerId(1), Some(PlayerId(2)));
        assert_eq!(AllianceSetting::Ask.standing_side(a, d), None);
        assert_eq!(AllianceSetting::Defender.standing_side(a, d), Some(Side::Defender));
        assert_eq!(
            AllianceSetting::Player(PlayerId(1)).standing_side(a, d),
            Some(Side::Attacker)
        );
        assert_eq!(
            AllianceSetting::Player(PlayerId(2)).standing_side(a, d),
            Some(Side::Defender)
        );
        assert_eq!(
            AllianceSetting::Player(PlayerId(5)).standing_side(a, d),
            Some(Side::Neutral)
        );

        // Unclaimed land has no defender to back
        assert_eq!(AllianceSetting::Defender.standing_side(a, None), Some(Side::Neutral));
        assert_eq!(
            AllianceSetting::Player(PlayerId(2)).standing_side(a, None),
            Some(Side::Neutral)
        );
        assert_eq!(AllianceSetting::Ask.standing_side(a, None), None);
    }

    #[test]
    fn test_no_ask_voters_resolves_at_once() {
        let mut battle = Battle::new(BattleId(1), plan());
        battle.add_candidate(PlayerId(3), 2, AllianceSetting::Defender);
        assert_eq!(battle.status(), BattleStatus::Pending);

        let requests = battle.open(Instant::now(), Duration::from_secs(60), None);
        assert!(requests.is_empty());
        assert_eq!(battle.status(), BattleStatus::Resolved);
        assert_eq!(battle.allied_totals(), Strengths { attack: 0, defense: 2 });
    }

    #[test]
    fn test_votes_complete_the_battle() {
        let now = Instant::now();
        let mut battle = Battle::new(BattleId(1), plan());
        battle.add_candidate(PlayerId(3), 2, AllianceSetting::Ask);
        battle.add_candidate(PlayerId(4), 1, AllianceSetting::Ask);

        let requests = battle.open(now, Duration::from_secs(60), None);
        assert_eq!(requests.len(), 2);
        assert_eq!(battle.deadline(), Some(now + Duration::from_secs(60)));

        battle.vote(PlayerId(3), Side::Attacker).unwrap();
        assert!(!battle.is_ready());
        assert!(battle.vote(PlayerId(3), Side::Defender).is_err());

        battle.vote(PlayerId(4), Side::Neutral).unwrap();
        assert_eq!(battle.status(), BattleStatus::Resolved);
        assert_eq!(battle.allies(), (vec![PlayerId(3)], vec![]));
        assert_eq!(battle.deadline(), None);
    }

    #[test]
    fn test_silent_voters_count_as_neutral() {
        let now = Instant::now();
        let mut battle = Battle::new(BattleId(1), plan());
        battle.add_candidate(PlayerId(3), 2, AllianceSetting::Ask);
        battle.open(now, Duration::from_secs(60), None);

        assert!(!battle.expire(now + Duration::from_secs(59)));
        assert!(battle.expire(now + Duration::from_secs(60)));
        assert_eq!(battle.status(), BattleStatus::TimedOut);
        assert_eq!(battle.allied_totals(), Strengths::default());

        let err = battle.vote(PlayerId(3), Side::Attacker).unwrap_err();
        assert_eq!(err.code(), "stale_battle");
    }

    #[test]
    fn test_card_window_shares_readiness() {
        let now = Instant::now();
        let mut battle = Battle::new(BattleId(1), plan());
        battle.open(now, Duration::from_secs(60), Some(Duration::from_secs(30)));
        assert!(!battle.is_ready());
        assert_eq!(battle.deadline(), Some(now + Duration::from_secs(30)));

        assert!(battle
            .choose_defense_cards(PlayerId(1), vec![DefenseCard::Fortify])
            .is_err());
        battle
            .choose_defense_cards(PlayerId(2), vec![DefenseCard::Fortify])
            .unwrap();
        assert!(battle.is_ready());
        assert_eq!(battle.engagement().defense_cards, vec![DefenseCard::Fortify]);
    }
}
