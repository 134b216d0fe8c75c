//! Notifications - what the engine tells participants after each change

use serde::{Deserialize, Serialize};

use super::phase::Phase;
use super::state::UnitKind;
use crate::alliance::{AllianceSetting, BattleStatus, Side, VoteRequest};
use crate::combat::{BattleResult, Card, Reinforcement, Strengths};
use crate::core::types::{BattleId, PlayerId, TerritoryId, TradeId};
use crate::rules::development::Improvement;
use crate::rules::production::Yield;
use crate::trade::{TradeProposal, TradeStatus};

/// Something that happened in a game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    PhaseChanged {
        phase: Phase,
        round: u32,
        current: Option<PlayerId>,
    },
    TurnChanged {
        player: PlayerId,
    },
    /// The player had no legal action and was passed over
    PhaseSkipped {
        player: PlayerId,
        phase: Phase,
    },
    TerritoryClaimed {
        player: PlayerId,
        territory: TerritoryId,
    },
    StockpilePlaced {
        player: PlayerId,
        territory: TerritoryId,
    },
    ProductionApplied {
        yields: Vec<Yield>,
    },
    TradeProposed {
        proposal: TradeProposal,
    },
    TradeClosed {
        trade: TradeId,
        from: PlayerId,
        to: PlayerId,
        status: TradeStatus,
    },
    UnitMoved {
        player: PlayerId,
        unit: UnitKind,
        from: TerritoryId,
        to: TerritoryId,
    },
    BattlePlanned {
        battle: BattleId,
        attacker: PlayerId,
        defender: Option<PlayerId>,
        target: TerritoryId,
        base: Strengths,
        reinforcement: Option<Reinforcement>,
    },
    VoteRequested {
        request: VoteRequest,
    },
    VoteCast {
        battle: BattleId,
        voter: PlayerId,
        side: Side,
    },
    DefenseCardsRequested {
        battle: BattleId,
        target: TerritoryId,
        timeout_secs: u64,
    },
    /// Defense cards stay hidden until the battle resolves
    DefenseCardsChosen {
        battle: BattleId,
    },
    BattleReady {
        battle: BattleId,
        status: BattleStatus,
        allied: Strengths,
    },
    BattleCancelled {
        battle: BattleId,
    },
    BattleResolved {
        result: BattleResult,
    },
    Built {
        player: PlayerId,
        territory: TerritoryId,
        improvement: Improvement,
    },
    CardBought {
        player: PlayerId,
    },
    CardDrawn {
        card: Card,
    },
    AllianceSettingChanged {
        player: PlayerId,
        setting: AllianceSetting,
    },
    TerritoryRenamed {
        territory: TerritoryId,
        name: String,
    },
    PlayerSurrendered {
        player: PlayerId,
    },
    GameEnded {
        winner: Option<PlayerId>,
    },
}

/// Who may see a notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Audience {
    All,
    Only(Vec<PlayerId>),
}

impl Audience {
    pub fn player(player: PlayerId) -> Self {
        Self::Only(vec![player])
    }

    pub fn pair(a: PlayerId, b: PlayerId) -> Self {
        Self::Only(vec![a, b])
    }

    pub fn includes(&self, player: PlayerId) -> bool {
        match self {
            Self::All => true,
            Self::Only(players) => players.contains(&player),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub audience: Audience,
    pub event: Event,
}

impl Notification {
    pub fn all(event: Event) -> Self {
        Self {
            audience: Audience::All,
            event,
        }
    }

    pub fn to(player: PlayerId, event: Event) -> Self {
        Self {
            audience: Audience::player(player),
            event,
        }
    }

    pub fn pair(a: PlayerId, b: PlayerId, event: Event) -> Self {
        Self {
            audience: Audience::pair(a, b),
            event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audience_filtering() {
        let event = Event::CardBought {
            player: PlayerId(1),
        };
        let n = Notification::pair(PlayerId(1), PlayerId(2), event);
        assert!(n.audience.includes(PlayerId(2)));
        assert!(!n.audience.includes(PlayerId(3)));
        assert!(Audience::All.includes(PlayerId(3)));
    }

    #[test]
    fn test_event_wire_shape() {
        let json = serde_json::to_value(Event::TurnChanged {
            player: PlayerId(2),
        })
        .unwrap();
        assert_eq!(json["event"], "turn_changed");
        assert_eq!(json["player"], 2);
    }
}
