//! Player actions - the typed records accepted at the intake boundary
//!
//! Parsing and shape checks happen here, before any rule sees the action.
//! Shape checks cover what can be judged without game state.

use serde::{Deserialize, Serialize};

use super::state::UnitKind;
use crate::alliance::{AllianceSetting, Side};
use crate::combat::cards::{AttackCard, DefenseCard};
use crate::combat::Reinforcement;
use crate::core::error::{EngineError, Result};
use crate::core::types::{BattleId, PlayerId, TerritoryId, TradeId, WaterBodyId};
use crate::rules::development::{Improvement, Payment};
use crate::trade::TradeBundle;

/// Longest territory name accepted
pub const MAX_NAME_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    SelectTerritory {
        territory: TerritoryId,
    },
    PlaceStockpile {
        territory: TerritoryId,
    },
    ProposeTrade {
        to: PlayerId,
        #[serde(default)]
        offer: TradeBundle,
        #[serde(default)]
        request: TradeBundle,
        /// Where requested horses go, one per horse
        #[serde(default)]
        horse_destinations: Vec<TerritoryId>,
    },
    RespondTrade {
        trade: TradeId,
        accept: bool,
        #[serde(default)]
        horse_destinations: Vec<TerritoryId>,
    },
    CancelTrade {
        trade: TradeId,
    },
    MoveUnit {
        unit: UnitKind,
        from: TerritoryId,
        to: TerritoryId,
        /// Required for boats
        #[serde(default)]
        water: Option<WaterBodyId>,
    },
    EndPhase,
    PlanAttack {
        target: TerritoryId,
        #[serde(default)]
        reinforcement: Option<Reinforcement>,
        #[serde(default)]
        cards: Vec<AttackCard>,
    },
    ExecuteAttack {
        battle: BattleId,
    },
    CancelAttack {
        battle: BattleId,
    },
    VoteAlliance {
        battle: BattleId,
        side: Side,
    },
    SetAlliance {
        setting: AllianceSetting,
    },
    Build {
        territory: TerritoryId,
        improvement: Improvement,
        #[serde(default)]
        payment: Payment,
        /// Required for a boat when the territory borders several water bodies
        #[serde(default)]
        water: Option<WaterBodyId>,
    },
    /// Costs `card_cost_gold` gold
    BuyCard,
    SelectDefenseCards {
        battle: BattleId,
        cards: Vec<DefenseCard>,
    },
    Surrender,
    RenameTerritory {
        territory: TerritoryId,
        name: String,
    },
}

impl Action {
    /// Parse an action from JSON and check its shape
    pub fn from_json(json: &str) -> Result<Self> {
        let action: Action = serde_json::from_str(json)?;
        action.validate_shape()?;
        Ok(action)
    }

    /// Reject payloads that are wrong regardless of game state
    pub fn validate_shape(&self) -> Result<()> {
        match self {
            Self::MoveUnit {
                unit, from, to, water,
            } => {
                if from == to {
                    return Err(EngineError::Malformed("move to the same territory".into()));
                }
                match (unit, water) {
                    (UnitKind::Boat, None) => {
                        Err(EngineError::Malformed("boat moves need a water body".into()))
                    }
                    (UnitKind::Stockpile | UnitKind::Horse, Some(_)) => Err(
                        EngineError::Malformed("only boats move through water".into()),
                    ),
                    _ => Ok(()),
                }
            }
            Self::Build {
                improvement, water, ..
            } => {
                if water.is_some() && *improvement != Improvement::Boat {
                    return Err(EngineError::Malformed(format!(
                        "a {improvement} takes no water body"
                    )));
                }
                Ok(())
            }
            Self::RenameTerritory { name, .. } => {
                let trimmed = name.trim();
                if trimmed.is_empty() || trimmed.chars().count() > MAX_NAME_LEN {
                    return Err(EngineError::Malformed(format!(
                        "names must be 1 to {MAX_NAME_LEN} characters"
                    )));
                }
                if trimmed.chars().any(char::is_control) {
                    return Err(EngineError::Malformed(
                        "names may not contain control characters".into(),
                    ));
                }
                Ok(())
            }
            Self::RespondTrade {
                accept: false,
                horse_destinations,
                ..
            } if !horse_destinations.is_empty() => Err(EngineError::Malformed(
                "a rejection places no horses".into(),
            )),
            _ => Ok(()),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::SelectTerritory { .. } => "select_territory",
            Self::PlaceStockpile { .. } => "place_stockpile",
            Self::ProposeTrade { .. } => "propose_trade",
            Self::RespondTrade { .. } => "respond_trade",
            Self::CancelTrade { .. } => "cancel_trade",
            Self::MoveUnit { .. } => "move_unit",
            Self::EndPhase => "end_phase",
            Self::PlanAttack { .. } => "plan_attack",
            Self::ExecuteAttack { .. } => "execute_attack",
            Self::CancelAttack { .. } => "cancel_attack",
            Self::VoteAlliance { .. } => "vote_alliance",
            Self::SetAlliance { .. } => "set_alliance",
            Self::Build { .. } => "build",
            Self::BuyCard => "buy_card",
            Self::SelectDefenseCards { .. } => "select_defense_cards",
            Self::Surrender => "surrender",
            Self::RenameTerritory { .. } => "rename_territory",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tagged_actions() {
        let action = Action::from_json(r#"{"type":"select_territory","territory":4}"#).unwrap();
        assert_eq!(
            action,
            Action::SelectTerritory {
                territory: TerritoryId(4)
            }
        );

        let action = Action::from_json(
            r#"{"type":"plan_attack","target":2,
                "reinforcement":{"unit":"horse","from":1,"carry_weapon":true},
                "cards":["charge"]}"#,
        )
        .unwrap();
        assert_eq!(action.name(), "plan_attack");

        let action = Action::from_json(
            r#"{"type":"propose_trade","to":2,"offer":{"gold":2},"request":{"timber":3}}"#,
        )
        .unwrap();
        match action {
            Action::ProposeTrade { offer, request, .. } => {
                assert_eq!(offer.resources.gold, 2);
                assert_eq!(request.resources.timber, 3);
            }
            other => panic!("unexpected {other:?}"),
        }

        let action =
            Action::from_json(r#"{"type":"set_alliance","setting":{"player":3}}"#).unwrap();
        assert_eq!(
            action,
            Action::SetAlliance {
                setting: AllianceSetting::Player(PlayerId(3))
            }
        );
    }

    #[test]
    fn test_unknown_type_rejected() {
        let err = Action::from_json(r#"{"type":"teleport","territory":1}"#).unwrap_err();
        assert_eq!(err.kind(), crate::core::error::ErrorKind::Malformed);
    }

    #[test]
    fn test_wrong_field_type_rejected() {
        assert!(Action::from_json(r#"{"type":"select_territory","territory":"four"}"#).is_err());
    }

    #[test]
    fn test_boat_move_needs_water() {
        let err = Action::from_json(r#"{"type":"move_unit","unit":"boat","from":1,"to":2}"#)
            .unwrap_err();
        assert_eq!(err.code(), "malformed");
        assert!(
            Action::from_json(r#"{"type":"move_unit","unit":"boat","from":1,"to":2,"water":0}"#)
                .is_ok()
        );
    }

    #[test]
    fn test_rename_checks_length() {
        let long = "x".repeat(MAX_NAME_LEN + 1);
        let action = Action::RenameTerritory {
            territory: TerritoryId(1),
            name: long,
        };
        assert!(action.validate_shape().is_err());

        let action = Action::RenameTerritory {
            territory: TerritoryId(1),
            name: "  ".into(),
        };
        assert!(action.validate_shape().is_err());
    }
}
