use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::types::{BattleId, PlayerId, TerritoryId, TradeId};
use crate::game::Phase;

/// Broad classes of failure, used by callers to decide how to react
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Rule violation; state unchanged, the actor may try something else
    IllegalAction,
    /// Reference to a battle or trade that no longer exists
    StaleReference,
    /// Internal consistency failure (generator output, corrupt grid)
    InvariantViolation,
    /// Payload failed boundary validation
    Malformed,
    /// Storage, IO or channel failure outside the rules
    Infrastructure,
}

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("action not allowed during {0:?}")]
    WrongPhase(Phase),

    #[error("it is not {0}'s turn")]
    NotYourTurn(PlayerId),

    #[error("unknown player: {0}")]
    UnknownPlayer(PlayerId),

    #[error("{0} is no longer active")]
    PlayerInactive(PlayerId),

    #[error("unknown territory: {0}")]
    UnknownTerritory(TerritoryId),

    #[error("{0} is not owned by the acting player")]
    NotOwner(TerritoryId),

    #[error("{0} is already owned")]
    AlreadyOwned(TerritoryId),

    #[error("{0} is not adjacent")]
    NotAdjacent(TerritoryId),

    #[error("{territory} already has a {what}")]
    AlreadyBuilt {
        territory: TerritoryId,
        what: &'static str,
    },

    #[error("{0} has already been used this turn")]
    AlreadyUsed(&'static str),

    #[error("insufficient resources: {0}")]
    InsufficientResources(String),

    #[error("invalid target: {0}")]
    InvalidTarget(String),

    #[error("invalid reinforcement: {0}")]
    InvalidReinforcement(String),

    #[error("{0} already has a battle pending")]
    BattlePending(PlayerId),

    #[error("{0} is still waiting for votes")]
    BattleNotReady(BattleId),

    #[error("{0} has already resolved or expired")]
    StaleBattle(BattleId),

    #[error("{0} has already resolved or expired")]
    StaleTrade(TradeId),

    #[error("card combat is not enabled for this game")]
    CardsDisabled,

    #[error("the game has ended")]
    GameOver,

    #[error("malformed action: {0}")]
    Malformed(String),

    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("map generation failed after {attempts} attempts: {reason}")]
    GenerationFailed { attempts: u32, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("game is not running: {0}")]
    GameUnavailable(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
}

impl EngineError {
    /// Stable wire code for the failure
    pub fn code(&self) -> &'static str {
        match self {
            Self::WrongPhase(_) => "wrong_phase",
            Self::NotYourTurn(_) => "not_your_turn",
            Self::UnknownPlayer(_) => "unknown_player",
            Self::PlayerInactive(_) => "player_inactive",
            Self::UnknownTerritory(_) => "unknown_territory",
            Self::NotOwner(_) => "not_owner",
            Self::AlreadyOwned(_) => "already_owned",
            Self::NotAdjacent(_) => "not_adjacent",
            Self::AlreadyBuilt { .. } => "already_built",
            Self::AlreadyUsed(_) => "already_used",
            Self::InsufficientResources(_) => "insufficient_resources",
            Self::InvalidTarget(_) => "invalid_target",
            Self::InvalidReinforcement(_) => "invalid_reinforcement",
            Self::BattlePending(_) => "battle_pending",
            Self::BattleNotReady(_) => "battle_not_ready",
            Self::StaleBattle(_) => "stale_battle",
            Self::StaleTrade(_) => "stale_trade",
            Self::CardsDisabled => "cards_disabled",
            Self::GameOver => "game_over",
            Self::Malformed(_) => "malformed",
            Self::InvariantViolation(_) => "invariant_violation",
            Self::GenerationFailed { .. } => "generation_failed",
            Self::Config(_) => "invalid_config",
            Self::Storage(_) => "storage",
            Self::GameUnavailable(_) => "game_unavailable",
            Self::IoError(_) => "io",
            Self::SerdeError(_) => "serialization",
            Self::TomlError(_) => "toml",
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::StaleBattle(_) | Self::StaleTrade(_) => ErrorKind::StaleReference,
            Self::InvariantViolation(_) | Self::GenerationFailed { .. } => {
                ErrorKind::InvariantViolation
            }
            Self::Malformed(_) | Self::SerdeError(_) | Self::TomlError(_) | Self::Config(_) => {
                ErrorKind::Malformed
            }
            Self::Storage(_) | Self::GameUnavailable(_) | Self::IoError(_) => {
                ErrorKind::Infrastructure
            }
            _ => ErrorKind::IllegalAction,
        }
    }

    /// Serializable form sent back to the acting player
    pub fn rejection(&self) -> Rejection {
        Rejection {
            code: self.code().to_string(),
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}

/// Structured failure returned through the action intake
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rejection {
    pub code: String,
    pub kind: ErrorKind,
    pub message: String,
}

pub type Result<T> = std::result::Result<T, EngineError>;
