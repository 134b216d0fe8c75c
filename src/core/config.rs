//! Game configuration with documented constants
//!
//! Every tunable rule number lives here. A config is fixed when a game is
//! created and travels with the game's actor.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::core::error::{EngineError, Result};
use crate::rules::stockpile::Stockpile;

/// How battles are decided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombatMode {
    /// Raw territory-derived strength comparison
    #[default]
    Standard,
    /// Strengths are modified by attack and defense cards before comparison
    Cards,
}

/// Resource cost of each development
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildCosts {
    pub city: Stockpile,
    pub weapon: Stockpile,
    pub boat: Stockpile,
}

impl Default for BuildCosts {
    fn default() -> Self {
        Self {
            city: Stockpile::new(1, 1, 1, 1),
            weapon: Stockpile::new(1, 0, 1, 0),
            boat: Stockpile::new(0, 0, 0, 3),
        }
    }
}

/// Configuration for one game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    // === PLAYERS ===
    /// Fewest seats a game can start with
    pub min_players: u8,

    /// Most seats a game can start with
    pub max_players: u8,

    // === VICTORY ===
    /// Number of cities a player must own to win
    ///
    /// Checked after every build and every conquest.
    pub victory_cities: u32,

    // === TIMERS ===
    /// Wall-clock window for `ask` alliance voters to respond
    ///
    /// Unanswered voters count as neutral once it passes.
    pub alliance_vote_timeout_secs: u64,

    /// Wall-clock window for a defender to pick defense cards (card mode)
    pub defense_card_timeout_secs: u64,

    /// Wall-clock length of the Trade phase before it ends on its own
    pub trade_phase_timeout_secs: u64,

    // === COMBAT ===
    pub combat_mode: CombatMode,

    /// Strength a horse adds when brought in as a reinforcement
    pub horse_bonus: u32,

    /// Strength a boat adds when brought in as a reinforcement
    pub boat_bonus: u32,

    // === DEVELOPMENT ===
    pub costs: BuildCosts,

    /// Gold paid for one card in card mode
    pub card_cost_gold: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            min_players: 2,
            max_players: 6,

            victory_cities: 3,

            alliance_vote_timeout_secs: 60,
            defense_card_timeout_secs: 30,
            trade_phase_timeout_secs: 120,

            combat_mode: CombatMode::Standard,
            horse_bonus: 1,
            boat_bonus: 1,

            costs: BuildCosts::default(),
            card_cost_gold: 1,
        }
    }
}

impl GameConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a config from TOML. Missing keys take their default values.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: GameConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn alliance_vote_timeout(&self) -> Duration {
        Duration::from_secs(self.alliance_vote_timeout_secs)
    }

    pub fn defense_card_timeout(&self) -> Duration {
        Duration::from_secs(self.defense_card_timeout_secs)
    }

    pub fn trade_phase_timeout(&self) -> Duration {
        Duration::from_secs(self.trade_phase_timeout_secs)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.min_players < 2 || self.max_players > 6 || self.min_players > self.max_players {
            return Err(EngineError::Config(format!(
                "player limits must satisfy 2 <= min ({}) <= max ({}) <= 6",
                self.min_players, self.max_players
            )));
        }

        if self.victory_cities == 0 {
            return Err(EngineError::Config("victory_cities must be positive".into()));
        }

        if self.alliance_vote_timeout_secs == 0
            || self.defense_card_timeout_secs == 0
            || self.trade_phase_timeout_secs == 0
        {
            return Err(EngineError::Config("timeouts must be positive".into()));
        }

        let costs = [self.costs.city, self.costs.weapon, self.costs.boat];
        if costs.iter().any(|c| c.is_empty()) {
            return Err(EngineError::Config("build costs must not be free".into()));
        }

        Ok(())
    }
}
