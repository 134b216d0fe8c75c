//! Development rules - what a build costs and how it may be paid

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::config::BuildCosts;
use crate::core::error::{EngineError, Result};
use crate::rules::stockpile::Stockpile;

/// Something a player can build on an owned territory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Improvement {
    City,
    Weapon,
    Boat,
}

impl Improvement {
    pub fn name(&self) -> &'static str {
        match self {
            Self::City => "city",
            Self::Weapon => "weapon",
            Self::Boat => "boat",
        }
    }
}

impl fmt::Display for Improvement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a build is paid for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Payment {
    /// The listed resources
    #[default]
    Resources,
    /// Gold equal to the total unit count of the listed resources
    Gold,
}

/// Base resource cost of an improvement
pub fn base_cost(costs: &BuildCosts, improvement: Improvement) -> Stockpile {
    match improvement {
        Improvement::City => costs.city,
        Improvement::Weapon => costs.weapon,
        Improvement::Boat => costs.boat,
    }
}

/// What will actually be deducted for this build and payment method
pub fn cost_of(costs: &BuildCosts, improvement: Improvement, payment: Payment) -> Stockpile {
    let base = base_cost(costs, improvement);
    match payment {
        Payment::Resources => base,
        Payment::Gold => Stockpile::gold(base.total()),
    }
}

/// Deduct `cost` from `stockpile`, leaving it untouched if it falls short
pub fn pay(stockpile: &mut Stockpile, cost: &Stockpile) -> Result<()> {
    match stockpile.checked_sub(cost) {
        Some(rest) => {
            *stockpile = rest;
            Ok(())
        }
        None => Err(EngineError::InsufficientResources(format!(
            "need {cost}, have {stockpile}"
        ))),
    }
}
