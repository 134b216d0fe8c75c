//! Game phases and the order they cycle in

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::types::PlayerId;

/// Where a game is in its round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum Phase {
    /// Round 1 only: players claim unclaimed territories in turn
    TerritorySelection,
    /// Stockpile placement, and passive yields from round 2 on
    Production,
    /// Everyone may trade at once until all end the phase or time runs out
    Trade,
    /// Move the stockpile, one horse and one boat
    Shipment,
    /// Attack neighbours
    Conquest,
    /// Build and buy cards
    Development,
    /// Terminal; nothing further is accepted
    Ended { winner: Option<PlayerId> },
}

impl Phase {
    /// The phase that follows this one; Development wraps to Production
    pub fn next(&self) -> Phase {
        match self {
            Self::TerritorySelection => Self::Production,
            Self::Production => Self::Trade,
            Self::Trade => Self::Shipment,
            Self::Shipment => Self::Conquest,
            Self::Conquest => Self::Development,
            Self::Development => Self::Production,
            Self::Ended { winner } => Self::Ended { winner: *winner },
        }
    }

    /// Trade is the only phase where everyone acts at once
    pub fn is_simultaneous(&self) -> bool {
        matches!(self, Self::Trade)
    }

    pub fn is_ended(&self) -> bool {
        matches!(self, Self::Ended { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::TerritorySelection => "territory_selection",
            Self::Production => "production",
            Self::Trade => "trade",
            Self::Shipment => "shipment",
            Self::Conquest => "conquest",
            Self::Development => "development",
            Self::Ended { .. } => "ended",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_cycle() {
        let mut phase = Phase::TerritorySelection;
        let mut seen = Vec::new();
        for _ in 0..7 {
            phase = phase.next();
            seen.push(phase);
        }
        assert_eq!(
            seen,
            vec![
                Phase::Production,
                Phase::Trade,
                Phase::Shipment,
                Phase::Conquest,
                Phase::Development,
                Phase::Production,
                Phase::Trade,
            ]
        );
    }

    #[test]
    fn test_ended_is_terminal() {
        let ended = Phase::Ended {
            winner: Some(PlayerId(2)),
        };
        assert_eq!(ended.next(), ended);
        assert!(ended.is_ended());
    }
}
