//! Stockpile - a player's resource bank

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stockpiled resource kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Coal,
    Gold,
    Iron,
    Timber,
}

impl Resource {
    pub const ALL: [Resource; 4] = [
        Resource::Coal,
        Resource::Gold,
        Resource::Iron,
        Resource::Timber,
    ];
}

/// Amounts of each stockpiled resource. Also used for costs and trade bundles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stockpile {
    pub coal: u32,
    pub gold: u32,
    pub iron: u32,
    pub timber: u32,
}

impl Stockpile {
    pub fn new(coal: u32, gold: u32, iron: u32, timber: u32) -> Self {
        Self {
            coal,
            gold,
            iron,
            timber,
        }
    }

    /// Only gold
    pub fn gold(amount: u32) -> Self {
        Self {
            gold: amount,
            ..Self::default()
        }
    }

    pub fn get(&self, resource: Resource) -> u32 {
        match resource {
            Resource::Coal => self.coal,
            Resource::Gold => self.gold,
            Resource::Iron => self.iron,
            Resource::Timber => self.timber,
        }
    }

    fn slot(&mut self, resource: Resource) -> &mut u32 {
        match resource {
            Resource::Coal => &mut self.coal,
            Resource::Gold => &mut self.gold,
            Resource::Iron => &mut self.iron,
            Resource::Timber => &mut self.timber,
        }
    }

    pub fn add(&mut self, resource: Resource, amount: u32) {
        let slot = self.slot(resource);
        *slot = slot.saturating_add(amount);
    }

    /// Total units across all resources
    pub fn total(&self) -> u32 {
        Resource::ALL.iter().map(|r| self.get(*r)).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Check if this stockpile holds at least `cost` of every resource
    pub fn covers(&self, cost: &Stockpile) -> bool {
        Resource::ALL.iter().all(|r| self.get(*r) >= cost.get(*r))
    }

    /// Remove `cost`, or return None and leave nothing changed if it is not covered
    pub fn checked_sub(&self, cost: &Stockpile) -> Option<Stockpile> {
        Some(Stockpile {
            coal: self.coal.checked_sub(cost.coal)?,
            gold: self.gold.checked_sub(cost.gold)?,
            iron: self.iron.checked_sub(cost.iron)?,
            timber: self.timber.checked_sub(cost.timber)?,
        })
    }

    /// Add every resource of `other`
    pub fn merge(&mut self, other: &Stockpile) {
        for r in Resource::ALL {
            self.add(r, other.get(r));
        }
    }

    /// Empty the stockpile, returning what it held
    pub fn take_all(&mut self) -> Stockpile {
        std::mem::take(self)
    }
}

impl fmt::Display for Stockpile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} coal, {} gold, {} iron, {} timber",
            self.coal, self.gold, self.iron, self.timber
        )
    }
}
