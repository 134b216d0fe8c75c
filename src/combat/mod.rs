//! Combat resolver - attack/defense strength, reinforcements and cards

pub mod cards;
pub mod reinforcement;
pub mod resolution;
pub mod strength;

pub use cards::{AttackCard, Card, CardHand, DefenseCard};
pub use reinforcement::Reinforcement;
pub use resolution::{resolve, seize_stockpile, BattleOutcome, BattleResult, Engagement};
pub use strength::{adjacent_strength, preview_attack, Strengths};
