//! Combat cards - strength modifiers used when card combat is enabled

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Cards an attacker plays when planning an attack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackCard {
    /// +2
    Charge,
    /// +3 against a territory with a city
    Siege,
    /// +2 when a horse is committed, otherwise +1
    Cavalry,
}

/// Cards a defender plays during the response window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefenseCard {
    /// +2
    Fortify,
    /// +3 when defending a city
    Walls,
    /// +2 when the defender holds two or more territories around the target
    Ambush,
}

/// Battle facts the conditional cards look at
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CardContext {
    pub target_has_city: bool,
    pub horse_committed: bool,
    /// Defender-owned territories adjacent to the target
    pub defender_neighbours: usize,
}

impl AttackCard {
    pub fn bonus(&self, ctx: &CardContext) -> u32 {
        match self {
            Self::Charge => 2,
            Self::Siege if ctx.target_has_city => 3,
            Self::Siege => 0,
            Self::Cavalry if ctx.horse_committed => 2,
            Self::Cavalry => 1,
        }
    }
}

impl DefenseCard {
    pub fn bonus(&self, ctx: &CardContext) -> u32 {
        match self {
            Self::Fortify => 2,
            Self::Walls if ctx.target_has_city => 3,
            Self::Walls => 0,
            Self::Ambush if ctx.defender_neighbours >= 2 => 2,
            Self::Ambush => 0,
        }
    }
}

/// A drawn card of either kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "side", content = "card", rename_all = "snake_case")]
pub enum Card {
    Attack(AttackCard),
    Defense(DefenseCard),
}

const DECK: [Card; 6] = [
    Card::Attack(AttackCard::Charge),
    Card::Attack(AttackCard::Siege),
    Card::Attack(AttackCard::Cavalry),
    Card::Defense(DefenseCard::Fortify),
    Card::Defense(DefenseCard::Walls),
    Card::Defense(DefenseCard::Ambush),
];

/// Draw one card uniformly from the deck
pub fn draw(rng: &mut ChaCha8Rng) -> Card {
    DECK[rng.gen_range(0..DECK.len())]
}

pub fn attack_bonus(cards: &[AttackCard], ctx: &CardContext) -> u32 {
    cards.iter().map(|c| c.bonus(ctx)).sum()
}

pub fn defense_bonus(cards: &[DefenseCard], ctx: &CardContext) -> u32 {
    cards.iter().map(|c| c.bonus(ctx)).sum()
}

/// Cards a player holds
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardHand {
    pub attack: Vec<AttackCard>,
    pub defense: Vec<DefenseCard>,
}

impl CardHand {
    pub fn add(&mut self, card: Card) {
        match card {
            Card::Attack(c) => self.attack.push(c),
            Card::Defense(c) => self.defense.push(c),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.attack.is_empty() && self.defense.is_empty()
    }

    /// True if every card in `cards` is held (counting duplicates)
    pub fn holds_attack(&self, cards: &[AttackCard]) -> bool {
        holds(&self.attack, cards)
    }

    pub fn holds_defense(&self, cards: &[DefenseCard]) -> bool {
        holds(&self.defense, cards)
    }

    /// Remove played cards. Cards not held are ignored.
    pub fn spend_attack(&mut self, cards: &[AttackCard]) {
        spend(&mut self.attack, cards);
    }

    pub fn spend_defense(&mut self, cards: &[DefenseCard]) {
        spend(&mut self.defense, cards);
    }
}

fn holds<T: PartialEq>(hand: &[T], cards: &[T]) -> bool {
    cards.iter().all(|card| {
        let wanted = cards.iter().filter(|c| *c == card).count();
        let held = hand.iter().filter(|c| *c == card).count();
        held >= wanted
    })
}

fn spend<T: PartialEq>(hand: &mut Vec<T>, cards: &[T]) {
    for card in cards {
        if let Some(pos) = hand.iter().position(|c| c == card) {
            hand.remove(pos);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_conditional_cards() {
        let plain = CardContext::default();
        let city = CardContext {
            target_has_city: true,
            horse_committed: true,
            defender_neighbours: 2,
        };

        assert_eq!(AttackCard::Siege.bonus(&plain), 0);
        assert_eq!(AttackCard::Siege.bonus(&city), 3);
        assert_eq!(AttackCard::Cavalry.bonus(&plain), 1);
        assert_eq!(AttackCard::Cavalry.bonus(&city), 2);
        assert_eq!(DefenseCard::Walls.bonus(&city), 3);
        assert_eq!(DefenseCard::Ambush.bonus(&plain), 0);
        assert_eq!(DefenseCard::Ambush.bonus(&city), 2);
        assert_eq!(
            attack_bonus(&[AttackCard::Charge, AttackCard::Charge], &plain),
            4
        );
    }

    #[test]
    fn test_hand_counts_duplicates() {
        let mut hand = CardHand::default();
        hand.add(Card::Attack(AttackCard::Charge));
        hand.add(Card::Defense(DefenseCard::Fortify));

        assert!(hand.holds_attack(&[AttackCard::Charge]));
        assert!(!hand.holds_attack(&[AttackCard::Charge, AttackCard::Charge]));
        assert!(!hand.holds_defense(&[DefenseCard::Walls]));

        hand.spend_attack(&[AttackCard::Charge]);
        assert!(hand.attack.is_empty());
        assert!(!hand.is_empty());
    }

    #[test]
    fn test_draw_is_seeded() {
        let mut a = ChaCha8Rng::seed_from_u64(12);
        let mut b = ChaCha8Rng::seed_from_u64(12);
        let first: Vec<Card> = (0..10).map(|_| draw(&mut a)).collect();
        let second: Vec<Card> = (0..10).map(|_| draw(&mut b)).collect();
        assert_eq!(first, second);
    }
}
