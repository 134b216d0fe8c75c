//! Resource and name assignment for generated territories

use rand::seq::SliceRandom;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeSet;

use crate::map::ResourceKind;

/// Relative draw weights for bonus resources
const RESOURCE_WEIGHTS: [(ResourceKind, u32); 5] = [
    (ResourceKind::Coal, 2),
    (ResourceKind::Gold, 1),
    (ResourceKind::Iron, 2),
    (ResourceKind::Timber, 3),
    (ResourceKind::Horses, 2),
];

const NAME_PREFIXES: [&str; 20] = [
    "Ash", "Bram", "Cold", "Dun", "Eld", "Fen", "Gar", "High", "Iron", "Kings", "Lark", "Mar",
    "North", "Oak", "Pike", "Raven", "Stone", "Thorn", "West", "Wolf",
];

const NAME_SUFFIXES: [&str; 12] = [
    "ford", "moor", "vale", "mere", "wick", "holm", "reach", "fell", "march", "hollow", "gate",
    "field",
];

fn draw_bonus(rng: &mut ChaCha8Rng) -> ResourceKind {
    let total: u32 = RESOURCE_WEIGHTS.iter().map(|(_, w)| w).sum();
    let mut roll = rng.gen_range(0..total);
    for (kind, weight) in RESOURCE_WEIGHTS {
        if roll < weight {
            return kind;
        }
        roll -= weight;
    }
    ResourceKind::Timber
}

/// Draw a resource for each of `count` territories.
///
/// `share` is the chance a territory gets a bonus resource. At least one
/// territory always gets one, so grassland is never the only kind on the map.
pub fn assign_resources(count: usize, share: f32, rng: &mut ChaCha8Rng) -> Vec<ResourceKind> {
    let mut resources: Vec<ResourceKind> = (0..count)
        .map(|_| {
            if rng.gen::<f32>() < share {
                draw_bonus(rng)
            } else {
                ResourceKind::Grassland
            }
        })
        .collect();

    if count > 0 && resources.iter().all(ResourceKind::is_baseline) {
        let pick = rng.gen_range(0..count);
        resources[pick] = draw_bonus(rng);
    }

    resources
}

/// Generate `count` distinct territory names
pub fn territory_names(count: usize, rng: &mut ChaCha8Rng) -> Vec<String> {
    let mut used = BTreeSet::new();
    let mut names = Vec::with_capacity(count);

    for _ in 0..count {
        let prefix = NAME_PREFIXES.choose(rng).copied().unwrap_or("Nor");
        let suffix = NAME_SUFFIXES.choose(rng).copied().unwrap_or("land");
        let base = format!("{prefix}{suffix}");

        let mut name = base.clone();
        let mut n = 2;
        while used.contains(&name) {
            name = format!("{base} {n}");
            n += 1;
        }
        used.insert(name.clone());
        names.push(name);
    }

    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_zero_share_still_places_one_bonus() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let resources = assign_resources(10, 0.0, &mut rng);
        let bonus = resources.iter().filter(|r| !r.is_baseline()).count();
        assert_eq!(bonus, 1);
    }

    #[test]
    fn test_full_share_has_no_grassland() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let resources = assign_resources(25, 1.0, &mut rng);
        assert!(resources.iter().all(|r| !r.is_baseline()));
    }

    #[test]
    fn test_empty_map_gets_no_resources() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        assert!(assign_resources(0, 0.5, &mut rng).is_empty());
    }

    #[test]
    fn test_names_are_unique() {
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let names = territory_names(300, &mut rng);
        let unique: BTreeSet<_> = names.iter().collect();
        assert_eq!(unique.len(), 300);
    }
}
