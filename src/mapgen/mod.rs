//! Map generator - builds a validated territory map from options
//!
//! Generation is a one-shot, side-effect-free computation. The output holds
//! the map, per-territory templates (name, resource) and an ordered list of
//! generation steps a caller can replay to reveal the map progressively.

pub mod land;
pub mod options;
pub mod partition;
pub mod resources;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::core::error::{EngineError, Result};
use crate::core::types::{Cell, TerritoryId};
use crate::map::{Map, ResourceKind, Territory};

pub use options::{Level, MapOptions, MapSize};

/// Attempts before the generator gives up
pub const MAX_ATTEMPTS: u32 = 8;

/// Seed offset between attempts
const RETRY_SEED_STRIDE: u64 = 0x9E37_79B9_7F4A_7C15;

/// One entry in the replayable generation sequence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum GenerationStep {
    /// Every cell assigned to one territory
    Territory { id: TerritoryId, cells: Vec<Cell> },
    /// No more territories follow
    Complete,
}

/// Per-territory data decided at generation time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerritoryTemplate {
    pub id: TerritoryId,
    pub name: String,
    pub resource: ResourceKind,
}

/// Output of one generator call
#[derive(Debug, Clone)]
pub struct GeneratedMap {
    pub map: Map,
    pub templates: Vec<TerritoryTemplate>,
    pub options: MapOptions,
    /// Seed of the attempt that succeeded
    pub seed: u64,
    steps: Vec<GenerationStep>,
}

impl GeneratedMap {
    /// The generation steps, ending with [`GenerationStep::Complete`].
    ///
    /// Each call starts a fresh pass over the same immutable sequence.
    pub fn steps(&self) -> std::slice::Iter<'_, GenerationStep> {
        self.steps.iter()
    }

    /// Fresh per-game territory records for this map
    pub fn territories(&self) -> Vec<Territory> {
        self.templates
            .iter()
            .map(|t| {
                let adjacent = self.map.adjacent(t.id).cloned().unwrap_or_default();
                Territory::new(t.id, t.name.clone(), t.resource, adjacent)
            })
            .collect()
    }
}

/// Apply a step sequence to an empty `width` x `height` grid
pub fn replay_steps<'a, I>(width: u32, height: u32, steps: I) -> Vec<Vec<u16>>
where
    I: IntoIterator<Item = &'a GenerationStep>,
{
    let mut grid = vec![vec![0u16; width as usize]; height as usize];
    for step in steps {
        match step {
            GenerationStep::Territory { id, cells } => {
                for cell in cells {
                    if let Some(row) = grid.get_mut(cell.y as usize) {
                        if let Some(slot) = row.get_mut(cell.x as usize) {
                            *slot = id.0;
                        }
                    }
                }
            }
            GenerationStep::Complete => break,
        }
    }
    grid
}

/// Generate a map, retrying with adjusted parameters if an attempt fails
pub fn generate(options: &MapOptions) -> Result<GeneratedMap> {
    let target = options.target_territories();
    let mut last_error = String::from("no attempt made");

    for attempt in 0..MAX_ATTEMPTS {
        let seed = options
            .seed
            .wrapping_add(RETRY_SEED_STRIDE.wrapping_mul(u64::from(attempt)));
        // Ask for fewer territories on each retry
        let attempt_target =
            (target - target * attempt as usize / (MAX_ATTEMPTS as usize * 2)).max(1);

        match generate_attempt(options, seed, attempt_target) {
            Ok(generated) => {
                tracing::debug!(
                    seed,
                    attempt,
                    territories = generated.map.territory_count(),
                    "map generated"
                );
                return Ok(generated);
            }
            Err(e) => {
                tracing::warn!(seed, attempt, error = %e, "map generation attempt rejected");
                last_error = e.to_string();
            }
        }
    }

    Err(EngineError::GenerationFailed {
        attempts: MAX_ATTEMPTS,
        reason: last_error,
    })
}

fn generate_attempt(options: &MapOptions, seed: u64, target: usize) -> Result<GeneratedMap> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let (width, height) = options.size.dimensions();
    let (w, h) = (width as i32, height as i32);

    let land = land::land_mask(w, h, options, &mut rng);
    let partition = partition::partition_land(w, h, &land, target, &mut rng);
    if partition.count == 0 {
        return Err(EngineError::InvariantViolation("no land left to partition".into()));
    }

    let map = Map::from_cells(width, height, partition.labels)?;
    check_generated(&map)?;

    let resources =
        resources::assign_resources(map.territory_count(), options.resource_share(), &mut rng);
    let names = resources::territory_names(map.territory_count(), &mut rng);
    let templates = map
        .territory_ids()
        .zip(resources)
        .zip(names)
        .map(|((id, resource), name)| TerritoryTemplate { id, name, resource })
        .collect();

    let mut steps: Vec<GenerationStep> = map
        .territory_ids()
        .map(|id| GenerationStep::Territory {
            id,
            cells: map.cells_of(id).to_vec(),
        })
        .collect();
    steps.push(GenerationStep::Complete);

    Ok(GeneratedMap {
        map,
        templates,
        options: *options,
        seed,
        steps,
    })
}

/// Checks beyond what `Map` construction already enforces
fn check_generated(map: &Map) -> Result<()> {
    if map.territory_count() < 2 {
        return Ok(());
    }
    let isolated = map
        .territory_ids()
        .find(|id| map.adjacent(*id).map_or(true, |a| a.is_empty()));
    match isolated {
        Some(id) => Err(EngineError::InvariantViolation(format!(
            "{id} has no land neighbours"
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_default_map() {
        let generated = generate(&MapOptions::default().with_seed(42)).unwrap();
        let map = &generated.map;
        assert_eq!((map.width(), map.height()), MapSize::Medium.dimensions());
        assert!(map.territory_count() > 1);
        assert_eq!(generated.templates.len(), map.territory_count());
        assert!(!map.water_bodies().is_empty());
    }

    #[test]
    fn test_steps_end_with_complete() {
        let generated = generate(&MapOptions::default().with_seed(1)).unwrap();
        let steps: Vec<_> = generated.steps().collect();
        assert_eq!(steps.last(), Some(&&GenerationStep::Complete));
        assert_eq!(steps.len(), generated.map.territory_count() + 1);
    }

    #[test]
    fn test_replay_reproduces_grid() {
        let generated = generate(&MapOptions::default().with_seed(5)).unwrap();
        let (w, h) = (generated.map.width(), generated.map.height());
        let first = replay_steps(w, h, generated.steps());
        let second = replay_steps(w, h, generated.steps());
        assert_eq!(first, second);
        assert_eq!(first, generated.map.rows());
    }

    #[test]
    fn test_same_seed_same_map() {
        let options = MapOptions::default().with_seed(77);
        let a = generate(&options).unwrap();
        let b = generate(&options).unwrap();
        assert_eq!(a.map, b.map);
        assert_eq!(a.templates, b.templates);
    }

    #[test]
    fn test_territories_copy_adjacency() {
        let generated = generate(&MapOptions::default().with_seed(3)).unwrap();
        for territory in generated.territories() {
            assert_eq!(Some(&territory.adjacent), generated.map.adjacent(territory.id));
            assert!(territory.owner.is_none());
        }
    }
}
