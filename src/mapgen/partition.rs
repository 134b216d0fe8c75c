//! Region growth - partitions land cells into contiguous territories
//!
//! Seeds are scattered over every landmass, then the smallest region with
//! open frontier claims one random frontier cell at a time. Regions only
//! ever grow into cells touching themselves, so each one is 4-connected by
//! construction. Undersized regions are merged into a neighbour afterwards.
//! When there are several landmasses each keeps at least two regions, so no
//! territory ends up without a land neighbour.

use rand::seq::SliceRandom;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeSet;

use crate::core::types::Cell;
use crate::map::water::flood_fill;

/// Landmasses smaller than this become water (unless they are all there is)
pub const MIN_ISLAND_CELLS: usize = 4;

/// Regions smaller than average / this are merged into a neighbour
pub const BALANCE_DIVISOR: usize = 3;

struct Region {
    component: usize,
    size: usize,
    frontier: Vec<Cell>,
}

/// Result of partitioning: row-major labels (0 = water) numbered 1..=count
#[derive(Debug, Clone)]
pub struct Partition {
    pub labels: Vec<u16>,
    pub count: usize,
}

/// Partition `land` into roughly `target` contiguous regions
pub fn partition_land(
    width: i32,
    height: i32,
    land: &[bool],
    target: usize,
    rng: &mut ChaCha8Rng,
) -> Partition {
    let idx = |c: Cell| (c.y * width + c.x) as usize;

    let mut components = land_components(width, height, land);
    if components.len() > 1 {
        components.retain(|c| c.len() >= MIN_ISLAND_CELLS);
    }
    let total_land: usize = components.iter().map(Vec::len).sum();
    if total_land == 0 {
        return Partition {
            labels: vec![0; land.len()],
            count: 0,
        };
    }

    let mut labels = vec![0u16; land.len()];
    let mut open = vec![false; land.len()];
    let mut regions: Vec<Region> = Vec::new();
    let min_per_component = if components.len() > 1 { 2 } else { 1 };

    for (component_index, component) in components.iter().enumerate() {
        for cell in component {
            open[idx(*cell)] = true;
        }
        let share = (target * component.len() + total_land / 2) / total_land;
        let count = share.max(min_per_component).min(component.len());
        for seed in pick_seeds(component, count, rng) {
            open[idx(seed)] = false;
            labels[idx(seed)] = (regions.len() + 1) as u16;
            regions.push(Region {
                component: component_index,
                size: 1,
                frontier: open_neighbours(seed, width, height, &open),
            });
        }
    }

    loop {
        let next = regions
            .iter()
            .enumerate()
            .filter(|(_, r)| !r.frontier.is_empty())
            .min_by_key(|(i, r)| (r.size, *i))
            .map(|(i, _)| i);
        let Some(i) = next else { break };

        let region = &mut regions[i];
        let pick = rng.gen_range(0..region.frontier.len());
        let cell = region.frontier.swap_remove(pick);
        if !open[idx(cell)] {
            continue;
        }

        open[idx(cell)] = false;
        labels[idx(cell)] = (i + 1) as u16;
        region.size += 1;
        region
            .frontier
            .extend(open_neighbours(cell, width, height, &open));
    }

    let components_of: Vec<usize> = regions.iter().map(|r| r.component).collect();
    merge_small_regions(
        width,
        height,
        &mut labels,
        &components_of,
        min_per_component,
        total_land,
    );
    renumber(&mut labels)
}

fn land_components(width: i32, height: i32, land: &[bool]) -> Vec<Vec<Cell>> {
    let idx = |c: Cell| (c.y * width + c.x) as usize;
    let mut seen = vec![false; land.len()];
    let mut components = Vec::new();

    for y in 0..height {
        for x in 0..width {
            let start = Cell::new(x, y);
            if !land[idx(start)] || seen[idx(start)] {
                continue;
            }
            let component = flood_fill(width, height, start, |c| land[idx(c)]);
            for cell in &component {
                seen[idx(*cell)] = true;
            }
            components.push(component);
        }
    }

    components
}

/// Choose `count` spread-out seed cells from a component
fn pick_seeds(component: &[Cell], count: usize, rng: &mut ChaCha8Rng) -> Vec<Cell> {
    let mut shuffled = component.to_vec();
    shuffled.shuffle(rng);

    let spacing = ((component.len() / count) as f32).sqrt() as i32;
    let mut seeds: Vec<Cell> = Vec::with_capacity(count);
    for cell in &shuffled {
        if seeds.len() == count {
            break;
        }
        if seeds.iter().all(|s| s.distance(cell) >= spacing) {
            seeds.push(*cell);
        }
    }
    for cell in &shuffled {
        if seeds.len() == count {
            break;
        }
        if !seeds.contains(cell) {
            seeds.push(*cell);
        }
    }
    seeds
}

fn open_neighbours(cell: Cell, width: i32, height: i32, open: &[bool]) -> Vec<Cell> {
    cell.neighbors()
        .into_iter()
        .filter(|n| n.x >= 0 && n.y >= 0 && n.x < width && n.y < height)
        .filter(|n| open[(n.y * width + n.x) as usize])
        .collect()
}

/// Fold regions far below the average size into their smallest neighbour.
///
/// `components_of[r - 1]` is the landmass of region `r`; a landmass never
/// drops below `min_per_component` regions.
fn merge_small_regions(
    width: i32,
    height: i32,
    labels: &mut [u16],
    components_of: &[usize],
    min_per_component: usize,
    total_land: usize,
) {
    let region_count = components_of.len();
    if region_count < 2 {
        return;
    }
    let min_size = (total_land / region_count / BALANCE_DIVISOR).max(2);

    loop {
        let mut sizes = vec![0usize; region_count + 1];
        for label in labels.iter() {
            sizes[*label as usize] += 1;
        }
        let mut live_per_component = vec![0usize; components_of.iter().max().map_or(0, |m| m + 1)];
        for r in 1..=region_count {
            if sizes[r] > 0 {
                live_per_component[components_of[r - 1]] += 1;
            }
        }

        let mut candidates: Vec<u16> = (1..=region_count as u16)
            .filter(|r| sizes[*r as usize] > 0 && sizes[*r as usize] < min_size)
            .filter(|r| live_per_component[components_of[*r as usize - 1]] > min_per_component)
            .collect();
        candidates.sort_by_key(|r| (sizes[*r as usize], *r));

        let merge = candidates.iter().find_map(|small| {
            neighbours_of(width, height, labels, *small)
                .into_iter()
                .min_by_key(|n| (sizes[*n as usize], *n))
                .map(|into| (*small, into))
        });
        let Some((small, into)) = merge else { break };

        for label in labels.iter_mut() {
            if *label == small {
                *label = into;
            }
        }
    }
}

fn neighbours_of(width: i32, height: i32, labels: &[u16], region: u16) -> BTreeSet<u16> {
    let mut found = BTreeSet::new();
    for y in 0..height {
        for x in 0..width {
            let cell = Cell::new(x, y);
            if labels[(y * width + x) as usize] != region {
                continue;
            }
            for n in cell.neighbors() {
                if n.x < 0 || n.y < 0 || n.x >= width || n.y >= height {
                    continue;
                }
                let other = labels[(n.y * width + n.x) as usize];
                if other != 0 && other != region {
                    found.insert(other);
                }
            }
        }
    }
    found
}

/// Relabel surviving regions to 1..=count, keeping their growth order
fn renumber(labels: &mut [u16]) -> Partition {
    let used: BTreeSet<u16> = labels.iter().copied().filter(|l| *l != 0).collect();
    let max = used.iter().next_back().copied().unwrap_or(0) as usize;
    let mut mapping = vec![0u16; max + 1];
    for (new, old) in used.iter().enumerate() {
        mapping[*old as usize] = (new + 1) as u16;
    }
    for label in labels.iter_mut() {
        *label = mapping[*label as usize];
    }
    Partition {
        labels: labels.to_vec(),
        count: used.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::Map;
    use rand::SeedableRng;

    #[test]
    fn test_partition_covers_all_land() {
        let (w, h) = (12, 10);
        let land = vec![true; (w * h) as usize];
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let partition = partition_land(w, h, &land, 8, &mut rng);

        assert!(partition.count >= 1 && partition.count <= 8);
        assert!(partition.labels.iter().all(|l| *l != 0));
        // Map construction re-checks contiguity
        let map = Map::from_cells(w as u32, h as u32, partition.labels).unwrap();
        assert_eq!(map.territory_count(), partition.count);
    }

    #[test]
    fn test_each_island_gets_a_region() {
        // Two 3x3 islands separated by a water column
        let (w, h) = (7, 3);
        let land: Vec<bool> = (0..h)
            .flat_map(|_| (0..w).map(|x| x != 3))
            .collect();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let partition = partition_land(w, h, &land, 1, &mut rng);

        // Two regions per island so nobody is left without a neighbour
        assert_eq!(partition.count, 4);
        assert_eq!(partition.labels[3], 0);
        let map = Map::from_cells(w as u32, h as u32, partition.labels).unwrap();
        for id in map.territory_ids() {
            assert!(!map.adjacent(id).unwrap().is_empty());
        }
    }

    #[test]
    fn test_tiny_islands_dropped() {
        // A 1-cell islet next to a bigger landmass
        let land = vec![true, false, true, true, true, true, true];
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let partition = partition_land(7, 1, &land, 2, &mut rng);
        assert_eq!(partition.labels[0], 0);
        assert!(partition.count >= 1);
    }

    #[test]
    fn test_single_cell_map() {
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let partition = partition_land(1, 1, &[true], 4, &mut rng);
        assert_eq!(partition.count, 1);
        assert_eq!(partition.labels, vec![1]);
    }
}
