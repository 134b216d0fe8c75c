//! Land mask - decides which cells are land before territories are drawn

use rand::seq::SliceRandom;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use super::options::MapOptions;
use crate::core::types::Cell;

/// Chance that a land cell touching water is eroded into a bay
const COAST_EROSION: f32 = 0.25;

/// Build a row-major land mask (`true` = land)
pub fn land_mask(width: i32, height: i32, options: &MapOptions, rng: &mut ChaCha8Rng) -> Vec<bool> {
    let mut land = vec![true; (width * height) as usize];
    if !options.water_border || width < 3 || height < 3 {
        return land;
    }

    let idx = |c: Cell| (c.y * width + c.x) as usize;

    // Water margin
    for y in 0..height {
        for x in 0..width {
            if x == 0 || y == 0 || x == width - 1 || y == height - 1 {
                land[idx(Cell::new(x, y))] = false;
            }
        }
    }

    let masses = options.landmasses();
    if masses > 1 {
        carve_channels(&mut land, width, height, masses, rng);
    }

    erode_coast(&mut land, width, height, rng);
    land
}

/// Split the interior into `masses` landmasses separated by 1-cell channels
fn carve_channels(land: &mut [bool], width: i32, height: i32, masses: usize, rng: &mut ChaCha8Rng) {
    let idx = |c: Cell| (c.y * width + c.x) as usize;
    let mut interior: Vec<Cell> = (1..height - 1)
        .flat_map(|y| (1..width - 1).map(move |x| Cell::new(x, y)))
        .collect();
    interior.shuffle(rng);

    let spacing = (width + height) / (2 * masses as i32);
    let mut centers: Vec<Cell> = Vec::with_capacity(masses);
    for cell in &interior {
        if centers.len() == masses {
            break;
        }
        if centers.iter().all(|c| c.distance(cell) >= spacing) {
            centers.push(*cell);
        }
    }
    // Too cramped to space them out: take whatever is left
    for cell in &interior {
        if centers.len() == masses {
            break;
        }
        if !centers.contains(cell) {
            centers.push(*cell);
        }
    }

    let nearest = |cell: &Cell| {
        centers
            .iter()
            .enumerate()
            .min_by_key(|(i, c)| (c.distance(cell), *i))
            .map(|(i, _)| i)
            .unwrap_or(0)
    };

    let owner: Vec<Option<usize>> = (0..height)
        .flat_map(|y| (0..width).map(move |x| Cell::new(x, y)))
        .map(|c| land[idx(c)].then(|| nearest(&c)))
        .collect();

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let cell = Cell::new(x, y);
            let Some(mine) = owner[idx(cell)] else { continue };
            let on_boundary = cell.neighbors().iter().any(|n| {
                matches!(owner[idx(*n)], Some(other) if other < mine)
            });
            if on_boundary {
                land[idx(cell)] = false;
            }
        }
    }
}

/// Roughen coastlines so landmasses are not perfect rectangles
fn erode_coast(land: &mut [bool], width: i32, height: i32, rng: &mut ChaCha8Rng) {
    let idx = |c: Cell| (c.y * width + c.x) as usize;
    let snapshot = land.to_vec();

    for y in 1..height - 1 {
        for x in 1..width - 1 {
            let cell = Cell::new(x, y);
            if !snapshot[idx(cell)] {
                continue;
            }
            let water_neighbours = cell
                .neighbors()
                .iter()
                .filter(|n| !snapshot[idx(**n)])
                .count();
            if water_neighbours >= 2 && rng.gen::<f32>() < COAST_EROSION {
                land[idx(cell)] = false;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapgen::options::Level;
    use rand::SeedableRng;

    #[test]
    fn test_no_border_is_all_land() {
        let options = MapOptions {
            water_border: false,
            ..MapOptions::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let land = land_mask(10, 8, &options, &mut rng);
        assert!(land.iter().all(|l| *l));
    }

    #[test]
    fn test_border_is_water() {
        let options = MapOptions {
            water_border: true,
            islands: Level::High,
            ..MapOptions::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let (w, h) = (16, 12);
        let land = land_mask(w, h, &options, &mut rng);

        for x in 0..w {
            assert!(!land[x as usize]);
            assert!(!land[((h - 1) * w + x) as usize]);
        }
        assert!(land.iter().any(|l| *l));
    }
}
