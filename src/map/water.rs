//! Water bodies - maximal 4-connected water regions

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, VecDeque};

use crate::core::types::{Cell, WaterBodyId};

/// A connected body of water. Boats are parked per body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaterBody {
    pub id: WaterBodyId,
    pub cells: BTreeSet<Cell>,
}

impl WaterBody {
    pub fn contains(&self, cell: &Cell) -> bool {
        self.cells.contains(cell)
    }

    pub fn size(&self) -> usize {
        self.cells.len()
    }
}

/// Flood fill from `start` over cells accepted by `include`.
///
/// `include` is only asked about in-bounds cells.
pub fn flood_fill<F>(width: i32, height: i32, start: Cell, mut include: F) -> Vec<Cell>
where
    F: FnMut(Cell) -> bool,
{
    let in_bounds = |c: &Cell| c.x >= 0 && c.y >= 0 && c.x < width && c.y < height;
    if !in_bounds(&start) || !include(start) {
        return Vec::new();
    }

    let mut seen = BTreeSet::new();
    let mut queue = VecDeque::new();
    let mut region = Vec::new();
    seen.insert(start);
    queue.push_back(start);

    while let Some(cell) = queue.pop_front() {
        region.push(cell);
        for n in cell.neighbors() {
            if in_bounds(&n) && !seen.contains(&n) && include(n) {
                seen.insert(n);
                queue.push_back(n);
            }
        }
    }

    region
}

/// Label every water cell (id 0) of a row-major grid with its water body.
///
/// Bodies are numbered in row-major order of their first cell, so the
/// numbering is stable for a given grid.
pub fn find_water_bodies(
    width: i32,
    height: i32,
    cells: &[u16],
) -> (Vec<WaterBody>, Vec<Option<WaterBodyId>>) {
    let mut labels: Vec<Option<WaterBodyId>> = vec![None; cells.len()];
    let mut bodies = Vec::new();
    let idx = |c: Cell| (c.y * width + c.x) as usize;

    for y in 0..height {
        for x in 0..width {
            let start = Cell::new(x, y);
            if cells[idx(start)] != 0 || labels[idx(start)].is_some() {
                continue;
            }

            let id = WaterBodyId(bodies.len() as u16);
            let region = flood_fill(width, height, start, |c| cells[idx(c)] == 0);
            for cell in &region {
                labels[idx(*cell)] = Some(id);
            }
            bodies.push(WaterBody {
                id,
                cells: region.into_iter().collect(),
            });
        }
    }

    (bodies, labels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_separate_lakes() {
        // 0 1 0
        // 0 1 0
        #[rustfmt::skip]
        let cells = [
            0, 1, 0,
            0, 1, 0,
        ];
        let (bodies, labels) = find_water_bodies(3, 2, &cells);
        assert_eq!(bodies.len(), 2);
        assert_eq!(bodies[0].size(), 2);
        assert_eq!(labels[0], Some(WaterBodyId(0)));
        assert_eq!(labels[2], Some(WaterBodyId(1)));
        assert_eq!(labels[1], None);
    }

    #[test]
    fn test_diagonal_water_is_not_connected() {
        #[rustfmt::skip]
        let cells = [
            0, 1,
            1, 0,
        ];
        let (bodies, _) = find_water_bodies(2, 2, &cells);
        assert_eq!(bodies.len(), 2);
    }

    #[test]
    fn test_flood_fill_respects_bounds() {
        let region = flood_fill(3, 3, Cell::new(0, 0), |_| true);
        assert_eq!(region.len(), 9);
        assert!(flood_fill(3, 3, Cell::new(5, 5), |_| true).is_empty());
    }
}
