//! Territory grid - the raw id grid plus the index derived from it once
//!
//! Cell lists, adjacency and shorelines are computed when the map is built
//! and never re-derived afterwards.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::territory::{ResourceKind, Territory};
use super::water::{find_water_bodies, flood_fill, WaterBody};
use crate::core::error::{EngineError, Result};
use crate::core::types::{Cell, TerritoryId, WaterBodyId};

/// Grid value reserved for water
pub const WATER: u16 = 0;

/// Serialized form of a map: only the grid, the index is rebuilt on load
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawGrid {
    pub width: u32,
    pub height: u32,
    pub rows: Vec<Vec<u16>>,
}

#[derive(Debug, Clone, Default)]
struct TerritoryIndex {
    cells: Vec<Cell>,
    adjacent: BTreeSet<TerritoryId>,
    shores: BTreeSet<WaterBodyId>,
}

/// A validated territory map
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawGrid", into = "RawGrid")]
pub struct Map {
    width: i32,
    height: i32,
    cells: Vec<u16>,
    territories: Vec<TerritoryIndex>,
    water_bodies: Vec<WaterBody>,
    water_labels: Vec<Option<WaterBodyId>>,
}

impl Map {
    /// Build a map from `grid[y][x]` rows
    pub fn from_rows(rows: &[Vec<u16>]) -> Result<Self> {
        let height = rows.len();
        let width = rows.first().map(Vec::len).unwrap_or(0);
        if rows.iter().any(|r| r.len() != width) {
            return Err(EngineError::InvariantViolation(
                "grid rows have different lengths".into(),
            ));
        }
        let cells = rows.iter().flatten().copied().collect();
        Self::from_cells(width as u32, height as u32, cells)
    }

    /// Build a map from row-major cells, validating every grid invariant
    pub fn from_cells(width: u32, height: u32, cells: Vec<u16>) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(EngineError::InvariantViolation("grid is empty".into()));
        }
        if cells.len() != (width * height) as usize {
            return Err(EngineError::InvariantViolation(format!(
                "grid has {} cells, expected {}x{}",
                cells.len(),
                width,
                height
            )));
        }

        let (width, height) = (width as i32, height as i32);
        let count = cells.iter().copied().max().unwrap_or(WATER) as usize;
        let mut territories = vec![TerritoryIndex::default(); count];

        for y in 0..height {
            for x in 0..width {
                let id = cells[(y * width + x) as usize];
                if id != WATER {
                    territories[id as usize - 1].cells.push(Cell::new(x, y));
                }
            }
        }

        let (water_bodies, water_labels) = find_water_bodies(width, height, &cells);
        let at = |c: Cell| cells[(c.y * width + c.x) as usize];

        for (i, territory) in territories.iter_mut().enumerate() {
            let id = (i + 1) as u16;
            let Some(&first) = territory.cells.first() else {
                return Err(EngineError::InvariantViolation(format!(
                    "territory ids are not contiguous: {} has no cells",
                    TerritoryId(id)
                )));
            };

            let region = flood_fill(width, height, first, |c| at(c) == id);
            if region.len() != territory.cells.len() {
                return Err(EngineError::InvariantViolation(format!(
                    "{} is split into disconnected regions",
                    TerritoryId(id)
                )));
            }

            for cell in &territory.cells {
                for n in cell.neighbors() {
                    if n.x < 0 || n.y < 0 || n.x >= width || n.y >= height {
                        continue;
                    }
                    let other = at(n);
                    if other == WATER {
                        if let Some(body) = water_labels[(n.y * width + n.x) as usize] {
                            territory.shores.insert(body);
                        }
                    } else if other != id {
                        territory.adjacent.insert(TerritoryId(other));
                    }
                }
            }
        }

        Ok(Self {
            width,
            height,
            cells,
            territories,
            water_bodies,
            water_labels,
        })
    }

    pub fn width(&self) -> u32 {
        self.width as u32
    }

    pub fn height(&self) -> u32 {
        self.height as u32
    }

    pub fn contains(&self, cell: &Cell) -> bool {
        cell.x >= 0 && cell.y >= 0 && cell.x < self.width && cell.y < self.height
    }

    /// Raw grid value at a cell (0 for water)
    pub fn get(&self, cell: &Cell) -> Option<u16> {
        if self.contains(cell) {
            Some(self.cells[(cell.y * self.width + cell.x) as usize])
        } else {
            None
        }
    }

    pub fn territory_at(&self, cell: &Cell) -> Option<TerritoryId> {
        self.get(cell).filter(|id| *id != WATER).map(TerritoryId)
    }

    pub fn water_body_at(&self, cell: &Cell) -> Option<WaterBodyId> {
        if self.contains(cell) {
            self.water_labels[(cell.y * self.width + cell.x) as usize]
        } else {
            None
        }
    }

    pub fn territory_count(&self) -> usize {
        self.territories.len()
    }

    pub fn territory_ids(&self) -> impl Iterator<Item = TerritoryId> + '_ {
        (1..=self.territories.len()).map(|i| TerritoryId(i as u16))
    }

    fn index(&self, id: TerritoryId) -> Option<&TerritoryIndex> {
        if id.0 == WATER {
            return None;
        }
        self.territories.get(id.index()?)
    }

    pub fn has_territory(&self, id: TerritoryId) -> bool {
        self.index(id).is_some()
    }

    pub fn cells_of(&self, id: TerritoryId) -> &[Cell] {
        self.index(id).map(|t| t.cells.as_slice()).unwrap_or(&[])
    }

    pub fn adjacent(&self, id: TerritoryId) -> Option<&BTreeSet<TerritoryId>> {
        self.index(id).map(|t| &t.adjacent)
    }

    pub fn are_adjacent(&self, a: TerritoryId, b: TerritoryId) -> bool {
        self.adjacent(a).is_some_and(|adj| adj.contains(&b))
    }

    /// Water bodies the territory touches
    pub fn shores(&self, id: TerritoryId) -> Option<&BTreeSet<WaterBodyId>> {
        self.index(id).map(|t| &t.shores)
    }

    pub fn is_coastal(&self, id: TerritoryId) -> bool {
        self.shores(id).is_some_and(|s| !s.is_empty())
    }

    pub fn borders_water(&self, id: TerritoryId, body: WaterBodyId) -> bool {
        self.shores(id).is_some_and(|s| s.contains(&body))
    }

    pub fn water_bodies(&self) -> &[WaterBody] {
        &self.water_bodies
    }

    pub fn water_body(&self, id: WaterBodyId) -> Option<&WaterBody> {
        self.water_bodies.get(id.0 as usize)
    }

    /// Unowned grassland records for every territory, named by id
    pub fn blank_territories(&self) -> Vec<Territory> {
        self.territory_ids()
            .map(|id| {
                let adjacent = self.adjacent(id).cloned().unwrap_or_default();
                let name = format!("Territory {}", id.0);
                Territory::new(id, name, ResourceKind::Grassland, adjacent)
            })
            .collect()
    }

    /// `grid[y][x]` rows
    pub fn rows(&self) -> Vec<Vec<u16>> {
        self.cells
            .chunks(self.width as usize)
            .map(<[u16]>::to_vec)
            .collect()
    }
}

impl PartialEq for Map {
    fn eq(&self, other: &Self) -> bool {
        self.width == other.width && self.height == other.height && self.cells == other.cells
    }
}

impl Eq for Map {}

impl TryFrom<RawGrid> for Map {
    type Error = EngineError;

    fn try_from(raw: RawGrid) -> Result<Self> {
        let map = Map::from_rows(&raw.rows)?;
        if map.width() != raw.width || map.height() != raw.height {
            return Err(EngineError::InvariantViolation(
                "declared dimensions do not match rows".into(),
            ));
        }
        Ok(map)
    }
}

impl From<Map> for RawGrid {
    fn from(map: Map) -> Self {
        RawGrid {
            width: map.width(),
            height: map.height(),
            rows: map.rows(),
        }
    }
}
