//! Generation options and the numbers derived from them

use serde::{Deserialize, Serialize};

/// Overall map size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MapSize {
    #[serde(rename = "S")]
    Small,
    #[default]
    #[serde(rename = "M")]
    Medium,
    #[serde(rename = "L")]
    Large,
}

impl MapSize {
    /// Grid (width, height) in cells
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Self::Small => (16, 12),
            Self::Medium => (24, 18),
            Self::Large => (32, 24),
        }
    }
}

/// Three-step setting shared by territory count, islands and resources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Level {
    Low,
    #[default]
    #[serde(rename = "Med")]
    Medium,
    High,
}

/// Everything the generator needs to build a map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapOptions {
    pub size: MapSize,
    pub territory_count: Level,
    pub water_border: bool,
    pub islands: Level,
    pub resources: Level,
    pub seed: u64,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            size: MapSize::Medium,
            territory_count: Level::Medium,
            water_border: true,
            islands: Level::Low,
            resources: Level::Medium,
            seed: 0,
        }
    }
}

impl MapOptions {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Requested number of territories before any merging
    pub fn target_territories(&self) -> usize {
        match (self.size, self.territory_count) {
            (MapSize::Small, Level::Low) => 8,
            (MapSize::Small, Level::Medium) => 12,
            (MapSize::Small, Level::High) => 16,
            (MapSize::Medium, Level::Low) => 14,
            (MapSize::Medium, Level::Medium) => 20,
            (MapSize::Medium, Level::High) => 28,
            (MapSize::Large, Level::Low) => 20,
            (MapSize::Large, Level::Medium) => 30,
            (MapSize::Large, Level::High) => 40,
        }
    }

    /// Number of separate landmasses carved when the map has a water border
    pub fn landmasses(&self) -> usize {
        if !self.water_border {
            return 1;
        }
        match self.islands {
            Level::Low => 1,
            Level::Medium => 2,
            Level::High => 3,
        }
    }

    /// Share of territories that receive a bonus resource
    pub fn resource_share(&self) -> f32 {
        match self.resources {
            Level::Low => 0.4,
            Level::Medium => 0.6,
            Level::High => 0.8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_larger_maps_ask_for_more_territories() {
        let small = MapOptions {
            size: MapSize::Small,
            ..MapOptions::default()
        };
        let large = MapOptions {
            size: MapSize::Large,
            ..MapOptions::default()
        };
        assert!(large.target_territories() > small.target_territories());
    }

    #[test]
    fn test_islands_need_a_water_border() {
        let options = MapOptions {
            water_border: false,
            islands: Level::High,
            ..MapOptions::default()
        };
        assert_eq!(options.landmasses(), 1);
    }

    #[test]
    fn test_options_parse_from_wire_names() {
        let options: MapOptions = serde_json::from_str(
            r#"{"size":"L","territoryCount":"High","waterBorder":true,
                "islands":"Med","resources":"Low","seed":7}"#,
        )
        .unwrap();
        assert_eq!(options.size, MapSize::Large);
        assert_eq!(options.islands, Level::Medium);
        assert_eq!(options.seed, 7);
    }
}
