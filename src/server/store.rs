//! Persistence collaborators: game state by id, immutable maps by id

use ahash::AHashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};

use crate::core::error::{EngineError, Result};
use crate::core::types::{GameId, MapId};
use crate::game::GameState;
use crate::map::{Map, Territory};
use crate::mapgen::GeneratedMap;

/// Where game state is saved between actions
pub trait StateStore: Send + Sync {
    fn load(&self, id: GameId) -> Result<Option<GameState>>;
    fn save(&self, state: &GameState) -> Result<()>;
}

/// Keeps serialized state in memory. Used in tests and single-process setups.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    saved: Mutex<AHashMap<GameId, String>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.saved.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self, id: GameId) -> Result<Option<GameState>> {
        let saved = self.saved.lock().map_err(|_| poisoned())?;
        saved
            .get(&id)
            .map(|json| serde_json::from_str(json).map_err(EngineError::from))
            .transpose()
    }

    fn save(&self, state: &GameState) -> Result<()> {
        let json = serde_json::to_string(state)?;
        self.saved
            .lock()
            .map_err(|_| poisoned())?
            .insert(state.id, json);
        Ok(())
    }
}

/// One JSON file per game in a directory
#[derive(Debug, Clone)]
pub struct FileStateStore {
    dir: PathBuf,
}

impl FileStateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path(&self, id: GameId) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl StateStore for FileStateStore {
    fn load(&self, id: GameId) -> Result<Option<GameState>> {
        let path = self.path(id);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn save(&self, state: &GameState) -> Result<()> {
        let json = serde_json::to_string_pretty(state)?;
        // Atomic replace
        let tmp = self.dir.join(format!("{}.json.tmp", state.id));
        std::fs::write(&tmp, json)?;
        std::fs::rename(tmp, self.path(state.id))?;
        Ok(())
    }
}

/// A generated map and the territory records a new game starts from
#[derive(Debug, Clone)]
pub struct StoredMap {
    pub map: Arc<Map>,
    pub territories: Vec<Territory>,
}

/// Immutable maps keyed by id
#[derive(Debug, Default)]
pub struct MapStore {
    maps: RwLock<AHashMap<MapId, StoredMap>>,
}

impl MapStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep a generated map and return its id
    pub fn insert(&self, generated: &GeneratedMap) -> Result<MapId> {
        let id = MapId::new();
        let stored = StoredMap {
            map: Arc::new(generated.map.clone()),
            territories: generated.territories(),
        };
        self.maps.write().map_err(|_| poisoned())?.insert(id, stored);
        tracing::debug!(map = ?id, territories = generated.map.territory_count(), "map stored");
        Ok(id)
    }

    pub fn get(&self, id: MapId) -> Result<StoredMap> {
        self.maps
            .read()
            .map_err(|_| poisoned())?
            .get(&id)
            .cloned()
            .ok_or_else(|| EngineError::Storage(format!("unknown map {id:?}")))
    }
}

fn poisoned() -> EngineError {
    EngineError::Storage("store lock poisoned".into())
}
