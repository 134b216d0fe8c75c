//! Game registry - many independent games, each behind its own actor

use ahash::AHashMap;
use std::sync::{Arc, RwLock};

use super::actor::{spawn_game, GameHandle};
use super::store::{MapStore, StateStore};
use crate::core::config::GameConfig;
use crate::core::error::{EngineError, Result};
use crate::core::types::{GameId, MapId};
use crate::game::{Game, GameSetup, Notification, Seat};

/// Running games plus the stores they share
pub struct GameRegistry {
    games: RwLock<AHashMap<GameId, GameHandle>>,
    maps: Arc<MapStore>,
    store: Arc<dyn StateStore>,
}

impl GameRegistry {
    pub fn new(maps: Arc<MapStore>, store: Arc<dyn StateStore>) -> Self {
        Self {
            games: RwLock::new(AHashMap::new()),
            maps,
            store,
        }
    }

    pub fn maps(&self) -> &MapStore {
        &self.maps
    }

    /// Start a new game on a stored map. Must be called within a tokio runtime.
    pub fn create_game(
        &self,
        map_id: MapId,
        seats: Vec<Seat>,
        config: GameConfig,
        seed: u64,
    ) -> Result<(GameHandle, Vec<Notification>)> {
        let stored = self.maps.get(map_id)?;
        let setup = GameSetup {
            id: GameId::new(),
            map_id,
            map: stored.map,
            territories: stored.territories,
            seats,
            config,
            seed,
        };
        let (game, opening) = Game::new(setup, tokio::time::Instant::now().into_std())?;
        let handle = spawn_game(game, Arc::clone(&self.store));
        self.insert(handle.clone())?;
        Ok((handle, opening))
    }

    /// Bring a saved game back up, or return its handle if already running
    pub fn resume(&self, id: GameId, config: GameConfig) -> Result<GameHandle> {
        if let Ok(handle) = self.get(id) {
            return Ok(handle);
        }
        let state = self
            .store
            .load(id)?
            .ok_or_else(|| EngineError::GameUnavailable(format!("no saved state for {id}")))?;
        let stored = self.maps.get(state.map_id)?;
        let now = tokio::time::Instant::now().into_std();
        let game = Game::restore(state, stored.map, config, now)?;
        let handle = spawn_game(game, Arc::clone(&self.store));
        self.insert(handle.clone())?;
        Ok(handle)
    }

    pub fn get(&self, id: GameId) -> Result<GameHandle> {
        self.games
            .read()
            .map_err(|_| poisoned())?
            .get(&id)
            .filter(|h| !h.is_closed())
            .cloned()
            .ok_or_else(|| EngineError::GameUnavailable(id.to_string()))
    }

    /// Stop a game's actor. Its last saved state stays in the store.
    pub async fn remove(&self, id: GameId) -> Result<()> {
        let handle = self
            .games
            .write()
            .map_err(|_| poisoned())?
            .remove(&id)
            .ok_or_else(|| EngineError::GameUnavailable(id.to_string()))?;
        handle.shutdown().await;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.games.read().map(|g| g.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert(&self, handle: GameHandle) -> Result<()> {
        self.games
            .write()
            .map_err(|_| poisoned())?
            .insert(handle.id(), handle);
        Ok(())
    }
}

fn poisoned() -> EngineError {
    EngineError::Storage("registry lock poisoned".into())
}
