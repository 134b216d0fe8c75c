//! Game actor - one tokio task per game, the only writer of its state
//!
//! Actions arrive on an mpsc queue with a oneshot for the reply. Between
//! messages the task sleeps until the engine's next deadline, so alliance
//! votes and the trade timer expire with no further input.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::Instant;

use super::store::StateStore;
use crate::core::error::{EngineError, Result};
use crate::core::types::{GameId, PlayerId};
use crate::game::{Action, Game, GameState, Notification};

/// Pending commands per game before senders wait
pub const COMMAND_QUEUE: usize = 64;

/// Notifications a slow subscriber may fall behind by
pub const EVENT_BUFFER: usize = 256;

/// Messages into a game actor
#[derive(Debug)]
pub enum Command {
    Submit {
        player: PlayerId,
        action: Action,
        reply: oneshot::Sender<Result<Vec<Notification>>>,
    },
    Snapshot {
        reply: oneshot::Sender<GameState>,
    },
    Shutdown,
}

/// Cheap, cloneable handle to a running game
#[derive(Debug, Clone)]
pub struct GameHandle {
    id: GameId,
    commands: mpsc::Sender<Command>,
    events: broadcast::Sender<Notification>,
}

impl GameHandle {
    pub fn id(&self) -> GameId {
        self.id
    }

    /// Submit an action and wait for its outcome
    pub async fn submit(&self, player: PlayerId, action: Action) -> Result<Vec<Notification>> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Submit {
            player,
            action,
            reply,
        })
        .await?;
        rx.await.map_err(|_| self.gone())?
    }

    /// Parse a JSON action at the boundary, then submit it
    pub async fn submit_json(&self, player: PlayerId, json: &str) -> Result<Vec<Notification>> {
        let action = Action::from_json(json)?;
        self.submit(player, action).await
    }

    /// Copy of the current persisted state
    pub async fn snapshot(&self) -> Result<GameState> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Snapshot { reply }).await?;
        rx.await.map_err(|_| self.gone())
    }

    /// Every notification the game publishes from now on
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.events.subscribe()
    }

    pub async fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown).await;
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.commands.send(command).await.map_err(|_| self.gone())
    }

    fn gone(&self) -> EngineError {
        EngineError::GameUnavailable(self.id.to_string())
    }
}

/// Start the actor task for a game. Must be called within a tokio runtime.
pub fn spawn_game(game: Game, store: Arc<dyn StateStore>) -> GameHandle {
    let (commands, rx) = mpsc::channel(COMMAND_QUEUE);
    let (events, _) = broadcast::channel(EVENT_BUFFER);
    let handle = GameHandle {
        id: game.id(),
        commands,
        events: events.clone(),
    };

    tokio::spawn(run(game, rx, events, store));
    handle
}

async fn run(
    mut game: Game,
    mut rx: mpsc::Receiver<Command>,
    events: broadcast::Sender<Notification>,
    store: Arc<dyn StateStore>,
) {
    let id = game.id();
    tracing::info!(game = %id, "game actor started");
    persist(&game, store.as_ref());

    loop {
        let deadline = game.next_deadline();
        tokio::select! {
            command = rx.recv() => match command {
                Some(Command::Submit { player, action, reply }) => {
                    let now = Instant::now().into_std();
                    // select! may pick a queued command over an elapsed timer
                    let expired = game.on_deadline(now);
                    if !expired.is_empty() {
                        publish(&events, &expired);
                        persist(&game, store.as_ref());
                    }
                    let result = game.apply(player, action, now);
                    match &result {
                        Ok(notifications) => {
                            publish(&events, notifications);
                            persist(&game, store.as_ref());
                        }
                        Err(err) => {
                            tracing::debug!(
                                game = %id,
                                %player,
                                code = err.code(),
                                "action rejected"
                            );
                        }
                    }
                    let _ = reply.send(result);
                }
                Some(Command::Snapshot { reply }) => {
                    let _ = reply.send(game.state().clone());
                }
                Some(Command::Shutdown) | None => break,
            },
            _ = sleep_until(deadline) => {
                let notifications = game.on_deadline(Instant::now().into_std());
                if !notifications.is_empty() {
                    publish(&events, &notifications);
                    persist(&game, store.as_ref());
                }
            }
        }
    }

    tracing::info!(game = %id, "game actor stopped");
}

async fn sleep_until(deadline: Option<std::time::Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(Instant::from_std(at)).await,
        None => std::future::pending().await,
    }
}

fn publish(events: &broadcast::Sender<Notification>, notifications: &[Notification]) {
    for n in notifications {
        // No subscribers is not an error
        let _ = events.send(n.clone());
    }
}

fn persist(game: &Game, store: &dyn StateStore) {
    if let Err(err) = store.save(game.state()) {
        tracing::warn!(game = %game.id(), %err, "failed to save game state");
    }
}
