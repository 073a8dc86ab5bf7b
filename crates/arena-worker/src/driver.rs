//! The game driver: advances one leased game tick by tick until it ends,
//! the lease is lost, or cancellation is signalled.
//!
//! The driver owns no lease bookkeeping itself. It is handed a token the
//! worker already holds and a cancellation flag the worker's heartbeat
//! task flips when renewal fails; the driver checks the flag at every
//! tick boundary and otherwise trusts the store to reject a stale append.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use arena_callout::SnakeClient;
use arena_engine::{game_over, next_tick};
use arena_store::GameStore;
use arena_types::wire::CalloutRequest;
use arena_types::{Direction, Game, GameId, GameStatus, LeaseToken, SnakeId, Tick};

use crate::error::DriverError;

/// How a driver run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverOutcome {
    /// The game reached a terminal status.
    Finished,
    /// The lease stopped being ours; another worker owns the game now.
    LeaseLost,
    /// The cancellation flag was set between ticks.
    Cancelled,
}

/// Drives games against a store using a snake client for callouts.
#[derive(Clone)]
pub struct GameDriver {
    store: Arc<GameStore>,
    client: SnakeClient,
}

impl GameDriver {
    /// Pair a store with a snake client.
    pub const fn new(store: Arc<GameStore>, client: SnakeClient) -> Self {
        Self { store, client }
    }

    /// Advance the game under an already-held lease until it finishes.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError`] only for unrecoverable failures: a store
    /// backend fault, or an engine failure (in which case the game status
    /// is set to Error first). A lost lease is an [`DriverOutcome`], not
    /// an error.
    pub async fn drive(
        &self,
        id: &GameId,
        token: &LeaseToken,
        cancel: &watch::Receiver<bool>,
    ) -> Result<DriverOutcome, DriverError> {
        let game = self.store.get_game(id).await?;
        let mut tick = self.last_tick(id).await?;

        // Start callouts happen once per driver run, only when the game
        // has never advanced. A resumed turn-0 game re-sends them; snakes
        // must tolerate a duplicate start.
        if tick.turn == 0 {
            self.send_starts(&game, &mut tick).await;
        }

        loop {
            if *cancel.borrow() {
                tracing::debug!(game_id = %id, turn = tick.turn, "driver cancelled");
                return Ok(DriverOutcome::Cancelled);
            }
            let game = self.store.get_game(id).await?;
            if game.status != GameStatus::Running {
                tracing::debug!(game_id = %id, status = ?game.status, "game no longer running");
                return Ok(DriverOutcome::Finished);
            }

            let moves = self.collect_moves(&game, &tick).await;
            let next = {
                let mut rng = rand::rng();
                next_tick(&game, &tick, &moves, &mut rng)
            };
            let next = match next {
                Ok(next) => next,
                Err(e) => {
                    tracing::warn!(game_id = %id, error = %e, "simulation failed, marking game Error");
                    // Best effort; the original failure is what matters.
                    if let Err(status_err) = self
                        .store
                        .set_game_status(id, GameStatus::Error)
                        .await
                    {
                        tracing::warn!(game_id = %id, error = %status_err, "could not mark game Error");
                    }
                    return Err(e.into());
                }
            };

            match self.store.push_tick(id, token, &next).await {
                Ok(()) => {}
                Err(e) if e.is_lease_lost() => {
                    tracing::debug!(game_id = %id, turn = next.turn, error = %e, "lease lost on append");
                    return Ok(DriverOutcome::LeaseLost);
                }
                Err(e) => return Err(e.into()),
            }
            tick = next;

            if game_over(game.mode, &tick) {
                self.send_ends(&game, &tick).await;
                self.store
                    .set_game_status(id, GameStatus::Complete)
                    .await?;
                tracing::info!(
                    game_id = %id,
                    turns = tick.turn,
                    survivors = tick.alive_count(),
                    "game complete"
                );
                return Ok(DriverOutcome::Finished);
            }
        }
    }

    /// The most recent stored tick.
    async fn last_tick(&self, id: &GameId) -> Result<Tick, DriverError> {
        let mut ticks = self.store.list_ticks(id, 1, -1).await?;
        ticks
            .pop()
            .ok_or_else(|| arena_store::StoreError::NotFound(format!("game {id} has no ticks")).into())
    }

    /// Announce the game to every alive snake, adopting any color the
    /// snake picks for itself. Failures keep the palette color.
    async fn send_starts(&self, game: &Game, tick: &mut Tick) {
        let timeout = Duration::from_millis(game.snake_timeout_ms);
        let mut colors: Vec<(SnakeId, String)> = Vec::new();
        for snake in tick.alive_snakes() {
            let request = CalloutRequest::for_snake(game, tick, snake);
            match self.client.start(&snake.url, &request, timeout).await {
                Ok(response) => {
                    if let Some(color) = response.color {
                        colors.push((snake.id.clone(), color));
                    }
                }
                Err(e) => {
                    tracing::debug!(game_id = %game.id, snake_id = %snake.id, error = %e, "start callout failed");
                }
            }
        }
        for (snake_id, color) in colors {
            if let Some(snake) = tick.snakes.iter_mut().find(|s| s.id == snake_id) {
                snake.color = color;
            }
        }
    }

    /// Gather this turn's moves. A snake that errs or answers garbage
    /// simply has no entry; the engine then continues it straight.
    async fn collect_moves(&self, game: &Game, tick: &Tick) -> std::collections::BTreeMap<SnakeId, Direction> {
        let timeout = Duration::from_millis(game.snake_timeout_ms);
        let mut moves = std::collections::BTreeMap::new();
        for snake in tick.alive_snakes() {
            let request = CalloutRequest::for_snake(game, tick, snake);
            match self.client.request_move(&snake.url, &request, timeout).await {
                Ok(direction) => {
                    moves.insert(snake.id.clone(), direction);
                }
                Err(e) => {
                    tracing::debug!(
                        game_id = %game.id,
                        snake_id = %snake.id,
                        turn = tick.turn,
                        error = %e,
                        "move callout failed, continuing straight"
                    );
                }
            }
        }
        moves
    }

    /// Fire the end callouts concurrently. Fire-and-forget: failures are
    /// logged and nothing is retried.
    async fn send_ends(&self, game: &Game, tick: &Tick) {
        let timeout = Duration::from_millis(game.snake_timeout_ms);
        let callouts = tick.snakes.iter().map(|snake| {
            let request = CalloutRequest::for_snake(game, tick, snake);
            let client = self.client.clone();
            async move {
                if let Err(e) = client.end(&snake.url, &request, timeout).await {
                    tracing::debug!(game_id = %game.id, snake_id = %snake.id, error = %e, "end callout failed");
                }
            }
        });
        futures::future::join_all(callouts).await;
    }
}
