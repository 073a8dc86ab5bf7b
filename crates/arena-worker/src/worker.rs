//! The worker pool: parallel tasks that claim and advance games.
//!
//! Each worker loops forever: pop a runnable game id, win the lease (or
//! lose the race quietly), spawn a heartbeat task that keeps the lease
//! renewed, drive the game, then always stop the heartbeat and attempt an
//! unlock before looking for the next game. No worker ever holds more
//! than one lease.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use arena_callout::SnakeClient;
use arena_store::GameStore;
use arena_types::{GameId, LeaseToken};

use crate::driver::{DriverOutcome, GameDriver};

/// Tuning for the worker pool.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Number of parallel worker tasks.
    pub workers: usize,
    /// How long to sleep when no game is poppable.
    pub poll_interval: Duration,
    /// How often the heartbeat renews the lease. Must be well under the
    /// store's lease TTL.
    pub heartbeat_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            workers: 10,
            poll_interval: Duration::from_secs(1),
            heartbeat_interval: Duration::from_millis(300),
        }
    }
}

/// A pool of game-advancing workers sharing one store and snake client.
pub struct WorkerPool {
    store: Arc<GameStore>,
    client: SnakeClient,
    config: WorkerConfig,
}

impl WorkerPool {
    /// Assemble a pool. Nothing runs until [`WorkerPool::spawn`].
    pub const fn new(store: Arc<GameStore>, client: SnakeClient, config: WorkerConfig) -> Self {
        Self {
            store,
            client,
            config,
        }
    }

    /// Spawn every worker task and return their handles. The tasks run
    /// until aborted; they have no natural exit.
    pub fn spawn(&self) -> Vec<JoinHandle<()>> {
        (0..self.config.workers)
            .map(|worker_id| {
                let store = Arc::clone(&self.store);
                let client = self.client.clone();
                let config = self.config.clone();
                tokio::spawn(async move {
                    worker_loop(worker_id, store, client, config).await;
                })
            })
            .collect()
    }
}

/// One worker's infinite claim-and-drive loop. Every failed claim, pop
/// or lock alike, waits a poll interval before the next attempt.
async fn worker_loop(
    worker_id: usize,
    store: Arc<GameStore>,
    client: SnakeClient,
    config: WorkerConfig,
) {
    let driver = GameDriver::new(Arc::clone(&store), client);
    tracing::debug!(worker_id, "worker started");
    loop {
        match claim_next(worker_id, &store).await {
            Some((id, token)) => {
                process_game(worker_id, &store, &driver, &id, &token, &config).await;
            }
            None => tokio::time::sleep(config.poll_interval).await,
        }
    }
}

/// Pop a runnable game and win its lease. `None` when nothing is
/// poppable, when another worker wins the race between pop and lock, or
/// on a backend failure.
async fn claim_next(worker_id: usize, store: &GameStore) -> Option<(GameId, LeaseToken)> {
    let id = match store.pop_game_id().await {
        Ok(id) => id,
        Err(e) if e.is_not_found() => return None,
        Err(e) => {
            tracing::warn!(worker_id, error = %e, "pop failed");
            return None;
        }
    };

    match store.lock(&id, None).await {
        Ok(token) => Some((id, token)),
        Err(e) if e.is_locked() => {
            tracing::debug!(worker_id, game_id = %id, "lost lock race");
            None
        }
        Err(e) => {
            tracing::warn!(worker_id, game_id = %id, error = %e, "lock failed");
            None
        }
    }
}

/// Drive one claimed game with a live heartbeat, then release everything.
async fn process_game(
    worker_id: usize,
    store: &Arc<GameStore>,
    driver: &GameDriver,
    id: &GameId,
    token: &LeaseToken,
    config: &WorkerConfig,
) {
    tracing::info!(worker_id, game_id = %id, "claimed game");
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let heartbeat = tokio::spawn(heartbeat_loop(
        Arc::clone(store),
        id.clone(),
        token.clone(),
        config.heartbeat_interval,
        cancel_tx,
    ));

    match driver.drive(id, token, &cancel_rx).await {
        Ok(DriverOutcome::Finished) => {
            tracing::info!(worker_id, game_id = %id, "game finished");
        }
        Ok(DriverOutcome::LeaseLost | DriverOutcome::Cancelled) => {
            tracing::debug!(worker_id, game_id = %id, "released game mid-drive");
        }
        Err(e) => {
            tracing::warn!(worker_id, game_id = %id, error = %e, "driver failed");
        }
    }

    heartbeat.abort();
    let _ = heartbeat.await;

    // Best effort: an expired or stolen lease makes this fail, which is
    // fine, the game is no longer ours either way.
    if let Err(e) = store.unlock(id, token).await {
        tracing::debug!(worker_id, game_id = %id, error = %e, "unlock failed");
    }
}

/// Renews the lease until aborted; on a failed renewal, flips the cancel
/// flag and exits so the driver stops at the next tick boundary.
async fn heartbeat_loop(
    store: Arc<GameStore>,
    id: GameId,
    token: LeaseToken,
    interval: Duration,
    cancel_tx: watch::Sender<bool>,
) {
    loop {
        tokio::time::sleep(interval).await;
        match store.lock(&id, Some(&token)).await {
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(game_id = %id, error = %e, "lease renewal failed, cancelling driver");
                let _ = cancel_tx.send(true);
                return;
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use arena_store::MemoryStore;
    use arena_types::{DEFAULT_LEASE_TTL_MS, Game, GameMode, GameStatus};

    use super::*;

    async fn store_with_game(status: GameStatus) -> (GameStore, GameId) {
        let store = GameStore::Memory(MemoryStore::new(DEFAULT_LEASE_TTL_MS));
        let game = Game {
            id: GameId::from("claim-game"),
            width: 5,
            height: 5,
            status,
            mode: GameMode::SinglePlayer,
            snake_timeout_ms: 100,
            created_at: Utc::now(),
        };
        store.create_game(&game, &[]).await.unwrap();
        (store, game.id)
    }

    #[tokio::test]
    async fn claim_wins_an_unlocked_running_game() {
        let (store, id) = store_with_game(GameStatus::Running).await;

        let (claimed, token) = claim_next(0, &store).await.unwrap();
        assert_eq!(claimed, id);

        // The lease is now held, so a second claim comes up empty and the
        // caller backs off for a poll interval.
        assert!(claim_next(1, &store).await.is_none());

        store.unlock(&id, &token).await.unwrap();
        assert!(claim_next(1, &store).await.is_some());
    }

    #[tokio::test]
    async fn stopped_games_yield_no_claim() {
        let (store, _) = store_with_game(GameStatus::Stopped).await;
        assert!(claim_next(0, &store).await.is_none());
    }
}
