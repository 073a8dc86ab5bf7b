//! Chaos wrapper: random latency injection around another store.
//!
//! With 20% probability a call is delayed by up to 5 seconds (enough to
//! outlive a default lease), otherwise by up to 50ms. Pointing workers at
//! a chaos-wrapped store exercises every lease-loss path: heartbeat
//! renewals time out, appends arrive after expiry and must be rejected by
//! the inner store, and games get re-popped by other workers.

use std::time::Duration;

use arena_types::{Game, GameId, GameStatus, LeaseToken, Tick};
use rand::Rng;

use crate::GameStore;
use crate::error::StoreError;

/// Probability of a long stall, in percent.
const STALL_CHANCE_PCT: u32 = 20;

/// Upper bound of a long stall, in milliseconds.
const STALL_MAX_MS: u64 = 5_000;

/// Upper bound of ordinary jitter, in milliseconds.
const JITTER_MAX_MS: u64 = 50;

/// A store decorator that delays every call before forwarding it.
pub struct ChaosStore {
    inner: Box<GameStore>,
}

impl ChaosStore {
    /// Wrap `inner` with latency injection.
    pub fn new(inner: GameStore) -> Self {
        Self {
            inner: Box::new(inner),
        }
    }

    /// Sleep for a freshly sampled chaos delay.
    async fn delay(&self) {
        let ms = {
            let mut rng = rand::rng();
            if rng.random_range(0..100) < STALL_CHANCE_PCT {
                rng.random_range(0..=STALL_MAX_MS)
            } else {
                rng.random_range(0..=JITTER_MAX_MS)
            }
        };
        if ms > 0 {
            tracing::trace!(delay_ms = ms, "chaos delay");
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }
    }

    /// Acquire or renew the lease on `id`, after a chaos delay.
    pub async fn lock(
        &self,
        id: &GameId,
        token: Option<&LeaseToken>,
    ) -> Result<LeaseToken, StoreError> {
        self.delay().await;
        Box::pin(self.inner.lock(id, token)).await
    }

    /// Release the lease on `id`, after a chaos delay.
    pub async fn unlock(&self, id: &GameId, token: &LeaseToken) -> Result<(), StoreError> {
        self.delay().await;
        Box::pin(self.inner.unlock(id, token)).await
    }

    /// Pop an unclaimed runnable game id, after a chaos delay.
    pub async fn pop_game_id(&self) -> Result<GameId, StoreError> {
        self.delay().await;
        Box::pin(self.inner.pop_game_id()).await
    }

    /// Store a new game, after a chaos delay.
    pub async fn create_game(&self, game: &Game, initial_ticks: &[Tick]) -> Result<(), StoreError> {
        self.delay().await;
        Box::pin(self.inner.create_game(game, initial_ticks)).await
    }

    /// Set the game's lifecycle status, after a chaos delay.
    pub async fn set_game_status(
        &self,
        id: &GameId,
        status: GameStatus,
    ) -> Result<(), StoreError> {
        self.delay().await;
        Box::pin(self.inner.set_game_status(id, status)).await
    }

    /// Fetch game metadata, after a chaos delay.
    pub async fn get_game(&self, id: &GameId) -> Result<Game, StoreError> {
        self.delay().await;
        Box::pin(self.inner.get_game(id)).await
    }

    /// Append a tick, after a chaos delay.
    pub async fn push_tick(
        &self,
        id: &GameId,
        token: &LeaseToken,
        tick: &Tick,
    ) -> Result<(), StoreError> {
        self.delay().await;
        Box::pin(self.inner.push_tick(id, token, tick)).await
    }

    /// Read a window of the tick history, after a chaos delay.
    pub async fn list_ticks(
        &self,
        id: &GameId,
        limit: usize,
        offset: i64,
    ) -> Result<Vec<Tick>, StoreError> {
        self.delay().await;
        Box::pin(self.inner.list_ticks(id, limit, offset)).await
    }
}
