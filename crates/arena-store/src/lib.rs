//! Lease-based game state store for the Arena game server.
//!
//! One contract, several backends. Every backend provides the same eight
//! operations with the same semantics:
//!
//! - `lock` / `unlock` -- time-bounded exclusive leases, at most one valid
//!   holder per game id even under contention
//! - `pop_game_id` -- hand out a Running game with no valid lock
//! - `create_game` / `set_game_status` / `get_game` -- game lifecycle
//! - `push_tick` / `list_ticks` -- append-only, sequence-enforced history
//!
//! # Backends
//!
//! - [`MemoryStore`] -- mutex-guarded reference implementation
//! - [`RedisStore`] -- `SET NX PX` leases on a Redis-compatible server
//! - [`PostgresStore`] -- atomic upsert leases on `PostgreSQL`
//! - [`RemoteStore`] -- HTTP client of a controller
//! - [`ChaosStore`] -- latency-injecting decorator for lease-loss testing
//!
//! [`GameStore`] is an enum over the backends rather than a trait object:
//! async methods are not dyn-compatible, so dispatch is a `match`, the
//! same shape the callout client uses.

pub mod chaos;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod redis;
pub mod remote;

use arena_types::{Game, GameId, GameStatus, LeaseToken, Tick};

pub use chaos::ChaosStore;
pub use error::StoreError;
pub use memory::MemoryStore;
pub use postgres::PostgresStore;
pub use redis::RedisStore;
pub use remote::RemoteStore;

/// A game state store, dispatching to one of the concrete backends.
pub enum GameStore {
    /// Mutex-guarded in-memory reference store.
    Memory(MemoryStore),
    /// Redis-backed store.
    Redis(RedisStore),
    /// `PostgreSQL`-backed store.
    Postgres(PostgresStore),
    /// HTTP client of a remote controller.
    Remote(RemoteStore),
    /// Latency-injecting wrapper around another store.
    Chaos(ChaosStore),
}

impl GameStore {
    /// Human-readable backend name for logging.
    pub const fn backend_name(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Redis(_) => "redis",
            Self::Postgres(_) => "postgres",
            Self::Remote(_) => "remote",
            Self::Chaos(_) => "chaos",
        }
    }

    /// Acquire or renew the lease on `id`.
    ///
    /// Installs a fresh lease when none is valid, generating a token if
    /// the caller passed `None` or an empty one; renews idempotently when
    /// `token` matches the holder; fails [`StoreError::IsLocked`] when a
    /// different valid token holds the key.
    pub async fn lock(
        &self,
        id: &GameId,
        token: Option<&LeaseToken>,
    ) -> Result<LeaseToken, StoreError> {
        match self {
            Self::Memory(s) => s.lock(id, token).await,
            Self::Redis(s) => s.lock(id, token).await,
            Self::Postgres(s) => s.lock(id, token).await,
            Self::Remote(s) => s.lock(id, token).await,
            Self::Chaos(s) => s.lock(id, token).await,
        }
    }

    /// Release the lease on `id`. Success when no lock exists, the lock
    /// is expired, or `token` matches; [`StoreError::IsLocked`] otherwise.
    pub async fn unlock(&self, id: &GameId, token: &LeaseToken) -> Result<(), StoreError> {
        match self {
            Self::Memory(s) => s.unlock(id, token).await,
            Self::Redis(s) => s.unlock(id, token).await,
            Self::Postgres(s) => s.unlock(id, token).await,
            Self::Remote(s) => s.unlock(id, token).await,
            Self::Chaos(s) => s.unlock(id, token).await,
        }
    }

    /// Return any game id whose status is Running and which has no valid
    /// lock; [`StoreError::NotFound`] when none exists. Selection among
    /// candidates is arbitrary.
    pub async fn pop_game_id(&self) -> Result<GameId, StoreError> {
        match self {
            Self::Memory(s) => s.pop_game_id().await,
            Self::Redis(s) => s.pop_game_id().await,
            Self::Postgres(s) => s.pop_game_id().await,
            Self::Remote(s) => s.pop_game_id().await,
            Self::Chaos(s) => s.pop_game_id().await,
        }
    }

    /// Store a new game with its initial tick history (turn 0 first,
    /// contiguous).
    pub async fn create_game(&self, game: &Game, initial_ticks: &[Tick]) -> Result<(), StoreError> {
        match self {
            Self::Memory(s) => s.create_game(game, initial_ticks).await,
            Self::Redis(s) => s.create_game(game, initial_ticks).await,
            Self::Postgres(s) => s.create_game(game, initial_ticks).await,
            Self::Remote(s) => s.create_game(game, initial_ticks).await,
            Self::Chaos(s) => s.create_game(game, initial_ticks).await,
        }
    }

    /// Set the game's lifecycle status. Terminal statuses are final.
    pub async fn set_game_status(
        &self,
        id: &GameId,
        status: GameStatus,
    ) -> Result<(), StoreError> {
        match self {
            Self::Memory(s) => s.set_game_status(id, status).await,
            Self::Redis(s) => s.set_game_status(id, status).await,
            Self::Postgres(s) => s.set_game_status(id, status).await,
            Self::Remote(s) => s.set_game_status(id, status).await,
            Self::Chaos(s) => s.set_game_status(id, status).await,
        }
    }

    /// Fetch game metadata as an owned copy.
    pub async fn get_game(&self, id: &GameId) -> Result<Game, StoreError> {
        match self {
            Self::Memory(s) => s.get_game(id).await,
            Self::Redis(s) => s.get_game(id).await,
            Self::Postgres(s) => s.get_game(id).await,
            Self::Remote(s) => s.get_game(id).await,
            Self::Chaos(s) => s.get_game(id).await,
        }
    }

    /// Append a tick. Requires a currently valid lease matching `token`
    /// ([`StoreError::IsLocked`] otherwise) and `tick.turn` exactly one
    /// past the stored history ([`StoreError::InvalidSequence`]
    /// otherwise).
    pub async fn push_tick(
        &self,
        id: &GameId,
        token: &LeaseToken,
        tick: &Tick,
    ) -> Result<(), StoreError> {
        match self {
            Self::Memory(s) => s.push_tick(id, token, tick).await,
            Self::Redis(s) => s.push_tick(id, token, tick).await,
            Self::Postgres(s) => s.push_tick(id, token, tick).await,
            Self::Remote(s) => s.push_tick(id, token, tick).await,
            Self::Chaos(s) => s.push_tick(id, token, tick).await,
        }
    }

    /// Read a window of the tick history. `offset < 0` counts from the
    /// end; `limit == 0` means unlimited; out-of-range windows are empty,
    /// not errors.
    pub async fn list_ticks(
        &self,
        id: &GameId,
        limit: usize,
        offset: i64,
    ) -> Result<Vec<Tick>, StoreError> {
        match self {
            Self::Memory(s) => s.list_ticks(id, limit, offset).await,
            Self::Redis(s) => s.list_ticks(id, limit, offset).await,
            Self::Postgres(s) => s.list_ticks(id, limit, offset).await,
            Self::Remote(s) => s.list_ticks(id, limit, offset).await,
            Self::Chaos(s) => s.list_ticks(id, limit, offset).await,
        }
    }
}

/// Resolve a `(limit, offset)` pair against a history of `len` items into
/// a concrete `[start, end)` window.
///
/// A negative offset counts from the end (`-3` means "the last three"),
/// clamped to the start when it reaches past the whole history. A
/// non-negative offset at or past `len` yields an empty window. A `limit`
/// of 0 means unlimited. Every backend funnels through this one function
/// so the off-by-one conventions cannot drift between them.
pub fn resolve_window(len: usize, limit: usize, offset: i64) -> (usize, usize) {
    let start = if offset < 0 {
        let back = usize::try_from(offset.unsigned_abs()).unwrap_or(usize::MAX);
        len.saturating_sub(back)
    } else {
        usize::try_from(offset).unwrap_or(usize::MAX)
    };
    if start >= len {
        return (len, len);
    }
    let end = if limit == 0 {
        len
    } else {
        start.saturating_add(limit).min(len)
    };
    (start, end)
}

#[cfg(test)]
mod tests {
    use super::resolve_window;

    #[test]
    fn window_with_positive_offset() {
        assert_eq!(resolve_window(10, 0, 0), (0, 10));
        assert_eq!(resolve_window(10, 3, 2), (2, 5));
        assert_eq!(resolve_window(10, 100, 8), (8, 10));
    }

    #[test]
    fn window_past_the_end_is_empty() {
        assert_eq!(resolve_window(10, 0, 10), (10, 10));
        assert_eq!(resolve_window(10, 5, 99), (10, 10));
        assert_eq!(resolve_window(0, 0, 0), (0, 0));
    }

    #[test]
    fn negative_offset_counts_from_the_end() {
        assert_eq!(resolve_window(10, 0, -3), (7, 10));
        assert_eq!(resolve_window(10, 2, -3), (7, 9));
        // |offset| past the start clamps to 0.
        assert_eq!(resolve_window(10, 0, -100), (0, 10));
        assert_eq!(resolve_window(0, 0, -1), (0, 0));
    }
}
