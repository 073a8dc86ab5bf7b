//! `PostgreSQL` store backend.
//!
//! The in-process mutex of the reference store is replaced by native SQL
//! atomicity: lease acquisition is a single
//! `INSERT .. ON CONFLICT DO UPDATE .. WHERE` upsert that only succeeds
//! when the existing lease is expired or already ours, and tick appends
//! run inside a transaction that re-checks the lease row under
//! `FOR UPDATE`.
//!
//! Uses [`sqlx`] with runtime query construction (not compile-time
//! checked) so no live database is needed at build time. All queries are
//! parameterized.

use std::time::Duration;

use arena_types::{Game, GameId, GameMode, GameStatus, LeaseToken, Tick};
use chrono::{DateTime, TimeDelta, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

use crate::error::StoreError;
use crate::resolve_window;

/// Default maximum number of connections in the pool.
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Default connection timeout in seconds.
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Store backend on a `PostgreSQL` database.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
    ttl_ms: u64,
}

impl PostgresStore {
    /// Connect to `PostgreSQL` and run pending migrations.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Postgres`] if the connection fails and
    /// [`StoreError::Migration`] if a migration fails.
    pub async fn connect(url: &str, ttl_ms: u64) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(DEFAULT_MAX_CONNECTIONS)
            .acquire_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
            .connect(url)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Connected to PostgreSQL store");
        Ok(Self { pool, ttl_ms })
    }

    /// Build a store around an existing pool (tests).
    pub const fn from_pool(pool: PgPool, ttl_ms: u64) -> Self {
        Self { pool, ttl_ms }
    }

    fn fresh_expiry(&self) -> DateTime<Utc> {
        let ttl = TimeDelta::milliseconds(i64::try_from(self.ttl_ms).unwrap_or(i64::MAX));
        Utc::now()
            .checked_add_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    async fn game_exists(&self, id: &GameId) -> Result<(), StoreError> {
        let found: Option<i32> = sqlx::query_scalar("SELECT 1 FROM games WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        if found.is_some() {
            Ok(())
        } else {
            Err(StoreError::NotFound(format!("no game {id}")))
        }
    }

    /// Acquire or renew the lease on `id` with one atomic upsert.
    pub async fn lock(
        &self,
        id: &GameId,
        token: Option<&LeaseToken>,
    ) -> Result<LeaseToken, StoreError> {
        self.game_exists(id).await?;

        let candidate = match token {
            Some(t) if !t.is_empty() => t.clone(),
            _ => LeaseToken::generate(),
        };

        // The WHERE clause makes the update conditional: it fires only when
        // the held lease is expired or carries the caller's own token, so a
        // live foreign lease yields zero rows.
        let granted: Option<String> = sqlx::query_scalar(
            "INSERT INTO leases (game_id, token, expires_at)
             VALUES ($1, $2, $3)
             ON CONFLICT (game_id) DO UPDATE
               SET token = EXCLUDED.token, expires_at = EXCLUDED.expires_at
               WHERE leases.expires_at <= now() OR leases.token = EXCLUDED.token
             RETURNING token",
        )
        .bind(id.as_str())
        .bind(candidate.as_str())
        .bind(self.fresh_expiry())
        .fetch_optional(&self.pool)
        .await?;

        granted.map(LeaseToken::from).ok_or_else(|| {
            StoreError::IsLocked(format!("game {id} is leased to another holder"))
        })
    }

    /// Release the lease on `id`.
    pub async fn unlock(&self, id: &GameId, token: &LeaseToken) -> Result<(), StoreError> {
        self.game_exists(id).await?;

        let released = sqlx::query(
            "DELETE FROM leases
             WHERE game_id = $1 AND (expires_at <= now() OR token = $2)",
        )
        .bind(id.as_str())
        .bind(token.as_str())
        .execute(&self.pool)
        .await?;

        if released.rows_affected() > 0 {
            return Ok(());
        }

        // Nothing deleted: either no lease row at all (success per the
        // contract) or a live lease under a different token.
        let live: Option<i32> = sqlx::query_scalar(
            "SELECT 1 FROM leases WHERE game_id = $1 AND expires_at > now()",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;
        if live.is_some() {
            Err(StoreError::IsLocked(format!(
                "game {id} is leased to another holder"
            )))
        } else {
            Ok(())
        }
    }

    /// Return any Running game without a live lease.
    pub async fn pop_game_id(&self) -> Result<GameId, StoreError> {
        let id: Option<String> = sqlx::query_scalar(
            "SELECT g.id FROM games g
             LEFT JOIN leases l ON l.game_id = g.id
             WHERE g.status = $1 AND (l.game_id IS NULL OR l.expires_at <= now())
             LIMIT 1",
        )
        .bind(status_to_db(GameStatus::Running))
        .fetch_optional(&self.pool)
        .await?;

        id.map(GameId::from)
            .ok_or_else(|| StoreError::NotFound("no unclaimed runnable game".to_owned()))
    }

    /// Insert a new game and its initial tick history in one transaction.
    pub async fn create_game(&self, game: &Game, initial_ticks: &[Tick]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            "INSERT INTO games (id, width, height, status, mode, snake_timeout_ms, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (id) DO NOTHING",
        )
        .bind(game.id.as_str())
        .bind(i32::try_from(game.width).unwrap_or(i32::MAX))
        .bind(i32::try_from(game.height).unwrap_or(i32::MAX))
        .bind(status_to_db(game.status))
        .bind(mode_to_db(game.mode))
        .bind(i64::try_from(game.snake_timeout_ms).unwrap_or(i64::MAX))
        .bind(game.created_at)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            return Err(StoreError::AlreadyExists(format!(
                "game {} already exists",
                game.id
            )));
        }

        for tick in initial_ticks {
            sqlx::query("INSERT INTO ticks (game_id, turn, data) VALUES ($1, $2, $3)")
                .bind(game.id.as_str())
                .bind(i64::from(tick.turn))
                .bind(serde_json::to_value(tick)?)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Set the game's lifecycle status.
    pub async fn set_game_status(
        &self,
        id: &GameId,
        status: GameStatus,
    ) -> Result<(), StoreError> {
        let current = self.get_game(id).await?;
        if current.status.is_terminal() {
            return Err(StoreError::InvalidSequence(format!(
                "game {id} already finished ({:?})",
                current.status
            )));
        }

        sqlx::query("UPDATE games SET status = $2 WHERE id = $1")
            .bind(id.as_str())
            .bind(status_to_db(status))
            .execute(&self.pool)
            .await?;

        if status.is_terminal() {
            sqlx::query("DELETE FROM leases WHERE game_id = $1")
                .bind(id.as_str())
                .execute(&self.pool)
                .await?;
        }
        Ok(())
    }

    /// Fetch game metadata.
    pub async fn get_game(&self, id: &GameId) -> Result<Game, StoreError> {
        let row = sqlx::query(
            "SELECT id, width, height, status, mode, snake_timeout_ms, created_at
             FROM games WHERE id = $1",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("no game {id}")))?;

        let status: String = row.try_get("status")?;
        let mode: String = row.try_get("mode")?;
        let width: i32 = row.try_get("width")?;
        let height: i32 = row.try_get("height")?;
        let snake_timeout_ms: i64 = row.try_get("snake_timeout_ms")?;
        let game_id: String = row.try_get("id")?;

        Ok(Game {
            id: GameId::from(game_id),
            width: u32::try_from(width).unwrap_or(0),
            height: u32::try_from(height).unwrap_or(0),
            status: status_from_db(&status)?,
            mode: mode_from_db(&mode)?,
            snake_timeout_ms: u64::try_from(snake_timeout_ms).unwrap_or(0),
            created_at: row.try_get("created_at")?,
        })
    }

    /// Append a tick under a held lease, transactionally.
    pub async fn push_tick(
        &self,
        id: &GameId,
        token: &LeaseToken,
        tick: &Tick,
    ) -> Result<(), StoreError> {
        let game = self.get_game(id).await?;
        if game.status.is_terminal() {
            return Err(StoreError::InvalidSequence(format!(
                "game {id} already finished, tick {} rejected",
                tick.turn
            )));
        }

        let mut tx = self.pool.begin().await?;

        let held: Option<String> = sqlx::query_scalar(
            "SELECT token FROM leases
             WHERE game_id = $1 AND expires_at > now()
             FOR UPDATE",
        )
        .bind(id.as_str())
        .fetch_optional(&mut *tx)
        .await?;
        if held.as_deref() != Some(token.as_str()) {
            return Err(StoreError::IsLocked(format!(
                "append to game {id} without a valid lease"
            )));
        }

        let last: Option<i64> =
            sqlx::query_scalar("SELECT MAX(turn) FROM ticks WHERE game_id = $1")
                .bind(id.as_str())
                .fetch_one(&mut *tx)
                .await?;
        let expected = last.map_or(0_u32, |t| {
            u32::try_from(t).unwrap_or(u32::MAX).saturating_add(1)
        });
        if tick.turn != expected {
            return Err(StoreError::InvalidSequence(format!(
                "expected turn {expected}, got {}",
                tick.turn
            )));
        }

        sqlx::query("INSERT INTO ticks (game_id, turn, data) VALUES ($1, $2, $3)")
            .bind(id.as_str())
            .bind(i64::from(tick.turn))
            .bind(serde_json::to_value(tick)?)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Read a window of the tick history.
    pub async fn list_ticks(
        &self,
        id: &GameId,
        limit: usize,
        offset: i64,
    ) -> Result<Vec<Tick>, StoreError> {
        self.game_exists(id).await?;

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM ticks WHERE game_id = $1")
            .bind(id.as_str())
            .fetch_one(&self.pool)
            .await?;
        let len = usize::try_from(count).unwrap_or(0);

        let (start, end) = resolve_window(len, limit, offset);
        if start >= end {
            return Ok(Vec::new());
        }

        let rows: Vec<serde_json::Value> = sqlx::query_scalar(
            "SELECT data FROM ticks WHERE game_id = $1
             ORDER BY turn OFFSET $2 LIMIT $3",
        )
        .bind(id.as_str())
        .bind(i64::try_from(start).unwrap_or(i64::MAX))
        .bind(i64::try_from(end.saturating_sub(start)).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        let mut ticks = Vec::with_capacity(rows.len());
        for value in rows {
            ticks.push(serde_json::from_value(value)?);
        }
        Ok(ticks)
    }
}

/// Map a status to its database representation.
const fn status_to_db(status: GameStatus) -> &'static str {
    match status {
        GameStatus::Stopped => "Stopped",
        GameStatus::Running => "Running",
        GameStatus::Complete => "Complete",
        GameStatus::Error => "Error",
    }
}

/// Map a database status string back to the enum.
fn status_from_db(raw: &str) -> Result<GameStatus, StoreError> {
    match raw {
        "Stopped" => Ok(GameStatus::Stopped),
        "Running" => Ok(GameStatus::Running),
        "Complete" => Ok(GameStatus::Complete),
        "Error" => Ok(GameStatus::Error),
        other => Err(StoreError::Backend(format!("unknown game status: {other}"))),
    }
}

/// Map a mode to its database representation.
const fn mode_to_db(mode: GameMode) -> &'static str {
    match mode {
        GameMode::SinglePlayer => "SinglePlayer",
        GameMode::MultiPlayer => "MultiPlayer",
    }
}

/// Map a database mode string back to the enum.
fn mode_from_db(raw: &str) -> Result<GameMode, StoreError> {
    match raw {
        "SinglePlayer" => Ok(GameMode::SinglePlayer),
        "MultiPlayer" => Ok(GameMode::MultiPlayer),
        other => Err(StoreError::Backend(format!("unknown game mode: {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_round_trips() {
        for status in [
            GameStatus::Stopped,
            GameStatus::Running,
            GameStatus::Complete,
            GameStatus::Error,
        ] {
            assert_eq!(
                status_from_db(status_to_db(status)).ok(),
                Some(status)
            );
        }
        assert!(status_from_db("Bogus").is_err());
    }

    #[test]
    fn mode_mapping_round_trips() {
        for mode in [GameMode::SinglePlayer, GameMode::MultiPlayer] {
            assert_eq!(mode_from_db(mode_to_db(mode)).ok(), Some(mode));
        }
    }
}
