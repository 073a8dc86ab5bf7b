//! Redis store backend.
//!
//! Mutual exclusion rides on Redis primitives: lease acquisition is a
//! single `SET NX PX` (atomic check-and-install with a TTL), renewal is a
//! token-checked `PEXPIRE`, and an expired lease simply vanishes. Tick
//! appends are not transactional; the lease's single-writer guarantee is
//! what keeps the sequence check and the `RPUSH` from racing.
//!
//! # Key Patterns
//!
//! | Pattern | Type | Description |
//! |---------|------|-------------|
//! | `arena:game:{id}:meta` | JSON | Serialized [`Game`] metadata |
//! | `arena:game:{id}:ticks` | List | JSON ticks, turn 0 first |
//! | `arena:game:{id}:lock` | String | Lease token, PX = lease TTL |
//! | `arena:games:running` | Set | Ids of games with status Running |

use arena_types::{Game, GameId, GameStatus, LeaseToken, Tick};
use fred::prelude::*;
use fred::types::Expiration;
use fred::types::SetOptions;

use crate::error::StoreError;
use crate::resolve_window;

/// Store backend on a Redis-compatible server.
#[derive(Clone)]
pub struct RedisStore {
    client: Client,
    ttl_ms: u64,
}

impl RedisStore {
    /// Connect to Redis at the given URL (`redis://host:port`).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Backend`] if the URL cannot be parsed and
    /// [`StoreError::Redis`] if the connection fails.
    pub async fn connect(url: &str, ttl_ms: u64) -> Result<Self, StoreError> {
        let config = Config::from_url(url)
            .map_err(|e| StoreError::Backend(format!("invalid Redis URL: {e}")))?;
        let client = Builder::from_config(config).build()?;
        client.init().await?;
        tracing::info!("Connected to Redis store");
        Ok(Self { client, ttl_ms })
    }

    fn meta_key(id: &GameId) -> String {
        format!("arena:game:{id}:meta")
    }

    fn ticks_key(id: &GameId) -> String {
        format!("arena:game:{id}:ticks")
    }

    fn lock_key(id: &GameId) -> String {
        format!("arena:game:{id}:lock")
    }

    /// The `arena:games:running` set key.
    const RUNNING_KEY: &'static str = "arena:games:running";

    async fn read_game(&self, id: &GameId) -> Result<Game, StoreError> {
        let raw: Option<String> = self.client.get(Self::meta_key(id)).await?;
        raw.map_or_else(
            || Err(StoreError::NotFound(format!("no game {id}"))),
            |s| Ok(serde_json::from_str(&s)?),
        )
    }

    /// Acquire or renew the lease on `id`.
    pub async fn lock(
        &self,
        id: &GameId,
        token: Option<&LeaseToken>,
    ) -> Result<LeaseToken, StoreError> {
        // Locking a nonexistent game is NotFound, matching the reference
        // store.
        self.read_game(id).await?;

        let candidate = match token {
            Some(t) if !t.is_empty() => t.clone(),
            _ => LeaseToken::generate(),
        };
        let key = Self::lock_key(id);
        let px = i64::try_from(self.ttl_ms).unwrap_or(i64::MAX);

        let acquired: Option<String> = self
            .client
            .set(
                &key,
                candidate.as_str(),
                Some(Expiration::PX(px)),
                Some(SetOptions::NX),
                false,
            )
            .await?;
        if acquired.is_some() {
            return Ok(candidate);
        }

        // Key already present: renewal only for the current holder. The
        // GET/PEXPIRE pair is not atomic, but renewal is only ever issued
        // by the holder itself under the single-writer discipline.
        let current: Option<String> = self.client.get(&key).await?;
        match current {
            Some(held) if held == candidate.as_str() => {
                let _: bool = self.client.pexpire(&key, px, None).await?;
                Ok(candidate)
            }
            Some(_) => Err(StoreError::IsLocked(format!(
                "game {id} is leased to another holder"
            ))),
            // Expired between SET and GET; one more attempt, then concede.
            None => {
                let acquired: Option<String> = self
                    .client
                    .set(
                        &key,
                        candidate.as_str(),
                        Some(Expiration::PX(px)),
                        Some(SetOptions::NX),
                        false,
                    )
                    .await?;
                if acquired.is_some() {
                    Ok(candidate)
                } else {
                    Err(StoreError::IsLocked(format!(
                        "game {id} is leased to another holder"
                    )))
                }
            }
        }
    }

    /// Release the lease on `id`. Expired leases are already gone in
    /// Redis, so "no key" is success.
    pub async fn unlock(&self, id: &GameId, token: &LeaseToken) -> Result<(), StoreError> {
        self.read_game(id).await?;
        let key = Self::lock_key(id);
        let current: Option<String> = self.client.get(&key).await?;
        match current {
            None => Ok(()),
            Some(held) if held == token.as_str() => {
                let _: u32 = self.client.del(&key).await?;
                Ok(())
            }
            Some(_) => Err(StoreError::IsLocked(format!(
                "game {id} is leased to another holder"
            ))),
        }
    }

    /// Return any member of the running set without a live lock key.
    pub async fn pop_game_id(&self) -> Result<GameId, StoreError> {
        let members: Vec<String> = self.client.smembers(Self::RUNNING_KEY).await?;
        for member in members {
            let id = GameId::from(member);
            let locked: bool = self.client.exists(Self::lock_key(&id)).await?;
            if !locked {
                return Ok(id);
            }
        }
        Err(StoreError::NotFound(
            "no unclaimed runnable game".to_owned(),
        ))
    }

    /// Store a new game with its initial tick history.
    pub async fn create_game(&self, game: &Game, initial_ticks: &[Tick]) -> Result<(), StoreError> {
        let meta = serde_json::to_string(game)?;
        let created: Option<String> = self
            .client
            .set(
                Self::meta_key(&game.id),
                meta.as_str(),
                None,
                Some(SetOptions::NX),
                false,
            )
            .await?;
        if created.is_none() {
            return Err(StoreError::AlreadyExists(format!(
                "game {} already exists",
                game.id
            )));
        }

        if !initial_ticks.is_empty() {
            let mut encoded = Vec::with_capacity(initial_ticks.len());
            for tick in initial_ticks {
                encoded.push(serde_json::to_string(tick)?);
            }
            let _: u64 = self
                .client
                .rpush(Self::ticks_key(&game.id), encoded)
                .await?;
        }

        if game.status == GameStatus::Running {
            let _: u32 = self
                .client
                .sadd(Self::RUNNING_KEY, game.id.as_str())
                .await?;
        }
        Ok(())
    }

    /// Set the game's lifecycle status and maintain the running index.
    pub async fn set_game_status(
        &self,
        id: &GameId,
        status: GameStatus,
    ) -> Result<(), StoreError> {
        let mut game = self.read_game(id).await?;
        if game.status.is_terminal() {
            return Err(StoreError::InvalidSequence(format!(
                "game {id} already finished ({:?})",
                game.status
            )));
        }
        game.status = status;
        let meta = serde_json::to_string(&game)?;
        let _: () = self
            .client
            .set(Self::meta_key(id), meta.as_str(), None, None, false)
            .await?;

        if status == GameStatus::Running {
            let _: u32 = self.client.sadd(Self::RUNNING_KEY, id.as_str()).await?;
        } else {
            let _: u32 = self.client.srem(Self::RUNNING_KEY, id.as_str()).await?;
        }
        if status.is_terminal() {
            let _: u32 = self.client.del(Self::lock_key(id)).await?;
        }
        Ok(())
    }

    /// Fetch game metadata.
    pub async fn get_game(&self, id: &GameId) -> Result<Game, StoreError> {
        self.read_game(id).await
    }

    /// Append a tick under a held lease.
    pub async fn push_tick(
        &self,
        id: &GameId,
        token: &LeaseToken,
        tick: &Tick,
    ) -> Result<(), StoreError> {
        let game = self.read_game(id).await?;
        if game.status.is_terminal() {
            return Err(StoreError::InvalidSequence(format!(
                "game {id} already finished, tick {} rejected",
                tick.turn
            )));
        }

        let current: Option<String> = self.client.get(Self::lock_key(id)).await?;
        if current.as_deref() != Some(token.as_str()) {
            return Err(StoreError::IsLocked(format!(
                "append to game {id} without a valid lease"
            )));
        }

        let key = Self::ticks_key(id);
        let last: Option<String> = self.client.lindex(&key, -1).await?;
        let expected = match last {
            Some(raw) => {
                let last_tick: Tick = serde_json::from_str(&raw)?;
                last_tick.turn.saturating_add(1)
            }
            None => 0,
        };
        if tick.turn != expected {
            return Err(StoreError::InvalidSequence(format!(
                "expected turn {expected}, got {}",
                tick.turn
            )));
        }

        let encoded = serde_json::to_string(tick)?;
        let _: u64 = self.client.rpush(&key, encoded.as_str()).await?;
        Ok(())
    }

    /// Read a window of the tick history.
    pub async fn list_ticks(
        &self,
        id: &GameId,
        limit: usize,
        offset: i64,
    ) -> Result<Vec<Tick>, StoreError> {
        self.read_game(id).await?;
        let key = Self::ticks_key(id);
        let len: u64 = self.client.llen(&key).await?;
        let len = usize::try_from(len).unwrap_or(usize::MAX);

        let (start, end) = resolve_window(len, limit, offset);
        if start >= end {
            return Ok(Vec::new());
        }

        // LRANGE bounds are inclusive.
        let stop = i64::try_from(end.saturating_sub(1)).unwrap_or(i64::MAX);
        let start = i64::try_from(start).unwrap_or(i64::MAX);
        let raw: Vec<String> = self.client.lrange(&key, start, stop).await?;

        let mut ticks = Vec::with_capacity(raw.len());
        for item in &raw {
            ticks.push(serde_json::from_str(item)?);
        }
        Ok(ticks)
    }
}
