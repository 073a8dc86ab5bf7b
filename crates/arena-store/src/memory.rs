//! In-memory reference store.
//!
//! A single [`tokio::sync::Mutex`] over the game map serializes every
//! operation, which is what makes `lock` atomic under contention: the
//! check-and-install of a lease happens entirely inside one critical
//! section. Backends with native atomicity (SQL upsert, Redis `SET NX`)
//! replace the mutex with their own primitive but must provide the same
//! at-most-one-holder guarantee.

use std::collections::HashMap;
use std::sync::Arc;

use arena_types::{DEFAULT_LEASE_TTL_MS, Game, GameId, GameStatus, Lease, LeaseToken, Tick};
use chrono::Utc;
use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::resolve_window;

/// One game's full state as held in memory.
#[derive(Debug, Clone)]
struct GameRecord {
    /// Game metadata.
    game: Game,
    /// Append-only tick history, turn 0 first.
    ticks: Vec<Tick>,
    /// The current lease, if any. An expired lease is treated as absent.
    lease: Option<Lease>,
}

/// The reference in-memory store implementation.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    games: Arc<Mutex<HashMap<GameId, GameRecord>>>,
    ttl_ms: u64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_LEASE_TTL_MS)
    }
}

impl MemoryStore {
    /// Create a store granting leases of `ttl_ms` milliseconds.
    pub fn new(ttl_ms: u64) -> Self {
        Self {
            games: Arc::new(Mutex::new(HashMap::new())),
            ttl_ms,
        }
    }

    /// Acquire or renew the lease on `id`.
    ///
    /// See the contract: installs a fresh lease when none is valid
    /// (generating a token if the caller supplied none), renews
    /// idempotently on a token match, and fails [`StoreError::IsLocked`]
    /// when a different valid token holds the key.
    pub async fn lock(
        &self,
        id: &GameId,
        token: Option<&LeaseToken>,
    ) -> Result<LeaseToken, StoreError> {
        let mut games = self.games.lock().await;
        let record = games
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("no game {id}")))?;

        let now = Utc::now();
        if let Some(lease) = record.lease.as_mut() {
            if !lease.is_expired(now) {
                if token == Some(&lease.token) {
                    lease.renew(self.ttl_ms);
                    return Ok(lease.token.clone());
                }
                return Err(StoreError::IsLocked(format!(
                    "game {id} is leased to another holder"
                )));
            }
        }

        let granted = match token {
            Some(t) if !t.is_empty() => t.clone(),
            _ => LeaseToken::generate(),
        };
        record.lease = Some(Lease::grant(granted.clone(), self.ttl_ms));
        Ok(granted)
    }

    /// Release the lease on `id`.
    ///
    /// Succeeds when no lock exists, when the existing lock is expired,
    /// or when the token matches; fails [`StoreError::IsLocked`] when a
    /// different valid token holds the key.
    pub async fn unlock(&self, id: &GameId, token: &LeaseToken) -> Result<(), StoreError> {
        let mut games = self.games.lock().await;
        let record = games
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("no game {id}")))?;

        match record.lease.as_ref() {
            None => Ok(()),
            Some(lease) if lease.is_expired(Utc::now()) || lease.token == *token => {
                record.lease = None;
                Ok(())
            }
            Some(_) => Err(StoreError::IsLocked(format!(
                "game {id} is leased to another holder"
            ))),
        }
    }

    /// Return any Running game id with no valid lock.
    ///
    /// Selection among candidates is whatever order the map iterates in —
    /// deliberately arbitrary, no caller may rely on it.
    pub async fn pop_game_id(&self) -> Result<GameId, StoreError> {
        let games = self.games.lock().await;
        let now = Utc::now();
        games
            .values()
            .find(|record| {
                record.game.status == GameStatus::Running
                    && record.lease.as_ref().is_none_or(|l| l.is_expired(now))
            })
            .map(|record| record.game.id.clone())
            .ok_or_else(|| StoreError::NotFound("no unclaimed runnable game".to_owned()))
    }

    /// Store a new game with its initial tick history.
    pub async fn create_game(&self, game: &Game, initial_ticks: &[Tick]) -> Result<(), StoreError> {
        validate_initial_ticks(initial_ticks)?;
        let mut games = self.games.lock().await;
        if games.contains_key(&game.id) {
            return Err(StoreError::AlreadyExists(format!(
                "game {} already exists",
                game.id
            )));
        }
        games.insert(
            game.id.clone(),
            GameRecord {
                game: game.clone(),
                ticks: initial_ticks.to_vec(),
                lease: None,
            },
        );
        Ok(())
    }

    /// Set the game's lifecycle status.
    ///
    /// A terminal game never changes status again; reaching a terminal
    /// status drops any remaining lease (backend resources are reclaimed).
    pub async fn set_game_status(
        &self,
        id: &GameId,
        status: GameStatus,
    ) -> Result<(), StoreError> {
        let mut games = self.games.lock().await;
        let record = games
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("no game {id}")))?;

        if record.game.status.is_terminal() {
            return Err(StoreError::InvalidSequence(format!(
                "game {id} already finished ({:?})",
                record.game.status
            )));
        }
        record.game.status = status;
        if status.is_terminal() {
            record.lease = None;
        }
        Ok(())
    }

    /// Fetch game metadata. The returned value is an owned copy; callers
    /// cannot mutate store state through it.
    pub async fn get_game(&self, id: &GameId) -> Result<Game, StoreError> {
        let games = self.games.lock().await;
        games
            .get(id)
            .map(|record| record.game.clone())
            .ok_or_else(|| StoreError::NotFound(format!("no game {id}")))
    }

    /// Append a tick under a held lease.
    ///
    /// The store is the authority on lease loss: an append without a
    /// currently valid matching lease fails [`StoreError::IsLocked`] even
    /// if the worker believes it still holds the game.
    pub async fn push_tick(
        &self,
        id: &GameId,
        token: &LeaseToken,
        tick: &Tick,
    ) -> Result<(), StoreError> {
        let mut games = self.games.lock().await;
        let record = games
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(format!("no game {id}")))?;

        if record.game.status.is_terminal() {
            return Err(StoreError::InvalidSequence(format!(
                "game {id} already finished, tick {} rejected",
                tick.turn
            )));
        }

        let holds_lease = record
            .lease
            .as_ref()
            .is_some_and(|l| !l.is_expired(Utc::now()) && l.token == *token);
        if !holds_lease {
            return Err(StoreError::IsLocked(format!(
                "append to game {id} without a valid lease"
            )));
        }

        let expected = record
            .ticks
            .last()
            .map_or(0, |last| last.turn.saturating_add(1));
        if tick.turn != expected {
            return Err(StoreError::InvalidSequence(format!(
                "expected turn {expected}, got {}",
                tick.turn
            )));
        }

        record.ticks.push(tick.clone());
        Ok(())
    }

    /// Read a window of the tick history.
    ///
    /// `offset < 0` counts from the end; an offset at or past the end
    /// yields an empty vec; `limit == 0` means unlimited.
    pub async fn list_ticks(
        &self,
        id: &GameId,
        limit: usize,
        offset: i64,
    ) -> Result<Vec<Tick>, StoreError> {
        let games = self.games.lock().await;
        let record = games
            .get(id)
            .ok_or_else(|| StoreError::NotFound(format!("no game {id}")))?;

        let (start, end) = resolve_window(record.ticks.len(), limit, offset);
        Ok(record.ticks.get(start..end).unwrap_or_default().to_vec())
    }
}

/// Reject initial tick histories that do not form the contiguous sequence
/// 0, 1, 2, ...
fn validate_initial_ticks(ticks: &[Tick]) -> Result<(), StoreError> {
    for (i, tick) in ticks.iter().enumerate() {
        let expected = u32::try_from(i).unwrap_or(u32::MAX);
        if tick.turn != expected {
            return Err(StoreError::InvalidSequence(format!(
                "initial tick at position {i} has turn {}, expected {expected}",
                tick.turn
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use arena_types::{GameMode, Point, Snake, SnakeId, SnakeState};

    fn test_game(id: &str) -> Game {
        Game {
            id: GameId::from(id),
            width: 5,
            height: 5,
            status: GameStatus::Running,
            mode: GameMode::MultiPlayer,
            snake_timeout_ms: 500,
            created_at: Utc::now(),
        }
    }

    fn test_tick(turn: u32) -> Tick {
        Tick {
            turn,
            snakes: vec![Snake {
                id: SnakeId::from("s1"),
                name: "one".to_owned(),
                url: "http://localhost:9001".to_owned(),
                color: "#111111".to_owned(),
                state: SnakeState::Alive {
                    body: vec![Point::new(2, 2)],
                    health: 100,
                },
            }],
            food: vec![Point::new(0, 0)],
        }
    }

    async fn seeded_store() -> MemoryStore {
        let store = MemoryStore::default();
        store
            .create_game(&test_game("g1"), &[test_tick(0)])
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn lock_generates_a_token_when_none_supplied() {
        let store = seeded_store().await;
        let token = store.lock(&GameId::from("g1"), None).await.unwrap();
        assert!(!token.is_empty());
    }

    #[tokio::test]
    async fn second_locker_is_rejected() {
        let store = seeded_store().await;
        let id = GameId::from("g1");
        let _held = store.lock(&id, None).await.unwrap();
        let err = store.lock(&id, None).await.unwrap_err();
        assert!(err.is_locked());
    }

    #[tokio::test]
    async fn relock_with_same_token_renews() {
        let store = seeded_store().await;
        let id = GameId::from("g1");
        let token = store.lock(&id, None).await.unwrap();
        let renewed = store.lock(&id, Some(&token)).await.unwrap();
        assert_eq!(renewed, token);
    }

    #[tokio::test]
    async fn caller_supplied_token_is_stored_verbatim() {
        let store = seeded_store().await;
        let id = GameId::from("g1");
        let mine = LeaseToken::from("my-token");
        let granted = store.lock(&id, Some(&mine)).await.unwrap();
        assert_eq!(granted, mine);
    }

    #[tokio::test]
    async fn expired_lease_can_be_taken_over() {
        let store = MemoryStore::new(0);
        store
            .create_game(&test_game("g1"), &[test_tick(0)])
            .await
            .unwrap();
        let id = GameId::from("g1");
        let first = store.lock(&id, None).await.unwrap();
        // TTL 0: the first lease is expired the moment it is granted.
        let second = store.lock(&id, None).await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn unlock_is_a_noop_without_a_lock() {
        let store = seeded_store().await;
        store
            .unlock(&GameId::from("g1"), &LeaseToken::from("whatever"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn unlock_with_wrong_token_fails() {
        let store = seeded_store().await;
        let id = GameId::from("g1");
        let _held = store.lock(&id, None).await.unwrap();
        let err = store
            .unlock(&id, &LeaseToken::from("not-it"))
            .await
            .unwrap_err();
        assert!(err.is_locked());
    }

    #[tokio::test]
    async fn unlock_then_lock_succeeds() {
        let store = seeded_store().await;
        let id = GameId::from("g1");
        let token = store.lock(&id, None).await.unwrap();
        store.unlock(&id, &token).await.unwrap();
        store.lock(&id, None).await.unwrap();
    }

    #[tokio::test]
    async fn pop_skips_locked_and_non_running_games() {
        let store = MemoryStore::default();
        store
            .create_game(&test_game("locked"), &[test_tick(0)])
            .await
            .unwrap();
        store
            .create_game(&test_game("stopped"), &[test_tick(0)])
            .await
            .unwrap();
        store
            .create_game(&test_game("free"), &[test_tick(0)])
            .await
            .unwrap();

        store.lock(&GameId::from("locked"), None).await.unwrap();
        store
            .set_game_status(&GameId::from("stopped"), GameStatus::Complete)
            .await
            .unwrap();

        let popped = store.pop_game_id().await.unwrap();
        assert_eq!(popped, GameId::from("free"));
    }

    #[tokio::test]
    async fn pop_fails_when_nothing_is_runnable() {
        let store = MemoryStore::default();
        let err = store.pop_game_id().await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn push_requires_a_valid_lease() {
        let store = seeded_store().await;
        let id = GameId::from("g1");
        let err = store
            .push_tick(&id, &LeaseToken::from("nobody"), &test_tick(1))
            .await
            .unwrap_err();
        assert!(err.is_locked());
    }

    #[tokio::test]
    async fn push_enforces_contiguous_turns() {
        let store = seeded_store().await;
        let id = GameId::from("g1");
        let token = store.lock(&id, None).await.unwrap();

        store.push_tick(&id, &token, &test_tick(1)).await.unwrap();

        let gap = store.push_tick(&id, &token, &test_tick(3)).await.unwrap_err();
        assert!(matches!(gap, StoreError::InvalidSequence(_)));

        let dup = store.push_tick(&id, &token, &test_tick(1)).await.unwrap_err();
        assert!(matches!(dup, StoreError::InvalidSequence(_)));

        store.push_tick(&id, &token, &test_tick(2)).await.unwrap();
    }

    #[tokio::test]
    async fn push_after_terminal_status_is_rejected() {
        let store = seeded_store().await;
        let id = GameId::from("g1");
        let token = store.lock(&id, None).await.unwrap();
        store
            .set_game_status(&id, GameStatus::Complete)
            .await
            .unwrap();
        let err = store.push_tick(&id, &token, &test_tick(1)).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidSequence(_)));
    }

    #[tokio::test]
    async fn terminal_status_is_final() {
        let store = seeded_store().await;
        let id = GameId::from("g1");
        store
            .set_game_status(&id, GameStatus::Error)
            .await
            .unwrap();
        let err = store
            .set_game_status(&id, GameStatus::Running)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidSequence(_)));
    }

    #[tokio::test]
    async fn list_ticks_with_negative_offset_reads_from_the_end() {
        let store = seeded_store().await;
        let id = GameId::from("g1");
        let token = store.lock(&id, None).await.unwrap();
        for turn in 1..=9 {
            store.push_tick(&id, &token, &test_tick(turn)).await.unwrap();
        }

        // Last three ticks.
        let tail = store.list_ticks(&id, 0, -3).await.unwrap();
        let turns: Vec<u32> = tail.iter().map(|t| t.turn).collect();
        assert_eq!(turns, vec![7, 8, 9]);

        // |offset| larger than the history clamps to the start.
        let all = store.list_ticks(&id, 0, -100).await.unwrap();
        assert_eq!(all.len(), 10);

        // Positive offset past the end is empty, not an error.
        let none = store.list_ticks(&id, 0, 100).await.unwrap();
        assert!(none.is_empty());

        // Limit applies after offset resolution.
        let window = store.list_ticks(&id, 2, 4).await.unwrap();
        let turns: Vec<u32> = window.iter().map(|t| t.turn).collect();
        assert_eq!(turns, vec![4, 5]);
    }

    #[tokio::test]
    async fn list_ticks_for_missing_game_is_not_found() {
        let store = MemoryStore::default();
        let err = store
            .list_ticks(&GameId::from("nope"), 0, 0)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn create_rejects_non_contiguous_initial_ticks() {
        let store = MemoryStore::default();
        let err = store
            .create_game(&test_game("bad"), &[test_tick(1)])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidSequence(_)));
    }

    #[tokio::test]
    async fn twenty_racing_locks_admit_exactly_one_holder() {
        let store = seeded_store().await;
        let id = GameId::from("g1");

        let mut handles = Vec::new();
        for _ in 0..20 {
            let store = store.clone();
            let id = id.clone();
            handles.push(tokio::spawn(
                async move { store.lock(&id, None).await },
            ));
        }

        let mut granted = 0_u32;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                granted = granted.saturating_add(1);
            }
        }
        assert_eq!(granted, 1);
    }
}
