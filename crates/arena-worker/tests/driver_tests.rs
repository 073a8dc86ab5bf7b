//! End-to-end tests for the driver and worker pool against the in-memory
//! store and the stub snake client. No sockets, no external services.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::watch;

use arena_callout::{SnakeClient, StubSnakeClient};
use arena_engine::{SnakeSeed, initial_tick};
use arena_store::{GameStore, MemoryStore};
use arena_types::{
    DEFAULT_LEASE_TTL_MS, Direction, Game, GameId, GameMode, GameStatus, LeaseToken, SnakeId,
};
use arena_worker::{DriverOutcome, GameDriver, WorkerConfig, WorkerPool};

/// Seed the store with a 5x5, 2-snake, 5-food game and return its id.
async fn seed_game(store: &GameStore, status: GameStatus) -> GameId {
    let seeds: Vec<SnakeSeed> = (0..2)
        .map(|i| SnakeSeed {
            id: SnakeId::from(format!("s{i}")),
            name: format!("snake-{i}"),
            url: format!("stub://snake-{i}"),
            color: "#2196f3".to_owned(),
        })
        .collect();
    let mut rng = StdRng::seed_from_u64(99);
    let tick0 = initial_tick(5, 5, 5, &seeds, &mut rng).unwrap();

    let game = Game {
        id: GameId::from("e2e-game"),
        width: 5,
        height: 5,
        status,
        mode: GameMode::MultiPlayer,
        snake_timeout_ms: 100,
        created_at: Utc::now(),
    };
    store.create_game(&game, &[tick0]).await.unwrap();
    game.id
}

fn memory_store() -> Arc<GameStore> {
    Arc::new(GameStore::Memory(MemoryStore::new(DEFAULT_LEASE_TTL_MS)))
}

fn stub_client() -> SnakeClient {
    SnakeClient::Stub(StubSnakeClient::new(Direction::Up))
}

#[tokio::test]
async fn driver_runs_a_game_to_completion() {
    let store = memory_store();
    let id = seed_game(&store, GameStatus::Running).await;
    let token = store.lock(&id, None).await.unwrap();
    let (_cancel_tx, cancel_rx) = watch::channel(false);

    let driver = GameDriver::new(Arc::clone(&store), stub_client());
    let outcome = driver.drive(&id, &token, &cancel_rx).await.unwrap();
    assert_eq!(outcome, DriverOutcome::Finished);

    let game = store.get_game(&id).await.unwrap();
    assert_eq!(game.status, GameStatus::Complete);

    // Snakes marching up on a 5x5 board cannot outlive the board height
    // plus their starting health.
    let ticks = store.list_ticks(&id, 0, 0).await.unwrap();
    let last = ticks.last().unwrap();
    assert_eq!(ticks.len(), usize::try_from(last.turn).unwrap() + 1);
    assert!(last.turn <= 6, "terminal by wall collision, got {}", last.turn);
    assert!(last.alive_count() <= 1);
    // Contiguous history.
    for (i, tick) in ticks.iter().enumerate() {
        assert_eq!(usize::try_from(tick.turn).unwrap(), i);
    }
}

#[tokio::test]
async fn failing_callouts_fall_back_to_continuing_straight() {
    let store = memory_store();
    let id = seed_game(&store, GameStatus::Running).await;
    let token = store.lock(&id, None).await.unwrap();
    let (_cancel_tx, cancel_rx) = watch::channel(false);

    // Every callout fails; snakes keep their default heading (up) and the
    // game still ends at the wall.
    let driver = GameDriver::new(
        Arc::clone(&store),
        SnakeClient::Stub(StubSnakeClient::broken()),
    );
    let outcome = driver.drive(&id, &token, &cancel_rx).await.unwrap();
    assert_eq!(outcome, DriverOutcome::Finished);
    let game = store.get_game(&id).await.unwrap();
    assert_eq!(game.status, GameStatus::Complete);
}

#[tokio::test]
async fn driver_observes_cancellation_before_advancing() {
    let store = memory_store();
    let id = seed_game(&store, GameStatus::Running).await;
    let token = store.lock(&id, None).await.unwrap();
    let (cancel_tx, cancel_rx) = watch::channel(false);
    cancel_tx.send(true).unwrap();

    let driver = GameDriver::new(Arc::clone(&store), stub_client());
    let outcome = driver.drive(&id, &token, &cancel_rx).await.unwrap();
    assert_eq!(outcome, DriverOutcome::Cancelled);

    // Nothing was appended and the game is still claimable.
    let game = store.get_game(&id).await.unwrap();
    assert_eq!(game.status, GameStatus::Running);
    let ticks = store.list_ticks(&id, 0, 0).await.unwrap();
    assert_eq!(ticks.len(), 1);
}

#[tokio::test]
async fn stale_token_ends_the_drive_as_lease_lost() {
    let store = memory_store();
    let id = seed_game(&store, GameStatus::Running).await;
    // Someone else holds the lease; we drive with a token that was never
    // granted.
    let _holder = store.lock(&id, None).await.unwrap();
    let stale = LeaseToken::from("stale-token");
    let (_cancel_tx, cancel_rx) = watch::channel(false);

    let driver = GameDriver::new(Arc::clone(&store), stub_client());
    let outcome = driver.drive(&id, &stale, &cancel_rx).await.unwrap();
    assert_eq!(outcome, DriverOutcome::LeaseLost);

    let game = store.get_game(&id).await.unwrap();
    assert_eq!(game.status, GameStatus::Running);
}

#[tokio::test]
async fn worker_pool_drives_a_game_to_terminal_status() {
    let store = memory_store();
    let id = seed_game(&store, GameStatus::Running).await;

    let pool = WorkerPool::new(
        Arc::clone(&store),
        stub_client(),
        WorkerConfig {
            workers: 2,
            poll_interval: Duration::from_millis(10),
            heartbeat_interval: Duration::from_millis(50),
        },
    );
    let handles = pool.spawn();

    let finished = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let game = store.get_game(&id).await.unwrap();
            if game.status.is_terminal() {
                return game.status;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("game did not reach a terminal status in time");

    assert_eq!(finished, GameStatus::Complete);
    for handle in handles {
        handle.abort();
    }
}
