//! Arena game server binary.
//!
//! A single process can play any combination of two roles:
//!
//! - **controller**: the HTTP facade over the store (game lifecycle,
//!   leases, tick history),
//! - **worker**: the pool that claims Running games and simulates them.
//!
//! Both roles are on by default against the in-memory store, which gives
//! a complete single-process server. Pointing the store at Redis or
//! `PostgreSQL` (or at another controller via the `remote` backend) lets
//! the roles be split across processes.
//!
//! # Startup sequence
//!
//! 1. Initialize structured logging (tracing)
//! 2. Load configuration from `arena-config.yaml`
//! 3. Connect the configured store backend (chaos-wrapped if asked)
//! 4. Spawn the worker pool
//! 5. Serve the controller API until terminated

mod config;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use tracing_subscriber::EnvFilter;

use arena_callout::{HttpSnakeClient, SnakeClient};
use arena_controller::{AppState, ServerConfig, start_server};
use arena_store::{ChaosStore, GameStore, MemoryStore, PostgresStore, RedisStore, RemoteStore};
use arena_worker::{WorkerConfig, WorkerPool};

use crate::config::{ArenaConfig, BackendType, StoreSection};

/// Default configuration file path, relative to the working directory.
const CONFIG_PATH: &str = "arena-config.yaml";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("arena-server starting");

    let config = load_config()?;
    info!(
        backend = ?config.store.backend,
        chaos = config.store.chaos,
        serve_api = config.server.enabled,
        workers = if config.worker.enabled { config.worker.workers } else { 0 },
        "configuration loaded"
    );

    let store = Arc::new(build_store(&config.store).await?);
    info!(backend = store.backend_name(), "store connected");

    let client = SnakeClient::Http(HttpSnakeClient::new());

    let mut worker_handles = Vec::new();
    if config.worker.enabled {
        let pool = WorkerPool::new(
            Arc::clone(&store),
            client.clone(),
            WorkerConfig {
                workers: config.worker.workers,
                poll_interval: Duration::from_millis(config.worker.poll_interval_ms),
                heartbeat_interval: Duration::from_millis(config.worker.heartbeat_interval_ms),
            },
        );
        worker_handles = pool.spawn();
        info!(workers = worker_handles.len(), "worker pool running");
    }

    if config.server.enabled {
        let server_config = ServerConfig {
            host: config.server.host.clone(),
            port: config.server.port,
        };
        let state = Arc::new(AppState::new(Arc::clone(&store), client));
        start_server(&server_config, state).await?;
    } else {
        info!("controller disabled, running workers only");
        tokio::signal::ctrl_c().await?;
    }

    for handle in worker_handles {
        handle.abort();
    }
    info!("arena-server stopped");
    Ok(())
}

/// Load `arena-config.yaml` when present, defaults otherwise.
fn load_config() -> Result<ArenaConfig, config::ConfigError> {
    let path = Path::new(CONFIG_PATH);
    if path.exists() {
        ArenaConfig::from_file(path)
    } else {
        info!(path = CONFIG_PATH, "no config file, using defaults");
        Ok(ArenaConfig::default())
    }
}

/// Connect the configured backend, applying the chaos wrapper if asked.
async fn build_store(section: &StoreSection) -> Result<GameStore, Box<dyn std::error::Error>> {
    let store = match section.backend {
        BackendType::Memory => GameStore::Memory(MemoryStore::new(section.lease_ttl_ms)),
        BackendType::Redis => {
            GameStore::Redis(RedisStore::connect(&section.redis_url, section.lease_ttl_ms).await?)
        }
        BackendType::Postgres => GameStore::Postgres(
            PostgresStore::connect(&section.postgres_url, section.lease_ttl_ms).await?,
        ),
        BackendType::Remote => GameStore::Remote(RemoteStore::new(&section.controller_url)),
    };
    if section.chaos {
        return Ok(GameStore::Chaos(ChaosStore::new(store)));
    }
    Ok(store)
}
