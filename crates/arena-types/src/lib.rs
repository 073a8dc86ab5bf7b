//! Shared type definitions for the Arena game server.
//!
//! This crate is the single source of truth for the data model that flows
//! between the lease store, the controller, the workers, and the snake
//! callout client.
//!
//! # Modules
//!
//! - [`ids`] -- Opaque string identifiers (game ids, snake ids, lease tokens)
//! - [`geometry`] -- Points, directions, and heading inference
//! - [`snake`] -- Snake state with the alive/dead tagged variant
//! - [`game`] -- Games, ticks, and the status state machine
//! - [`lease`] -- Time-bounded exclusive leases
//! - [`wire`] -- Snake callout protocol payloads
//! - [`api`] -- Controller API request/response bodies

pub mod api;
pub mod game;
pub mod geometry;
pub mod ids;
pub mod lease;
pub mod snake;
pub mod wire;

// Re-export the core model at the crate root for convenience.
pub use game::{Game, GameMode, GameStatus, Tick};
pub use geometry::{Direction, Point, heading};
pub use ids::{GameId, LeaseToken, SnakeId};
pub use lease::{DEFAULT_LEASE_TTL_MS, Lease};
pub use snake::{DeathCause, MAX_HEALTH, Snake, SnakeState};
