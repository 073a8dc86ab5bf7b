//! Worker pool and game driver for the Arena game server.
//!
//! Workers are the only writers of simulation state. The coordination
//! loop is pop → lock → heartbeat → drive → unlock; the lease makes the
//! "at most one writer per game" guarantee, and everything here is built
//! to lose that lease gracefully at any moment.

pub mod driver;
pub mod error;
pub mod worker;

pub use driver::{DriverOutcome, GameDriver};
pub use error::DriverError;
pub use worker::{WorkerConfig, WorkerPool};
