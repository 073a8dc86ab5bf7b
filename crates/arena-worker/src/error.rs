//! Errors from the game driver.
//!
//! Recoverable conditions (lease lost, no poppable game, per-snake callout
//! failures) never surface here; they are outcomes or fallbacks. What is
//! left is genuinely fatal to the current game.

use arena_engine::EngineError;
use arena_store::StoreError;

/// Fatal failures while driving a game.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    /// A store operation failed for a reason other than a lost lease.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The simulation could not advance. The game's status is set to
    /// Error before this is returned.
    #[error(transparent)]
    Engine(#[from] EngineError),
}
