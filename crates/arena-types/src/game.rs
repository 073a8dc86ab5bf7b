//! Games, ticks, and the game status state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geometry::Point;
use crate::ids::GameId;
use crate::snake::Snake;

/// Where a game is in its lifecycle.
///
/// The state machine is `Stopped -> Running -> {Complete, Error}`.
/// `Complete` and `Error` are terminal; no ticks may be appended after
/// either is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameStatus {
    /// Created but not yet started. Tick 0 exists.
    Stopped,
    /// Eligible to be popped and advanced by a worker.
    Running,
    /// Finished normally. Terminal.
    Complete,
    /// Ended by an unrecoverable simulation failure. Terminal.
    Error,
}

impl GameStatus {
    /// True for `Complete` and `Error`.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }
}

/// Game-over evaluation mode, fixed at creation from the snake count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameMode {
    /// One snake: the game is over when zero snakes remain alive.
    SinglePlayer,
    /// Two or more snakes: over when zero or one snake remains alive.
    MultiPlayer,
}

impl GameMode {
    /// Derive the mode from the number of participating snakes.
    pub const fn from_snake_count(count: usize) -> Self {
        if count <= 1 {
            Self::SinglePlayer
        } else {
            Self::MultiPlayer
        }
    }
}

/// Game metadata.
///
/// The ordered tick history belongs to the game but is stored and read
/// separately through the store's `push_tick` / `list_ticks` operations,
/// so this struct stays cheap to copy out of the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    /// Opaque game identifier; the lease key.
    pub id: GameId,
    /// Board width in cells. Positive.
    pub width: u32,
    /// Board height in cells. Positive.
    pub height: u32,
    /// Lifecycle status.
    pub status: GameStatus,
    /// Game-over evaluation mode.
    pub mode: GameMode,
    /// Advisory per-turn budget for snake move callouts, in milliseconds.
    pub snake_timeout_ms: u64,
    /// When the game was created.
    pub created_at: DateTime<Utc>,
}

/// One discrete simulation step: all snakes' and food's state at a turn.
///
/// Immutable once appended; turns within a game form the contiguous
/// sequence 0, 1, 2, ...
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tick {
    /// Turn number, starting at 0.
    pub turn: u32,
    /// All snakes (alive and dead) at this turn.
    pub snakes: Vec<Snake>,
    /// Food positions at this turn.
    pub food: Vec<Point>,
}

impl Tick {
    /// Iterate over the snakes still alive at this turn.
    pub fn alive_snakes(&self) -> impl Iterator<Item = &Snake> {
        self.snakes.iter().filter(|s| s.is_alive())
    }

    /// Number of snakes still alive at this turn.
    pub fn alive_count(&self) -> usize {
        self.alive_snakes().count()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses() {
        assert!(!GameStatus::Stopped.is_terminal());
        assert!(!GameStatus::Running.is_terminal());
        assert!(GameStatus::Complete.is_terminal());
        assert!(GameStatus::Error.is_terminal());
    }

    #[test]
    fn mode_from_snake_count() {
        assert_eq!(GameMode::from_snake_count(0), GameMode::SinglePlayer);
        assert_eq!(GameMode::from_snake_count(1), GameMode::SinglePlayer);
        assert_eq!(GameMode::from_snake_count(2), GameMode::MultiPlayer);
        assert_eq!(GameMode::from_snake_count(8), GameMode::MultiPlayer);
    }
}
