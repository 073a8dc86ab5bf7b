//! Errors from the simulation engine.
//!
//! An engine error is fatal to its game: the driver sets status Error and
//! never retries. Everything recoverable (bad snake responses, crowded
//! food placement) is handled inline and never surfaces here.

use arena_types::SnakeId;

/// Errors that can occur while computing a tick.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// A snake's body was empty, which no well-formed tick produces.
    #[error("snake {snake_id} has an empty body")]
    EmptyBody {
        /// The malformed snake.
        snake_id: SnakeId,
    },

    /// The turn counter would overflow.
    #[error("turn counter overflow past {turn}")]
    TurnOverflow {
        /// The last representable turn.
        turn: u32,
    },

    /// The board cannot hold the requested snakes and food.
    #[error("board {width}x{height} too small for {snakes} snakes and {food} food")]
    BoardFull {
        /// Board width.
        width: u32,
        /// Board height.
        height: u32,
        /// Requested snake count.
        snakes: usize,
        /// Requested food count.
        food: u32,
    },

    /// A game was created with no snakes.
    #[error("a game needs at least one snake")]
    NoSnakes,

    /// A board dimension was zero.
    #[error("board dimensions must be positive, got {width}x{height}")]
    InvalidBoard {
        /// Requested width.
        width: u32,
        /// Requested height.
        height: u32,
    },
}
