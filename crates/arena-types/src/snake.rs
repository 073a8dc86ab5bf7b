//! Snake state: body, health, and the alive/dead tagged variant.
//!
//! A snake's mutable state is a tagged enum rather than an optional `death`
//! field: once a snake is [`SnakeState::Dead`] its body and health are
//! frozen structurally, so later ticks can only carry them forward
//! unchanged.

use serde::{Deserialize, Serialize};

use crate::geometry::Point;
use crate::ids::SnakeId;

/// Maximum (and starting) snake health. Health is clamped to `[0, 100]`.
pub const MAX_HEALTH: u8 = 100;

/// Why a snake died. One cause per snake per tick; the first matching
/// cause in evaluation order wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeathCause {
    /// Health reached 0. Always wins over any other cause that tick.
    Starvation,
    /// Head moved outside the board.
    WallCollision,
    /// Head met another snake's head and this snake was not strictly longer.
    HeadToHeadCollision,
    /// Head landed on another snake's body segment.
    SnakeCollision,
}

impl core::fmt::Display for DeathCause {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Self::Starvation => "starvation",
            Self::WallCollision => "wall collision",
            Self::HeadToHeadCollision => "head-to-head collision",
            Self::SnakeCollision => "snake collision",
        };
        write!(f, "{name}")
    }
}

/// The mutable per-tick state of a snake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SnakeState {
    /// The snake is alive and moves each tick.
    Alive {
        /// Body cells, head first, tail last. Never empty.
        body: Vec<Point>,
        /// Health in `[0, 100]`.
        health: u8,
    },
    /// The snake died. Body and health are frozen at their values from the
    /// tick the death occurred.
    Dead {
        /// Frozen body cells.
        body: Vec<Point>,
        /// Frozen health.
        health: u8,
        /// Why the snake died.
        cause: DeathCause,
        /// The turn on which the snake died.
        turn: u32,
    },
}

/// A snake participating in a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snake {
    /// Identifier, unique within the game.
    pub id: SnakeId,
    /// Display name.
    pub name: String,
    /// Base URL for the snake's callout endpoints (`/start`, `/move`, `/end`).
    pub url: String,
    /// Display color, from the `/start` response or the default palette.
    pub color: String,
    /// Alive/dead state, body, and health.
    pub state: SnakeState,
}

impl Snake {
    /// The snake's body cells, head first.
    pub fn body(&self) -> &[Point] {
        match &self.state {
            SnakeState::Alive { body, .. } | SnakeState::Dead { body, .. } => body,
        }
    }

    /// The snake's current (or frozen) health.
    pub const fn health(&self) -> u8 {
        match &self.state {
            SnakeState::Alive { health, .. } | SnakeState::Dead { health, .. } => *health,
        }
    }

    /// True while the snake has not died.
    pub const fn is_alive(&self) -> bool {
        matches!(self.state, SnakeState::Alive { .. })
    }

    /// The head cell, if the body is non-empty.
    pub fn head(&self) -> Option<Point> {
        self.body().first().copied()
    }

    /// Body length in segments.
    pub fn len(&self) -> usize {
        self.body().len()
    }

    /// True when the body is empty. A well-formed snake never is.
    pub fn is_empty(&self) -> bool {
        self.body().is_empty()
    }

    /// The death cause and turn, if the snake is dead.
    pub const fn death(&self) -> Option<(DeathCause, u32)> {
        match &self.state {
            SnakeState::Alive { .. } => None,
            SnakeState::Dead { cause, turn, .. } => Some((*cause, *turn)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn snake(state: SnakeState) -> Snake {
        Snake {
            id: SnakeId::from("s1"),
            name: "test".to_owned(),
            url: "http://localhost:9000".to_owned(),
            color: "#3f51b5".to_owned(),
            state,
        }
    }

    #[test]
    fn alive_accessors() {
        let s = snake(SnakeState::Alive {
            body: vec![Point::new(1, 1), Point::new(1, 2)],
            health: 80,
        });
        assert!(s.is_alive());
        assert_eq!(s.health(), 80);
        assert_eq!(s.head(), Some(Point::new(1, 1)));
        assert_eq!(s.len(), 2);
        assert_eq!(s.death(), None);
    }

    #[test]
    fn dead_state_carries_cause_and_turn() {
        let s = snake(SnakeState::Dead {
            body: vec![Point::new(0, 0)],
            health: 0,
            cause: DeathCause::Starvation,
            turn: 7,
        });
        assert!(!s.is_alive());
        assert_eq!(s.death(), Some((DeathCause::Starvation, 7)));
    }

    #[test]
    fn state_tag_round_trips() {
        let s = snake(SnakeState::Alive {
            body: vec![Point::new(0, 0)],
            health: 100,
        });
        let json = serde_json::to_string(&s).unwrap();
        assert!(json.contains("\"state\":\"alive\""));
        let back: Snake = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }
}
