//! Board geometry: points, directions, and heading inference.
//!
//! The board uses screen coordinates: `(0, 0)` is the top-left cell and
//! "up" *decreases* `y`. Coordinates are signed so that an off-board head
//! (the wall-collision case) is representable before death evaluation runs.

use serde::{Deserialize, Serialize};

/// A cell on the board. Equality is exact coordinate match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Point {
    /// Column, increasing rightward.
    pub x: i32,
    /// Row, increasing downward.
    pub y: i32,
}

impl Point {
    /// Create a point from coordinates.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The adjacent cell one step in `direction`.
    pub const fn step(self, direction: Direction) -> Self {
        match direction {
            Direction::Up => Self::new(self.x, self.y.wrapping_sub(1)),
            Direction::Down => Self::new(self.x, self.y.wrapping_add(1)),
            Direction::Left => Self::new(self.x.wrapping_sub(1), self.y),
            Direction::Right => Self::new(self.x.wrapping_add(1), self.y),
        }
    }

    /// True when the point lies inside a `width` x `height` board,
    /// i.e. `0 <= x < width` and `0 <= y < height`.
    pub fn in_bounds(self, width: u32, height: u32) -> bool {
        let w = i64::from(width);
        let h = i64::from(height);
        i64::from(self.x) >= 0
            && i64::from(self.x) < w
            && i64::from(self.y) >= 0
            && i64::from(self.y) < h
    }
}

/// One of the four cardinal move directions.
///
/// Serialized lowercase to match the snake callout wire format
/// (`{"move": "up"}`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Toward smaller `y`.
    Up,
    /// Toward larger `y`.
    Down,
    /// Toward smaller `x`.
    Left,
    /// Toward larger `x`.
    Right,
}

impl Direction {
    /// The wire name of the direction.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

impl core::fmt::Display for Direction {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Infer a snake's current heading from its body.
///
/// The heading is the direction from the second segment toward the head.
/// A body with fewer than two distinct leading points (the stacked spawn
/// body, or a single-segment snake) has no heading yet and defaults to
/// [`Direction::Up`]. Diagonal or disjoint segments also fall back to up;
/// a well-formed body never produces them.
pub fn heading(body: &[Point]) -> Direction {
    let Some(head) = body.first() else {
        return Direction::Up;
    };
    let Some(neck) = body.get(1) else {
        return Direction::Up;
    };
    if head == neck {
        return Direction::Up;
    }
    if head.x > neck.x {
        Direction::Right
    } else if head.x < neck.x {
        Direction::Left
    } else if head.y < neck.y {
        Direction::Up
    } else {
        Direction::Down
    }
}
