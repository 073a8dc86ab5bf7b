//! Snake callout wire payloads.
//!
//! Three endpoints relative to a snake's base URL, all POST with JSON
//! bodies of the same request shape:
//!
//! | Endpoint | Response |
//! |----------|----------|
//! | `/start` | optionally `{"color": "#aabbcc"}` |
//! | `/move`  | `{"move": "up" \| "down" \| "left" \| "right"}` |
//! | `/end`   | ignored |

use serde::{Deserialize, Serialize};

use crate::game::{Game, Tick};
use crate::geometry::{Direction, Point};
use crate::ids::{GameId, SnakeId};
use crate::snake::Snake;

/// The `game` object inside a callout request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRef {
    /// The game's identifier.
    pub id: GameId,
}

/// A snake as presented on the callout wire: no URL, no color, no
/// death bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireSnake {
    /// Snake identifier.
    pub id: SnakeId,
    /// Display name.
    pub name: String,
    /// Health in `[0, 100]`.
    pub health: u8,
    /// Body cells, head first.
    pub body: Vec<Point>,
}

impl From<&Snake> for WireSnake {
    fn from(snake: &Snake) -> Self {
        Self {
            id: snake.id.clone(),
            name: snake.name.clone(),
            health: snake.health(),
            body: snake.body().to_vec(),
        }
    }
}

/// The board as presented on the callout wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireBoard {
    /// Board width in cells.
    pub width: u32,
    /// Board height in cells.
    pub height: u32,
    /// Food positions.
    pub food: Vec<Point>,
    /// Snakes still alive this turn.
    pub snakes: Vec<WireSnake>,
}

/// Request body shared by `/start`, `/move`, and `/end`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalloutRequest {
    /// The game being played.
    pub game: GameRef,
    /// Current turn number.
    pub turn: u32,
    /// The full visible board.
    pub board: WireBoard,
    /// The snake this request is addressed to.
    pub you: WireSnake,
}

impl CalloutRequest {
    /// Build the request payload for one snake from a stored tick.
    ///
    /// Only alive snakes appear on the board; dead snakes' frozen bodies
    /// are not obstacles and are not shown.
    pub fn for_snake(game: &Game, tick: &Tick, you: &Snake) -> Self {
        Self {
            game: GameRef {
                id: game.id.clone(),
            },
            turn: tick.turn,
            board: WireBoard {
                width: game.width,
                height: game.height,
                food: tick.food.clone(),
                snakes: tick.alive_snakes().map(WireSnake::from).collect(),
            },
            you: WireSnake::from(you),
        }
    }
}

/// Response body of `/start`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartResponse {
    /// Requested display color, e.g. `"#ff8800"`. Optional; the server
    /// falls back to its palette.
    #[serde(default)]
    pub color: Option<String>,
}

/// Response body of `/move`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveResponse {
    /// The requested direction for this turn.
    #[serde(rename = "move")]
    pub direction: Direction,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::game::{GameMode, GameStatus};
    use crate::snake::SnakeState;
    use chrono::Utc;

    fn fixture() -> (Game, Tick) {
        let game = Game {
            id: GameId::from("g-1"),
            width: 5,
            height: 5,
            status: GameStatus::Running,
            mode: GameMode::MultiPlayer,
            snake_timeout_ms: 500,
            created_at: Utc::now(),
        };
        let alive = Snake {
            id: SnakeId::from("s1"),
            name: "one".to_owned(),
            url: "http://localhost:9001".to_owned(),
            color: "#111111".to_owned(),
            state: SnakeState::Alive {
                body: vec![Point::new(1, 1)],
                health: 90,
            },
        };
        let dead = Snake {
            id: SnakeId::from("s2"),
            name: "two".to_owned(),
            url: "http://localhost:9002".to_owned(),
            color: "#222222".to_owned(),
            state: SnakeState::Dead {
                body: vec![Point::new(3, 3)],
                health: 0,
                cause: crate::snake::DeathCause::Starvation,
                turn: 2,
            },
        };
        let tick = Tick {
            turn: 3,
            snakes: vec![alive, dead],
            food: vec![Point::new(0, 4)],
        };
        (game, tick)
    }

    #[test]
    fn dead_snakes_do_not_appear_on_the_wire_board() {
        let (game, tick) = fixture();
        let you = tick.snakes.first().unwrap();
        let req = CalloutRequest::for_snake(&game, &tick, you);
        assert_eq!(req.board.snakes.len(), 1);
        assert_eq!(req.you.id, SnakeId::from("s1"));
        assert_eq!(req.turn, 3);
    }

    #[test]
    fn move_response_uses_the_move_key() {
        let resp: MoveResponse = serde_json::from_str(r#"{"move": "left"}"#).unwrap();
        assert_eq!(resp.direction, Direction::Left);
        let json = serde_json::to_string(&resp).unwrap();
        assert_eq!(json, r#"{"move":"left"}"#);
    }

    #[test]
    fn start_response_color_is_optional() {
        let resp: StartResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(resp.color, None);
        let resp: StartResponse = serde_json::from_str(r##"{"color": "#abc123"}"##).unwrap();
        assert_eq!(resp.color.as_deref(), Some("#abc123"));
    }
}
