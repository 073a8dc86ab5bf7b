//! Controller API request/response bodies.
//!
//! These DTOs are shared between the controller's axum handlers and the
//! remote store client so the two sides cannot drift. The lease token is
//! *not* part of any body; it travels in the `X-Lease-Token` request
//! header (request metadata, per the coordination contract).

use serde::{Deserialize, Serialize};

use crate::game::GameStatus;
use crate::ids::{GameId, LeaseToken};

/// Name of the request header carrying the lease token.
pub const LEASE_TOKEN_HEADER: &str = "x-lease-token";

/// A snake to include in a new game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnakeSpec {
    /// Display name.
    pub name: String,
    /// Base URL for the snake's callout endpoints.
    pub url: String,
}

/// Body of `POST /api/games`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateGameRequest {
    /// Board width in cells. Must be positive.
    pub width: u32,
    /// Board height in cells. Must be positive.
    pub height: u32,
    /// Number of food items to place initially.
    #[serde(default)]
    pub food: u32,
    /// Advisory per-turn callout budget in milliseconds.
    #[serde(default)]
    pub snake_timeout_ms: Option<u64>,
    /// The participating snakes. Must be non-empty.
    pub snakes: Vec<SnakeSpec>,
}

/// Response of `POST /api/games`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateGameResponse {
    /// The created game's identifier.
    pub id: GameId,
}

/// Response of `POST /api/games/{id}/lock`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockResponse {
    /// The token actually stored (generated when the caller sent none).
    pub token: LeaseToken,
}

/// Response of `POST /api/games/pop`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopResponse {
    /// A Running game id with no valid lock.
    pub id: GameId,
}

/// Body of `PUT /api/games/{id}/status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRequest {
    /// The status to set.
    pub status: GameStatus,
}

/// Response of `GET /api/ping`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PingResponse {
    /// Server version string.
    pub version: String,
}

/// Query parameters of `GET /api/games/{id}/ticks`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicksQuery {
    /// Maximum number of ticks to return; 0 or absent means unlimited.
    #[serde(default)]
    pub limit: Option<usize>,
    /// Start position; negative counts from the end of the history.
    #[serde(default)]
    pub offset: Option<i64>,
}

/// Machine-readable error category, mirrored from the store error taxonomy
/// so remote callers can reconstruct it from an HTTP response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// No such game, or no poppable game.
    NotFound,
    /// A valid lease is held under a different token.
    IsLocked,
    /// Tick append out of order, or append to a finished game.
    InvalidSequence,
    /// Malformed request (bad body, missing token header).
    InvalidRequest,
    /// Backend or internal failure.
    Internal,
}

/// JSON error body returned by every failing controller endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable message.
    pub error: String,
    /// Stable machine-readable category.
    pub code: ErrorCode,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_are_snake_case_on_the_wire() {
        let json = serde_json::to_string(&ErrorCode::InvalidSequence).unwrap();
        assert_eq!(json, "\"invalid_sequence\"");
        let back: ErrorCode = serde_json::from_str("\"is_locked\"").unwrap();
        assert_eq!(back, ErrorCode::IsLocked);
    }

    #[test]
    fn create_request_defaults() {
        let req: CreateGameRequest = serde_json::from_str(
            r#"{"width": 11, "height": 11, "snakes": [{"name": "a", "url": "http://localhost:1"}]}"#,
        )
        .unwrap();
        assert_eq!(req.food, 0);
        assert_eq!(req.snake_timeout_ms, None);
        assert_eq!(req.snakes.len(), 1);
    }
}
