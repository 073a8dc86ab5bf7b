//! Endpoint handlers for the controller API.
//!
//! Most handlers are thin adapters from HTTP onto the store contract; the
//! one piece of real logic here is game creation, which runs the engine's
//! placement to build tick 0 before anything is stored.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/api/ping` | Version string |
//! | `POST` | `/api/games` | Create a game (placement runs here) |
//! | `POST` | `/api/games/raw` | Store pre-built game + ticks |
//! | `GET` | `/api/games/{id}` | Game metadata |
//! | `PUT` | `/api/games/{id}/status` | Set lifecycle status |
//! | `POST` | `/api/games/{id}/start` | Mark Running |
//! | `POST` | `/api/games/{id}/end` | Mark Complete, send end callouts |
//! | `POST` | `/api/games/pop` | Pop an unclaimed runnable game id |
//! | `POST` | `/api/games/{id}/lock` | Acquire/renew the lease |
//! | `POST` | `/api/games/{id}/unlock` | Release the lease |
//! | `POST` | `/api/games/{id}/ticks` | Append a tick under the lease |
//! | `GET` | `/api/games/{id}/ticks` | Read a tick window |

use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use chrono::Utc;

use arena_engine::{SnakeSeed, initial_tick};
use arena_types::api::{
    CreateGameRequest, CreateGameResponse, LEASE_TOKEN_HEADER, LockResponse, PingResponse,
    PopResponse, StatusRequest, TicksQuery,
};
use arena_types::wire::CalloutRequest;
use arena_types::{Game, GameId, GameMode, GameStatus, LeaseToken, SnakeId, Tick};

use crate::error::ControllerError;
use crate::state::AppState;

/// Callout budget applied when a create request does not set one.
const DEFAULT_SNAKE_TIMEOUT_MS: u64 = 500;

/// Body of `POST /api/games/raw`: metadata and history built elsewhere.
#[derive(Debug, serde::Deserialize)]
pub struct RawCreateRequest {
    /// The game metadata to store.
    pub game: Game,
    /// The initial tick history, turn 0 first.
    pub ticks: Vec<Tick>,
}

/// `GET /api/ping`
pub async fn ping() -> Json<PingResponse> {
    Json(PingResponse {
        version: env!("CARGO_PKG_VERSION").to_owned(),
    })
}

/// `POST /api/games`
///
/// Validates the request, colors the snakes (request order, palette
/// fallback), places them with the engine, and stores the game Stopped
/// with its turn-0 tick.
pub async fn create_game(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateGameRequest>,
) -> Result<Json<CreateGameResponse>, ControllerError> {
    if request.width == 0 || request.height == 0 {
        return Err(ControllerError::InvalidRequest(format!(
            "board dimensions must be positive, got {}x{}",
            request.width, request.height
        )));
    }
    if request.snakes.is_empty() {
        return Err(ControllerError::InvalidRequest(
            "a game needs at least one snake".to_owned(),
        ));
    }

    let seeds: Vec<SnakeSeed> = {
        let mut palette = state.palette.lock().await;
        request
            .snakes
            .iter()
            .map(|spec| SnakeSeed {
                id: SnakeId::generate(),
                name: spec.name.clone(),
                url: spec.url.clone(),
                color: palette.next_color(),
            })
            .collect()
    };

    let tick0 = {
        let mut rng = rand::rng();
        initial_tick(request.width, request.height, request.food, &seeds, &mut rng)
            .map_err(|e| ControllerError::InvalidRequest(e.to_string()))?
    };

    let game = Game {
        id: GameId::generate(),
        width: request.width,
        height: request.height,
        status: GameStatus::Stopped,
        mode: GameMode::from_snake_count(request.snakes.len()),
        snake_timeout_ms: request.snake_timeout_ms.unwrap_or(DEFAULT_SNAKE_TIMEOUT_MS),
        created_at: Utc::now(),
    };

    state.store.create_game(&game, &[tick0]).await?;
    tracing::info!(
        game_id = %game.id,
        width = game.width,
        height = game.height,
        snakes = request.snakes.len(),
        "game created"
    );
    Ok(Json(CreateGameResponse { id: game.id }))
}

/// `POST /api/games/raw`
pub async fn create_game_raw(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RawCreateRequest>,
) -> Result<Json<CreateGameResponse>, ControllerError> {
    state.store.create_game(&request.game, &request.ticks).await?;
    Ok(Json(CreateGameResponse {
        id: request.game.id,
    }))
}

/// `GET /api/games/{id}`
pub async fn get_game(
    State(state): State<Arc<AppState>>,
    Path(id): Path<GameId>,
) -> Result<Json<Game>, ControllerError> {
    Ok(Json(state.store.get_game(&id).await?))
}

/// `PUT /api/games/{id}/status`
pub async fn set_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<GameId>,
    Json(request): Json<StatusRequest>,
) -> Result<(), ControllerError> {
    state.store.set_game_status(&id, request.status).await?;
    Ok(())
}

/// `POST /api/games/{id}/start` -- convenience for marking a game Running.
pub async fn start_game(
    State(state): State<Arc<AppState>>,
    Path(id): Path<GameId>,
) -> Result<(), ControllerError> {
    state.store.set_game_status(&id, GameStatus::Running).await?;
    tracing::info!(game_id = %id, "game started");
    Ok(())
}

/// `POST /api/games/{id}/end` -- mark a game Complete and tell every
/// snake on its final board. A worker that still holds the game observes
/// the terminal status at its next tick boundary and stops without
/// sending a second round of callouts.
pub async fn end_game(
    State(state): State<Arc<AppState>>,
    Path(id): Path<GameId>,
) -> Result<(), ControllerError> {
    state.store.set_game_status(&id, GameStatus::Complete).await?;
    send_end_callouts(&state, &id).await;
    tracing::info!(game_id = %id, "game ended");
    Ok(())
}

/// Deliver `/end` callouts for the game's last stored tick. Callout
/// failures are logged and swallowed: the game is over whether or not a
/// snake hears about it.
async fn send_end_callouts(state: &AppState, id: &GameId) {
    let (game, tick) = match tokio::try_join!(
        state.store.get_game(id),
        state.store.list_ticks(id, 1, -1),
    ) {
        Ok((game, mut ticks)) => match ticks.pop() {
            Some(tick) => (game, tick),
            None => return,
        },
        Err(e) => {
            tracing::debug!(game_id = %id, error = %e, "skipping end callouts");
            return;
        }
    };
    let timeout = Duration::from_millis(game.snake_timeout_ms);
    let game = &game;
    let callouts = tick.snakes.iter().map(|snake| {
        let request = CalloutRequest::for_snake(game, &tick, snake);
        let client = state.client.clone();
        async move {
            if let Err(e) = client.end(&snake.url, &request, timeout).await {
                tracing::debug!(game_id = %game.id, snake_id = %snake.id, error = %e, "end callout failed");
            }
        }
    });
    futures::future::join_all(callouts).await;
}

/// `POST /api/games/pop`
pub async fn pop_game(
    State(state): State<Arc<AppState>>,
) -> Result<Json<PopResponse>, ControllerError> {
    let id = state.store.pop_game_id().await?;
    Ok(Json(PopResponse { id }))
}

/// `POST /api/games/{id}/lock`
///
/// The token header is optional here: absent means "grant me a fresh
/// token", present means "renew (or adopt) this token".
pub async fn lock_game(
    State(state): State<Arc<AppState>>,
    Path(id): Path<GameId>,
    headers: HeaderMap,
) -> Result<Json<LockResponse>, ControllerError> {
    let token = optional_token(&headers)?;
    let granted = state.store.lock(&id, token.as_ref()).await?;
    Ok(Json(LockResponse { token: granted }))
}

/// `POST /api/games/{id}/unlock`
pub async fn unlock_game(
    State(state): State<Arc<AppState>>,
    Path(id): Path<GameId>,
    headers: HeaderMap,
) -> Result<(), ControllerError> {
    let token = required_token(&headers)?;
    state.store.unlock(&id, &token).await?;
    Ok(())
}

/// `POST /api/games/{id}/ticks`
pub async fn push_tick(
    State(state): State<Arc<AppState>>,
    Path(id): Path<GameId>,
    headers: HeaderMap,
    Json(tick): Json<Tick>,
) -> Result<(), ControllerError> {
    let token = required_token(&headers)?;
    state.store.push_tick(&id, &token, &tick).await?;
    Ok(())
}

/// `GET /api/games/{id}/ticks`
pub async fn list_ticks(
    State(state): State<Arc<AppState>>,
    Path(id): Path<GameId>,
    Query(query): Query<TicksQuery>,
) -> Result<Json<Vec<Tick>>, ControllerError> {
    let limit = query.limit.unwrap_or(0);
    let offset = query.offset.unwrap_or(0);
    Ok(Json(state.store.list_ticks(&id, limit, offset).await?))
}

fn optional_token(headers: &HeaderMap) -> Result<Option<LeaseToken>, ControllerError> {
    match headers.get(LEASE_TOKEN_HEADER) {
        None => Ok(None),
        Some(value) => {
            let token = value.to_str().map_err(|_| ControllerError::MissingToken)?;
            if token.is_empty() {
                return Ok(None);
            }
            Ok(Some(LeaseToken::from(token)))
        }
    }
}

fn required_token(headers: &HeaderMap) -> Result<LeaseToken, ControllerError> {
    optional_token(headers)?.ok_or(ControllerError::MissingToken)
}
