//! Integration tests for the controller API endpoints.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server, against the in-memory store backend. This
//! validates handler logic, routing, and the error mapping without a
//! live network connection.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use arena_callout::{SnakeClient, StubSnakeClient};
use arena_controller::build_router;
use arena_controller::state::AppState;
use arena_store::{GameStore, MemoryStore};
use arena_types::{DEFAULT_LEASE_TTL_MS, Direction};
use arena_types::api::LEASE_TOKEN_HEADER;

fn make_router() -> axum::Router {
    make_router_with_client(SnakeClient::Stub(StubSnakeClient::new(Direction::Up)))
}

fn make_router_with_client(client: SnakeClient) -> axum::Router {
    let store = Arc::new(GameStore::Memory(MemoryStore::new(DEFAULT_LEASE_TTL_MS)));
    build_router(Arc::new(AppState::new(store, client)))
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn create_body(snakes: usize) -> String {
    let snakes: Vec<Value> = (0..snakes)
        .map(|i| json!({"name": format!("snake-{i}"), "url": format!("http://localhost:90{i:02}")}))
        .collect();
    json!({"width": 11, "height": 11, "food": 5, "snakes": snakes}).to_string()
}

/// Create a game through the API and return its id.
async fn create_game(router: &axum::Router) -> String {
    let response = router
        .clone()
        .oneshot(
            Request::post("/api/games")
                .header("content-type", "application/json")
                .body(Body::from(create_body(2)))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    json["id"].as_str().unwrap().to_owned()
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_ping_returns_version() {
    let router = make_router();

    let response = router
        .oneshot(Request::get("/api/ping").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_create_then_get_game() {
    let router = make_router();
    let id = create_game(&router).await;

    let response = router
        .oneshot(
            Request::get(format!("/api/games/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["id"], id.as_str());
    assert_eq!(json["width"], 11);
    assert_eq!(json["status"], "Stopped");
    assert_eq!(json["mode"], "MultiPlayer");
}

#[tokio::test]
async fn test_create_rejects_empty_roster() {
    let router = make_router();

    let response = router
        .oneshot(
            Request::post("/api/games")
                .header("content-type", "application/json")
                .body(Body::from(create_body(0)))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["code"], "invalid_request");
}

#[tokio::test]
async fn test_create_stores_a_turn_zero_tick() {
    let router = make_router();
    let id = create_game(&router).await;

    let response = router
        .oneshot(
            Request::get(format!("/api/games/{id}/ticks"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    let ticks = json.as_array().unwrap();
    assert_eq!(ticks.len(), 1);
    assert_eq!(ticks[0]["turn"], 0);
    assert_eq!(ticks[0]["snakes"].as_array().unwrap().len(), 2);
    assert_eq!(ticks[0]["food"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn test_get_unknown_game_is_404_with_code() {
    let router = make_router();

    let response = router
        .oneshot(
            Request::get("/api/games/no-such-game")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["code"], "not_found");
}

#[tokio::test]
async fn test_lock_conflict_is_409() {
    let router = make_router();
    let id = create_game(&router).await;

    let response = router
        .clone()
        .oneshot(
            Request::post(format!("/api/games/{id}/lock"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let token = body_to_json(response.into_body()).await["token"]
        .as_str()
        .unwrap()
        .to_owned();
    assert!(!token.is_empty());

    // A second caller without the token loses.
    let response = router
        .clone()
        .oneshot(
            Request::post(format!("/api/games/{id}/lock"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // The holder renews idempotently.
    let response = router
        .oneshot(
            Request::post(format!("/api/games/{id}/lock"))
                .header(LEASE_TOKEN_HEADER, &token)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let renewed = body_to_json(response.into_body()).await;
    assert_eq!(renewed["token"], token.as_str());
}

#[tokio::test]
async fn test_push_tick_without_token_is_400() {
    let router = make_router();
    let id = create_game(&router).await;

    let response = router
        .oneshot(
            Request::post(format!("/api/games/{id}/ticks"))
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({"turn": 1, "snakes": [], "food": []}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["code"], "invalid_request");
}

#[tokio::test]
async fn test_push_tick_sequence_violation_is_422() {
    let router = make_router();
    let id = create_game(&router).await;

    let response = router
        .clone()
        .oneshot(
            Request::post(format!("/api/games/{id}/lock"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let token = body_to_json(response.into_body()).await["token"]
        .as_str()
        .unwrap()
        .to_owned();

    // History holds turn 0; turn 5 is out of sequence.
    let response = router
        .oneshot(
            Request::post(format!("/api/games/{id}/ticks"))
                .header("content-type", "application/json")
                .header(LEASE_TOKEN_HEADER, &token)
                .body(Body::from(
                    json!({"turn": 5, "snakes": [], "food": []}).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["code"], "invalid_sequence");
}

#[tokio::test]
async fn test_start_makes_the_game_poppable() {
    let router = make_router();
    let id = create_game(&router).await;

    // Nothing runnable yet.
    let response = router
        .clone()
        .oneshot(Request::post("/api/games/pop").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = router
        .clone()
        .oneshot(
            Request::post(format!("/api/games/{id}/start"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .oneshot(Request::post("/api/games/pop").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["id"], id.as_str());
}

#[tokio::test]
async fn test_list_ticks_negative_offset_returns_the_tail() {
    let router = make_router();
    let id = create_game(&router).await;

    let response = router
        .clone()
        .oneshot(
            Request::get(format!("/api/games/{id}/ticks?limit=1&offset=-1"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    let ticks = json.as_array().unwrap();
    assert_eq!(ticks.len(), 1);
    assert_eq!(ticks[0]["turn"], 0);
}

#[tokio::test]
async fn test_end_marks_the_game_complete() {
    let router = make_router();
    let id = create_game(&router).await;

    let response = router
        .clone()
        .oneshot(
            Request::post(format!("/api/games/{id}/end"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .oneshot(
            Request::get(format!("/api/games/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], "Complete");
}

#[tokio::test]
async fn test_end_sends_end_callouts_to_every_snake() {
    let stub = StubSnakeClient::new(Direction::Up);
    let router = make_router_with_client(SnakeClient::Stub(stub.clone()));
    let id = create_game(&router).await;

    let response = router
        .clone()
        .oneshot(
            Request::post(format!("/api/games/{id}/end"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(stub.ends_sent(), 2);

    // Ending a finished game is rejected and must not notify again.
    let response = router
        .oneshot(
            Request::post(format!("/api/games/{id}/end"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(stub.ends_sent(), 2);
}
