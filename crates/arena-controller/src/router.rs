//! Axum router construction for the controller API.
//!
//! Assembles the store-facade routes into a single [`Router`] with CORS
//! and request tracing middleware.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the complete axum router for the controller.
///
/// CORS is configured to allow any origin for development. In production
/// this should be restricted.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/ping", get(handlers::ping))
        // Lifecycle
        .route("/api/games", post(handlers::create_game))
        .route("/api/games/raw", post(handlers::create_game_raw))
        .route("/api/games/{id}", get(handlers::get_game))
        .route("/api/games/{id}/status", put(handlers::set_status))
        .route("/api/games/{id}/start", post(handlers::start_game))
        .route("/api/games/{id}/end", post(handlers::end_game))
        // Coordination
        .route("/api/games/pop", post(handlers::pop_game))
        .route("/api/games/{id}/lock", post(handlers::lock_game))
        .route("/api/games/{id}/unlock", post(handlers::unlock_game))
        // History
        .route(
            "/api/games/{id}/ticks",
            post(handlers::push_tick).get(handlers::list_ticks),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
