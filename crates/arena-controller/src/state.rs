//! Shared application state for the controller API.

use std::sync::Arc;

use tokio::sync::Mutex;

use arena_callout::SnakeClient;
use arena_engine::Palette;
use arena_store::GameStore;

/// State shared by every controller handler.
///
/// The store already serializes its own mutation; the only controller-side
/// mutable state is the palette position used to color snakes that do not
/// pick a color themselves. The store arrives in an [`Arc`] because a
/// single-process deployment shares the same instance with its worker
/// pool. The snake client delivers the `/end` callouts that an
/// externally-ended game owes its snakes.
pub struct AppState {
    /// The backing game store.
    pub store: Arc<GameStore>,
    /// Callout client for end notifications.
    pub client: SnakeClient,
    /// Round-robin color source for new snakes.
    pub palette: Mutex<Palette>,
}

impl AppState {
    /// Wrap a store and callout client for serving.
    pub fn new(store: Arc<GameStore>, client: SnakeClient) -> Self {
        Self {
            store,
            client,
            palette: Mutex::new(Palette::new()),
        }
    }
}
