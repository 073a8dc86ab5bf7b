//! HTTP controller for the Arena game server.
//!
//! The controller is the network face of the game store: every store
//! operation is a route, the lease token travels in the `X-Lease-Token`
//! header, and error responses carry a stable machine-readable `code`.
//! On top of the facade it owns game creation (engine placement plus
//! palette coloring) and the start/end lifecycle conveniences.

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;

pub use error::ControllerError;
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use state::AppState;
