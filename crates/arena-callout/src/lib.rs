//! HTTP callouts to external snake agents.
//!
//! A snake agent is a web service with three POST endpoints under its base
//! URL: `/start`, `/move`, and `/end`. Payload shapes live in
//! `arena_types::wire`; this crate owns transport and response parsing.
//! Per-snake failures are recoverable by contract, so the driver absorbs
//! every [`CalloutError`] with a fallback instead of failing the game.

pub mod client;
pub mod error;

pub use client::{HttpSnakeClient, SnakeClient, StubSnakeClient};
pub use error::CalloutError;
