//! Deterministic snake game simulation.
//!
//! The engine is pure: given the previous tick, the collected moves, and a
//! random source, [`next_tick`] produces exactly one successor tick. All
//! I/O — snake callouts, persistence, leasing — lives in other crates, so
//! every rule here is unit-testable with a seeded RNG.
//!
//! | module | contents |
//! |--------|----------|
//! | [`placement`] | turn-zero boards: spawn bodies and starting food |
//! | [`tick`] | movement, eating, and food replacement |
//! | [`death`] | ordered death-cause evaluation |
//! | [`palette`] | fallback colors for snakes that do not pick one |

pub mod error;
pub mod palette;
pub mod placement;
pub mod tick;

mod death;

pub use error::EngineError;
pub use palette::Palette;
pub use placement::{SnakeSeed, initial_tick};
pub use tick::{game_over, next_tick};
