//! Errors from snake agent callouts.
//!
//! A callout error is always scoped to one snake on one turn. Callers
//! recover per snake (fall back to the default move or color) instead of
//! failing the game, so these errors are logged and absorbed at the call
//! site rather than propagated upward.

/// A failed callout to one snake.
#[derive(Debug, thiserror::Error)]
pub enum CalloutError {
    /// The request could not be sent or the response never arrived.
    #[error("callout transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// The snake answered with a non-success HTTP status.
    #[error("snake returned HTTP {status}")]
    BadStatus {
        /// The status the snake returned.
        status: reqwest::StatusCode,
    },

    /// The response body was not the expected JSON shape.
    #[error("malformed snake response: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The snake's callout URL is empty or unusable.
    #[error("snake has no usable callout URL: {url:?}")]
    BadUrl {
        /// The offending URL.
        url: String,
    },
}
