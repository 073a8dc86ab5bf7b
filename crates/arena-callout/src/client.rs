//! Snake client abstraction and implementations.
//!
//! Defines an enum-based dispatch for snake clients, avoiding the
//! dyn-compatibility issues with async trait methods. The real client
//! speaks HTTP via `reqwest`; the stub plays a fixed move and exists for
//! driver tests that must not open sockets.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use arena_types::Direction;
use arena_types::wire::{CalloutRequest, MoveResponse, StartResponse};

use crate::error::CalloutError;

// ---------------------------------------------------------------------------
// Unified client enum (dyn-compatible alternative to async trait)
// ---------------------------------------------------------------------------

/// A client that can deliver start/move/end callouts to a snake agent.
#[derive(Debug, Clone)]
pub enum SnakeClient {
    /// Real HTTP callouts to the snake's URL.
    Http(HttpSnakeClient),
    /// Canned responses, no I/O.
    Stub(StubSnakeClient),
}

impl SnakeClient {
    /// Announce the game to a snake and read back its display color.
    ///
    /// # Errors
    ///
    /// Returns [`CalloutError`] when the snake is unreachable, answers a
    /// non-success status, or returns a body that is not valid JSON.
    pub async fn start(
        &self,
        url: &str,
        request: &CalloutRequest,
        timeout: Duration,
    ) -> Result<StartResponse, CalloutError> {
        match self {
            Self::Http(client) => client.start(url, request, timeout).await,
            Self::Stub(client) => client.start(),
        }
    }

    /// Ask a snake for its move this turn.
    ///
    /// # Errors
    ///
    /// Returns [`CalloutError`] when the snake is unreachable, answers a
    /// non-success status, or returns a body missing a valid `move` key.
    pub async fn request_move(
        &self,
        url: &str,
        request: &CalloutRequest,
        timeout: Duration,
    ) -> Result<Direction, CalloutError> {
        match self {
            Self::Http(client) => client.request_move(url, request, timeout).await,
            Self::Stub(client) => client.request_move(),
        }
    }

    /// Tell a snake the game is over. The response body is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`CalloutError`] when the snake is unreachable or answers a
    /// non-success status.
    pub async fn end(
        &self,
        url: &str,
        request: &CalloutRequest,
        timeout: Duration,
    ) -> Result<(), CalloutError> {
        match self {
            Self::Http(client) => client.end(url, request, timeout).await,
            Self::Stub(client) => client.end(),
        }
    }

    /// Human-readable name for logging.
    pub const fn name(&self) -> &str {
        match self {
            Self::Http(_) => "http",
            Self::Stub(_) => "stub",
        }
    }
}

// ---------------------------------------------------------------------------
// HTTP client
// ---------------------------------------------------------------------------

/// Callouts over HTTP. Endpoints are `{url}/start`, `{url}/move`, and
/// `{url}/end`; the per-request timeout is the game's snake timeout.
#[derive(Debug, Clone)]
pub struct HttpSnakeClient {
    client: reqwest::Client,
}

impl HttpSnakeClient {
    /// Create a client with its own connection pool.
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    async fn post(
        &self,
        base_url: &str,
        endpoint: &str,
        request: &CalloutRequest,
        timeout: Duration,
    ) -> Result<Vec<u8>, CalloutError> {
        let base = base_url.trim_end_matches('/');
        if base.is_empty() {
            return Err(CalloutError::BadUrl {
                url: base_url.to_owned(),
            });
        }
        let response = self
            .client
            .post(format!("{base}/{endpoint}"))
            .timeout(timeout)
            .json(request)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CalloutError::BadStatus { status });
        }
        Ok(response.bytes().await?.to_vec())
    }

    async fn start(
        &self,
        url: &str,
        request: &CalloutRequest,
        timeout: Duration,
    ) -> Result<StartResponse, CalloutError> {
        let body = self.post(url, "start", request, timeout).await?;
        parse_start(&body)
    }

    async fn request_move(
        &self,
        url: &str,
        request: &CalloutRequest,
        timeout: Duration,
    ) -> Result<Direction, CalloutError> {
        let body = self.post(url, "move", request, timeout).await?;
        parse_move(&body)
    }

    async fn end(
        &self,
        url: &str,
        request: &CalloutRequest,
        timeout: Duration,
    ) -> Result<(), CalloutError> {
        self.post(url, "end", request, timeout).await.map(|_| ())
    }
}

impl Default for HttpSnakeClient {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Stub client
// ---------------------------------------------------------------------------

/// A snake that always plays the same move. No I/O.
///
/// Clones share the end-callout counter, so a test can hold one copy and
/// observe callouts delivered through another.
#[derive(Debug, Clone)]
pub struct StubSnakeClient {
    /// The move returned for every `/move` callout.
    pub direction: Direction,
    /// The color returned for every `/start` callout.
    pub color: Option<String>,
    /// When true, every callout fails, exercising fallback paths.
    pub failing: bool,
    ends: Arc<AtomicUsize>,
}

impl StubSnakeClient {
    /// A stub that always plays `direction` and never errs.
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            color: None,
            failing: false,
            ends: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A stub whose every callout fails with [`CalloutError::BadUrl`].
    pub fn broken() -> Self {
        Self {
            failing: true,
            ..Self::new(Direction::Up)
        }
    }

    /// How many `/end` callouts this stub (and its clones) received.
    pub fn ends_sent(&self) -> usize {
        self.ends.load(Ordering::SeqCst)
    }

    fn start(&self) -> Result<StartResponse, CalloutError> {
        if self.failing {
            return Err(CalloutError::BadUrl {
                url: "stub://broken".to_owned(),
            });
        }
        Ok(StartResponse {
            color: self.color.clone(),
        })
    }

    fn request_move(&self) -> Result<Direction, CalloutError> {
        if self.failing {
            return Err(CalloutError::BadUrl {
                url: "stub://broken".to_owned(),
            });
        }
        Ok(self.direction)
    }

    fn end(&self) -> Result<(), CalloutError> {
        if self.failing {
            return Err(CalloutError::BadUrl {
                url: "stub://broken".to_owned(),
            });
        }
        self.ends.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

/// Parse a `/start` response body. An empty body counts as "no color".
fn parse_start(body: &[u8]) -> Result<StartResponse, CalloutError> {
    if body.is_empty() {
        return Ok(StartResponse::default());
    }
    Ok(serde_json::from_slice(body)?)
}

/// Parse a `/move` response body into a direction.
fn parse_move(body: &[u8]) -> Result<Direction, CalloutError> {
    let response: MoveResponse = serde_json::from_slice(body)?;
    Ok(response.direction)
}
