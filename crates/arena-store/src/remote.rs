//! Remote store: an HTTP client of the controller implementing the same
//! contract as the local backends.
//!
//! Workers pointed at a controller URL use this backend; the operations
//! map 1:1 onto the controller routes and the lease token travels in the
//! `X-Lease-Token` header, never in a body. Error responses carry a
//! stable `code` field that is mapped back into [`StoreError`], so a
//! remote `IsLocked` is indistinguishable from a local one to the worker
//! loop.

use arena_types::api::{
    CreateGameResponse, ErrorBody, LEASE_TOKEN_HEADER, LockResponse, PopResponse, StatusRequest,
};
use arena_types::{Game, GameId, GameStatus, LeaseToken, Tick};
use reqwest::{Response, StatusCode};

use crate::error::StoreError;

/// Store backend speaking HTTP to a controller.
#[derive(Debug, Clone)]
pub struct RemoteStore {
    client: reqwest::Client,
    base_url: String,
}

impl RemoteStore {
    /// Create a client for the controller at `base_url`
    /// (e.g. `http://localhost:8080`). A trailing slash is tolerated.
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_owned(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Acquire or renew the lease on `id`.
    pub async fn lock(
        &self,
        id: &GameId,
        token: Option<&LeaseToken>,
    ) -> Result<LeaseToken, StoreError> {
        let mut request = self.client.post(self.url(&format!("/api/games/{id}/lock")));
        if let Some(token) = token {
            request = request.header(LEASE_TOKEN_HEADER, token.as_str());
        }
        let response = check(request.send().await?).await?;
        let body: LockResponse = response.json().await?;
        Ok(body.token)
    }

    /// Release the lease on `id`.
    pub async fn unlock(&self, id: &GameId, token: &LeaseToken) -> Result<(), StoreError> {
        let response = self
            .client
            .post(self.url(&format!("/api/games/{id}/unlock")))
            .header(LEASE_TOKEN_HEADER, token.as_str())
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    /// Pop an unclaimed runnable game id.
    pub async fn pop_game_id(&self) -> Result<GameId, StoreError> {
        let response = self
            .client
            .post(self.url("/api/games/pop"))
            .send()
            .await?;
        let response = check(response).await?;
        let body: PopResponse = response.json().await?;
        Ok(body.id)
    }

    /// Create a game from already-built metadata and initial ticks.
    ///
    /// The controller's own `POST /api/games` computes placement from a
    /// [`CreateGameRequest`](arena_types::api::CreateGameRequest); this
    /// raw variant exists so a remote worker can mirror the full store
    /// contract. It posts to `/api/games/raw`.
    pub async fn create_game(&self, game: &Game, initial_ticks: &[Tick]) -> Result<(), StoreError> {
        let body = serde_json::json!({ "game": game, "ticks": initial_ticks });
        let response = self
            .client
            .post(self.url("/api/games/raw"))
            .json(&body)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    /// Set the game's lifecycle status.
    pub async fn set_game_status(
        &self,
        id: &GameId,
        status: GameStatus,
    ) -> Result<(), StoreError> {
        let response = self
            .client
            .put(self.url(&format!("/api/games/{id}/status")))
            .json(&StatusRequest { status })
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    /// Fetch game metadata.
    pub async fn get_game(&self, id: &GameId) -> Result<Game, StoreError> {
        let response = self
            .client
            .get(self.url(&format!("/api/games/{id}")))
            .send()
            .await?;
        let response = check(response).await?;
        Ok(response.json().await?)
    }

    /// Append a tick under a held lease.
    pub async fn push_tick(
        &self,
        id: &GameId,
        token: &LeaseToken,
        tick: &Tick,
    ) -> Result<(), StoreError> {
        let response = self
            .client
            .post(self.url(&format!("/api/games/{id}/ticks")))
            .header(LEASE_TOKEN_HEADER, token.as_str())
            .json(tick)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    /// Read a window of the tick history.
    pub async fn list_ticks(
        &self,
        id: &GameId,
        limit: usize,
        offset: i64,
    ) -> Result<Vec<Tick>, StoreError> {
        let response = self
            .client
            .get(self.url(&format!("/api/games/{id}/ticks")))
            .query(&[
                ("limit", limit.to_string()),
                ("offset", offset.to_string()),
            ])
            .send()
            .await?;
        let response = check(response).await?;
        Ok(response.json().await?)
    }

    /// Health-check the controller, returning its version string.
    pub async fn ping(&self) -> Result<String, StoreError> {
        let response = self.client.get(self.url("/api/ping")).send().await?;
        let response = check(response).await?;
        let body: arena_types::api::PingResponse = response.json().await?;
        Ok(body.version)
    }
}

/// Turn a non-success response into the taxonomy error its body describes.
async fn check(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match response.json::<ErrorBody>().await {
        Ok(body) => Err(StoreError::from_code(body.code, body.error)),
        // No parsable body; fall back on the HTTP status alone.
        Err(_) => Err(match status {
            StatusCode::NOT_FOUND => StoreError::NotFound(format!("HTTP {status}")),
            StatusCode::CONFLICT => StoreError::IsLocked(format!("HTTP {status}")),
            StatusCode::UNPROCESSABLE_ENTITY => {
                StoreError::InvalidSequence(format!("HTTP {status}"))
            }
            _ => StoreError::Backend(format!("controller returned HTTP {status}")),
        }),
    }
}
