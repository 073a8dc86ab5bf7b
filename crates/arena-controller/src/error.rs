//! Error types for the controller API.
//!
//! [`ControllerError`] unifies all failure modes into a single enum that
//! converts into an HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation. Every
//! failing endpoint returns the same JSON shape, an
//! [`ErrorBody`](arena_types::api::ErrorBody) whose `code` field lets the
//! remote store client rebuild the store taxonomy on its side.
//!
//! | store error | HTTP status |
//! |-------------|-------------|
//! | `NotFound` | 404 |
//! | `IsLocked` | 409 |
//! | `InvalidSequence` | 422 |
//! | bad request / missing token | 400 |
//! | backend failure | 500 |

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use arena_store::StoreError;
use arena_types::api::{ErrorBody, ErrorCode, LEASE_TOKEN_HEADER};

/// Errors that can occur in the controller API layer.
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    /// The store rejected the operation.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The request needed a lease token header and carried none.
    #[error("missing or malformed {LEASE_TOKEN_HEADER} header")]
    MissingToken,

    /// The request body failed validation.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl ControllerError {
    /// The stable wire category for this error.
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Store(e) => e.code(),
            Self::MissingToken | Self::InvalidRequest(_) => ErrorCode::InvalidRequest,
        }
    }
}

impl IntoResponse for ControllerError {
    fn into_response(self) -> Response {
        let code = self.code();
        let status = match code {
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::IsLocked => StatusCode::CONFLICT,
            ErrorCode::InvalidSequence => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorCode::InvalidRequest => StatusCode::BAD_REQUEST,
            ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "controller request failed");
        }

        let body = ErrorBody {
            error: self.to_string(),
            code,
        };
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_their_statuses() {
        let cases = [
            (
                ControllerError::Store(StoreError::NotFound("g".to_owned())),
                StatusCode::NOT_FOUND,
            ),
            (
                ControllerError::Store(StoreError::IsLocked("g".to_owned())),
                StatusCode::CONFLICT,
            ),
            (
                ControllerError::Store(StoreError::InvalidSequence("g".to_owned())),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (ControllerError::MissingToken, StatusCode::BAD_REQUEST),
            (
                ControllerError::Store(StoreError::Backend("boom".to_owned())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }
}
