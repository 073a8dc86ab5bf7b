//! Error taxonomy for the store contract.
//!
//! Workers recover `NotFound` and `IsLocked` locally (retry signals);
//! `InvalidSequence` on append means the lease was lost or duplicated and
//! aborts the current driver iteration. Backend errors wrap the underlying
//! [`sqlx`], [`fred`], and [`reqwest`] failures.

use arena_types::api::ErrorCode;

/// Errors that can occur in the store layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No such game, or no poppable game.
    #[error("not found: {0}")]
    NotFound(String),

    /// A valid lease is held under a different token.
    #[error("locked: {0}")]
    IsLocked(String),

    /// A tick append out of order, or an append to a finished game.
    #[error("invalid sequence: {0}")]
    InvalidSequence(String),

    /// The game already exists and cannot be created again.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// A `PostgreSQL` operation failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// A `PostgreSQL` migration failed.
    #[error("PostgreSQL migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A Redis operation failed.
    #[error("Redis error: {0}")]
    Redis(#[from] fred::error::Error),

    /// An HTTP call to the remote controller failed.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A serialization or deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Any other backend failure.
    #[error("backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// True for the "no poppable game / no such game" category the worker
    /// loop treats as a retry signal.
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// True when a valid lease is held elsewhere — the lost-the-race case
    /// the worker loop retries quietly.
    pub const fn is_locked(&self) -> bool {
        matches!(self, Self::IsLocked(_))
    }

    /// True for the errors that mean "the lease is no longer ours" when
    /// returned from a tick append.
    pub const fn is_lease_lost(&self) -> bool {
        matches!(self, Self::IsLocked(_) | Self::InvalidSequence(_))
    }

    /// The stable wire category for this error.
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::IsLocked(_) => ErrorCode::IsLocked,
            Self::InvalidSequence(_) => ErrorCode::InvalidSequence,
            Self::AlreadyExists(_) => ErrorCode::InvalidRequest,
            Self::Postgres(_)
            | Self::Migration(_)
            | Self::Redis(_)
            | Self::Transport(_)
            | Self::Serialization(_)
            | Self::Backend(_) => ErrorCode::Internal,
        }
    }

    /// Rebuild a taxonomy error from a wire category and message, for the
    /// remote store client.
    pub fn from_code(code: ErrorCode, message: String) -> Self {
        match code {
            ErrorCode::NotFound => Self::NotFound(message),
            ErrorCode::IsLocked => Self::IsLocked(message),
            ErrorCode::InvalidSequence => Self::InvalidSequence(message),
            ErrorCode::InvalidRequest | ErrorCode::Internal => Self::Backend(message),
        }
    }
}
