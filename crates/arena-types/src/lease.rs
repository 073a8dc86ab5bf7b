//! Time-bounded exclusive leases on game ids.
//!
//! A lease pairs an opaque token with an absolute expiry. At most one
//! valid (non-expired) token exists per game id at any instant; holding it
//! is what authorizes a worker to append ticks.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::LeaseToken;

/// Default lease duration: 5 seconds.
pub const DEFAULT_LEASE_TTL_MS: u64 = 5_000;

/// A granted lease: token plus absolute expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lease {
    /// The credential the holder must present on renewal, unlock, and
    /// tick appends.
    pub token: LeaseToken,
    /// The instant the lease stops being valid.
    pub expires_at: DateTime<Utc>,
}

impl Lease {
    /// Grant a new lease expiring `ttl_ms` from now.
    pub fn grant(token: LeaseToken, ttl_ms: u64) -> Self {
        Self {
            token,
            expires_at: expiry_from_now(ttl_ms),
        }
    }

    /// True once the expiry has passed.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Push the expiry out to `ttl_ms` from now (idempotent renewal).
    pub fn renew(&mut self, ttl_ms: u64) {
        self.expires_at = expiry_from_now(ttl_ms);
    }
}

/// Absolute expiry `ttl_ms` milliseconds from now.
fn expiry_from_now(ttl_ms: u64) -> DateTime<Utc> {
    let ttl = TimeDelta::milliseconds(i64::try_from(ttl_ms).unwrap_or(i64::MAX));
    Utc::now()
        .checked_add_signed(ttl)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
