//! Type-safe wrappers for the opaque string identifiers in the system.
//!
//! Game ids, snake ids, and lease tokens are all opaque strings on the wire
//! (clients may supply their own), so the wrappers hold a [`String`] rather
//! than a [`Uuid`]. The `generate()` constructors produce UUID v4 strings
//! for the server-generated case.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generates a newtype wrapper around an opaque [`String`] identifier.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Generate a fresh identifier from a UUID v4.
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            /// View the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the wrapper and return the inner [`String`].
            pub fn into_inner(self) -> String {
                self.0
            }

            /// True when the identifier is the empty string.
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for a game. The lease store keys on this.
    GameId
}

define_id! {
    /// Identifier for a snake, unique within a single game.
    SnakeId
}

define_id! {
    /// Opaque lease credential. Exactly one valid token may exist per game
    /// id at any instant; holding it authorizes tick appends.
    LeaseToken
}
