//! Error types for the session layer.

use std::fmt;

use authly_store::StoreError;

/// The session operation an error came from.
///
/// Carried by the infrastructure variants of [`SessionError`] so an
/// operator can tell which call hit the degraded store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Issue,
    Resolve,
    Revoke,
    RevokeUser,
    Ping,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Issue => write!(f, "issue"),
            Self::Resolve => write!(f, "resolve"),
            Self::Revoke => write!(f, "revoke"),
            Self::RevokeUser => write!(f, "revoke_user"),
            Self::Ping => write!(f, "ping"),
        }
    }
}

/// Errors that can occur during session management.
///
/// Two families:
///
/// - **Infrastructure**: `StoreUnavailable`, `StoreReadFailed`,
///   `StoreWriteFailed`, `TokenSpaceExhausted`. Server-side failures; the
///   caller should answer with a 5xx.
/// - **Caller-visible**: `SessionNotFound`, `InvalidInput`, `AuthFailed`.
///   Normal authentication outcomes; answer with a 4xx and don't page
///   anyone.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The store couldn't be reached or timed out.
    #[error("{operation}: session store unavailable: {reason}")]
    StoreUnavailable { operation: Operation, reason: String },

    /// A read against the store failed.
    #[error("{operation}: session store read failed: {reason}")]
    StoreReadFailed { operation: Operation, reason: String },

    /// A write against the store failed.
    #[error("{operation}: session store write failed: {reason}")]
    StoreWriteFailed { operation: Operation, reason: String },

    /// Every candidate token collided with an active one.
    ///
    /// With 64-character tokens from a CSPRNG this should never happen;
    /// seeing it means the generator is broken, not that load is high.
    #[error("token space exhausted after {attempts} attempts")]
    TokenSpaceExhausted { attempts: u32 },

    /// The token is unknown, expired, or revoked.
    #[error("session not found")]
    SessionNotFound,

    /// A malformed token, user ID, or TTL was rejected before any store
    /// access.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Credentials were rejected by a
    /// [`CredentialVerifier`](crate::CredentialVerifier).
    #[error("authentication failed: {0}")]
    AuthFailed(String),
}

impl SessionError {
    /// Attaches the failing operation to a store error.
    pub fn from_store(operation: Operation, err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(reason) => {
                Self::StoreUnavailable { operation, reason }
            }
            StoreError::ReadFailed(reason) => {
                Self::StoreReadFailed { operation, reason }
            }
            StoreError::WriteFailed(reason) => {
                Self::StoreWriteFailed { operation, reason }
            }
        }
    }

    /// Returns `true` for failures on the server's side (5xx), `false` for
    /// outcomes caused by what the caller sent (4xx).
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::StoreUnavailable { .. }
                | Self::StoreReadFailed { .. }
                | Self::StoreWriteFailed { .. }
                | Self::TokenSpaceExhausted { .. }
        )
    }

    /// The operation an infrastructure error came from, if any.
    pub fn operation(&self) -> Option<Operation> {
        match self {
            Self::StoreUnavailable { operation, .. }
            | Self::StoreReadFailed { operation, .. }
            | Self::StoreWriteFailed { operation, .. } => Some(*operation),
            Self::TokenSpaceExhausted { .. } => Some(Operation::Issue),
            _ => None,
        }
    }
}
