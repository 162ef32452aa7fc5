//! Unified error type for Authly.

use authly_session::SessionError;
use authly_store::StoreError;

/// How a caller-facing layer (HTTP, RPC) should answer an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed request: 400.
    BadRequest,
    /// Unknown, expired or revoked session, or rejected credentials: 401.
    Unauthorized,
    /// Infrastructure failure: 5xx.
    ServerError,
}

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `authly` facade you deal with this single error type
/// instead of importing errors from each sub-crate. The `#[from]`
/// attributes let `?` convert sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum AuthlyError {
    /// A store-level error raised outside a session operation (e.g. while
    /// building the store).
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A session-level error (not found, exhausted, store failure).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The configuration could not be read or parsed.
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// The configuration parsed but holds unusable values.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl AuthlyError {
    /// Classifies the error for the caller-facing layer.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Session(
                SessionError::SessionNotFound | SessionError::AuthFailed(_),
            ) => ErrorKind::Unauthorized,
            Self::Session(SessionError::InvalidInput(_)) => ErrorKind::BadRequest,
            Self::Session(_)
            | Self::Store(_)
            | Self::Config(_)
            | Self::InvalidConfig(_) => ErrorKind::ServerError,
        }
    }
}
