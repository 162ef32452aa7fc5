//! Session manager configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::SessionError;
use crate::token::DEFAULT_TOKEN_LENGTH;

/// Longest session `issue` accepts: 100 years.
///
/// Far below the largest `EX` Redis takes, and small enough that adding it
/// to the current instant cannot overflow.
pub const MAX_SESSION_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Configuration for a [`SessionManager`](crate::SessionManager).
///
/// Passed in explicitly at construction. The manager never reads
/// process-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Length of issued tokens, in characters.
    pub token_length: usize,

    /// TTL applied when `issue_session` is called without one.
    pub default_ttl_minutes: u64,

    /// Total candidates tried by `issue` before giving up with
    /// `TokenSpaceExhausted`. Counts the first attempt.
    pub max_issue_attempts: u32,

    /// When set, issuing a session for a user revokes the user's previous
    /// session, so each user holds at most one active token.
    pub single_session_per_user: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            token_length: DEFAULT_TOKEN_LENGTH,
            default_ttl_minutes: 1440,
            max_issue_attempts: 5,
            single_session_per_user: false,
        }
    }
}

impl SessionConfig {
    /// Checks that every value is usable.
    ///
    /// # Errors
    /// Returns [`SessionError::InvalidInput`] naming the first bad field.
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.token_length == 0 {
            return Err(SessionError::InvalidInput(
                "token_length must be positive".into(),
            ));
        }
        if self.default_ttl_minutes == 0 {
            return Err(SessionError::InvalidInput(
                "default_ttl_minutes must be positive".into(),
            ));
        }
        if self.default_ttl_minutes > MAX_SESSION_TTL.as_secs() / 60 {
            return Err(SessionError::InvalidInput(format!(
                "default_ttl_minutes must be at most {}",
                MAX_SESSION_TTL.as_secs() / 60
            )));
        }
        if self.max_issue_attempts == 0 {
            return Err(SessionError::InvalidInput(
                "max_issue_attempts must be positive".into(),
            ));
        }
        Ok(())
    }
}
