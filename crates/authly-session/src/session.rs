//! Identity types and the store key layout.
//!
//! A session has no representation of its own outside the store. It is the
//! relationship `token → user_id`, held under a TTL:
//!
//! ```text
//!   absent ──(issue)──→ active ──(TTL elapses)──→ expired ──→ absent
//!                          │
//!                          └──────(revoke)──────→ revoked ──→ absent
//! ```
//!
//! `expired` is never signalled. The store drops the key and `resolve`
//! simply stops finding it.

use std::fmt;

use crate::SessionError;

/// Prefix of the per-user index key written in single-session mode.
///
/// Tokens are purely alphanumeric, so a key containing `:` can never clash
/// with a token key.
const USER_INDEX_PREFIX: &str = "user-session:";

/// Opaque identifier of a user in the user-management subsystem.
///
/// The session layer never parses it. The only requirement is that it is
/// non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserId(String);

impl UserId {
    /// Wraps a user ID.
    ///
    /// # Errors
    /// Returns [`SessionError::InvalidInput`] if `id` is empty.
    pub fn new(id: impl Into<String>) -> Result<Self, SessionError> {
        let id = id.into();
        if id.is_empty() {
            return Err(SessionError::InvalidInput(
                "user id must not be empty".into(),
            ));
        }
        Ok(Self(id))
    }

    /// Returns the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the wrapper and returns the raw ID.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Store key of the index entry pointing at a user's current token.
pub(crate) fn user_index_key(user_id: &UserId) -> String {
    format!("{USER_INDEX_PREFIX}{user_id}")
}
