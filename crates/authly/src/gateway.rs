//! The authentication gateway: credentials in, bearer token out.
//!
//! This is the seam the HTTP layer talks to. It ties the two halves
//! together: a [`CredentialVerifier`] that knows about users, and a
//! [`SessionManager`] that knows about tokens.
//!
//! ```text
//! login(login, secret) ──→ verify ──→ issue ──→ LoginResponse
//! authenticate(header) ──→ parse bearer ──→ resolve ──→ UserId
//! logout(header)       ──→ parse bearer ──→ revoke
//! ```

use authly_session::{
    CredentialVerifier, SessionError, SessionManager, TokenGenerator,
    TokenSource, UserId,
};
use authly_store::SessionStore;
use serde::Serialize;

use crate::AuthlyError;
use crate::logging::log_security_event;

/// What a successful login hands back to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    /// Always `"bearer"`.
    pub token_type: &'static str,
    /// Seconds until the session expires.
    pub expires_in: u64,
}

/// Verifies credentials and manages the resulting sessions.
pub struct AuthGateway<V, S, T = TokenGenerator> {
    verifier: V,
    sessions: SessionManager<S, T>,
}

impl<V, S, T> AuthGateway<V, S, T>
where
    V: CredentialVerifier,
    S: SessionStore,
    T: TokenSource,
{
    /// Creates a gateway from a verifier and a session manager.
    pub fn new(verifier: V, sessions: SessionManager<S, T>) -> Self {
        Self { verifier, sessions }
    }

    /// The session manager behind this gateway.
    pub fn sessions(&self) -> &SessionManager<S, T> {
        &self.sessions
    }

    /// Verifies credentials and issues a session.
    ///
    /// `ttl_minutes` of `None` uses the configured default.
    ///
    /// # Errors
    /// - `Session(AuthFailed)`: the verifier rejected the credentials;
    ///   no session is issued
    /// - any error from [`SessionManager::issue_session`]
    pub async fn login(
        &self,
        login: &str,
        secret: &str,
        ttl_minutes: Option<u64>,
    ) -> Result<LoginResponse, AuthlyError> {
        let user_id = match self.verifier.verify(login, secret).await {
            Ok(user_id) => user_id,
            Err(e) => {
                if matches!(e, SessionError::AuthFailed(_)) {
                    log_security_event("failed_login", Some(login), &e.to_string());
                }
                return Err(e.into());
            }
        };

        let minutes =
            ttl_minutes.unwrap_or(self.sessions.config().default_ttl_minutes);
        let token = self
            .sessions
            .issue_session(user_id.as_str(), Some(minutes))
            .await?;

        tracing::info!(%user_id, "login succeeded");
        Ok(LoginResponse {
            access_token: token.into_inner(),
            token_type: "bearer",
            expires_in: minutes.saturating_mul(60),
        })
    }

    /// Resolves the identity behind an `Authorization` header value.
    ///
    /// Accepts `Bearer <token>` (scheme matched case-insensitively) or a
    /// bare token.
    pub async fn authenticate(&self, authorization: &str) -> Result<UserId, AuthlyError> {
        let token = bearer_token(authorization);
        match self.sessions.resolve(token).await {
            Ok(user_id) => Ok(user_id),
            Err(e @ SessionError::InvalidInput(_)) => {
                log_security_event("malformed_token", None, &e.to_string());
                Err(e.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Ends the session behind an `Authorization` header value.
    /// Logging out twice is not an error.
    pub async fn logout(&self, authorization: &str) -> Result<(), AuthlyError> {
        self.sessions.revoke(bearer_token(authorization)).await?;
        Ok(())
    }

    /// Readiness probe: fails if the session store is unreachable.
    pub async fn ready(&self) -> Result<(), AuthlyError> {
        self.sessions.ping().await?;
        Ok(())
    }
}

/// Strips an optional `Bearer ` scheme and surrounding whitespace.
fn bearer_token(authorization: &str) -> &str {
    let value = authorization.trim();
    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") => {
            token.trim()
        }
        _ => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token_strips_scheme() {
        assert_eq!(bearer_token("Bearer abc123"), "abc123");
        assert_eq!(bearer_token("bearer   abc123 "), "abc123");
        assert_eq!(bearer_token("BEARER abc123"), "abc123");
    }

    #[test]
    fn test_bearer_token_passes_bare_token_through() {
        assert_eq!(bearer_token("abc123"), "abc123");
        assert_eq!(bearer_token("  abc123\n"), "abc123");
    }

    #[test]
    fn test_bearer_token_other_scheme_left_intact() {
        // Not ours to interpret; resolve() will reject it as malformed.
        assert_eq!(bearer_token("Basic dXNlcg=="), "Basic dXNlcg==");
    }
}
