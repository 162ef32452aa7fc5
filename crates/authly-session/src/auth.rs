//! Credential verification hook.
//!
//! Authly's session layer doesn't check passwords itself. Hashing, user
//! documents and lockout policy belong to the user-management side.
//! What the session layer needs is a yes/no answer plus the user's
//! identity, so it defines the [`CredentialVerifier`] trait. You implement
//! it on top of your user store and the gateway calls it before asking the
//! [`SessionManager`](crate::SessionManager) for a token.

use std::future::Future;

use crate::{SessionError, UserId};

/// Checks a user's credentials and returns their identity.
///
/// # Trait bounds
///
/// - `Send + Sync`: one verifier is shared by every request task.
/// - `'static`: it lives as long as the gateway that owns it.
///
/// # Example
///
/// ```rust
/// use authly_session::{CredentialVerifier, SessionError, UserId};
///
/// /// Accepts a single hard-coded account.
/// /// Only for local development!
/// struct DevVerifier;
///
/// impl CredentialVerifier for DevVerifier {
///     async fn verify(
///         &self,
///         login: &str,
///         secret: &str,
///     ) -> Result<UserId, SessionError> {
///         if login == "dev" && secret == "dev" {
///             return UserId::new("dev-user");
///         }
///         Err(SessionError::AuthFailed("unknown login or wrong secret".into()))
///     }
/// }
/// ```
pub trait CredentialVerifier: Send + Sync + 'static {
    /// Verifies `secret` for `login`.
    ///
    /// # Returns
    /// - `Ok(UserId)`: credentials are valid, here's who they belong to
    /// - `Err(SessionError::AuthFailed)`: credentials were rejected
    /// - any infrastructure error from the user store, passed through
    fn verify(
        &self,
        login: &str,
        secret: &str,
    ) -> impl Future<Output = Result<UserId, SessionError>> + Send;
}
