//! # Authly
//!
//! Opaque bearer-token authentication backend.
//!
//! Authly verifies a user's credentials through a pluggable
//! [`CredentialVerifier`](authly_session::CredentialVerifier), then issues a
//! random token that stands in for the user on later requests. Tokens live
//! only in a TTL-capable store (Redis in production), so expiry and
//! revocation take effect for every process at once.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use authly::prelude::*;
//!
//! # async fn run(verifier: impl CredentialVerifier) -> Result<(), AuthlyError> {
//! authly::logging::init();
//! let config = AuthlyConfig::load()?;
//! let gateway = AuthGateway::new(verifier, authly::redis_session_manager(&config)?);
//!
//! let login = gateway.login("alice", "correct horse", None).await?;
//! let user = gateway
//!     .authenticate(&format!("Bearer {}", login.access_token))
//!     .await?;
//! # let _ = user;
//! # Ok(())
//! # }
//! ```

pub mod config;
mod error;
mod gateway;
pub mod logging;

pub use config::AuthlyConfig;
pub use error::{AuthlyError, ErrorKind};
pub use gateway::{AuthGateway, LoginResponse};

use authly_session::SessionManager;
use authly_store::RedisStore;

/// Builds a Redis-backed session manager from the loaded configuration.
///
/// Nothing is dialed yet; the first session operation connects.
pub fn redis_session_manager(
    config: &AuthlyConfig,
) -> Result<SessionManager<RedisStore>, AuthlyError> {
    let store = RedisStore::new(&config.redis_config())?;
    Ok(SessionManager::new(store, config.session_config())?)
}

pub mod prelude {
    pub use crate::{AuthGateway, AuthlyConfig, AuthlyError, ErrorKind, LoginResponse};
    pub use authly_session::{
        CredentialVerifier, SessionConfig, SessionError, SessionManager,
        SessionToken, UserId,
    };
    pub use authly_store::{MemoryStore, RedisStore, SessionStore};
}
