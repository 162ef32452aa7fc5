//! Session management for Authly.
//!
//! This crate turns a verified identity into an opaque bearer token and
//! back:
//!
//! 1. **Generation**: random alphanumeric tokens from a CSPRNG
//!    ([`TokenGenerator`])
//! 2. **Issuing**: collision-free writes of `token → user_id` with a TTL
//!    ([`SessionManager::issue`])
//! 3. **Validation / revocation**: [`SessionManager::resolve`] and
//!    [`SessionManager::revoke`]
//!
//! # How it fits in the stack
//!
//! ```text
//! Gateway (above)          ← verifies credentials, calls issue/resolve
//!     ↕
//! Session Layer (this crate)  ← tokens, TTLs, collision handling
//!     ↕
//! Store Layer (below)      ← SET NX EX / GET / DEL against Redis
//! ```

mod auth;
mod config;
mod error;
mod manager;
mod session;
mod token;

pub use auth::CredentialVerifier;
pub use config::{MAX_SESSION_TTL, SessionConfig};
pub use error::{Operation, SessionError};
pub use manager::SessionManager;
pub use session::UserId;
pub use token::{DEFAULT_TOKEN_LENGTH, SessionToken, TokenGenerator, TokenSource};
