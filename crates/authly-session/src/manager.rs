//! The session manager: issues, resolves, and revokes bearer tokens.
//!
//! The manager owns no session state. Every record lives in the store, and
//! the store alone decides when a record expires. What the manager adds on
//! top of the raw store is:
//!
//! - input validation, before any store access
//! - collision-free issuing via an atomic conditional write, retried a
//!   bounded number of times with fresh candidates
//! - typed errors that carry the failing operation
//!
//! # Concurrency note
//!
//! `SessionManager` is `Send + Sync` and holds nothing mutable, so one
//! instance can be shared behind an `Arc` by every request handler. Two
//! concurrent `issue` calls can't hand out the same token because the write
//! is `SET NX`: whichever reaches the store second sees a collision and
//! moves on to a new candidate. That holds across processes too, since no
//! in-process lock is involved.
//!
//! # Connections
//!
//! Each operation acquires one store connection and closes it before
//! returning. If the future is dropped mid-flight the connection is released
//! by `Drop` instead.

use std::time::Duration;

use authly_store::{SessionStore, StoreConnection, StoreError};

use crate::session::user_index_key;
use crate::token::{SessionToken, TokenGenerator, TokenSource};
use crate::{MAX_SESSION_TTL, Operation, SessionConfig, SessionError, UserId};

/// Issues and validates opaque session tokens against a [`SessionStore`].
///
/// ## Lifecycle
///
/// ```text
/// issue() ──→ [active] ──→ resolve() ──→ user id
///                │
///                ├──→ revoke() ──────────→ [absent]
///                └──→ TTL elapses ───────→ [absent]
/// ```
pub struct SessionManager<S, T = TokenGenerator> {
    store: S,
    tokens: T,
    config: SessionConfig,
}

impl<S: SessionStore> SessionManager<S> {
    /// Creates a manager that draws tokens from the system CSPRNG.
    ///
    /// # Errors
    /// Returns [`SessionError::InvalidInput`] if the config fails
    /// validation.
    pub fn new(store: S, config: SessionConfig) -> Result<Self, SessionError> {
        let tokens = TokenGenerator::new(config.token_length);
        Self::with_token_source(store, tokens, config)
    }
}

impl<S, T> SessionManager<S, T>
where
    S: SessionStore,
    T: TokenSource,
{
    /// Creates a manager with a custom token source.
    ///
    /// # Errors
    /// Returns [`SessionError::InvalidInput`] if the config fails
    /// validation.
    pub fn with_token_source(
        store: S,
        tokens: T,
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        config.validate()?;
        Ok(Self {
            store,
            tokens,
            config,
        })
    }

    /// The configuration this manager was built with.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Issues a new session for `user_id`, valid for `ttl`.
    ///
    /// Sub-second precision in `ttl` is dropped; the store counts whole
    /// seconds.
    ///
    /// # Errors
    /// - [`SessionError::InvalidInput`]: `ttl` is under one second or over
    ///   [`MAX_SESSION_TTL`]
    /// - [`SessionError::TokenSpaceExhausted`]: every candidate collided
    /// - `Store*` variants: the store failed; never retried here
    pub async fn issue(
        &self,
        user_id: &UserId,
        ttl: Duration,
    ) -> Result<SessionToken, SessionError> {
        let ttl_secs = ttl.as_secs();
        if ttl_secs == 0 {
            return Err(SessionError::InvalidInput(
                "session ttl must be at least one second".into(),
            ));
        }
        if ttl_secs > MAX_SESSION_TTL.as_secs() {
            return Err(SessionError::InvalidInput(format!(
                "session ttl must be at most {} seconds",
                MAX_SESSION_TTL.as_secs()
            )));
        }

        let mut conn = self.connect(Operation::Issue).await?;
        let result = self.issue_on(&mut conn, user_id, ttl_secs).await;
        conn.close().await;
        result
    }

    /// Issues a session with a TTL in minutes, falling back to
    /// `default_ttl_minutes` when none is given.
    ///
    /// This is the entry point used by the gateway.
    pub async fn issue_session(
        &self,
        user_id: &str,
        ttl_minutes: Option<u64>,
    ) -> Result<SessionToken, SessionError> {
        let user_id = UserId::new(user_id)?;
        let minutes = ttl_minutes.unwrap_or(self.config.default_ttl_minutes);
        let secs = minutes.checked_mul(60).ok_or_else(|| {
            SessionError::InvalidInput(format!(
                "ttl of {minutes} minutes is out of range"
            ))
        })?;
        self.issue(&user_id, Duration::from_secs(secs)).await
    }

    /// Looks up the user a token belongs to. Never changes the record or
    /// its TTL.
    ///
    /// # Errors
    /// - [`SessionError::InvalidInput`]: the token is malformed
    /// - [`SessionError::SessionNotFound`]: unknown, expired, or revoked
    /// - `Store*` variants: the store failed
    pub async fn resolve(&self, token: &str) -> Result<UserId, SessionError> {
        let token = self.parse_token(token)?;

        let mut conn = self.connect(Operation::Resolve).await?;
        let result = conn.get(token.as_str()).await;
        conn.close().await;

        match store_result(Operation::Resolve, result)? {
            Some(user_id) => {
                tracing::debug!(%token, %user_id, "session resolved");
                UserId::new(user_id)
            }
            None => {
                // An ordinary auth failure, not an operational problem.
                tracing::debug!(%token, "session not found");
                Err(SessionError::SessionNotFound)
            }
        }
    }

    /// Deletes a session. Revoking an unknown or expired token succeeds.
    ///
    /// # Errors
    /// - [`SessionError::InvalidInput`]: the token is malformed
    /// - `Store*` variants: the store failed
    pub async fn revoke(&self, token: &str) -> Result<(), SessionError> {
        let token = self.parse_token(token)?;

        let mut conn = self.connect(Operation::Revoke).await?;
        let result = conn.delete(token.as_str()).await;
        conn.close().await;

        store_result(Operation::Revoke, result)?;
        tracing::info!(%token, "session revoked");
        Ok(())
    }

    /// Revokes the current session of `user_id`, if it has one.
    ///
    /// Only available with `single_session_per_user`, since that is what
    /// maintains the user → token index.
    ///
    /// # Errors
    /// - [`SessionError::InvalidInput`]: single-session mode is off
    /// - `Store*` variants: the store failed
    pub async fn revoke_user(&self, user_id: &UserId) -> Result<(), SessionError> {
        if !self.config.single_session_per_user {
            return Err(SessionError::InvalidInput(
                "revoke_user requires single_session_per_user".into(),
            ));
        }

        let mut conn = self.connect(Operation::RevokeUser).await?;
        let result = revoke_indexed(&mut conn, user_id, None).await;
        conn.close().await;

        store_result(Operation::RevokeUser, result)?;
        tracing::info!(%user_id, "user sessions revoked");
        Ok(())
    }

    /// Checks that the store is reachable and answering.
    pub async fn ping(&self) -> Result<(), SessionError> {
        let mut conn = self.connect(Operation::Ping).await?;
        let result = conn.ping().await;
        conn.close().await;
        store_result(Operation::Ping, result)
    }

    // -- Internals --------------------------------------------------------

    async fn connect(
        &self,
        operation: Operation,
    ) -> Result<S::Connection, SessionError> {
        self.store.connect().await.map_err(|e| {
            tracing::warn!(%operation, error = %e, "session store connect failed");
            SessionError::from_store(operation, e)
        })
    }

    fn parse_token(&self, token: &str) -> Result<SessionToken, SessionError> {
        let token = SessionToken::new(token);
        if !token.is_well_formed(self.config.token_length) {
            return Err(SessionError::InvalidInput(format!(
                "token must be {} alphanumeric characters",
                self.config.token_length
            )));
        }
        Ok(token)
    }

    /// The collision loop. Attempts are bounded by `max_issue_attempts`;
    /// store failures abort immediately instead of burning an attempt.
    async fn issue_on(
        &self,
        conn: &mut S::Connection,
        user_id: &UserId,
        ttl_secs: u64,
    ) -> Result<SessionToken, SessionError> {
        let max_attempts = self.config.max_issue_attempts;

        for attempt in 1..=max_attempts {
            let candidate = self.tokens.next_token();
            let written = conn
                .set_if_absent(candidate.as_str(), user_id.as_str(), ttl_secs)
                .await;

            if !store_result(Operation::Issue, written)? {
                tracing::debug!(
                    %user_id,
                    attempt,
                    max_attempts,
                    "token collision, regenerating"
                );
                continue;
            }

            if self.config.single_session_per_user {
                let indexed =
                    replace_user_session(conn, user_id, &candidate, ttl_secs)
                        .await;
                if indexed.is_err() {
                    // The caller sees a failure, so the token must not stay live.
                    discard_unindexed(conn, user_id, &candidate).await;
                }
                store_result(Operation::Issue, indexed)?;
            }

            tracing::info!(
                %user_id,
                token = %candidate,
                attempt,
                ttl_secs,
                "session issued"
            );
            return Ok(candidate);
        }

        tracing::warn!(
            %user_id,
            attempts = max_attempts,
            "token space exhausted; check the token generator"
        );
        Err(SessionError::TokenSpaceExhausted {
            attempts: max_attempts,
        })
    }
}

fn store_result<V>(
    operation: Operation,
    result: Result<V, StoreError>,
) -> Result<V, SessionError> {
    result.map_err(|e| {
        tracing::warn!(%operation, error = %e, "session store failure");
        SessionError::from_store(operation, e)
    })
}

/// Points the user's index entry at `token` and revokes whatever it pointed
/// at before.
async fn replace_user_session<C: StoreConnection>(
    conn: &mut C,
    user_id: &UserId,
    token: &SessionToken,
    ttl_secs: u64,
) -> Result<(), StoreError> {
    revoke_indexed(conn, user_id, Some(token)).await?;
    conn.set(&user_index_key(user_id), token.as_str(), ttl_secs)
        .await
}

/// Best-effort removal of a token whose index entry could not be written.
async fn discard_unindexed<C: StoreConnection>(
    conn: &mut C,
    user_id: &UserId,
    token: &SessionToken,
) {
    if let Err(e) = conn.delete(token.as_str()).await {
        tracing::warn!(
            %user_id,
            %token,
            error = %e,
            "could not discard unindexed session; it lives until its ttl"
        );
    }
}

/// Deletes the token the user's index entry points at, unless it is `keep`.
///
/// The old token is only deleted while it still maps to this user. If it
/// expired and the string was since issued to someone else, it is left
/// alone. With `keep` unset the index entry itself is removed as well.
async fn revoke_indexed<C: StoreConnection>(
    conn: &mut C,
    user_id: &UserId,
    keep: Option<&SessionToken>,
) -> Result<(), StoreError> {
    let index_key = user_index_key(user_id);
    let Some(previous) = conn.get(&index_key).await? else {
        return Ok(());
    };

    if keep.map(SessionToken::as_str) != Some(previous.as_str()) {
        let owner = conn.get(&previous).await?;
        if owner.as_deref() == Some(user_id.as_str()) {
            conn.delete(&previous).await?;
            tracing::debug!(
                %user_id,
                token = %SessionToken::new(previous),
                "previous session revoked"
            );
        }
    }

    if keep.is_none() {
        conn.delete(&index_key).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    //! Unit tests for `SessionManager` against the in-memory store.
    //!
    //! Naming convention: `test_{function}_{scenario}_{expected}`.
    //! The end-to-end properties (collisions, TTL expiry, concurrency) are
    //! covered in `tests/session_lifecycle.rs`.

    use authly_store::MemoryStore;

    use super::*;

    // -- Helpers ----------------------------------------------------------

    fn manager() -> SessionManager<MemoryStore> {
        SessionManager::new(MemoryStore::new(), SessionConfig::default())
            .expect("default config is valid")
    }

    fn single_session_manager() -> SessionManager<MemoryStore> {
        SessionManager::new(
            MemoryStore::new(),
            SessionConfig {
                single_session_per_user: true,
                ..SessionConfig::default()
            },
        )
        .expect("config is valid")
    }

    fn uid(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    const HOUR: Duration = Duration::from_secs(3600);

    // =====================================================================
    // construction
    // =====================================================================

    #[test]
    fn test_new_invalid_config_returns_error() {
        let result = SessionManager::new(
            MemoryStore::new(),
            SessionConfig {
                max_issue_attempts: 0,
                ..SessionConfig::default()
            },
        );
        assert!(matches!(result, Err(SessionError::InvalidInput(_))));
    }

    // =====================================================================
    // issue()
    // =====================================================================

    #[tokio::test]
    async fn test_issue_returns_token_of_configured_length() {
        let mgr = manager();

        let token = mgr.issue(&uid("u1"), HOUR).await.unwrap();

        assert!(token.is_well_formed(64));
    }

    #[tokio::test]
    async fn test_issue_writes_ttl_to_store() {
        let mgr = manager();

        let token = mgr.issue(&uid("u1"), HOUR).await.unwrap();

        let ttl = mgr.store().ttl(token.as_str()).expect("record exists");
        assert!(ttl <= HOUR && ttl > HOUR - Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_issue_sub_second_ttl_rejected_without_store_access() {
        let mgr = manager();

        let result = mgr.issue(&uid("u1"), Duration::from_millis(500)).await;

        assert!(matches!(result, Err(SessionError::InvalidInput(_))));
        assert_eq!(mgr.store().command_count(), 0);
        assert_eq!(mgr.store().open_connections(), 0);
    }

    #[tokio::test]
    async fn test_issue_ttl_over_maximum_rejected_without_store_access() {
        let mgr = manager();

        let result = mgr
            .issue(&uid("u1"), MAX_SESSION_TTL + Duration::from_secs(1))
            .await;

        assert!(matches!(result, Err(SessionError::InvalidInput(_))));
        assert_eq!(mgr.store().command_count(), 0);
    }

    #[tokio::test]
    async fn test_issue_maximum_ttl_accepted() {
        let mgr = manager();

        let token = mgr.issue(&uid("u1"), MAX_SESSION_TTL).await.unwrap();

        assert_eq!(mgr.resolve(token.as_str()).await.unwrap(), uid("u1"));
    }

    #[tokio::test]
    async fn test_issue_session_huge_minutes_is_invalid_input() {
        let mgr = manager();

        let result = mgr.issue_session("u1", Some(u64::MAX / 60)).await;

        assert!(matches!(result, Err(SessionError::InvalidInput(_))));
        assert!(mgr.store().is_empty());
        assert_eq!(mgr.store().open_connections(), 0);
    }

    #[tokio::test]
    async fn test_issue_session_uses_default_ttl() {
        let mgr = manager();

        let token = mgr.issue_session("u1", None).await.unwrap();

        let ttl = mgr.store().ttl(token.as_str()).unwrap();
        assert!(ttl > Duration::from_secs(1439 * 60));
    }

    #[tokio::test]
    async fn test_issue_session_empty_user_rejected() {
        let mgr = manager();

        let result = mgr.issue_session("", Some(10)).await;

        assert!(matches!(result, Err(SessionError::InvalidInput(_))));
        assert_eq!(mgr.store().command_count(), 0);
    }

    #[tokio::test]
    async fn test_issue_session_overflowing_ttl_rejected() {
        let mgr = manager();

        let result = mgr.issue_session("u1", Some(u64::MAX)).await;

        assert!(matches!(result, Err(SessionError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_issue_store_offline_returns_unavailable() {
        let mgr = manager();
        mgr.store().set_offline(true);

        let result = mgr.issue(&uid("u1"), HOUR).await;

        assert!(matches!(
            result,
            Err(SessionError::StoreUnavailable { operation: Operation::Issue, .. })
        ));
    }

    // =====================================================================
    // resolve()
    // =====================================================================

    #[tokio::test]
    async fn test_resolve_malformed_token_rejected_without_store_access() {
        let mgr = manager();

        let bad_tokens = vec![
            String::new(),
            "short".to_string(),
            "a".repeat(63),
            "a".repeat(65),
            format!("{}!", "a".repeat(63)),
        ];
        for bad in &bad_tokens {
            let result = mgr.resolve(bad).await;
            assert!(
                matches!(result, Err(SessionError::InvalidInput(_))),
                "{bad:?} should be rejected"
            );
        }
        assert_eq!(mgr.store().command_count(), 0);
    }

    #[tokio::test]
    async fn test_resolve_unknown_token_returns_not_found() {
        let mgr = manager();

        let result = mgr.resolve(&"Z".repeat(64)).await;

        assert!(matches!(result, Err(SessionError::SessionNotFound)));
    }

    #[tokio::test]
    async fn test_resolve_releases_connection() {
        let mgr = manager();
        let token = mgr.issue(&uid("u1"), HOUR).await.unwrap();

        mgr.resolve(token.as_str()).await.unwrap();
        let _ = mgr.resolve(&"Z".repeat(64)).await;

        assert_eq!(mgr.store().open_connections(), 0);
    }

    // =====================================================================
    // revoke()
    // =====================================================================

    #[tokio::test]
    async fn test_revoke_is_idempotent() {
        let mgr = manager();
        let token = mgr.issue(&uid("u1"), HOUR).await.unwrap();

        mgr.revoke(token.as_str()).await.unwrap();
        mgr.revoke(token.as_str()).await.unwrap();

        assert!(mgr.store().is_empty());
    }

    #[tokio::test]
    async fn test_revoke_malformed_token_rejected() {
        let mgr = manager();

        let result = mgr.revoke("not a token").await;

        assert!(matches!(result, Err(SessionError::InvalidInput(_))));
    }

    // =====================================================================
    // single_session_per_user / revoke_user()
    // =====================================================================

    #[tokio::test]
    async fn test_issue_single_session_revokes_previous_token() {
        let mgr = single_session_manager();
        let first = mgr.issue(&uid("u1"), HOUR).await.unwrap();

        let second = mgr.issue(&uid("u1"), HOUR).await.unwrap();

        assert!(matches!(
            mgr.resolve(first.as_str()).await,
            Err(SessionError::SessionNotFound)
        ));
        assert_eq!(mgr.resolve(second.as_str()).await.unwrap(), uid("u1"));
    }

    #[tokio::test]
    async fn test_issue_single_session_leaves_other_users_alone() {
        let mgr = single_session_manager();
        let alice = mgr.issue(&uid("alice"), HOUR).await.unwrap();

        mgr.issue(&uid("bob"), HOUR).await.unwrap();

        assert_eq!(mgr.resolve(alice.as_str()).await.unwrap(), uid("alice"));
    }

    #[tokio::test]
    async fn test_issue_multi_session_keeps_previous_token() {
        let mgr = manager();
        let first = mgr.issue(&uid("u1"), HOUR).await.unwrap();

        mgr.issue(&uid("u1"), HOUR).await.unwrap();

        assert_eq!(mgr.resolve(first.as_str()).await.unwrap(), uid("u1"));
    }

    #[tokio::test]
    async fn test_revoke_user_removes_session_and_index() {
        let mgr = single_session_manager();
        let token = mgr.issue(&uid("u1"), HOUR).await.unwrap();

        mgr.revoke_user(&uid("u1")).await.unwrap();

        assert!(matches!(
            mgr.resolve(token.as_str()).await,
            Err(SessionError::SessionNotFound)
        ));
        assert!(mgr.store().is_empty(), "index entry should be gone too");
    }

    #[tokio::test]
    async fn test_revoke_user_without_session_is_ok() {
        let mgr = single_session_manager();

        assert!(mgr.revoke_user(&uid("ghost")).await.is_ok());
    }

    #[tokio::test]
    async fn test_revoke_user_requires_single_session_mode() {
        let mgr = manager();

        let result = mgr.revoke_user(&uid("u1")).await;

        assert!(matches!(result, Err(SessionError::InvalidInput(_))));
    }

    // =====================================================================
    // ping()
    // =====================================================================

    #[tokio::test]
    async fn test_ping_reports_store_health() {
        let mgr = manager();
        assert!(mgr.ping().await.is_ok());

        mgr.store().set_offline(true);
        let result = mgr.ping().await;

        assert!(matches!(
            result,
            Err(SessionError::StoreUnavailable { operation: Operation::Ping, .. })
        ));
    }
}
