//! Walks one user through the session lifecycle.
//!
//! ```text
//! cargo run -p session-demo            # in-memory store
//! cargo run -p session-demo -- --redis # Redis from config/authly.toml / AUTHLY__*
//! ```

use authly::prelude::*;

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// One hard-coded account. Real deployments check a user store.
struct DemoVerifier;

impl CredentialVerifier for DemoVerifier {
    async fn verify(&self, login: &str, secret: &str) -> Result<UserId, SessionError> {
        if login == "demo" && secret == "demo-secret" {
            return UserId::new("user-123");
        }
        Err(SessionError::AuthFailed("unknown login or wrong secret".into()))
    }
}

// ---------------------------------------------------------------------------
// Scenario
// ---------------------------------------------------------------------------

async fn walk_through<S: SessionStore>(
    gateway: AuthGateway<DemoVerifier, S>,
) -> Result<(), AuthlyError> {
    gateway.ready().await?;

    if let Err(e) = gateway.login("demo", "wrong", None).await {
        eprintln!("bad password rejected: {e} ({:?})", e.kind());
    }

    let login = gateway.login("demo", "demo-secret", Some(5)).await?;
    eprintln!(
        "issued {}… expiring in {}s",
        &login.access_token[..8],
        login.expires_in
    );

    let header = format!("Bearer {}", login.access_token);
    let user = gateway.authenticate(&header).await?;
    eprintln!("token resolves to {user}");

    gateway.logout(&header).await?;
    match gateway.authenticate(&header).await {
        Err(e) if e.kind() == ErrorKind::Unauthorized => {
            eprintln!("after logout: {e}");
        }
        other => eprintln!("unexpected result after logout: {other:?}"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    authly::logging::init();
    let config = AuthlyConfig::load()?;

    if std::env::args().any(|arg| arg == "--redis") {
        tracing::info!(host = %config.store.host, port = config.store.port, "using redis store");
        let sessions = authly::redis_session_manager(&config)?;
        walk_through(AuthGateway::new(DemoVerifier, sessions)).await?;
    } else {
        tracing::info!("using in-memory store");
        let sessions = SessionManager::new(MemoryStore::new(), config.session_config())?;
        walk_through(AuthGateway::new(DemoVerifier, sessions)).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_walk_through_in_memory_succeeds() {
        let sessions =
            SessionManager::new(MemoryStore::new(), SessionConfig::default()).unwrap();

        let result = walk_through(AuthGateway::new(DemoVerifier, sessions)).await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_demo_verifier_rejects_wrong_secret() {
        let result = DemoVerifier.verify("demo", "nope").await;
        assert!(matches!(result, Err(SessionError::AuthFailed(_))));
    }
}
