//! Structured logging setup.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the global `tracing` subscriber.
///
/// Log levels come from `RUST_LOG`, defaulting to `info` with the Redis
/// client turned down to `warn`. Calling this more than once is harmless;
/// only the first call installs anything.
///
/// # Example
///
/// ```no_run
/// authly::logging::init();
/// tracing::info!("auth service starting");
/// ```
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,redis=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);

    if tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .is_ok()
    {
        tracing::debug!("logging initialized");
    }
}

/// Records a security-relevant event (failed login, malformed token).
///
/// Kept separate from ordinary logs so they can be routed or alerted on by
/// the `event_type` field.
pub fn log_security_event(event_type: &str, login: Option<&str>, message: &str) {
    tracing::warn!(event_type, login, "SECURITY: {message}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_does_not_panic() {
        init();
        init();
    }

    #[test]
    fn test_log_security_event() {
        log_security_event("failed_login", Some("alice"), "wrong secret");
        log_security_event("malformed_token", None, "bad bearer header");
    }
}
