//! Redis store implementation using the `redis` crate.
//!
//! One [`ConnectionManager`] is established lazily on the first `connect`
//! and shared by every [`RedisConnection`] handed out afterwards. The
//! manager multiplexes commands over a single socket and reconnects on its
//! own, so a "connection" here is a cheap clone scoped to one call.

use std::future::Future;
use std::time::Duration;

use redis::aio::ConnectionManager;
use redis::{RedisError, Value};
use tokio::sync::OnceCell;

use crate::{SessionStore, StoreConnection, StoreError};

/// Where and how to reach Redis.
#[derive(Debug, Clone)]
pub struct RedisStoreConfig {
    pub host: String,
    pub port: u16,
    /// Logical database index (`SELECT n`).
    pub index: i64,
    /// Upper bound for connecting and for every single command.
    pub command_timeout: Duration,
}

impl Default for RedisStoreConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6379,
            index: 0,
            command_timeout: Duration::from_secs(2),
        }
    }
}

impl RedisStoreConfig {
    /// Renders the `redis://` URL for this config.
    pub fn url(&self) -> String {
        format!("redis://{}:{}/{}", self.host, self.port, self.index)
    }
}

/// A [`SessionStore`] backed by a Redis server.
pub struct RedisStore {
    client: redis::Client,
    addr: String,
    manager: OnceCell<ConnectionManager>,
    timeout: Duration,
}

impl RedisStore {
    /// Creates a store for the given config without touching the network.
    ///
    /// # Errors
    /// Returns [`StoreError::Unavailable`] if the config doesn't form a
    /// valid Redis URL.
    pub fn new(config: &RedisStoreConfig) -> Result<Self, StoreError> {
        let client = redis::Client::open(config.url())
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(Self {
            client,
            addr: format!("{}:{}", config.host, config.port),
            manager: OnceCell::new(),
            timeout: config.command_timeout,
        })
    }
}

impl SessionStore for RedisStore {
    type Connection = RedisConnection;

    async fn connect(&self) -> Result<RedisConnection, StoreError> {
        let manager = self
            .manager
            .get_or_try_init(|| async {
                let manager = tokio::time::timeout(
                    self.timeout,
                    self.client.get_connection_manager(),
                )
                .await
                .map_err(|_| {
                    StoreError::Unavailable(format!(
                        "connect timed out after {:?}",
                        self.timeout
                    ))
                })?
                .map_err(|e| StoreError::Unavailable(e.to_string()))?;
                tracing::info!(addr = %self.addr, "connected to redis");
                Ok::<_, StoreError>(manager)
            })
            .await?;

        Ok(RedisConnection {
            manager: manager.clone(),
            timeout: self.timeout,
        })
    }
}

/// Whether a command reads or writes; picks the error variant on failure.
#[derive(Debug, Clone, Copy)]
enum Access {
    Read,
    Write,
}

/// A handle to the shared Redis connection, scoped to one call.
pub struct RedisConnection {
    manager: ConnectionManager,
    timeout: Duration,
}

impl RedisConnection {
    /// Runs one command under the timeout and classifies its failure.
    async fn run<T>(
        &mut self,
        command: &'static str,
        access: Access,
        cmd: redis::Cmd,
    ) -> Result<T, StoreError>
    where
        T: redis::FromRedisValue + Send,
    {
        let timeout = self.timeout;
        let query = cmd.query_async::<T>(&mut self.manager);
        with_timeout(command, timeout, query)
            .await?
            .map_err(|e| classify(command, access, e))
    }
}

async fn with_timeout<F, T>(
    command: &'static str,
    timeout: Duration,
    fut: F,
) -> Result<T, StoreError>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(timeout, fut).await.map_err(|_| {
        tracing::warn!(command, ?timeout, "redis command timed out");
        StoreError::Unavailable(format!(
            "{command} timed out after {timeout:?}"
        ))
    })
}

/// Connection-level failures mean the service is unreachable; anything else
/// is a failure of the command itself.
fn classify(command: &str, access: Access, err: RedisError) -> StoreError {
    if err.is_io_error()
        || err.is_connection_refusal()
        || err.is_connection_dropped()
        || err.is_timeout()
    {
        return StoreError::Unavailable(format!("{command}: {err}"));
    }
    match access {
        Access::Read => StoreError::ReadFailed(format!("{command}: {err}")),
        Access::Write => StoreError::WriteFailed(format!("{command}: {err}")),
    }
}

impl StoreConnection for RedisConnection {
    async fn set(
        &mut self,
        key: &str,
        value: &str,
        ttl_secs: u64,
    ) -> Result<(), StoreError> {
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value).arg("EX").arg(ttl_secs);
        self.run::<()>("SET", Access::Write, cmd).await
    }

    async fn set_if_absent(
        &mut self,
        key: &str,
        value: &str,
        ttl_secs: u64,
    ) -> Result<bool, StoreError> {
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value).arg("EX").arg(ttl_secs).arg("NX");
        let reply = self.run::<Value>("SET NX", Access::Write, cmd).await?;
        Ok(!matches!(reply, Value::Nil))
    }

    async fn get(&mut self, key: &str) -> Result<Option<String>, StoreError> {
        let mut cmd = redis::cmd("GET");
        cmd.arg(key);
        self.run::<Option<String>>("GET", Access::Read, cmd).await
    }

    async fn exists(&mut self, key: &str) -> Result<bool, StoreError> {
        let mut cmd = redis::cmd("EXISTS");
        cmd.arg(key);
        let count = self.run::<i64>("EXISTS", Access::Read, cmd).await?;
        Ok(count > 0)
    }

    async fn delete(&mut self, key: &str) -> Result<(), StoreError> {
        let mut cmd = redis::cmd("DEL");
        cmd.arg(key);
        self.run::<i64>("DEL", Access::Write, cmd).await.map(|_| ())
    }

    async fn ping(&mut self) -> Result<(), StoreError> {
        self.run::<String>("PING", Access::Read, redis::cmd("PING"))
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default_points_at_local_redis() {
        let config = RedisStoreConfig::default();
        assert_eq!(config.url(), "redis://127.0.0.1:6379/0");
        assert_eq!(config.command_timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_config_url_includes_index() {
        let config = RedisStoreConfig {
            host: "cache.internal".into(),
            port: 6380,
            index: 3,
            ..RedisStoreConfig::default()
        };
        assert_eq!(config.url(), "redis://cache.internal:6380/3");
    }

    #[test]
    fn test_new_does_not_connect() {
        // Port 1 is never a Redis server; construction must still succeed
        // because nothing is dialed until `connect`.
        let config = RedisStoreConfig {
            port: 1,
            ..RedisStoreConfig::default()
        };
        assert!(RedisStore::new(&config).is_ok());
    }

    #[tokio::test]
    async fn test_connect_unreachable_returns_unavailable() {
        let config = RedisStoreConfig {
            port: 1,
            command_timeout: Duration::from_millis(500),
            ..RedisStoreConfig::default()
        };
        let store = RedisStore::new(&config).unwrap();

        let result = store.connect().await;

        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_with_timeout_elapsed_returns_unavailable() {
        let result = with_timeout(
            "GET",
            Duration::from_millis(10),
            std::future::pending::<()>(),
        )
        .await;

        assert!(
            matches!(result, Err(StoreError::Unavailable(ref msg)) if msg.contains("GET"))
        );
    }
}
