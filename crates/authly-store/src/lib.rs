//! Session store abstraction for Authly.
//!
//! Provides the [`SessionStore`] and [`StoreConnection`] traits that abstract
//! over a TTL-capable key-value service, plus two implementations:
//!
//! - [`RedisStore`]: the production backend (feature `redis`, default)
//! - [`MemoryStore`]: an in-process store with the same semantics, used in
//!   development and tests
//!
//! The store knows nothing about tokens or users. It only moves strings in
//! and out with an expiry; retries and collision handling live one layer up
//! in `authly-session`.
//!
//! # Feature Flags
//!
//! - `redis` (default): Redis backend via the `redis` crate

mod error;
mod memory;
#[cfg(feature = "redis")]
mod redis_store;

pub use error::StoreError;
pub use memory::{MemoryConnection, MemoryStore};
#[cfg(feature = "redis")]
pub use redis_store::{RedisConnection, RedisStore, RedisStoreConfig};

use std::future::Future;

/// A TTL-capable key-value service that hands out connections.
///
/// `connect` is the scoped acquisition step: every operation against the
/// store happens on a [`StoreConnection`] obtained here, and the connection
/// is released by [`StoreConnection::close`] or, on any other exit path
/// (early return, error, dropped future), by `Drop`.
pub trait SessionStore: Send + Sync + 'static {
    /// The connection type produced by this store.
    type Connection: StoreConnection;

    /// Acquires a connection to the backing service.
    ///
    /// # Errors
    /// Returns [`StoreError::Unavailable`] if the service can't be reached.
    fn connect(
        &self,
    ) -> impl Future<Output = Result<Self::Connection, StoreError>> + Send;
}

/// A single acquired connection to the store.
///
/// Methods mirror the store protocol one-to-one:
///
/// ```text
/// set            SET key value EX ttl
/// set_if_absent  SET key value EX ttl NX
/// get            GET key
/// exists         EXISTS key
/// delete         DEL key
/// ping           PING
/// ```
pub trait StoreConnection: Send + 'static {
    /// Writes `key → value`, expiring after `ttl_secs` seconds.
    /// Overwrites any existing value.
    fn set(
        &mut self,
        key: &str,
        value: &str,
        ttl_secs: u64,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Atomically writes `key → value` with expiry only if `key` is absent.
    ///
    /// Returns `Ok(true)` if the value was written, `Ok(false)` if an
    /// unexpired value already occupied the key (nothing was changed).
    /// Against Redis these are the `OK` and nil replies of `SET ... NX`.
    fn set_if_absent(
        &mut self,
        key: &str,
        value: &str,
        ttl_secs: u64,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Reads a value. `Ok(None)` means the key is absent or expired.
    fn get(
        &mut self,
        key: &str,
    ) -> impl Future<Output = Result<Option<String>, StoreError>> + Send;

    /// Returns `true` if an unexpired value exists under `key`.
    fn exists(
        &mut self,
        key: &str,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Deletes a key. Deleting an absent key is not an error.
    fn delete(
        &mut self,
        key: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Round-trips a no-op command to check the service is healthy.
    fn ping(&mut self) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Releases the connection.
    ///
    /// Defaults to dropping it. Backends that need an orderly shutdown
    /// should override this, but must still release on drop.
    fn close(self) -> impl Future<Output = ()> + Send
    where
        Self: Sized,
    {
        async move { drop(self) }
    }
}
