//! In-process store with Redis-like TTL semantics.
//!
//! Expiry is measured with `tokio::time::Instant`, so tests can pause the
//! runtime clock and `advance` it past a TTL without sleeping. Expired
//! entries are purged lazily, the next time anything touches them.
//!
//! Besides the data itself the store tracks two counters that tests lean
//! on: how many connections are currently open, and how many commands have
//! been executed. A store can also be switched "offline" to simulate an
//! outage.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

use crate::{SessionStore, StoreConnection, StoreError};

#[derive(Debug)]
struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

#[derive(Debug, Default)]
struct Shared {
    entries: Mutex<HashMap<String, Entry>>,
    offline: AtomicBool,
    open_connections: AtomicUsize,
    commands: AtomicUsize,
}

impl Shared {
    /// Locks the map, dropping every entry whose TTL has elapsed.
    fn live_entries(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        // A poisoned lock only means another test thread panicked mid-call.
        // The map itself is never left half-updated, so keep going.
        let mut entries =
            self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        entries.retain(|_, entry| entry.is_live(now));
        entries
    }
}

/// A [`SessionStore`] that keeps everything in memory.
///
/// Cloning is cheap and every clone sees the same data, the same way two
/// processes pointed at one Redis instance would.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates an outage (`true`) or recovery (`false`).
    ///
    /// While offline, `connect` and every command on an already-open
    /// connection fail with [`StoreError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.shared.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of connections acquired and not yet released.
    pub fn open_connections(&self) -> usize {
        self.shared.open_connections.load(Ordering::SeqCst)
    }

    /// Number of commands executed so far (connects excluded).
    pub fn command_count(&self) -> usize {
        self.shared.commands.load(Ordering::SeqCst)
    }

    /// Number of unexpired keys.
    pub fn len(&self) -> usize {
        self.shared.live_entries().len()
    }

    /// Returns `true` if no unexpired keys remain.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remaining lifetime of a key, or `None` if it is absent or expired.
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        self.shared
            .live_entries()
            .get(key)
            .map(|entry| entry.expires_at.saturating_duration_since(now))
    }
}

impl SessionStore for MemoryStore {
    type Connection = MemoryConnection;

    async fn connect(&self) -> Result<MemoryConnection, StoreError> {
        if self.shared.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(
                "memory store is offline".into(),
            ));
        }
        self.shared.open_connections.fetch_add(1, Ordering::SeqCst);
        Ok(MemoryConnection {
            shared: Arc::clone(&self.shared),
        })
    }
}

/// A connection to a [`MemoryStore`]. Released on drop.
#[derive(Debug)]
pub struct MemoryConnection {
    shared: Arc<Shared>,
}

impl MemoryConnection {
    /// Counts the command and fails if the store has gone offline.
    fn begin(&self, command: &str) -> Result<(), StoreError> {
        self.shared.commands.fetch_add(1, Ordering::SeqCst);
        if self.shared.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!(
                "memory store is offline ({command})"
            )));
        }
        Ok(())
    }

    fn entry(value: &str, ttl_secs: u64) -> Result<Entry, StoreError> {
        // Mirrors Redis, which rejects `EX 0`.
        if ttl_secs == 0 {
            return Err(StoreError::WriteFailed(
                "invalid expire time in 'set' command".into(),
            ));
        }
        let expires_at = Instant::now()
            .checked_add(Duration::from_secs(ttl_secs))
            .ok_or_else(|| {
                StoreError::WriteFailed(
                    "invalid expire time in 'set' command".into(),
                )
            })?;
        Ok(Entry {
            value: value.to_owned(),
            expires_at,
        })
    }
}

impl Drop for MemoryConnection {
    fn drop(&mut self) {
        self.shared.open_connections.fetch_sub(1, Ordering::SeqCst);
    }
}

impl StoreConnection for MemoryConnection {
    async fn set(
        &mut self,
        key: &str,
        value: &str,
        ttl_secs: u64,
    ) -> Result<(), StoreError> {
        self.begin("SET")?;
        let entry = Self::entry(value, ttl_secs)?;
        self.shared.live_entries().insert(key.to_owned(), entry);
        Ok(())
    }

    async fn set_if_absent(
        &mut self,
        key: &str,
        value: &str,
        ttl_secs: u64,
    ) -> Result<bool, StoreError> {
        self.begin("SET NX")?;
        let entry = Self::entry(value, ttl_secs)?;
        // Check and insert happen under one lock acquisition, which is what
        // makes this a conditional write rather than exists-then-set.
        let mut entries = self.shared.live_entries();
        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(key.to_owned(), entry);
        Ok(true)
    }

    async fn get(&mut self, key: &str) -> Result<Option<String>, StoreError> {
        self.begin("GET")?;
        Ok(self
            .shared
            .live_entries()
            .get(key)
            .map(|entry| entry.value.clone()))
    }

    async fn exists(&mut self, key: &str) -> Result<bool, StoreError> {
        self.begin("EXISTS")?;
        Ok(self.shared.live_entries().contains_key(key))
    }

    async fn delete(&mut self, key: &str) -> Result<(), StoreError> {
        self.begin("DEL")?;
        self.shared.live_entries().remove(key);
        Ok(())
    }

    async fn ping(&mut self) -> Result<(), StoreError> {
        self.begin("PING")
    }
}
