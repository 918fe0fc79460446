// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! In-memory backend implementation using moka.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use futures::lock::Mutex;
use moka::{Expiry, future::Cache};
use stowage_backend::{BackendStats, CacheBackend, Error};

use crate::builder::MemoryBackendBuilder;

#[derive(Clone, Copy, Debug)]
enum Lifetime {
    /// Expire this long after the write, or never.
    Fresh(Option<Duration>),
    /// Keep whatever time the previous value had left.
    Remaining,
}

#[derive(Clone, Debug)]
struct Stored {
    value: Vec<u8>,
    lifetime: Lifetime,
}

/// Derives each entry's expiry from its [`Lifetime`].
struct PerEntryTtl;

impl Expiry<String, Stored> for PerEntryTtl {
    fn expire_after_create(&self, _key: &String, stored: &Stored, _created_at: Instant) -> Option<Duration> {
        match stored.lifetime {
            Lifetime::Fresh(ttl) => ttl,
            Lifetime::Remaining => None,
        }
    }

    fn expire_after_update(
        &self,
        _key: &String,
        stored: &Stored,
        _updated_at: Instant,
        duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        match stored.lifetime {
            Lifetime::Fresh(ttl) => ttl,
            Lifetime::Remaining => duration_until_expiry,
        }
    }
}

struct Inner {
    entries: Cache<String, Stored>,
    default_ttl: Option<Duration>,
    name: Option<String>,
    // Serializes read-modify-write operations.
    write_lock: Mutex<()>,
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
}

/// An in-memory cache backend backed by moka.
///
/// Per-entry TTLs are handed to moka, which stops returning an entry once it
/// expires and purges it during maintenance. `add`, `replace`, `increment` and
/// `decrement` are atomic with respect to each other.
///
/// Cloning is cheap; clones share the same entries.
///
/// # Examples
///
/// ```
/// use stowage_backend::CacheBackend;
/// use stowage_memory::MemoryBackend;
/// # futures::executor::block_on(async {
///
/// let backend = MemoryBackend::new();
/// assert!(backend.add("counter", b"1".to_vec(), None).await?);
/// assert_eq!(backend.increment("counter", 4).await?, Some(5));
/// # Ok::<(), stowage_backend::Error>(())
/// # });
/// ```
#[derive(Clone)]
pub struct MemoryBackend {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for MemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBackend")
            .field("name", &self.inner.name)
            .field("default_ttl", &self.inner.default_ttl)
            .finish_non_exhaustive()
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Creates a new unbounded backend without default expiry.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Creates a new builder for configuring a backend.
    #[must_use]
    pub fn builder() -> MemoryBackendBuilder {
        MemoryBackendBuilder::new()
    }

    pub(crate) fn from_builder(builder: MemoryBackendBuilder) -> Self {
        let mut moka_builder = Cache::builder().expire_after(PerEntryTtl);

        if let Some(capacity) = builder.max_capacity {
            moka_builder = moka_builder.max_capacity(capacity);
        }

        if let Some(capacity) = builder.initial_capacity {
            moka_builder = moka_builder.initial_capacity(capacity);
        }

        if let Some(name) = builder.name.as_deref() {
            moka_builder = moka_builder.name(name);
        }

        Self {
            inner: Arc::new(Inner {
                entries: moka_builder.build(),
                default_ttl: builder.default_ttl,
                name: builder.name,
                write_lock: Mutex::new(()),
                hits: AtomicU64::new(0),
                misses: AtomicU64::new(0),
                writes: AtomicU64::new(0),
            }),
        }
    }

    fn stored(&self, value: Vec<u8>, ttl: Option<Duration>) -> Stored {
        Stored {
            value,
            lifetime: Lifetime::Fresh(ttl.or(self.inner.default_ttl)),
        }
    }

    async fn live(&self, key: &str) -> Option<Stored> {
        self.inner.entries.get(key).await
    }

    async fn write(&self, key: &str, stored: Stored) {
        self.inner.entries.insert(key.to_owned(), stored).await;
        self.inner.writes.fetch_add(1, Ordering::Relaxed);
    }

    async fn update_counter(&self, key: &str, apply: impl FnOnce(u64) -> u64) -> Result<Option<u64>, Error> {
        let _guard = self.inner.write_lock.lock().await;

        let Some(stored) = self.live(key).await else {
            return Ok(None);
        };
        let current = std::str::from_utf8(&stored.value)
            .ok()
            .and_then(|text| text.trim().parse::<u64>().ok())
            .ok_or_else(|| Error::from_message(format!("value under `{key}` is not a counter")))?;

        let next = apply(current);
        self.write(
            key,
            Stored {
                value: next.to_string().into_bytes(),
                lifetime: Lifetime::Remaining,
            },
        )
        .await;
        Ok(Some(next))
    }
}

impl CacheBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
        let value = self.live(key).await.map(|stored| stored.value);
        let counter = if value.is_some() { &self.inner.hits } else { &self.inner.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        Ok(value)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<(), Error> {
        self.write(key, self.stored(value, ttl)).await;
        Ok(())
    }

    async fn add(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<bool, Error> {
        let _guard = self.inner.write_lock.lock().await;
        if self.live(key).await.is_some() {
            return Ok(false);
        }
        self.write(key, self.stored(value, ttl)).await;
        Ok(true)
    }

    async fn replace(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<bool, Error> {
        let _guard = self.inner.write_lock.lock().await;
        if self.live(key).await.is_none() {
            return Ok(false);
        }
        self.write(key, self.stored(value, ttl)).await;
        Ok(true)
    }

    async fn delete(&self, key: &str) -> Result<bool, Error> {
        Ok(self.inner.entries.remove(key).await.is_some())
    }

    async fn increment(&self, key: &str, delta: u64) -> Result<Option<u64>, Error> {
        self.update_counter(key, |current| current.wrapping_add(delta)).await
    }

    async fn decrement(&self, key: &str, delta: u64) -> Result<Option<u64>, Error> {
        self.update_counter(key, |current| current.saturating_sub(delta)).await
    }

    async fn flush(&self) -> Result<(), Error> {
        self.inner.entries.invalidate_all();
        Ok(())
    }

    async fn stats(&self) -> Result<BackendStats, Error> {
        self.inner.entries.run_pending_tasks().await;
        Ok(BackendStats {
            entries: Some(self.inner.entries.entry_count()),
            hits: self.inner.hits.load(Ordering::Relaxed),
            misses: self.inner.misses.load(Ordering::Relaxed),
            writes: self.inner.writes.load(Ordering::Relaxed),
        })
    }

    async fn version(&self) -> Result<String, Error> {
        let name = self.inner.name.as_deref().unwrap_or("memory");
        Ok(format!("{name}/{}", env!("CARGO_PKG_VERSION")))
    }

    async fn server_status(&self) -> bool {
        true
    }
}
