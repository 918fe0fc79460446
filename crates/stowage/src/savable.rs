// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

use serde::Serialize;
use stowage_backend::{Backend, CacheBackend, CacheRecord};

use crate::CacheKey;

/// The handle a registry object uses to write itself back to the cache.
///
/// The registry attaches a loader to every object it constructs or restores.
/// It carries the object's [`CacheKey`], the effective descriptor version the
/// object was resolved at, and the TTL from the environment.
#[derive(Clone, Debug)]
pub struct Loader {
    backend: Backend,
    key: CacheKey,
    version: u32,
    ttl: Option<Duration>,
}

impl Loader {
    /// Creates a loader writing under `key` at `version`.
    #[must_use]
    pub fn new(backend: Backend, key: CacheKey, version: u32, ttl: Option<Duration>) -> Self {
        Self {
            backend,
            key,
            version,
            ttl,
        }
    }

    /// The key the object is stored under.
    #[must_use]
    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    /// The effective descriptor version the object belongs to.
    #[must_use]
    pub fn version(&self) -> u32 {
        self.version
    }

    /// The expiry applied to writes.
    #[must_use]
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Wraps `payload` in a [`CacheRecord`] and writes it to the backend.
    ///
    /// Returns `false` if the write did not happen. Failures are logged and
    /// otherwise ignored; the cache is an optimization.
    pub async fn store(&self, payload: Vec<u8>) -> bool {
        let bytes = match CacheRecord::new(payload, self.version).encode() {
            Ok(bytes) => bytes,
            Err(error) => {
                tracing::debug!(key = %self.key, %error, "failed to encode cache record");
                return false;
            }
        };

        match self.backend.set(self.key.as_str(), bytes, self.ttl).await {
            Ok(()) => true,
            Err(error) => {
                tracing::debug!(key = %self.key, %error, "cache write-through skipped");
                false
            }
        }
    }
}

/// An object that can persist its own serialized form in the cache.
///
/// Implementors keep the [`Loader`] handed to them in a field that serde
/// skips:
///
/// ```
/// use serde::{Deserialize, Serialize};
/// use stowage::{CacheSavable, Loader};
///
/// #[derive(Serialize, Deserialize)]
/// struct Settings {
///     theme: String,
///     #[serde(skip)]
///     loader: Option<Loader>,
/// }
///
/// impl CacheSavable for Settings {
///     fn set_loader(&mut self, loader: Loader) {
///         self.loader = Some(loader);
///     }
///
///     fn loader(&self) -> Option<&Loader> {
///         self.loader.as_ref()
///     }
/// }
/// ```
pub trait CacheSavable: Serialize + Send + Sync {
    /// Attaches the loader. Called by the registry before the object is shared.
    fn set_loader(&mut self, loader: Loader);

    /// The attached loader, if any.
    fn loader(&self) -> Option<&Loader>;

    /// Serializes the current state and writes it back under the object's key.
    ///
    /// Returns `false` without a loader, if serialization fails, or if the
    /// backend rejects the write.
    fn cache_self(&self) -> impl Future<Output = bool> + Send
    where
        Self: Sized,
    {
        async move {
            let Some(loader) = self.loader() else {
                return false;
            };

            match serde_json::to_vec(self) {
                Ok(payload) => loader.store(payload).await,
                Err(error) => {
                    tracing::debug!(key = %loader.key(), %error, "failed to serialize object for caching");
                    false
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use stowage_backend::testing::MockBackend;

    use super::*;

    #[derive(Serialize, Deserialize)]
    struct Counter {
        hits: u32,
        #[serde(skip)]
        loader: Option<Loader>,
    }

    impl CacheSavable for Counter {
        fn set_loader(&mut self, loader: Loader) {
            self.loader = Some(loader);
        }

        fn loader(&self) -> Option<&Loader> {
            self.loader.as_ref()
        }
    }

    fn block_on<F: Future>(f: F) -> F::Output {
        futures::executor::block_on(f)
    }

    #[test]
    fn cache_self_without_loader_is_a_no_op() {
        let counter = Counter { hits: 1, loader: None };
        assert!(!block_on(counter.cache_self()));
    }

    #[test]
    fn cache_self_writes_current_state() {
        let mock = MockBackend::new();
        let key = CacheKey::build("app", "counter", 4, &[]);
        let mut counter = Counter { hits: 0, loader: None };
        counter.set_loader(Loader::new(Backend::active(mock.clone()), key.clone(), 4, None));
        counter.hits = 9;

        assert!(block_on(counter.cache_self()));

        let raw = mock.raw(key.as_str()).expect("record written");
        let record = CacheRecord::decode(&raw).expect("valid record");
        assert!(record.is_current(4));
        assert_eq!(record.payload(), br#"{"hits":9}"#);
    }

    #[test]
    fn cache_self_on_degraded_backend_reports_failure() {
        let key = CacheKey::build("app", "counter", 1, &[]);
        let mut counter = Counter { hits: 0, loader: None };
        counter.set_loader(Loader::new(Backend::degraded(), key, 1, None));

        assert!(!block_on(counter.cache_self()));
    }
}
