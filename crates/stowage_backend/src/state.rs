// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Backend selection and the active/degraded state machine.

use std::time::Duration;

use crate::{BackendStats, CacheBackend, DynamicBackend, Error, NullBackend};

/// Which variant a [`Backend`] currently runs on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BackendState {
    /// Operations reach the real store.
    Active,
    /// Operations go to the [`NullBackend`] for the rest of the process.
    Degraded,
}

impl BackendState {
    /// Returns the state as a static string for logging.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Degraded => "degraded",
        }
    }
}

/// The cache backend a process hands to the registry.
///
/// Selection happens once, through [`connect`](Self::connect). A backend that
/// degraded stays degraded until the process ends; a fresh process
/// re-attempts the connection.
///
/// # Examples
///
/// ```
/// use stowage_backend::{Backend, BackendState, NullBackend};
/// # futures::executor::block_on(async {
///
/// let backend = Backend::connect(|| async { Ok::<_, stowage_backend::Error>(NullBackend) }).await;
/// assert_eq!(backend.state(), BackendState::Active);
/// # });
/// ```
#[derive(Clone, Debug)]
pub enum Backend {
    /// A reachable backend.
    Active(DynamicBackend),
    /// The inert fallback.
    Degraded(NullBackend),
}

impl Backend {
    /// Wraps an already connected backend without probing it.
    pub fn active<B>(backend: B) -> Self
    where
        B: CacheBackend + 'static,
    {
        Self::Active(DynamicBackend::new(backend))
    }

    /// Returns a degraded backend.
    #[must_use]
    pub fn degraded() -> Self {
        Self::Degraded(NullBackend)
    }

    /// Runs `connector` and probes the resulting backend.
    ///
    /// A connector error or a failed liveness probe yields a degraded backend;
    /// neither is reported to the caller beyond a warning log.
    pub async fn connect<F, Fut, B>(connector: F) -> Self
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<B, Error>>,
        B: CacheBackend + 'static,
    {
        let backend = match connector().await {
            Ok(backend) => backend,
            Err(error) => {
                tracing::warn!(state = BackendState::Degraded.as_str(), %error, "cache backend connection failed");
                return Self::degraded();
            }
        };

        if backend.server_status().await {
            Self::active(backend)
        } else {
            tracing::warn!(state = BackendState::Degraded.as_str(), "cache backend failed its liveness probe");
            Self::degraded()
        }
    }

    /// Re-attempts the connection of an active backend.
    ///
    /// If the attempt fails the backend degrades. A degraded backend is left
    /// untouched and `connector` is not called.
    pub async fn reconnect<F, Fut, B>(&mut self, connector: F) -> BackendState
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<B, Error>>,
        B: CacheBackend + 'static,
    {
        if self.is_degraded() {
            tracing::debug!("cache backend is degraded for the rest of the process, not reconnecting");
            return BackendState::Degraded;
        }

        *self = Self::connect(connector).await;
        self.state()
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> BackendState {
        match self {
            Self::Active(_) => BackendState::Active,
            Self::Degraded(_) => BackendState::Degraded,
        }
    }

    /// Returns `true` when running on the null backend.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.state() == BackendState::Degraded
    }
}

impl Default for Backend {
    fn default() -> Self {
        Self::degraded()
    }
}

impl CacheBackend for Backend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
        match self {
            Self::Active(b) => b.get(key).await,
            Self::Degraded(b) => b.get(key).await,
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<(), Error> {
        match self {
            Self::Active(b) => b.set(key, value, ttl).await,
            Self::Degraded(b) => b.set(key, value, ttl).await,
        }
    }

    async fn add(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<bool, Error> {
        match self {
            Self::Active(b) => b.add(key, value, ttl).await,
            Self::Degraded(b) => b.add(key, value, ttl).await,
        }
    }

    async fn replace(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<bool, Error> {
        match self {
            Self::Active(b) => b.replace(key, value, ttl).await,
            Self::Degraded(b) => b.replace(key, value, ttl).await,
        }
    }

    async fn delete(&self, key: &str) -> Result<bool, Error> {
        match self {
            Self::Active(b) => b.delete(key).await,
            Self::Degraded(b) => b.delete(key).await,
        }
    }

    async fn increment(&self, key: &str, delta: u64) -> Result<Option<u64>, Error> {
        match self {
            Self::Active(b) => b.increment(key, delta).await,
            Self::Degraded(b) => b.increment(key, delta).await,
        }
    }

    async fn decrement(&self, key: &str, delta: u64) -> Result<Option<u64>, Error> {
        match self {
            Self::Active(b) => b.decrement(key, delta).await,
            Self::Degraded(b) => b.decrement(key, delta).await,
        }
    }

    async fn flush(&self) -> Result<(), Error> {
        match self {
            Self::Active(b) => b.flush().await,
            Self::Degraded(b) => b.flush().await,
        }
    }

    async fn stats(&self) -> Result<BackendStats, Error> {
        match self {
            Self::Active(b) => b.stats().await,
            Self::Degraded(b) => b.stats().await,
        }
    }

    async fn version(&self) -> Result<String, Error> {
        match self {
            Self::Active(b) => b.version().await,
            Self::Degraded(b) => b.version().await,
        }
    }

    async fn server_status(&self) -> bool {
        match self {
            Self::Active(b) => b.server_status().await,
            Self::Degraded(b) => b.server_status().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockBackend;

    fn block_on<F: std::future::Future>(f: F) -> F::Output {
        futures::executor::block_on(f)
    }

    #[test]
    fn state_as_str() {
        assert_eq!(BackendState::Active.as_str(), "active");
        assert_eq!(BackendState::Degraded.as_str(), "degraded");
    }

    #[test]
    fn default_backend_is_degraded() {
        assert!(Backend::default().is_degraded());
    }

    #[test]
    fn unreachable_backend_degrades_on_connect() {
        block_on(async {
            let mock = MockBackend::new();
            mock.set_reachable(false);

            let backend = Backend::connect(|| async { Ok::<_, Error>(mock) }).await;
            assert_eq!(backend.state(), BackendState::Degraded);
        });
    }

    #[test]
    fn reconnect_failure_degrades_active_backend() {
        block_on(async {
            let mut backend = Backend::active(MockBackend::new());

            let state = backend
                .reconnect(|| async { Err::<MockBackend, _>(Error::from_message("refused")) })
                .await;

            assert_eq!(state, BackendState::Degraded);
            assert!(backend.is_degraded());
        });
    }

    #[test]
    fn degraded_backend_never_reconnects() {
        block_on(async {
            let mut backend = Backend::degraded();
            let mut called = false;

            let state = backend
                .reconnect(|| {
                    called = true;
                    async { Ok::<_, Error>(MockBackend::new()) }
                })
                .await;

            assert_eq!(state, BackendState::Degraded);
            assert!(!called, "connector must not run for a degraded backend");
        });
    }

    #[test]
    fn active_backend_delegates_to_store() {
        block_on(async {
            let mock = MockBackend::new();
            let backend = Backend::active(mock.clone());

            backend.set("k", b"v".to_vec(), None).await.expect("set failed");
            assert_eq!(mock.raw("k"), Some(b"v".to_vec()));
            assert_eq!(backend.get("k").await.expect("get failed"), Some(b"v".to_vec()));
        });
    }
}
