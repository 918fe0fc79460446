// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Dynamic backend wrapper for type erasure.

use std::{fmt::Debug, sync::Arc, time::Duration};

use crate::{BackendStats, CacheBackend, Error, backend::DynCacheBackend};

/// Extension trait for converting any `CacheBackend` into a `DynamicBackend`.
///
/// This trait is automatically implemented for all types that implement `CacheBackend`.
///
/// # Examples
///
/// ```
/// use stowage_backend::{DynamicBackend, DynamicBackendExt, NullBackend};
///
/// let dynamic: DynamicBackend = NullBackend.into_dynamic();
/// ```
pub trait DynamicBackendExt: Sized {
    /// Converts this backend into a `DynamicBackend`.
    fn into_dynamic(self) -> DynamicBackend;
}

impl<T> DynamicBackendExt for T
where
    T: CacheBackend + 'static,
{
    fn into_dynamic(self) -> DynamicBackend {
        DynamicBackend::new(self)
    }
}

/// A clonable backend with type erasure.
///
/// `DynamicBackend` wraps a trait object in an `Arc` so one connected backend
/// can be shared by every execution in a process without making the registry
/// generic over the concrete store.
pub struct DynamicBackend(Arc<DynCacheBackend<'static>>);

impl DynamicBackend {
    /// Creates a new dynamic backend from any `CacheBackend` implementation.
    pub fn new<T>(backend: T) -> Self
    where
        T: CacheBackend + 'static,
    {
        Self(DynCacheBackend::new_arc(backend))
    }
}

impl Debug for DynamicBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicBackend").finish()
    }
}

impl Clone for DynamicBackend {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl CacheBackend for DynamicBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
        self.0.get(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<(), Error> {
        self.0.set(key, value, ttl).await
    }

    async fn add(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<bool, Error> {
        self.0.add(key, value, ttl).await
    }

    async fn replace(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<bool, Error> {
        self.0.replace(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<bool, Error> {
        self.0.delete(key).await
    }

    async fn increment(&self, key: &str, delta: u64) -> Result<Option<u64>, Error> {
        self.0.increment(key, delta).await
    }

    async fn decrement(&self, key: &str, delta: u64) -> Result<Option<u64>, Error> {
        self.0.decrement(key, delta).await
    }

    async fn flush(&self) -> Result<(), Error> {
        self.0.flush().await
    }

    async fn stats(&self) -> Result<BackendStats, Error> {
        self.0.stats().await
    }

    async fn version(&self) -> Result<String, Error> {
        self.0.version().await
    }

    async fn server_status(&self) -> bool {
        self.0.server_status().await
    }
}
