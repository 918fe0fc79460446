// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

use crate::{BackendStats, CacheBackend, Error};

/// The backend a process runs on after its real backend could not be reached.
///
/// Every read misses and every other operation fails with
/// [`Error::unavailable`], no matter how often or in which order it is called.
/// [`server_status`](CacheBackend::server_status) still reports `true`: the
/// backend is intentionally inert, not recovering, and must not prompt callers
/// to reconnect.
///
/// # Examples
///
/// ```
/// use stowage_backend::{CacheBackend, NullBackend};
/// # futures::executor::block_on(async {
///
/// let backend = NullBackend;
/// assert!(backend.get("key").await.expect("null get never fails").is_none());
/// assert!(backend.add("key", vec![1], None).await.is_err());
/// assert!(backend.server_status().await);
/// # });
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NullBackend;

impl CacheBackend for NullBackend {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, Error> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Option<Duration>) -> Result<(), Error> {
        Err(Error::unavailable())
    }

    async fn add(&self, _key: &str, _value: Vec<u8>, _ttl: Option<Duration>) -> Result<bool, Error> {
        Err(Error::unavailable())
    }

    async fn replace(&self, _key: &str, _value: Vec<u8>, _ttl: Option<Duration>) -> Result<bool, Error> {
        Err(Error::unavailable())
    }

    async fn delete(&self, _key: &str) -> Result<bool, Error> {
        Err(Error::unavailable())
    }

    async fn increment(&self, _key: &str, _delta: u64) -> Result<Option<u64>, Error> {
        Err(Error::unavailable())
    }

    async fn decrement(&self, _key: &str, _delta: u64) -> Result<Option<u64>, Error> {
        Err(Error::unavailable())
    }

    async fn flush(&self) -> Result<(), Error> {
        Err(Error::unavailable())
    }

    async fn stats(&self) -> Result<BackendStats, Error> {
        Err(Error::unavailable())
    }

    async fn version(&self) -> Result<String, Error> {
        Err(Error::unavailable())
    }

    async fn server_status(&self) -> bool {
        true
    }
}
