// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The protocol every cache backend speaks.
//!
//! [`CacheBackend`] mirrors the operations of a memcached-style volatile store.
//! Concrete backends and the [`NullBackend`](crate::NullBackend) implement it
//! with identical signatures, so callers never branch on which one they hold.

use std::time::Duration;

use crate::Error;

/// Counters reported by [`CacheBackend::stats`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BackendStats {
    /// Number of live entries, if the backend tracks it.
    pub entries: Option<u64>,
    /// Reads that found a value.
    pub hits: u64,
    /// Reads that found nothing.
    pub misses: u64,
    /// Successful writes of any kind.
    pub writes: u64,
}

/// Uniform protocol over a volatile key/value store.
///
/// Keys are the strings produced by the registry's key builder; values are
/// opaque bytes. A `ttl` of `None` stores the value without expiry.
///
/// Failure semantics shared by all implementations:
/// - a backend that cannot complete an operation (down, timed out) returns `Err`;
/// - `add` returns `Ok(false)` when the key already exists, `replace` and
///   `delete` return `Ok(false)` when it does not;
/// - `increment`/`decrement` return `Ok(None)` for a missing key;
/// - `server_status` answers whether callers should keep treating the backend
///   as usable. It never fails.
#[dynosaur::dynosaur(pub(crate) DynCacheBackend = dyn(box) CacheBackend, bridge(none))]
pub trait CacheBackend: Send + Sync {
    /// Reads the value stored under `key`.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<Vec<u8>>, Error>> + Send;

    /// Stores `value` under `key`, overwriting any previous value.
    fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> impl Future<Output = Result<(), Error>> + Send;

    /// Stores `value` only if `key` is absent.
    fn add(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> impl Future<Output = Result<bool, Error>> + Send;

    /// Stores `value` only if `key` is present.
    fn replace(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> impl Future<Output = Result<bool, Error>> + Send;

    /// Removes `key`.
    fn delete(&self, key: &str) -> impl Future<Output = Result<bool, Error>> + Send;

    /// Adds `delta` to the decimal counter stored under `key`.
    fn increment(&self, key: &str, delta: u64) -> impl Future<Output = Result<Option<u64>, Error>> + Send;

    /// Subtracts `delta` from the decimal counter stored under `key`, saturating at zero.
    fn decrement(&self, key: &str, delta: u64) -> impl Future<Output = Result<Option<u64>, Error>> + Send;

    /// Drops every entry.
    fn flush(&self) -> impl Future<Output = Result<(), Error>> + Send;

    /// Returns backend counters.
    fn stats(&self) -> impl Future<Output = Result<BackendStats, Error>> + Send;

    /// Returns a backend identification string.
    fn version(&self) -> impl Future<Output = Result<String, Error>> + Send;

    /// Liveness probe.
    fn server_status(&self) -> impl Future<Output = bool> + Send;
}
