// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Mock backend implementation for testing.
//!
//! This module provides `MockBackend`, an in-memory backend that records all
//! operations and supports failure injection for testing degraded paths.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use parking_lot::Mutex;

use crate::{BackendStats, CacheBackend, Error};

/// Recorded backend operation with full context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendOp {
    /// A get operation was performed with the given key.
    Get(String),
    /// A set operation.
    Set {
        /// The key that was written.
        key: String,
        /// The bytes that were written.
        value: Vec<u8>,
        /// The requested time-to-live.
        ttl: Option<Duration>,
    },
    /// An add operation.
    Add {
        /// The key that was written.
        key: String,
        /// The bytes that were written.
        value: Vec<u8>,
    },
    /// A replace operation.
    Replace {
        /// The key that was written.
        key: String,
        /// The bytes that were written.
        value: Vec<u8>,
    },
    /// A delete operation was performed with the given key.
    Delete(String),
    /// An increment operation.
    Increment {
        /// The counter key.
        key: String,
        /// The amount added.
        delta: u64,
    },
    /// A decrement operation.
    Decrement {
        /// The counter key.
        key: String,
        /// The amount subtracted.
        delta: u64,
    },
    /// A flush operation was performed.
    Flush,
    /// A stats request.
    Stats,
    /// A version request.
    Version,
}

type FailPredicate = Box<dyn Fn(&BackendOp) -> bool + Send + Sync>;

/// A configurable mock backend for testing.
///
/// Values are kept in memory (TTLs are recorded but never enforced) and every
/// operation can be made to fail on demand. Clones share state, so a test can
/// keep a handle while the registry owns another.
///
/// # Examples
///
/// ```
/// use stowage_backend::{CacheBackend, testing::{BackendOp, MockBackend}};
/// # futures::executor::block_on(async {
///
/// let backend = MockBackend::new();
/// backend.fail_when(|op| matches!(op, BackendOp::Set { .. }));
///
/// assert!(backend.set("key", vec![1], None).await.is_err());
/// assert!(backend.get("key").await.expect("get failed").is_none());
/// # });
/// ```
pub struct MockBackend {
    data: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    operations: Arc<Mutex<Vec<BackendOp>>>,
    fail_when: Arc<Mutex<Option<FailPredicate>>>,
    reachable: Arc<AtomicBool>,
}

impl std::fmt::Debug for MockBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockBackend")
            .field("data", &self.data)
            .field("operations", &self.operations)
            .field("fail_when", &self.fail_when.lock().is_some())
            .field("reachable", &self.reachable.load(Ordering::Relaxed))
            .finish()
    }
}

impl Clone for MockBackend {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            operations: Arc::clone(&self.operations),
            fail_when: Arc::clone(&self.fail_when),
            reachable: Arc::clone(&self.reachable),
        }
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Creates a new empty, reachable mock backend.
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: Arc::new(Mutex::new(HashMap::new())),
            operations: Arc::new(Mutex::new(Vec::new())),
            fail_when: Arc::new(Mutex::new(None)),
            reachable: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Sets a predicate that determines when operations should fail.
    pub fn fail_when<F>(&self, predicate: F)
    where
        F: Fn(&BackendOp) -> bool + Send + Sync + 'static,
    {
        *self.fail_when.lock() = Some(Box::new(predicate));
    }

    /// Clears the failure predicate, allowing all operations to succeed.
    pub fn clear_failures(&self) {
        *self.fail_when.lock() = None;
    }

    /// Controls what [`CacheBackend::server_status`] reports.
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::Relaxed);
    }

    /// Returns a clone of all recorded operations.
    #[must_use]
    pub fn operations(&self) -> Vec<BackendOp> {
        self.operations.lock().clone()
    }

    /// Counts recorded operations matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&BackendOp) -> bool) -> usize {
        self.operations.lock().iter().filter(|op| predicate(op)).count()
    }

    /// Clears all recorded operations.
    pub fn clear_operations(&self) {
        self.operations.lock().clear();
    }

    /// Returns the raw bytes stored under `key` without recording an operation.
    #[must_use]
    pub fn raw(&self, key: &str) -> Option<Vec<u8>> {
        self.data.lock().get(key).cloned()
    }

    /// Stores raw bytes under `key` without recording an operation.
    pub fn insert_raw(&self, key: impl Into<String>, value: Vec<u8>) {
        self.data.lock().insert(key.into(), value);
    }

    /// Returns the stored keys in no particular order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.data.lock().keys().cloned().collect()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.data.lock().len()
    }

    /// Returns true if the backend contains the given key.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.lock().contains_key(key)
    }

    fn check(&self, op: BackendOp) -> Result<(), Error> {
        let fail = self.fail_when.lock().as_ref().is_some_and(|predicate| predicate(&op));
        self.operations.lock().push(op);
        if fail { Err(Error::caused_by("mock: operation failed")) } else { Ok(()) }
    }

    fn counter(&self, key: &str, apply: impl FnOnce(u64) -> u64) -> Result<Option<u64>, Error> {
        let mut data = self.data.lock();
        let Some(current) = data.get(key) else {
            return Ok(None);
        };
        let current = std::str::from_utf8(current)
            .ok()
            .and_then(|text| text.parse::<u64>().ok())
            .ok_or_else(|| Error::caused_by("mock: value is not a counter"))?;
        let next = apply(current);
        data.insert(key.to_owned(), next.to_string().into_bytes());
        Ok(Some(next))
    }
}

impl CacheBackend for MockBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
        self.check(BackendOp::Get(key.to_owned()))?;
        Ok(self.raw(key))
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<(), Error> {
        self.check(BackendOp::Set {
            key: key.to_owned(),
            value: value.clone(),
            ttl,
        })?;
        self.insert_raw(key, value);
        Ok(())
    }

    async fn add(&self, key: &str, value: Vec<u8>, _ttl: Option<Duration>) -> Result<bool, Error> {
        self.check(BackendOp::Add {
            key: key.to_owned(),
            value: value.clone(),
        })?;
        let mut data = self.data.lock();
        if data.contains_key(key) {
            return Ok(false);
        }
        data.insert(key.to_owned(), value);
        Ok(true)
    }

    async fn replace(&self, key: &str, value: Vec<u8>, _ttl: Option<Duration>) -> Result<bool, Error> {
        self.check(BackendOp::Replace {
            key: key.to_owned(),
            value: value.clone(),
        })?;
        let mut data = self.data.lock();
        match data.get_mut(key) {
            Some(slot) => {
                *slot = value;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, key: &str) -> Result<bool, Error> {
        self.check(BackendOp::Delete(key.to_owned()))?;
        Ok(self.data.lock().remove(key).is_some())
    }

    async fn increment(&self, key: &str, delta: u64) -> Result<Option<u64>, Error> {
        self.check(BackendOp::Increment {
            key: key.to_owned(),
            delta,
        })?;
        self.counter(key, |current| current.wrapping_add(delta))
    }

    async fn decrement(&self, key: &str, delta: u64) -> Result<Option<u64>, Error> {
        self.check(BackendOp::Decrement {
            key: key.to_owned(),
            delta,
        })?;
        self.counter(key, |current| current.saturating_sub(delta))
    }

    async fn flush(&self) -> Result<(), Error> {
        self.check(BackendOp::Flush)?;
        self.data.lock().clear();
        Ok(())
    }

    async fn stats(&self) -> Result<BackendStats, Error> {
        self.check(BackendOp::Stats)?;
        Ok(BackendStats {
            entries: Some(self.entry_count() as u64),
            ..BackendStats::default()
        })
    }

    async fn version(&self) -> Result<String, Error> {
        self.check(BackendOp::Version)?;
        Ok("mock".to_owned())
    }

    async fn server_status(&self) -> bool {
        self.reachable.load(Ordering::Relaxed)
    }
}
