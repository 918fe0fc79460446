// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Builder for configuring in-memory backends.

use std::time::Duration;

use crate::backend::MemoryBackend;

/// Builder for configuring a `MemoryBackend`.
///
/// # Examples
///
/// ```
/// use stowage_memory::MemoryBackend;
/// use std::time::Duration;
///
/// let backend = MemoryBackend::builder()
///     .max_capacity(1000)
///     .initial_capacity(100)
///     .default_ttl(Duration::from_secs(300))
///     .name("registry")
///     .build();
/// ```
#[derive(Debug, Default)]
pub struct MemoryBackendBuilder {
    pub(crate) max_capacity: Option<u64>,
    pub(crate) initial_capacity: Option<usize>,
    pub(crate) default_ttl: Option<Duration>,
    pub(crate) name: Option<String>,
}

impl MemoryBackendBuilder {
    /// Creates a new builder for an unbounded backend without expiry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of entries.
    ///
    /// Once reached, moka evicts entries using `TinyLFU`. If not set, the
    /// backend is unbounded.
    #[must_use]
    pub fn max_capacity(mut self, capacity: u64) -> Self {
        self.max_capacity = Some(capacity);
        self
    }

    /// Sets the initial capacity (pre-allocation hint).
    #[must_use]
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = Some(capacity);
        self
    }

    /// Sets the TTL applied to writes that do not carry their own.
    #[must_use]
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = Some(ttl);
        self
    }

    /// Sets a name for the backend, reported by `version()`.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Builds the configured `MemoryBackend`.
    #[must_use]
    pub fn build(self) -> MemoryBackend {
        MemoryBackend::from_builder(self)
    }
}
