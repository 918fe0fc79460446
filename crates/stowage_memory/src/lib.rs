// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! In-memory cache backend backed by moka.
//!
//! This crate provides [`MemoryBackend`], a concurrent implementation of the
//! full [`CacheBackend`](stowage_backend::CacheBackend) protocol, including
//! create-if-absent writes and decimal counters. Use [`MemoryBackendBuilder`]
//! to configure capacity and a default TTL without exposing moka types.
//!
//! # Quick Start
//!
//! ```
//! use stowage_backend::CacheBackend;
//! use stowage_memory::MemoryBackend;
//! use std::time::Duration;
//!
//! # futures::executor::block_on(async {
//! let backend = MemoryBackend::builder()
//!     .max_capacity(1000)
//!     .default_ttl(Duration::from_secs(300))
//!     .build();
//!
//! backend.set("key", b"value".to_vec(), None).await?;
//! assert_eq!(backend.get("key").await?, Some(b"value".to_vec()));
//! # Ok::<(), stowage_backend::Error>(())
//! # });
//! ```

pub mod backend;
pub mod builder;

#[doc(inline)]
pub use backend::MemoryBackend;
#[doc(inline)]
pub use builder::MemoryBackendBuilder;
