// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Cache backend adapter for the stowage object registry.
//!
//! This crate defines the [`CacheBackend`] trait that every volatile key/value
//! store used by the registry must satisfy, along with [`CacheRecord`] for
//! versioned payloads and the opaque [`Error`] type for failed operations.
//!
//! # Degradation
//!
//! A process selects its backend once, at startup, through [`Backend::connect`].
//! When the real store cannot be reached the process runs on [`NullBackend`]
//! for the rest of its lifetime: reads miss, writes fail, and the liveness
//! probe keeps reporting healthy so nothing tries to reconnect.
//!
//! ```
//! use stowage_backend::{Backend, BackendState, CacheBackend, Error, NullBackend};
//! # futures::executor::block_on(async {
//!
//! let backend = Backend::connect(|| async { Err::<NullBackend, _>(Error::from_message("refused")) }).await;
//! assert_eq!(backend.state(), BackendState::Degraded);
//!
//! assert!(backend.get("anything").await?.is_none());
//! assert!(backend.set("anything", b"1".to_vec(), None).await.is_err());
//! assert!(backend.server_status().await);
//! # Ok::<(), Error>(())
//! # });
//! ```
//!
//! # Implementing a Backend
//!
//! ```
//! use std::{collections::HashMap, sync::Mutex, time::Duration};
//! use stowage_backend::{BackendStats, CacheBackend, Error};
//!
//! struct Unreliable(Mutex<HashMap<String, Vec<u8>>>);
//!
//! impl CacheBackend for Unreliable {
//!     async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, Error> {
//!         Ok(self.0.lock().unwrap().get(key).cloned())
//!     }
//!     async fn set(&self, key: &str, value: Vec<u8>, _ttl: Option<Duration>) -> Result<(), Error> {
//!         self.0.lock().unwrap().insert(key.to_owned(), value);
//!         Ok(())
//!     }
//!     async fn add(&self, _: &str, _: Vec<u8>, _: Option<Duration>) -> Result<bool, Error> {
//!         Err(Error::unavailable())
//!     }
//!     async fn replace(&self, _: &str, _: Vec<u8>, _: Option<Duration>) -> Result<bool, Error> {
//!         Err(Error::unavailable())
//!     }
//!     async fn delete(&self, key: &str) -> Result<bool, Error> {
//!         Ok(self.0.lock().unwrap().remove(key).is_some())
//!     }
//!     async fn increment(&self, _: &str, _: u64) -> Result<Option<u64>, Error> {
//!         Err(Error::unavailable())
//!     }
//!     async fn decrement(&self, _: &str, _: u64) -> Result<Option<u64>, Error> {
//!         Err(Error::unavailable())
//!     }
//!     async fn flush(&self) -> Result<(), Error> {
//!         self.0.lock().unwrap().clear();
//!         Ok(())
//!     }
//!     async fn stats(&self) -> Result<BackendStats, Error> {
//!         Ok(BackendStats::default())
//!     }
//!     async fn version(&self) -> Result<String, Error> {
//!         Ok("unreliable/0".to_owned())
//!     }
//!     async fn server_status(&self) -> bool {
//!         true
//!     }
//! }
//! ```

mod backend;
mod dynamic;
pub mod error;
mod null;
mod record;
mod state;
#[cfg(any(feature = "test-util", test))]
pub mod testing;

#[doc(inline)]
pub use backend::{BackendStats, CacheBackend};
#[doc(inline)]
pub use dynamic::{DynamicBackend, DynamicBackendExt};
#[doc(inline)]
pub use error::{Error, Result};
#[doc(inline)]
pub use null::NullBackend;
#[doc(inline)]
pub use record::CacheRecord;
#[doc(inline)]
pub use state::{Backend, BackendState};
