// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Lazy, versioned object registry with read-through caching.
//!
//! A [`Registry`] resolves a `(symbol, key, params)` triple to a shared
//! application object. Each kind of object is described once by an
//! [`ObjectDescriptor`]: how many parameters it takes, which registered
//! type builds it, and its schema version. A resolution is completed in
//! three steps:
//!
//! 1. The per-execution memo. Within one [`Execution`] every resolution of
//!    the same [`CacheKey`] yields the same instance.
//! 2. The cache backend. A [`CacheRecord`](stowage_backend::CacheRecord) is
//!    used only if it was written at the descriptor's current version.
//! 3. The constructor. The new instance is memoized and written through to
//!    the cache on a best-effort basis.
//!
//! The cache backend is an optimization. When it is unreachable the
//! environment runs on a degraded backend, every read misses, and every
//! object is constructed.
//!
//! # Versioning
//!
//! The descriptor version is part of the cache key and of the stored record.
//! Raising it in configuration, or calling [`Registry::invalidate`], makes
//! every previously cached record unreachable without touching the backend.
//!
//! # Example
//!
//! ```
//! use serde::{Deserialize, Serialize};
//! use stowage::{CacheSavable, ConstructError, DescriptorTable, Environment, Loader, Origin, Registrable, Value};
//! use stowage_backend::Backend;
//!
//! #[derive(Serialize, Deserialize)]
//! struct Profile {
//!     user: String,
//!     #[serde(skip)]
//!     loader: Option<Loader>,
//! }
//!
//! impl CacheSavable for Profile {
//!     fn set_loader(&mut self, loader: Loader) {
//!         self.loader = Some(loader);
//!     }
//!
//!     fn loader(&self) -> Option<&Loader> {
//!         self.loader.as_ref()
//!     }
//! }
//!
//! impl Registrable for Profile {
//!     fn construct(_factory: Option<&str>, params: &[Value]) -> Result<Self, ConstructError> {
//!         let user = params[0].as_str().ok_or_else(|| ConstructError::new("user must be text"))?;
//!         Ok(Self {
//!             user: user.to_owned(),
//!             loader: None,
//!         })
//!     }
//! }
//!
//! # futures::executor::block_on(async {
//! let environment = Environment::builder()
//!     .descriptors(DescriptorTable::from_json(
//!         r#"{"app_profile": {"params": 1, "construct": ["profile"], "version": 1}}"#,
//!     )?)
//!     .register::<Profile>("profile")
//!     .backend(Backend::degraded())
//!     .build();
//!
//! let execution = environment.execution();
//! let first = execution.registry().resolve_with("app", "profile", ["alice"]).await?;
//! let second = execution.registry().resolve_with("app", "profile", ["alice"]).await?;
//!
//! assert_eq!(first.origin(), Origin::Constructed);
//! assert_eq!(second.origin(), Origin::Memo);
//! assert_eq!(second.downcast::<Profile>().expect("a profile").user, "alice");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! # }).unwrap();
//! ```

mod constructor;
mod descriptor;
mod diagnostics;
mod environment;
mod error;
mod key;
mod registry;
mod savable;
#[cfg(any(feature = "test-util", test))]
pub mod testing;
mod value;

#[doc(inline)]
pub use constructor::{Constructors, Registrable};
#[doc(inline)]
pub use descriptor::{ConstructSpec, DescriptorTable, ObjectDescriptor};
#[doc(inline)]
pub use diagnostics::{Diagnostics, NoopDiagnostics, REGISTRY_CATEGORY, TracingDiagnostics};
#[doc(inline)]
pub use environment::{DEFAULT_TTL, Environment, EnvironmentBuilder, Execution};
#[doc(inline)]
pub use error::{ConfigError, ConstructError, RegistryError};
#[doc(inline)]
pub use key::CacheKey;
#[doc(inline)]
pub use registry::{Instance, Origin, PendingResolution, Registry, Resolution};
#[doc(inline)]
pub use savable::{CacheSavable, Loader};
#[doc(inline)]
pub use value::Value;
