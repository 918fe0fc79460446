// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::any::Any;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt::Debug;
use std::sync::Arc;

use parking_lot::Mutex;
use stowage_backend::{CacheBackend, CacheRecord};

use crate::constructor::Object;
use crate::diagnostics::REGISTRY_CATEGORY;
use crate::{CacheKey, Environment, Loader, ObjectDescriptor, RegistryError, Value};

/// Where a resolved instance came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Origin {
    /// Already resolved earlier in this execution.
    Memo,
    /// Restored from a current record in the cache backend.
    Cache,
    /// Built by its constructor.
    Constructed,
}

/// A resolved, shared registry object.
#[derive(Clone)]
pub struct Instance {
    key: CacheKey,
    object: Object,
    origin: Origin,
}

impl Instance {
    /// The key the instance is memoized and cached under.
    #[must_use]
    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    /// Where this instance came from.
    #[must_use]
    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Returns the object as a `T`, or `None` if it is another type.
    #[must_use]
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.object).downcast::<T>().ok()
    }

    /// Returns `true` if both instances share the same object.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.object, &other.object)
    }
}

impl Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("key", &self.key)
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

/// The state of a resolution.
#[derive(Debug)]
pub enum Resolution<'a> {
    /// More parameters are required.
    Pending(PendingResolution<'a>),
    /// All parameters were supplied and the instance is available.
    Ready(Instance),
}

impl Resolution<'_> {
    /// Returns the instance if the resolution is complete.
    #[must_use]
    pub fn ready(self) -> Option<Instance> {
        match self {
            Self::Ready(instance) => Some(instance),
            Self::Pending(_) => None,
        }
    }

    /// Returns `true` if the resolution is complete.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

/// A resolution waiting for more parameters.
#[derive(Debug)]
pub struct PendingResolution<'a> {
    registry: &'a Registry,
    descriptor: ObjectDescriptor,
    params: Vec<Value>,
}

impl<'a> PendingResolution<'a> {
    /// The descriptor being resolved.
    #[must_use]
    pub fn descriptor(&self) -> &ObjectDescriptor {
        &self.descriptor
    }

    /// Parameters supplied so far, in order.
    #[must_use]
    pub fn params(&self) -> &[Value] {
        &self.params
    }

    /// Number of parameters still required.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.descriptor.param_count() - self.params.len()
    }

    /// Appends one parameter, completing the resolution once all are present.
    ///
    /// # Errors
    ///
    /// Returns an error if the completed resolution cannot be constructed.
    pub async fn supply(mut self, value: impl Into<Value>) -> Result<Resolution<'a>, RegistryError> {
        self.params.push(value.into());
        if self.params.len() < self.descriptor.param_count() {
            return Ok(Resolution::Pending(self));
        }

        self.registry
            .complete(&self.descriptor, self.params)
            .await
            .map(Resolution::Ready)
    }
}

/// Per-execution object registry.
///
/// Resolves `(symbol, key, params)` to a shared instance, memoizing it for the
/// lifetime of the registry. Each completed resolution is looked up, in order,
/// in the memo, then in the cache backend, and is finally constructed and
/// written back to the cache. Cache problems never fail a resolution.
///
/// # Examples
///
/// ```
/// # use serde::{Deserialize, Serialize};
/// # use stowage::{CacheSavable, ConstructError, Loader, Registrable, Value};
/// # #[derive(Serialize, Deserialize)]
/// # struct Dummy { name: String, #[serde(skip)] loader: Option<Loader> }
/// # impl CacheSavable for Dummy {
/// #     fn set_loader(&mut self, loader: Loader) { self.loader = Some(loader); }
/// #     fn loader(&self) -> Option<&Loader> { self.loader.as_ref() }
/// # }
/// # impl Registrable for Dummy {
/// #     fn construct(_: Option<&str>, params: &[Value]) -> Result<Self, ConstructError> {
/// #         Ok(Self { name: params[0].to_string(), loader: None })
/// #     }
/// # }
/// use stowage::{DescriptorTable, Environment, Resolution};
///
/// # futures::executor::block_on(async {
/// let environment = Environment::builder()
///     .descriptors(DescriptorTable::from_json(
///         r#"{"gld_dummyparams": {"params": 1, "construct": ["dummy", "create_object"], "version": 1}}"#,
///     )?)
///     .register::<Dummy>("dummy")
///     .build();
/// let execution = environment.execution();
/// let registry = execution.registry();
///
/// let Resolution::Pending(pending) = registry.resolve("gld", "dummyparams").await? else {
///     unreachable!("one parameter is required");
/// };
/// let instance = pending.supply("value").await?.ready().expect("all parameters supplied");
///
/// let again = registry.resolve_with("gld", "dummyparams", ["value"]).await?;
/// assert!(instance.ptr_eq(&again));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// # }).unwrap();
/// ```
pub struct Registry {
    environment: Environment,
    memo: Mutex<HashMap<CacheKey, Object>>,
}

impl Registry {
    /// Creates a registry with an empty memo.
    #[must_use]
    pub fn new(environment: Environment) -> Self {
        Self {
            environment,
            memo: Mutex::new(HashMap::new()),
        }
    }

    /// The environment the registry resolves against.
    #[must_use]
    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// Number of memoized instances.
    #[must_use]
    pub fn memoized(&self) -> usize {
        self.memo.lock().len()
    }

    /// Starts resolving `symbol`/`key`.
    ///
    /// Descriptors without parameters complete immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if no descriptor is registered or construction fails.
    pub async fn resolve(&self, symbol: &str, key: &str) -> Result<Resolution<'_>, RegistryError> {
        let descriptor = self.environment.descriptors().lookup(symbol, key)?.clone();
        if descriptor.param_count() > 0 {
            return Ok(Resolution::Pending(PendingResolution {
                registry: self,
                params: Vec::with_capacity(descriptor.param_count()),
                descriptor,
            }));
        }

        self.complete(&descriptor, Vec::new()).await.map(Resolution::Ready)
    }

    /// Resolves `symbol`/`key` with every parameter at once.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::ArityMismatch`] unless exactly the descriptor's
    /// parameter count is supplied, and otherwise the same errors as
    /// [`resolve`](Self::resolve).
    pub async fn resolve_with<I>(&self, symbol: &str, key: &str, params: I) -> Result<Instance, RegistryError>
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let descriptor = self.environment.descriptors().lookup(symbol, key)?;
        let params: Vec<Value> = params.into_iter().map(Into::into).collect();
        descriptor.check_arity(params.len())?;

        self.complete(descriptor, params).await
    }

    /// Retires every cached instance of `symbol`/`key` for the rest of the
    /// process by raising its effective version.
    ///
    /// Instances already memoized stay valid for their executions; new
    /// resolutions use the new version. Returns the new effective version.
    ///
    /// # Errors
    ///
    /// Returns an error if no descriptor is registered.
    pub fn invalidate(&self, symbol: &str, key: &str) -> Result<u32, RegistryError> {
        let descriptor = self.environment.descriptors().lookup(symbol, key)?;
        let version = self.environment.bump_version(descriptor);
        tracing::info!(id = descriptor.id(), version, "registry entry invalidated");
        Ok(version)
    }

    async fn complete(&self, descriptor: &ObjectDescriptor, params: Vec<Value>) -> Result<Instance, RegistryError> {
        let version = self.environment.effective_version(descriptor);
        let key = CacheKey::build(descriptor.symbol(), descriptor.key(), version, &params);

        let diagnostics = self.environment.diagnostics();
        diagnostics.start_timer(REGISTRY_CATEGORY, descriptor.id(), key.as_str());
        let result = self.complete_keyed(descriptor, &params, key.clone(), version).await;
        diagnostics.stop_timer(REGISTRY_CATEGORY, key.as_str());

        result
    }

    async fn complete_keyed(
        &self,
        descriptor: &ObjectDescriptor,
        params: &[Value],
        key: CacheKey,
        version: u32,
    ) -> Result<Instance, RegistryError> {
        let memoized = self.memo.lock().get(&key).cloned();
        if let Some(object) = memoized {
            tracing::debug!(%key, "registry memo hit");
            return Ok(Instance {
                key,
                object,
                origin: Origin::Memo,
            });
        }

        let loader = Loader::new(self.environment.backend().clone(), key.clone(), version, self.environment.ttl());

        if let Some(object) = self.load_cached(descriptor, &key, version, loader.clone()).await {
            return Ok(self.memoize(key, object, Origin::Cache));
        }

        let built = self.environment.constructors().construct(descriptor, params, loader.clone())?;
        let instance = self.memoize(key, built.object, Origin::Constructed);

        // Losing a memo race means another resolution owns the write-through.
        if instance.origin == Origin::Constructed
            && let Some(payload) = built.payload
        {
            loader.store(payload).await;
        }

        Ok(instance)
    }

    async fn load_cached(&self, descriptor: &ObjectDescriptor, key: &CacheKey, version: u32, loader: Loader) -> Option<Object> {
        let bytes = match self.environment.backend().get(key.as_str()).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                tracing::debug!(%key, "registry cache miss");
                return None;
            }
            Err(error) => {
                tracing::debug!(%key, %error, "registry cache read failed");
                return None;
            }
        };

        let record = match CacheRecord::decode(&bytes) {
            Ok(record) => record,
            Err(error) => {
                tracing::debug!(%key, %error, "undecodable cache record");
                return None;
            }
        };

        if !record.is_current(version) {
            tracing::debug!(%key, stored = record.stored_version(), expected = version, "stale cache record");
            return None;
        }

        let object = self.environment.constructors().restore(descriptor, record.payload(), loader);
        if object.is_some() {
            tracing::debug!(%key, "registry cache hit");
        } else {
            tracing::debug!(%key, "cached payload could not be restored");
        }
        object
    }

    fn memoize(&self, key: CacheKey, object: Object, origin: Origin) -> Instance {
        match self.memo.lock().entry(key.clone()) {
            Entry::Occupied(existing) => Instance {
                key,
                object: Arc::clone(existing.get()),
                origin: Origin::Memo,
            },
            Entry::Vacant(slot) => {
                slot.insert(Arc::clone(&object));
                Instance { key, object, origin }
            }
        }
    }
}

impl Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("environment", &self.environment)
            .field("memoized", &self.memoized())
            .finish()
    }
}
