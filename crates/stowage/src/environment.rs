// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use stowage_backend::Backend;

use crate::{Constructors, DescriptorTable, Diagnostics, ObjectDescriptor, Registrable, Registry, TracingDiagnostics};

/// Expiry applied to registry write-through unless configured otherwise.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Process-wide state shared by every request.
///
/// Holds the descriptor table, the registered constructors, the selected
/// cache [`Backend`], the [`Diagnostics`] sink and the per-descriptor version
/// bumps made by [`Registry::invalidate`]. Cloning is cheap and every clone
/// sees the same state.
///
/// # Examples
///
/// ```
/// use stowage::{DescriptorTable, Environment};
/// use stowage_backend::Backend;
///
/// let environment = Environment::builder()
///     .descriptors(DescriptorTable::new())
///     .backend(Backend::degraded())
///     .build();
///
/// let execution = environment.execution();
/// assert!(execution.backend().is_degraded());
/// ```
#[derive(Clone, Debug)]
pub struct Environment {
    inner: Arc<EnvironmentInner>,
}

#[derive(Debug)]
struct EnvironmentInner {
    descriptors: DescriptorTable,
    constructors: Constructors,
    backend: Backend,
    diagnostics: Arc<dyn Diagnostics>,
    ttl: Option<Duration>,
    bumps: Mutex<HashMap<String, u32>>,
}

impl Environment {
    /// Starts building an environment.
    #[must_use]
    pub fn builder() -> EnvironmentBuilder {
        EnvironmentBuilder::default()
    }

    /// Starts a request with an empty memo.
    #[must_use]
    pub fn execution(&self) -> Execution {
        Execution {
            registry: Registry::new(self.clone()),
        }
    }

    /// The descriptor table.
    #[must_use]
    pub fn descriptors(&self) -> &DescriptorTable {
        &self.inner.descriptors
    }

    /// The registered constructors.
    #[must_use]
    pub fn constructors(&self) -> &Constructors {
        &self.inner.constructors
    }

    /// The cache backend selected at startup.
    #[must_use]
    pub fn backend(&self) -> &Backend {
        &self.inner.backend
    }

    /// The diagnostics sink.
    #[must_use]
    pub fn diagnostics(&self) -> &Arc<dyn Diagnostics> {
        &self.inner.diagnostics
    }

    /// Expiry for cache writes; `None` stores without expiry.
    #[must_use]
    pub fn ttl(&self) -> Option<Duration> {
        self.inner.ttl
    }

    /// The configured version plus any invalidations made in this process.
    #[must_use]
    pub fn effective_version(&self, descriptor: &ObjectDescriptor) -> u32 {
        let bump = self.inner.bumps.lock().get(descriptor.id()).copied().unwrap_or(0);
        descriptor.version().saturating_add(bump)
    }

    /// Raises the effective version of `descriptor` by one and returns it.
    pub(crate) fn bump_version(&self, descriptor: &ObjectDescriptor) -> u32 {
        let mut bumps = self.inner.bumps.lock();
        let bump = bumps.entry(descriptor.id().to_owned()).or_insert(0);
        *bump = bump.saturating_add(1);
        descriptor.version().saturating_add(*bump)
    }
}

/// Builder for [`Environment`].
///
/// Defaults: no descriptors, no constructors, a degraded backend,
/// [`TracingDiagnostics`] and a TTL of [`DEFAULT_TTL`].
#[derive(Debug)]
pub struct EnvironmentBuilder {
    descriptors: DescriptorTable,
    constructors: Constructors,
    backend: Backend,
    diagnostics: Arc<dyn Diagnostics>,
    ttl: Option<Duration>,
}

impl Default for EnvironmentBuilder {
    fn default() -> Self {
        Self {
            descriptors: DescriptorTable::new(),
            constructors: Constructors::new(),
            backend: Backend::degraded(),
            diagnostics: Arc::new(TracingDiagnostics::new()),
            ttl: Some(DEFAULT_TTL),
        }
    }
}

impl EnvironmentBuilder {
    /// Sets the descriptor table.
    #[must_use]
    pub fn descriptors(mut self, descriptors: DescriptorTable) -> Self {
        self.descriptors = descriptors;
        self
    }

    /// Replaces all registered constructors.
    #[must_use]
    pub fn constructors(mut self, constructors: Constructors) -> Self {
        self.constructors = constructors;
        self
    }

    /// Registers one constructor.
    #[must_use]
    pub fn register<T: Registrable>(mut self, type_name: impl Into<String>) -> Self {
        self.constructors.register::<T>(type_name);
        self
    }

    /// Sets the cache backend, usually obtained from [`Backend::connect`].
    #[must_use]
    pub fn backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    /// Sets the diagnostics sink.
    #[must_use]
    pub fn diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Sets the expiry for cache writes.
    #[must_use]
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Stores cache writes without expiry.
    #[must_use]
    pub fn no_ttl(mut self) -> Self {
        self.ttl = None;
        self
    }

    /// Builds the environment.
    #[must_use]
    pub fn build(self) -> Environment {
        Environment {
            inner: Arc::new(EnvironmentInner {
                descriptors: self.descriptors,
                constructors: self.constructors,
                backend: self.backend,
                diagnostics: self.diagnostics,
                ttl: self.ttl,
                bumps: Mutex::new(HashMap::new()),
            }),
        }
    }
}

/// Per-request state.
///
/// Owns the registry memo. Dropping the execution discards every memoized
/// instance; the environment and cache backend are unaffected.
#[derive(Debug)]
pub struct Execution {
    registry: Registry,
}

impl Execution {
    /// The request's registry.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The environment this execution belongs to.
    #[must_use]
    pub fn environment(&self) -> &Environment {
        self.registry.environment()
    }

    /// The cache backend.
    #[must_use]
    pub fn backend(&self) -> &Backend {
        self.environment().backend()
    }

    /// The diagnostics sink.
    #[must_use]
    pub fn diagnostics(&self) -> &Arc<dyn Diagnostics> {
        self.environment().diagnostics()
    }
}
