// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::any::Any;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::{CacheSavable, ConstructError, Loader, ObjectDescriptor, RegistryError, Value};

/// A type-erased, shared registry object.
pub(crate) type Object = Arc<dyn Any + Send + Sync>;

/// A type the registry can construct from descriptor parameters.
///
/// `factory` is the optional factory method named by the descriptor's
/// `construct` entry; `params` holds exactly `param_count` values in the
/// order they were supplied.
///
/// # Examples
///
/// ```
/// use serde::{Deserialize, Serialize};
/// use stowage::{CacheSavable, ConstructError, Loader, Registrable, Value};
///
/// #[derive(Serialize, Deserialize)]
/// struct Greeting {
///     text: String,
///     #[serde(skip)]
///     loader: Option<Loader>,
/// }
///
/// impl CacheSavable for Greeting {
///     fn set_loader(&mut self, loader: Loader) {
///         self.loader = Some(loader);
///     }
///
///     fn loader(&self) -> Option<&Loader> {
///         self.loader.as_ref()
///     }
/// }
///
/// impl Registrable for Greeting {
///     fn construct(factory: Option<&str>, params: &[Value]) -> Result<Self, ConstructError> {
///         match factory {
///             None => Ok(Self {
///                 text: format!("hello {}", params[0]),
///                 loader: None,
///             }),
///             Some(other) => Err(ConstructError::unknown_factory(other)),
///         }
///     }
/// }
/// ```
pub trait Registrable: CacheSavable + DeserializeOwned + Sized + 'static {
    /// Builds a fresh instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the parameters are unusable or the factory is unknown.
    fn construct(factory: Option<&str>, params: &[Value]) -> Result<Self, ConstructError>;
}

type BuildFn = dyn Fn(Option<&str>, &[Value], Loader) -> Result<Built, ConstructError> + Send + Sync;
type RestoreFn = dyn Fn(&[u8], Loader) -> Option<Object> + Send + Sync;

struct Entry {
    build: Box<BuildFn>,
    restore: Box<RestoreFn>,
}

/// A freshly constructed object together with its serialized form.
pub(crate) struct Built {
    pub(crate) object: Object,
    /// `None` when the object could not be serialized; it is then never cached.
    pub(crate) payload: Option<Vec<u8>>,
}

/// Maps descriptor type names onto Rust types.
///
/// # Examples
///
/// ```
/// # use serde::{Deserialize, Serialize};
/// # use stowage::{CacheSavable, ConstructError, Loader, Registrable, Value};
/// # #[derive(Serialize, Deserialize)]
/// # struct Greeting;
/// # impl CacheSavable for Greeting {
/// #     fn set_loader(&mut self, _loader: Loader) {}
/// #     fn loader(&self) -> Option<&Loader> { None }
/// # }
/// # impl Registrable for Greeting {
/// #     fn construct(_: Option<&str>, _: &[Value]) -> Result<Self, ConstructError> { Ok(Self) }
/// # }
/// use stowage::Constructors;
///
/// let mut constructors = Constructors::new();
/// constructors.register::<Greeting>("greeting");
///
/// assert!(constructors.contains("greeting"));
/// ```
#[derive(Clone, Default)]
pub struct Constructors {
    entries: HashMap<String, Arc<Entry>>,
}

impl Constructors {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T` under `type_name`, replacing any previous registration.
    pub fn register<T: Registrable>(&mut self, type_name: impl Into<String>) -> &mut Self {
        let entry = Entry {
            build: Box::new(|factory: Option<&str>, params: &[Value], loader: Loader| -> Result<Built, ConstructError> {
                let mut object = T::construct(factory, params)?;
                object.set_loader(loader);
                let payload = match serde_json::to_vec(&object) {
                    Ok(payload) => Some(payload),
                    Err(error) => {
                        tracing::debug!(%error, "constructed object is not serializable, skipping cache");
                        None
                    }
                };
                Ok(Built {
                    object: Arc::new(object),
                    payload,
                })
            }),
            restore: Box::new(|payload: &[u8], loader: Loader| -> Option<Object> {
                let mut object: T = serde_json::from_slice(payload).ok()?;
                object.set_loader(loader);
                Some(Arc::new(object))
            }),
        };

        self.entries.insert(type_name.into(), Arc::new(entry));
        self
    }

    /// Returns `true` if `type_name` has a registration.
    #[must_use]
    pub fn contains(&self, type_name: &str) -> bool {
        self.entries.contains_key(type_name)
    }

    /// Number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Builds the object `descriptor` describes.
    pub(crate) fn construct(&self, descriptor: &ObjectDescriptor, params: &[Value], loader: Loader) -> Result<Built, RegistryError> {
        descriptor.check_arity(params.len())?;

        let spec = descriptor.construct();
        let entry = self.entry(spec.type_name())?;

        (entry.build)(spec.factory(), params, loader).map_err(|source| RegistryError::Construction {
            id: descriptor.id().to_owned(),
            source,
        })
    }

    /// Rebuilds an object from a cached payload; `None` if it does not decode.
    pub(crate) fn restore(&self, descriptor: &ObjectDescriptor, payload: &[u8], loader: Loader) -> Option<Object> {
        let entry = self.entries.get(descriptor.construct().type_name())?;
        (entry.restore)(payload, loader)
    }

    fn entry(&self, type_name: &str) -> Result<&Entry, RegistryError> {
        self.entries
            .get(type_name)
            .map(AsRef::as_ref)
            .ok_or_else(|| RegistryError::ConstructorNotFound {
                type_name: type_name.to_owned(),
            })
    }
}

impl Debug for Constructors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<_> = self.entries.keys().collect();
        names.sort();
        f.debug_struct("Constructors").field("types", &names).finish()
    }
}
