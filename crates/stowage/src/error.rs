// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error types for registry resolution and descriptor configuration.
//!
//! Cache backend failures never appear here: the registry absorbs them as
//! misses or skipped writes.

use std::borrow::Cow;

/// A resolution that could not produce an instance.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// No descriptor is registered for the requested symbol and key.
    #[error("no descriptor registered for `{symbol}_{key}`")]
    DescriptorNotFound {
        /// The requested symbol.
        symbol: String,
        /// The requested key.
        key: String,
    },

    /// The wrong number of parameters reached construction.
    #[error("`{id}` takes {expected} parameter(s) but {supplied} were supplied")]
    ArityMismatch {
        /// The descriptor id, `"{symbol}_{key}"`.
        id: String,
        /// The descriptor's parameter count.
        expected: usize,
        /// The number of parameters supplied.
        supplied: usize,
    },

    /// The descriptor names a type no constructor was registered for.
    #[error("no constructor registered for type `{type_name}`")]
    ConstructorNotFound {
        /// The type name from the descriptor.
        type_name: String,
    },

    /// The constructor rejected the parameters.
    #[error("failed to construct `{id}`")]
    Construction {
        /// The descriptor id, `"{symbol}_{key}"`.
        id: String,
        /// The constructor's error.
        #[source]
        source: ConstructError,
    },
}

/// An error returned by a registered constructor.
///
/// # Examples
///
/// ```
/// use stowage::ConstructError;
///
/// let error = ConstructError::new("negative page size");
/// assert_eq!(error.to_string(), "negative page size");
/// ```
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct ConstructError {
    message: Cow<'static, str>,
}

impl ConstructError {
    /// Creates a constructor error with a message.
    pub fn new(message: impl Into<Cow<'static, str>>) -> Self {
        Self { message: message.into() }
    }

    /// Error for a factory method the type does not provide.
    #[must_use]
    pub fn unknown_factory(factory: &str) -> Self {
        Self::new(format!("unknown factory method `{factory}`"))
    }
}

/// Malformed descriptor configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration is not valid JSON of the expected shape.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// A descriptor id is not of the form `"{symbol}_{key}"`.
    #[error("descriptor id `{id}` must be `<symbol>_<key>` with a non-empty symbol and key")]
    InvalidId {
        /// The offending id.
        id: String,
    },

    /// A descriptor declares version 0.
    #[error("descriptor `{id}` must have a version of at least 1")]
    InvalidVersion {
        /// The offending id.
        id: String,
    },

    /// The `construct` list is not `[typeName]` or `[typeName, factory]`.
    #[error("descriptor `{id}` must construct `[typeName]` or `[typeName, factoryMethod]`")]
    InvalidConstruct {
        /// The offending id.
        id: String,
    },
}
