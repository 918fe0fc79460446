// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Error types for collection reads.

/// An error reported by a [`PersistentStore`](crate::PersistentStore).
///
/// # Example
///
/// ```
/// use stowage_dao::StoreError;
///
/// let error = StoreError::from_message("deadlock detected");
/// assert!(error.to_string().contains("deadlock detected"));
/// ```
#[ohno::error]
pub struct StoreError {}

impl StoreError {
    /// Creates a new error from any type that can be converted to an error.
    pub fn from_message(cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::caused_by(cause)
    }
}

/// A failed [`DaoCollection::read`](crate::DaoCollection::read).
///
/// The collection keeps its previous rows and key data whenever a read fails.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    /// The persistent store rejected the query.
    #[error("persistent store read failed")]
    Store(#[from] StoreError),

    /// A primary key column has no value to default the predicate from.
    #[error("no value for primary key column `{column}`")]
    MissingKey {
        /// The primary key column without a value.
        column: String,
    },

    /// A table or column name is not a plain SQL identifier.
    #[error("`{identifier}` is not a valid identifier")]
    InvalidIdentifier {
        /// The rejected name.
        identifier: String,
    },
}

/// Returned by [`DaoCollection::set`](crate::DaoCollection::set): collection
/// properties are read-only.
#[derive(Debug, thiserror::Error)]
#[error("collection property `{name}` cannot be set")]
pub struct UndeclaredPropertyAccess {
    name: String,
}

impl UndeclaredPropertyAccess {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// The property that was written.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn store_error_is_the_source() {
        let error = ReadError::from(StoreError::from_message("timeout"));
        assert_eq!(error.to_string(), "persistent store read failed");
        let source = error.source().expect("store error attached");
        assert!(source.to_string().contains("timeout"));
    }

    #[test]
    fn undeclared_property_access_names_the_property() {
        let error = UndeclaredPropertyAccess::new("id");
        assert_eq!(error.name(), "id");
        assert_eq!(error.to_string(), "collection property `id` cannot be set");
    }
}
