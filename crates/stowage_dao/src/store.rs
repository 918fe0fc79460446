// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use stowage::Value;

use crate::StoreError;

/// One result row: column names mapped to values, in select order.
///
/// # Examples
///
/// ```
/// use stowage::Value;
/// use stowage_dao::Row;
///
/// let row = Row::from_iter([("id", Value::from(7)), ("name", Value::from("alice"))]);
/// assert_eq!(row.get("name"), Some(&Value::from("alice")));
/// assert_eq!(row.get("missing"), None);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    /// Creates an empty row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a column, replacing the value of an existing column of the same name.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        let column = column.into();
        let value = value.into();
        match self.columns.iter_mut().find(|(name, _)| *name == column) {
            Some((_, slot)) => *slot = value,
            None => self.columns.push((column, value)),
        }
    }

    /// The value of `column`, if present.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns.iter().find(|(name, _)| name == column).map(|(_, value)| value)
    }

    /// Columns in select order.
    pub fn columns(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Number of columns.
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns `true` if the row has no columns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Self::new();
        for (column, value) in iter {
            row.insert(column, value);
        }
        row
    }
}

/// Named parameters bound into a query, in predicate order.
///
/// A parameter named `id` is referenced as `:id` in the query text.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BoundParams {
    params: Vec<(String, Value)>,
}

impl BoundParams {
    pub(crate) fn new(params: Vec<(String, Value)>) -> Self {
        Self { params }
    }

    pub(crate) fn into_inner(self) -> Vec<(String, Value)> {
        self.params
    }

    /// The value bound to `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.params.iter().find(|(param, _)| param == name).map(|(_, value)| value)
    }

    /// Parameters in predicate order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.params.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Returns `true` if nothing is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

/// The database a [`DaoCollection`](crate::DaoCollection) reads from.
///
/// Implementations execute a parameterized `SELECT` and return its rows in
/// result order.
pub trait PersistentStore: Send + Sync {
    /// Runs `query` with `params` bound.
    fn execute_read(&self, query: &str, params: &BoundParams) -> impl Future<Output = Result<Vec<Row>, StoreError>> + Send;
}

impl<T: PersistentStore> PersistentStore for &T {
    fn execute_read(&self, query: &str, params: &BoundParams) -> impl Future<Output = Result<Vec<Row>, StoreError>> + Send {
        (**self).execute_read(query, params)
    }
}

impl<T: PersistentStore> PersistentStore for Arc<T> {
    fn execute_read(&self, query: &str, params: &BoundParams) -> impl Future<Output = Result<Vec<Row>, StoreError>> + Send {
        (**self).execute_read(query, params)
    }
}
