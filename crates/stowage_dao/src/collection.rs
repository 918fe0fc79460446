// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use stowage::{CacheKey, Diagnostics, Loader, TracingDiagnostics, Value};
use stowage_backend::{Backend, CacheBackend, CacheRecord};

use crate::query::{predicate, select, validate_identifier, validate_table};
use crate::{BoundParams, PersistentStore, ReadError, Row, UndeclaredPropertyAccess};

/// Diagnostics category for collection notices.
pub const DAO_CATEGORY: &str = "dao";

/// Symbol under which collection rows are cached.
const CACHE_SYMBOL: &str = "dao";

/// Cached rows carry this record version.
const ROWS_VERSION: u32 = 1;

#[derive(Clone, Debug)]
struct ReadThrough {
    backend: Backend,
    ttl: Option<Duration>,
}

/// Rows of one table selected by a key predicate, with a cursor over them.
///
/// A read replaces the rows and the predicate ("key data") wholesale, or
/// leaves both untouched when it fails. Row order is the store's result order.
///
/// # Examples
///
/// ```
/// use stowage::Value;
/// use stowage_dao::{BoundParams, DaoCollection, PersistentStore, Row, StoreError};
///
/// struct Users;
///
/// impl PersistentStore for Users {
///     async fn execute_read(&self, query: &str, params: &BoundParams) -> Result<Vec<Row>, StoreError> {
///         assert_eq!(query, "SELECT * FROM users WHERE id = :id");
///         let id = params.get("id").cloned().unwrap_or(Value::Null);
///         Ok(vec![Row::from_iter([("id", id), ("name", Value::from("alice"))])])
///     }
/// }
///
/// # futures::executor::block_on(async {
/// let mut users = DaoCollection::builder("users", Users).primary_key("id").key("id", 42).build();
/// users.read_by_primary_key().await?;
///
/// assert_eq!(users.get("id"), Some(&Value::from(42)));
/// assert_eq!(users.current().and_then(|row| row.get("name")), Some(&Value::from("alice")));
/// # Ok::<(), stowage_dao::ReadError>(())
/// # })?;
/// # Ok::<(), stowage_dao::ReadError>(())
/// ```
pub struct DaoCollection<S> {
    table: String,
    primary_keys: Vec<String>,
    own_keys: Vec<(String, Value)>,
    key_data: Vec<(String, Value)>,
    rows: Vec<Row>,
    position: usize,
    store: S,
    read_through: Option<ReadThrough>,
    diagnostics: Arc<dyn Diagnostics>,
}

impl<S: PersistentStore> DaoCollection<S> {
    /// Starts building a collection over `table`.
    pub fn builder(table: impl Into<String>, store: S) -> DaoCollectionBuilder<S> {
        DaoCollectionBuilder {
            table: table.into(),
            primary_keys: Vec::new(),
            own_keys: Vec::new(),
            store,
            read_through: None,
            diagnostics: None,
        }
    }

    /// Selects the rows matching `where_keys`.
    ///
    /// With no keys, the predicate is built from the primary key columns and
    /// the collection's own key values. Otherwise the keys are used in the
    /// order given; a repeated column keeps its first position and its last
    /// value. Returns the number of rows read.
    ///
    /// # Errors
    ///
    /// Returns an error if a primary key has no value, a name is not a valid
    /// identifier, or the store fails. The collection is unchanged on error.
    pub async fn read<I, K, V>(&mut self, where_keys: I) -> Result<usize, ReadError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut keys = Vec::new();
        for (column, value) in where_keys {
            upsert(&mut keys, column.into(), value.into());
        }
        if keys.is_empty() {
            keys = self.default_keys()?;
        }

        validate_table(&self.table)?;
        for (column, _) in &keys {
            validate_identifier(column)?;
        }

        let query = select(&self.table, &predicate(&keys));
        let params = BoundParams::new(keys);
        let rows = match &self.read_through {
            Some(read_through) => self.read_cached(read_through, &query, &params).await?,
            None => self.store.execute_read(&query, &params).await?,
        };

        tracing::debug!(table = %self.table, rows = rows.len(), "collection read");
        self.rows = rows;
        self.key_data = params.into_inner();
        self.position = 0;
        Ok(self.rows.len())
    }

    /// Selects the row(s) identified by the collection's own primary key values.
    ///
    /// # Errors
    ///
    /// Same as [`read`](Self::read).
    pub async fn read_by_primary_key(&mut self) -> Result<usize, ReadError> {
        self.read(std::iter::empty::<(String, Value)>()).await
    }

    async fn read_cached(&self, read_through: &ReadThrough, query: &str, params: &BoundParams) -> Result<Vec<Row>, ReadError> {
        let key = self.cache_key(params);
        if let Some(rows) = Self::load_rows(&read_through.backend, &key).await {
            tracing::debug!(%key, "collection cache hit");
            return Ok(rows);
        }

        let rows = self.store.execute_read(query, params).await?;
        if !rows.iter().flat_map(|row| row.columns()).all(|(_, value)| value.is_finite()) {
            tracing::debug!(%key, "rows hold non-finite floats, not caching");
            return Ok(rows);
        }
        match serde_json::to_vec(&rows) {
            Ok(payload) => {
                Loader::new(read_through.backend.clone(), key, ROWS_VERSION, read_through.ttl)
                    .store(payload)
                    .await;
            }
            Err(error) => tracing::debug!(%key, %error, "failed to serialize rows for caching"),
        }
        Ok(rows)
    }

    async fn load_rows(backend: &Backend, key: &CacheKey) -> Option<Vec<Row>> {
        let bytes = match backend.get(key.as_str()).await {
            Ok(bytes) => bytes?,
            Err(error) => {
                tracing::debug!(%key, %error, "collection cache read failed");
                return None;
            }
        };

        let record = CacheRecord::decode(&bytes).ok().filter(|record| record.is_current(ROWS_VERSION))?;
        serde_json::from_slice(record.payload()).ok()
    }

    /// Column names and values both feed the key, so `{a: 1}` and `{b: 1}` differ.
    fn cache_key(&self, params: &BoundParams) -> CacheKey {
        let values: Vec<Value> = params
            .iter()
            .flat_map(|(column, value)| [Value::from(column), value.clone()])
            .collect();
        CacheKey::build(CACHE_SYMBOL, &self.table, ROWS_VERSION, &values)
    }
}

impl<S> DaoCollection<S> {
    fn default_keys(&self) -> Result<Vec<(String, Value)>, ReadError> {
        self.primary_keys
            .iter()
            .map(|column| {
                self.own_keys
                    .iter()
                    .find(|(name, _)| name == column)
                    .map(|(name, value)| (name.clone(), value.clone()))
                    .ok_or_else(|| ReadError::MissingKey { column: column.clone() })
            })
            .collect()
    }

    /// The table name.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Primary key columns in declaration order.
    #[must_use]
    pub fn primary_keys(&self) -> &[String] {
        &self.primary_keys
    }

    /// The predicate that produced the current rows.
    #[must_use]
    pub fn key_data(&self) -> &[(String, Value)] {
        &self.key_data
    }

    /// The current rows in store order.
    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if there are no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Moves the cursor to the first row.
    pub fn rewind(&mut self) {
        self.position = 0;
    }

    /// Returns `true` while the cursor points at a row.
    #[must_use]
    pub fn valid(&self) -> bool {
        self.position < self.rows.len()
    }

    /// The row under the cursor.
    #[must_use]
    pub fn current(&self) -> Option<&Row> {
        self.rows.get(self.position)
    }

    /// The cursor position, while it points at a row.
    #[must_use]
    pub fn key(&self) -> Option<usize> {
        self.valid().then_some(self.position)
    }

    /// Moves the cursor to the next row.
    pub fn advance(&mut self) {
        if self.valid() {
            self.position += 1;
        }
    }

    /// Iterates over the rows without moving the cursor.
    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }

    /// Reads a key-data property.
    ///
    /// Names outside the key data are reported to diagnostics and read as `None`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        let value = self.key_data.iter().find(|(column, _)| column == name).map(|(_, value)| value);
        if value.is_none() {
            self.diagnostics
                .notice(DAO_CATEGORY, &format!("undeclared collection property `{name}` on `{}`", self.table));
        }
        value
    }

    /// Collection properties are read-only; every call is rejected and
    /// reported to diagnostics once.
    ///
    /// # Errors
    ///
    /// Always returns [`UndeclaredPropertyAccess`].
    pub fn set(&self, name: &str, _value: impl Into<Value>) -> Result<(), UndeclaredPropertyAccess> {
        self.diagnostics.notice(DAO_CATEGORY, "collection properties cannot be set");
        Err(UndeclaredPropertyAccess::new(name))
    }
}

impl<'a, S> IntoIterator for &'a DaoCollection<S> {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

impl<S> Debug for DaoCollection<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DaoCollection")
            .field("table", &self.table)
            .field("primary_keys", &self.primary_keys)
            .field("key_data", &self.key_data)
            .field("rows", &self.rows.len())
            .field("position", &self.position)
            .field("read_through", &self.read_through.is_some())
            .finish_non_exhaustive()
    }
}

fn upsert(keys: &mut Vec<(String, Value)>, column: String, value: Value) {
    match keys.iter_mut().find(|(name, _)| *name == column) {
        Some((_, slot)) => *slot = value,
        None => keys.push((column, value)),
    }
}

/// Builder for [`DaoCollection`].
pub struct DaoCollectionBuilder<S> {
    table: String,
    primary_keys: Vec<String>,
    own_keys: Vec<(String, Value)>,
    store: S,
    read_through: Option<ReadThrough>,
    diagnostics: Option<Arc<dyn Diagnostics>>,
}

impl<S: PersistentStore> DaoCollectionBuilder<S> {
    /// Declares a primary key column; repeated declarations are ignored.
    #[must_use]
    pub fn primary_key(mut self, column: impl Into<String>) -> Self {
        let column = column.into();
        if !self.primary_keys.contains(&column) {
            self.primary_keys.push(column);
        }
        self
    }

    /// Sets the collection's own value for a key column.
    #[must_use]
    pub fn key(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        upsert(&mut self.own_keys, column.into(), value.into());
        self
    }

    /// Caches read results in `backend`.
    #[must_use]
    pub fn read_through(mut self, backend: Backend, ttl: Option<Duration>) -> Self {
        self.read_through = Some(ReadThrough { backend, ttl });
        self
    }

    /// Sets the diagnostics sink; defaults to [`TracingDiagnostics`].
    #[must_use]
    pub fn diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }

    /// Builds an empty collection; call [`DaoCollection::read`] to load rows.
    #[must_use]
    pub fn build(self) -> DaoCollection<S> {
        DaoCollection {
            table: self.table,
            primary_keys: self.primary_keys,
            own_keys: self.own_keys,
            key_data: Vec::new(),
            rows: Vec::new(),
            position: 0,
            store: self.store,
            read_through: self.read_through,
            diagnostics: self.diagnostics.unwrap_or_else(|| Arc::new(TracingDiagnostics::new())),
        }
    }
}

impl<S> Debug for DaoCollectionBuilder<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DaoCollectionBuilder")
            .field("table", &self.table)
            .field("primary_keys", &self.primary_keys)
            .field("own_keys", &self.own_keys)
            .field("read_through", &self.read_through)
            .finish_non_exhaustive()
    }
}
