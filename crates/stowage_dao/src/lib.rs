// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Read-through row collections for the stowage object registry.
//!
//! A [`DaoCollection`] holds the rows of one table selected by a key
//! predicate. Reads go to a [`PersistentStore`]; when read-through caching is
//! enabled, results are first looked up in the cache backend and written back
//! after a miss.
//!
//! Collections are usually created from an [`Execution`](stowage::Execution)
//! through [`ExecutionExt::collection`], which wires in the environment's
//! cache backend, TTL and diagnostics:
//!
//! ```
//! use stowage::{Environment, Value};
//! use stowage_dao::{BoundParams, ExecutionExt, PersistentStore, Row, StoreError};
//!
//! struct Orders;
//!
//! impl PersistentStore for Orders {
//!     async fn execute_read(&self, query: &str, _params: &BoundParams) -> Result<Vec<Row>, StoreError> {
//!         assert_eq!(query, "SELECT * FROM orders WHERE customer = :customer");
//!         Ok(vec![Row::from_iter([("id", 7)])])
//!     }
//! }
//!
//! # futures::executor::block_on(async {
//! let environment = Environment::builder().build();
//! let execution = environment.execution();
//!
//! let mut orders = execution.collection("orders", Orders).primary_key("id").build();
//! orders.read([("customer", Value::from("alice"))]).await?;
//!
//! assert_eq!(orders.len(), 1);
//! assert_eq!(orders.key_data(), &[("customer".to_owned(), Value::from("alice"))]);
//! # Ok::<(), stowage_dao::ReadError>(())
//! # })?;
//! # Ok::<(), stowage_dao::ReadError>(())
//! ```
//!
//! Collection properties are read-only: [`DaoCollection::set`] is always
//! rejected and reported to diagnostics, and [`DaoCollection::get`] reads only
//! the key data of the last successful read.

mod collection;
mod error;
mod ext;
mod query;
mod store;
#[cfg(any(feature = "test-util", test))]
pub mod testing;

#[doc(inline)]
pub use collection::{DAO_CATEGORY, DaoCollection, DaoCollectionBuilder};
#[doc(inline)]
pub use error::{ReadError, StoreError, UndeclaredPropertyAccess};
#[doc(inline)]
pub use ext::ExecutionExt;
#[doc(inline)]
pub use store::{BoundParams, PersistentStore, Row};
