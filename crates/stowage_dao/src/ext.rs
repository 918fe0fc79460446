// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::Arc;

use stowage::Execution;

use crate::{DaoCollection, DaoCollectionBuilder, PersistentStore};

/// Creates collections wired to an execution's cache backend and diagnostics.
pub trait ExecutionExt {
    /// Starts a collection over `table` that reads through the execution's
    /// backend with the environment TTL and reports to its diagnostics.
    fn collection<S: PersistentStore>(&self, table: impl Into<String>, store: S) -> DaoCollectionBuilder<S>;
}

impl ExecutionExt for Execution {
    fn collection<S: PersistentStore>(&self, table: impl Into<String>, store: S) -> DaoCollectionBuilder<S> {
        DaoCollection::builder(table, store)
            .read_through(self.backend().clone(), self.environment().ttl())
            .diagnostics(Arc::clone(self.diagnostics()))
    }
}
