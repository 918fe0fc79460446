// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Mock persistent store for testing.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

#[doc(inline)]
pub use stowage::testing::RecordingDiagnostics;

use crate::{BoundParams, PersistentStore, Row, StoreError};

/// A persistent store that answers from canned results.
///
/// Each query pops the next queued result set; with nothing queued it returns
/// no rows. Every query is recorded with its parameters, including failed
/// ones. Clones share state.
#[derive(Clone, Debug, Default)]
pub struct MockStore {
    results: Arc<Mutex<VecDeque<Vec<Row>>>>,
    queries: Arc<Mutex<Vec<(String, BoundParams)>>>,
    failing: Arc<Mutex<Option<String>>>,
}

impl MockStore {
    /// Creates a store with no queued results.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the rows returned by the next unanswered query.
    pub fn push_rows(&self, rows: impl IntoIterator<Item = Row>) {
        self.results.lock().push_back(rows.into_iter().collect());
    }

    /// Makes every query fail with `message` until [`recover`](Self::recover).
    pub fn fail_with(&self, message: impl Into<String>) {
        *self.failing.lock() = Some(message.into());
    }

    /// Lets queries succeed again.
    pub fn recover(&self) {
        *self.failing.lock() = None;
    }

    /// Every query executed so far with its parameters.
    #[must_use]
    pub fn queries(&self) -> Vec<(String, BoundParams)> {
        self.queries.lock().clone()
    }

    /// Number of queries executed so far.
    #[must_use]
    pub fn query_count(&self) -> usize {
        self.queries.lock().len()
    }
}

impl PersistentStore for MockStore {
    async fn execute_read(&self, query: &str, params: &BoundParams) -> Result<Vec<Row>, StoreError> {
        self.queries.lock().push((query.to_owned(), params.clone()));

        let failing = self.failing.lock().clone();
        if let Some(message) = failing {
            return Err(StoreError::from_message(message));
        }

        Ok(self.results.lock().pop_front().unwrap_or_default())
    }
}
