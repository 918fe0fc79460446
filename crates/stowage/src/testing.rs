// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Test helpers for code built on the registry.

use std::sync::Arc;

use parking_lot::Mutex;

#[doc(inline)]
pub use stowage_backend::testing::{BackendOp, MockBackend};

use crate::Diagnostics;

/// A diagnostics event captured by [`RecordingDiagnostics`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiagnosticEvent {
    /// `start_timer` was called.
    TimerStarted {
        /// Timer category.
        category: String,
        /// Timer label.
        label: String,
        /// Timer context.
        context: String,
    },
    /// `stop_timer` was called.
    TimerStopped {
        /// Timer category.
        category: String,
        /// Timer context.
        context: String,
    },
    /// `notice` was called.
    Notice {
        /// Notice category.
        category: String,
        /// Notice message.
        message: String,
    },
}

/// A [`Diagnostics`] sink that records every call.
///
/// Clones share the same log.
///
/// # Examples
///
/// ```
/// use stowage::Diagnostics;
/// use stowage::testing::RecordingDiagnostics;
///
/// let diagnostics = RecordingDiagnostics::new();
/// diagnostics.notice("dao", "collection properties cannot be set");
///
/// assert_eq!(diagnostics.notices(), vec!["collection properties cannot be set".to_owned()]);
/// ```
#[derive(Clone, Debug, Default)]
pub struct RecordingDiagnostics {
    events: Arc<Mutex<Vec<DiagnosticEvent>>>,
}

impl RecordingDiagnostics {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every recorded event in call order.
    #[must_use]
    pub fn events(&self) -> Vec<DiagnosticEvent> {
        self.events.lock().clone()
    }

    /// Messages of every recorded notice in call order.
    #[must_use]
    pub fn notices(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                DiagnosticEvent::Notice { message, .. } => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of `start_timer` calls.
    #[must_use]
    pub fn timers_started(&self) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|event| matches!(event, DiagnosticEvent::TimerStarted { .. }))
            .count()
    }

    /// Number of `stop_timer` calls.
    #[must_use]
    pub fn timers_stopped(&self) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|event| matches!(event, DiagnosticEvent::TimerStopped { .. }))
            .count()
    }

    /// Forgets every recorded event.
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl Diagnostics for RecordingDiagnostics {
    fn start_timer(&self, category: &str, label: &str, context: &str) {
        self.events.lock().push(DiagnosticEvent::TimerStarted {
            category: category.to_owned(),
            label: label.to_owned(),
            context: context.to_owned(),
        });
    }

    fn stop_timer(&self, category: &str, context: &str) {
        self.events.lock().push(DiagnosticEvent::TimerStopped {
            category: category.to_owned(),
            context: context.to_owned(),
        });
    }

    fn notice(&self, category: &str, message: &str) {
        self.events.lock().push(DiagnosticEvent::Notice {
            category: category.to_owned(),
            message: message.to_owned(),
        });
    }
}
