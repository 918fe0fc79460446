// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Timing and notice hooks.
//!
//! The registry times every resolution it completes and reports misuse
//! through a [`Diagnostics`] implementation shared by the whole
//! [`Environment`](crate::Environment). The default,
//! [`TracingDiagnostics`], forwards everything to `tracing`.

use std::collections::HashMap;
use std::fmt::Debug;
use std::time::Instant;

use parking_lot::Mutex;

/// Timer category used by the registry for resolutions.
pub const REGISTRY_CATEGORY: &str = "registry";

/// Receiver for timing and notice events.
///
/// A timer is identified by its `(category, context)` pair. Starting a timer
/// that is already running, or stopping one that is not, is ignored.
pub trait Diagnostics: Debug + Send + Sync {
    /// Starts a timer.
    fn start_timer(&self, category: &str, label: &str, context: &str);

    /// Stops a timer started with the same category and context.
    fn stop_timer(&self, category: &str, context: &str);

    /// Reports a non-fatal problem.
    fn notice(&self, category: &str, message: &str);
}

/// Discards every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopDiagnostics;

impl Diagnostics for NoopDiagnostics {
    fn start_timer(&self, _category: &str, _label: &str, _context: &str) {}

    fn stop_timer(&self, _category: &str, _context: &str) {}

    fn notice(&self, _category: &str, _message: &str) {}
}

#[derive(Debug)]
struct RunningTimer {
    label: String,
    started: Instant,
}

/// Emits timers as `debug` events and notices as `warn` events.
#[derive(Debug, Default)]
pub struct TracingDiagnostics {
    timers: Mutex<HashMap<(String, String), RunningTimer>>,
}

impl TracingDiagnostics {
    /// Creates a diagnostics sink with no running timers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of timers started and not yet stopped.
    #[must_use]
    pub fn running_timers(&self) -> usize {
        self.timers.lock().len()
    }
}

impl Diagnostics for TracingDiagnostics {
    fn start_timer(&self, category: &str, label: &str, context: &str) {
        self.timers
            .lock()
            .entry((category.to_owned(), context.to_owned()))
            .or_insert_with(|| RunningTimer {
                label: label.to_owned(),
                started: Instant::now(),
            });
    }

    fn stop_timer(&self, category: &str, context: &str) {
        let Some(timer) = self.timers.lock().remove(&(category.to_owned(), context.to_owned())) else {
            return;
        };

        tracing::debug!(
            category,
            label = %timer.label,
            context,
            elapsed_us = u64::try_from(timer.started.elapsed().as_micros()).unwrap_or(u64::MAX),
            "timer stopped"
        );
    }

    fn notice(&self, category: &str, message: &str) {
        tracing::warn!(category, message, "diagnostic notice");
    }
}
