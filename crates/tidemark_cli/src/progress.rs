//! Progress reporting for coordination runs.
//!
//! Events from the library are mapped onto structured `tracing` output on
//! stderr, keeping stdout free for command results.

use std::sync::Arc;

use tidemark::{CoordinationEvent, ProgressCallback};

/// Logging reporter using tracing for structured output.
pub struct LoggingReporter;

impl LoggingReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, event: CoordinationEvent) {
        match event {
            CoordinationEvent::BucketSelected {
                bucket_id,
                bucket_total,
                previous_bucket_id,
            } => {
                tracing::info!(
                    bucket_id,
                    bucket_total,
                    previous_bucket_id = ?previous_bucket_id,
                    "Selected bucket"
                );
            }

            CoordinationEvent::CutoffAdvanced {
                key,
                previous,
                cutoff,
            } => {
                tracing::debug!(key = %key, previous = ?previous, cutoff, "Cutoff advanced");
            }

            CoordinationEvent::RecordSkipped { reason } => {
                tracing::debug!(reason = %reason, "Record skipped");
            }

            _ => {}
        }
    }

    /// Convert to a ProgressCallback for the library.
    pub fn as_callback(self: &Arc<Self>) -> ProgressCallback {
        let reporter = Arc::clone(self);
        Box::new(move |event| {
            reporter.handle(event);
        })
    }
}

impl Default for LoggingReporter {
    fn default() -> Self {
        Self::new()
    }
}
