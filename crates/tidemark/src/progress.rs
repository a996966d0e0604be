//! Progress events emitted while coordinating a run.
//!
//! These events are the log sink for the coordination engine: callers pass
//! an optional callback and render events however they like. Every event
//! also formats as a human-readable line via `Display`.

use std::fmt;

/// Why a record left the cutoff state untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The cursor field was missing, null, or not a timestamp.
    MissingTimestamp,
    /// The slice did not resolve to a partition key.
    UnresolvedKey,
    /// The slice resolved to a reserved state key.
    ReservedKey,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingTimestamp => f.write_str("missing cursor timestamp"),
            Self::UnresolvedKey => f.write_str("slice has no partition key"),
            Self::ReservedKey => f.write_str("partition key is reserved"),
        }
    }
}

/// Events emitted during scheduling and cutoff tracking.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CoordinationEvent {
    /// Round-robin execution picked the bucket for this run.
    BucketSelected {
        /// The bucket this run processes.
        bucket_id: u32,
        /// Total bucket count.
        bucket_total: u32,
        /// The bucket executed by the previous run, if any.
        previous_bucket_id: Option<u32>,
    },

    /// A partition's cutoff moved forward.
    CutoffAdvanced {
        /// Normalized partition key.
        key: String,
        /// Cutoff before this record (epoch millis).
        previous: Option<i64>,
        /// New cutoff (epoch millis).
        cutoff: i64,
    },

    /// A record did not change any cutoff.
    RecordSkipped {
        /// Why the record was ignored.
        reason: SkipReason,
    },
}

impl fmt::Display for CoordinationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BucketSelected {
                bucket_id,
                bucket_total,
                ..
            } => write!(
                f,
                "Using bucket {bucket_id} of {bucket_total} for round robin execution"
            ),
            Self::CutoffAdvanced { key, cutoff, .. } => {
                write!(f, "Advanced cutoff for {key} to {cutoff}")
            }
            Self::RecordSkipped { reason } => write!(f, "Skipped record: {reason}"),
        }
    }
}

/// Callback for progress updates.
pub type ProgressCallback = Box<dyn Fn(CoordinationEvent) + Send + Sync>;

/// Emit a progress event if a callback is provided.
#[inline]
pub fn emit(on_progress: Option<&ProgressCallback>, event: CoordinationEvent) {
    if let Some(cb) = on_progress {
        cb(event);
    }
}
