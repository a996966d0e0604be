//! High-water-mark tracking across independently progressing partitions.

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

use super::extract::{FieldExtractor, coerce_timestamp};
use super::key::KeyGenerator;
use super::{BUCKET_EXECUTION_STATE_KEY, StreamState};
use crate::progress::SkipReason;

/// How cutoffs are derived from records and slices.
pub struct TimestampStateConfig {
    field_extractor: Box<dyn FieldExtractor>,
    key_generator: Box<dyn KeyGenerator>,
    cutoff_lag_days: u32,
}

impl TimestampStateConfig {
    pub fn new(
        field_extractor: impl FieldExtractor + 'static,
        key_generator: impl KeyGenerator + 'static,
    ) -> Self {
        Self {
            field_extractor: Box::new(field_extractor),
            key_generator: Box::new(key_generator),
            cutoff_lag_days: 0,
        }
    }

    /// Build from already-boxed strategies.
    pub fn from_boxed(
        field_extractor: Box<dyn FieldExtractor>,
        key_generator: Box<dyn KeyGenerator>,
    ) -> Self {
        Self {
            field_extractor,
            key_generator,
            cutoff_lag_days: 0,
        }
    }

    /// Subtract this many days from observed timestamps before storing them.
    pub fn with_cutoff_lag_days(mut self, days: u32) -> Self {
        self.cutoff_lag_days = days;
        self
    }

    pub fn cutoff_lag_days(&self) -> u32 {
        self.cutoff_lag_days
    }
}

impl std::fmt::Debug for TimestampStateConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimestampStateConfig")
            .field("cutoff_lag_days", &self.cutoff_lag_days)
            .finish_non_exhaustive()
    }
}

/// What a single record does to the state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CutoffUpdate {
    /// The partition's cutoff moves forward.
    Advance {
        key: String,
        previous: Option<i64>,
        cutoff: i64,
    },
    /// The record is not newer than the stored cutoff.
    Unchanged { key: String },
    /// The record is ignored.
    Skipped(SkipReason),
}

/// Folds records into a per-partition cutoff map.
#[derive(Debug)]
pub struct CutoffStateManager {
    config: TimestampStateConfig,
}

impl CutoffStateManager {
    pub fn new(config: TimestampStateConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TimestampStateConfig {
        &self.config
    }

    /// Decide how `record` under `slice` affects `current` without building
    /// a new state.
    pub fn evaluate(&self, current: &StreamState, record: &Value, slice: &Value) -> CutoffUpdate {
        let Some(timestamp) = self
            .config
            .field_extractor
            .extract(record)
            .as_ref()
            .and_then(coerce_timestamp)
        else {
            return CutoffUpdate::Skipped(SkipReason::MissingTimestamp);
        };

        let Some(key) = self.config.key_generator.key(slice) else {
            return CutoffUpdate::Skipped(SkipReason::UnresolvedKey);
        };
        let key = key.to_lowercase();
        if key == BUCKET_EXECUTION_STATE_KEY {
            return CutoffUpdate::Skipped(SkipReason::ReservedKey);
        }

        let candidate = self.lagged_millis(timestamp);
        let previous = current.cutoff(&key);
        if candidate > previous.unwrap_or(0) {
            CutoffUpdate::Advance {
                key,
                previous,
                cutoff: candidate,
            }
        } else {
            CutoffUpdate::Unchanged { key }
        }
    }

    /// Return the state after observing `record` under `slice`.
    ///
    /// Only the maximum lag-adjusted timestamp per key survives, so record
    /// order does not matter. Records without a usable timestamp or key
    /// return `current` untouched.
    pub fn get_updated_state(
        &self,
        current: StreamState,
        record: &Value,
        slice: &Value,
    ) -> StreamState {
        match self.evaluate(&current, record, slice) {
            CutoffUpdate::Advance { key, cutoff, .. } => current.with_cutoff(key, cutoff),
            CutoffUpdate::Unchanged { .. } | CutoffUpdate::Skipped(_) => current,
        }
    }

    /// Stored cutoff for the partition a slice maps to.
    pub fn cutoff_for(&self, state: &StreamState, slice: &Value) -> Option<DateTime<Utc>> {
        let key = self.config.key_generator.key(slice)?.to_lowercase();
        state.get(&key)?.as_datetime()
    }

    fn lagged_millis(&self, timestamp: DateTime<Utc>) -> i64 {
        let lag = Duration::days(i64::from(self.config.cutoff_lag_days));
        timestamp.timestamp_millis() - lag.num_milliseconds()
    }
}
