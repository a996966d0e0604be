//! Per-partition cutoff state.
//!
//! The persisted blob for one stream maps normalized partition keys to their
//! high-water mark, alongside the reserved round-robin execution fragment:
//!
//! ```json
//! {
//!   "acme/widgets": { "cutoff": 1704844800000 },
//!   "__bucket_execution_state": { "last_executed_bucket_id": 3 }
//! }
//! ```
//!
//! All state values are threaded through functions by value: a new state is
//! returned and the input is never mutated in place.
//!
//! # Module Structure
//!
//! - [`extract`] - `FieldExtractor` strategies and timestamp coercion
//! - [`key`] - `KeyGenerator` strategies
//! - [`manager`] - `CutoffStateManager`

pub mod extract;
pub mod key;
pub mod manager;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::round_robin::BucketExecutionState;

pub use extract::{FieldExtractor, FlatField, NestedField, coerce_timestamp, extractor_for};
pub use key::{FieldKey, FieldPairKey, KeyGenerator};
pub use manager::{CutoffStateManager, CutoffUpdate, TimestampStateConfig};

/// Reserved top-level key holding the round-robin execution state.
pub const BUCKET_EXECUTION_STATE_KEY: &str = "__bucket_execution_state";

/// High-water mark for one partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cutoff {
    /// Epoch milliseconds.
    pub cutoff: i64,
}

impl Cutoff {
    /// The cutoff as a UTC timestamp, if representable.
    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.cutoff)
    }
}

/// Mapping from partition key to cutoff.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamState(BTreeMap<String, Cutoff>);

impl StreamState {
    /// Empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cutoff entry for a key.
    pub fn get(&self, key: &str) -> Option<&Cutoff> {
        self.0.get(key)
    }

    /// Cutoff millis for a key.
    pub fn cutoff(&self, key: &str) -> Option<i64> {
        self.get(key).map(|c| c.cutoff)
    }

    /// Return this state with `key` set to `cutoff`.
    pub fn with_cutoff(mut self, key: impl Into<String>, cutoff: i64) -> Self {
        self.0.insert(key.into(), Cutoff { cutoff });
        self
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Cutoff)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, i64)> for StreamState {
    fn from_iter<I: IntoIterator<Item = (String, i64)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, cutoff)| (key, Cutoff { cutoff }))
                .collect(),
        )
    }
}

/// The full state blob for one stream, as handed to and from persistence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    /// Round-robin execution fragment.
    #[serde(
        rename = "__bucket_execution_state",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub bucket_execution_state: Option<BucketExecutionState>,
    /// Per-partition cutoffs.
    #[serde(flatten)]
    pub streams: StreamState,
}

impl PersistedState {
    /// Parse a state blob. An empty or whitespace-only input is empty state.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_json::from_str(json)
    }

    /// Serialize to pretty JSON with keys in stable order.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
