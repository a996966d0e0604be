//! Tidemark - coordination engine for partitioned incremental syncs.
//!
//! Large catalogs (every repository in an org, every project in a group) are
//! too big to sync in one run. Tidemark spreads entities across numbered
//! buckets with a deterministic keyed hash, advances a persisted round-robin
//! pointer so each invocation handles one bucket, and tracks a per-partition
//! high-water mark so re-runs only fetch new data.
//!
//! Tidemark does no I/O of its own. Callers load the state blob, thread it
//! through these pure functions, and persist the returned value.
//!
//! # Example
//!
//! ```ignore
//! use tidemark::{CutoffStateManager, FieldPairKey, FlatField, PersistedState,
//!     RoundRobinConfig, TimestampStateConfig, plan_run};
//!
//! let config = RoundRobinConfig::new(10).with_round_robin(true);
//! let manager = CutoffStateManager::new(
//!     TimestampStateConfig::new(FlatField::new("updated_at"), FieldPairKey::org_repo())
//!         .with_cutoff_lag_days(1),
//! );
//!
//! let mut plan = plan_run("my-source", &config, persisted, None)?;
//! for repo in repos.iter().filter(|r| plan.includes(r)) {
//!     for (record, slice) in sync(repo) {
//!         plan.fold(&manager, &record, &slice);
//!     }
//! }
//! store.save(&plan.finish())?;
//! ```

pub mod bucketing;
pub mod progress;
pub mod round_robin;
pub mod run;
pub mod state;

pub use bucketing::{
    BucketFilter, BucketRanges, BucketSet, ConfigurationError, DIGEST_PREFIX_HEX_LEN, bucket,
    digest_prefix,
};
pub use progress::{CoordinationEvent, ProgressCallback, SkipReason, emit};
pub use round_robin::{
    BucketExecutionState, RoundRobinConfig, RoundRobinOutcome, apply_round_robin_bucketing,
    next_bucket_id, validate_bucketing_config,
};
pub use run::{RunPlan, RunStats, plan_run, resume_run};
pub use state::{
    BUCKET_EXECUTION_STATE_KEY, Cutoff, CutoffStateManager, CutoffUpdate, FieldExtractor,
    FieldKey, FieldPairKey, FlatField, KeyGenerator, NestedField, PersistedState, StreamState,
    TimestampStateConfig, coerce_timestamp, extractor_for,
};
