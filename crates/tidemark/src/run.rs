//! One invocation of a partitioned incremental sync.
//!
//! A run loads the persisted blob, picks its bucket, filters entities
//! against that bucket, folds every synced record into the cutoff map, and
//! hands the resulting blob back for persistence. A run that is interrupted
//! never calls [`RunPlan::finish`], so nothing partial is written and the
//! next run resumes from the last persisted state.

use serde_json::Value;

use crate::bucketing::{BucketFilter, ConfigurationError};
use crate::progress::{CoordinationEvent, ProgressCallback, emit};
use crate::round_robin::{
    BucketExecutionState, RoundRobinConfig, apply_round_robin_bucketing, validate_bucketing_config,
};
use crate::state::{CutoffStateManager, CutoffUpdate, PersistedState, StreamState};

/// Summary counters for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Records folded into the state.
    pub records: usize,
    /// Records that advanced a cutoff.
    pub advanced: usize,
    /// Records ignored as data anomalies.
    pub skipped: usize,
}

/// The scheduled bucket, entity filter, and in-progress state of a run.
pub struct RunPlan<'a> {
    config: RoundRobinConfig,
    filter: BucketFilter,
    execution_state: Option<BucketExecutionState>,
    streams: StreamState,
    stats: RunStats,
    on_progress: Option<&'a ProgressCallback>,
}

/// Validate configuration, schedule this run's bucket, and prepare to fold
/// records.
///
/// Fails fast on invalid configuration, before any entity is processed.
pub fn plan_run<'a>(
    namespace_key: &str,
    config: &RoundRobinConfig,
    persisted: PersistedState,
    on_progress: Option<&'a ProgressCallback>,
) -> Result<RunPlan<'a>, ConfigurationError> {
    validate_bucketing_config(config)?;

    let outcome = apply_round_robin_bucketing(
        config,
        persisted.bucket_execution_state.as_ref(),
        on_progress,
    )?;
    let filter = BucketFilter::new(namespace_key, &outcome.config)?;

    Ok(RunPlan {
        config: outcome.config,
        filter,
        execution_state: outcome.state,
        streams: persisted.streams,
        stats: RunStats::default(),
        on_progress,
    })
}

/// Continue the run whose bucket was already scheduled by [`plan_run`].
///
/// Unlike [`plan_run`] this never advances the round-robin pointer: with
/// round-robin enabled the persisted last executed bucket is the active one.
/// Lets a run span several processes (schedule, then filter, then fold).
pub fn resume_run<'a>(
    namespace_key: &str,
    config: &RoundRobinConfig,
    persisted: PersistedState,
    on_progress: Option<&'a ProgressCallback>,
) -> Result<RunPlan<'a>, ConfigurationError> {
    validate_bucketing_config(config)?;

    let config = if config.round_robin_bucket_execution {
        let state = persisted
            .bucket_execution_state
            .ok_or(ConfigurationError::NotScheduled)?;
        let resumed = RoundRobinConfig {
            bucket_ranges: None,
            ..config.clone()
        }
        .with_bucket_id(state.last_executed_bucket_id);
        validate_bucketing_config(&resumed)?;
        resumed
    } else {
        config.clone()
    };
    let filter = BucketFilter::new(namespace_key, &config)?;

    Ok(RunPlan {
        config,
        filter,
        execution_state: persisted.bucket_execution_state,
        streams: persisted.streams,
        stats: RunStats::default(),
        on_progress,
    })
}

impl RunPlan<'_> {
    /// Configuration after scheduling.
    pub fn config(&self) -> &RoundRobinConfig {
        &self.config
    }

    /// The bucket this run processes, if a single bucket is active.
    pub fn bucket_id(&self) -> Option<u32> {
        self.config.bucket_id
    }

    pub fn filter(&self) -> &BucketFilter {
        &self.filter
    }

    /// Whether an entity belongs to this run.
    pub fn includes(&self, entity: &str) -> bool {
        self.filter.contains(entity)
    }

    /// Cutoffs as of the records folded so far.
    pub fn streams(&self) -> &StreamState {
        &self.streams
    }

    pub fn stats(&self) -> RunStats {
        self.stats
    }

    /// Fold one synced record into the cutoff map.
    pub fn fold(&mut self, manager: &CutoffStateManager, record: &Value, slice: &Value) {
        self.stats.records += 1;
        let current = std::mem::take(&mut self.streams);
        let update = manager.evaluate(&current, record, slice);
        self.streams = match update {
            CutoffUpdate::Advance {
                key,
                previous,
                cutoff,
            } => {
                self.stats.advanced += 1;
                tracing::debug!(key = %key, cutoff, "Advanced cutoff");
                emit(
                    self.on_progress,
                    CoordinationEvent::CutoffAdvanced {
                        key: key.clone(),
                        previous,
                        cutoff,
                    },
                );
                current.with_cutoff(key, cutoff)
            }
            CutoffUpdate::Unchanged { .. } => current,
            CutoffUpdate::Skipped(reason) => {
                self.stats.skipped += 1;
                tracing::debug!(%reason, "Skipped record");
                emit(self.on_progress, CoordinationEvent::RecordSkipped { reason });
                current
            }
        };
    }

    /// The blob to hand back to persistence.
    pub fn finish(self) -> PersistedState {
        PersistedState {
            bucket_execution_state: self.execution_state,
            streams: self.streams,
        }
    }
}
