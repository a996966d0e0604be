//! Round-robin bucket scheduling across invocations.
//!
//! Each invocation processes exactly one bucket. The last executed bucket id
//! is persisted between runs, and every run advances it to the next
//! configured bucket, so a full cycle over all configured buckets completes
//! before any bucket repeats.

use serde::{Deserialize, Serialize};

use crate::bucketing::{BucketRanges, BucketSet, ConfigurationError};
use crate::progress::{CoordinationEvent, ProgressCallback, emit};

fn default_bucket_total() -> u32 {
    1
}

/// Bucketing configuration for a stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundRobinConfig {
    /// Total number of buckets entities are spread across.
    #[serde(default = "default_bucket_total")]
    pub bucket_total: u32,
    /// The bucket this run processes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket_id: Option<u32>,
    /// Buckets in scope for round-robin execution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket_ranges: Option<BucketRanges>,
    /// Advance through buckets one per invocation.
    #[serde(default)]
    pub round_robin_bucket_execution: bool,
}

impl Default for RoundRobinConfig {
    fn default() -> Self {
        Self {
            bucket_total: default_bucket_total(),
            bucket_id: None,
            bucket_ranges: None,
            round_robin_bucket_execution: false,
        }
    }
}

impl RoundRobinConfig {
    /// Configuration spreading entities over `bucket_total` buckets.
    pub fn new(bucket_total: u32) -> Self {
        Self {
            bucket_total,
            ..Self::default()
        }
    }

    /// Set the bucket processed by this run.
    pub fn with_bucket_id(mut self, bucket_id: u32) -> Self {
        self.bucket_id = Some(bucket_id);
        self
    }

    /// Restrict round-robin execution to a range specification.
    pub fn with_bucket_ranges(mut self, ranges: impl Into<BucketRanges>) -> Self {
        self.bucket_ranges = Some(ranges.into());
        self
    }

    /// Enable or disable round-robin execution.
    pub fn with_round_robin(mut self, enabled: bool) -> Self {
        self.round_robin_bucket_execution = enabled;
        self
    }
}

/// Execution state persisted between invocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketExecutionState {
    pub last_executed_bucket_id: u32,
}

/// Configuration and state produced by [`apply_round_robin_bucketing`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundRobinOutcome {
    /// Configuration with `bucket_id` set to the bucket this run processes.
    pub config: RoundRobinConfig,
    /// Execution state to persist at the end of the run.
    pub state: Option<BucketExecutionState>,
}

/// Check `bucket_total` and `bucket_id` bounds.
pub fn validate_bucketing_config(config: &RoundRobinConfig) -> Result<(), ConfigurationError> {
    if config.bucket_total < 1 {
        return Err(ConfigurationError::InvalidBucketTotal {
            bucket_total: config.bucket_total,
        });
    }
    if let Some(bucket_id) = config.bucket_id
        && !(1..=config.bucket_total).contains(&bucket_id)
    {
        return Err(ConfigurationError::BucketIdOutOfRange {
            bucket_id,
            bucket_total: config.bucket_total,
        });
    }
    Ok(())
}

/// Compute the bucket this invocation should process.
///
/// With no prior state the last executed bucket defaults to `bucket_total`,
/// so a brand-new deployment starts at the beginning of the cycle.
pub fn next_bucket_id(
    config: &RoundRobinConfig,
    state: Option<&BucketExecutionState>,
) -> Result<u32, ConfigurationError> {
    validate_bucketing_config(config)?;

    let last = state
        .map(|s| s.last_executed_bucket_id)
        .unwrap_or(config.bucket_total);

    if config.round_robin_bucket_execution
        && let Some(ranges) = &config.bucket_ranges
    {
        let set = BucketSet::new(config.bucket_total, ranges)?;
        return Ok(set.next(last));
    }

    Ok((last % config.bucket_total) + 1)
}

/// Advance round-robin execution by one bucket.
///
/// When round-robin is disabled the input is passed through unchanged.
pub fn apply_round_robin_bucketing(
    config: &RoundRobinConfig,
    state: Option<&BucketExecutionState>,
    on_progress: Option<&ProgressCallback>,
) -> Result<RoundRobinOutcome, ConfigurationError> {
    if !config.round_robin_bucket_execution {
        return Ok(RoundRobinOutcome {
            config: config.clone(),
            state: state.copied(),
        });
    }

    let next = next_bucket_id(config, state)?;
    tracing::debug!(
        bucket_id = next,
        bucket_total = config.bucket_total,
        "Using bucket {} for round robin execution",
        next
    );
    emit(
        on_progress,
        CoordinationEvent::BucketSelected {
            bucket_id: next,
            bucket_total: config.bucket_total,
            previous_bucket_id: state.map(|s| s.last_executed_bucket_id),
        },
    );

    Ok(RoundRobinOutcome {
        config: config.clone().with_bucket_id(next),
        state: Some(BucketExecutionState {
            last_executed_bucket_id: next,
        }),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    fn last(id: u32) -> BucketExecutionState {
        BucketExecutionState {
            last_executed_bucket_id: id,
        }
    }

    #[test]
    fn test_validate_rejects_bucket_id_above_total() {
        let config = RoundRobinConfig::new(5).with_bucket_id(6);

        assert_eq!(
            validate_bucketing_config(&config),
            Err(ConfigurationError::BucketIdOutOfRange {
                bucket_id: 6,
                bucket_total: 5,
            })
        );
    }

    #[test]
    fn test_validate_rejects_zero_total() {
        let config = RoundRobinConfig::new(0).with_bucket_id(1);

        assert_eq!(
            validate_bucketing_config(&config),
            Err(ConfigurationError::InvalidBucketTotal { bucket_total: 0 })
        );
    }

    #[test]
    fn test_validate_rejects_zero_bucket_id() {
        let config = RoundRobinConfig::new(3).with_bucket_id(0);

        assert!(validate_bucketing_config(&config).is_err());
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(validate_bucketing_config(&RoundRobinConfig::default()).is_ok());
        assert!(validate_bucketing_config(&RoundRobinConfig::new(5).with_bucket_id(5)).is_ok());
    }

    #[test]
    fn test_first_run_starts_at_bucket_one() {
        let config = RoundRobinConfig::new(5).with_round_robin(true);

        assert_eq!(next_bucket_id(&config, None), Ok(1));
    }

    #[test]
    fn test_first_run_with_ranges_wraps_to_first_member() {
        let config = RoundRobinConfig::new(5)
            .with_round_robin(true)
            .with_bucket_ranges(&["1-3", "5"][..]);

        assert_eq!(next_bucket_id(&config, None), Ok(1));
    }

    #[test]
    fn test_first_run_with_ranges_not_starting_at_one() {
        let config = RoundRobinConfig::new(5)
            .with_round_robin(true)
            .with_bucket_ranges("3-4");

        assert_eq!(next_bucket_id(&config, None), Ok(3));
    }

    #[test]
    fn test_increments_and_wraps() {
        let config = RoundRobinConfig::new(3).with_round_robin(true);

        assert_eq!(next_bucket_id(&config, Some(&last(1))), Ok(2));
        assert_eq!(next_bucket_id(&config, Some(&last(2))), Ok(3));
        assert_eq!(next_bucket_id(&config, Some(&last(3))), Ok(1));
    }

    #[test]
    fn test_ranges_ignored_without_round_robin() {
        let config = RoundRobinConfig::new(5).with_bucket_ranges("2");

        assert_eq!(next_bucket_id(&config, Some(&last(2))), Ok(3));
    }

    #[test]
    fn test_invalid_ranges_fail() {
        let config = RoundRobinConfig::new(5)
            .with_round_robin(true)
            .with_bucket_ranges("4-9");

        assert!(matches!(
            next_bucket_id(&config, None),
            Err(ConfigurationError::BoundOutOfRange { .. })
        ));
    }

    #[test]
    fn test_apply_disabled_is_passthrough() {
        let config = RoundRobinConfig::new(4).with_bucket_id(2);
        let state = last(3);
        let events = Arc::new(Mutex::new(Vec::<CoordinationEvent>::new()));
        let sink = Arc::clone(&events);
        let callback: ProgressCallback = Box::new(move |e| sink.lock().unwrap().push(e));

        let outcome = apply_round_robin_bucketing(&config, Some(&state), Some(&callback)).unwrap();

        assert_eq!(outcome.config, config);
        assert_eq!(outcome.state, Some(state));
        assert!(events.lock().unwrap().is_empty());
    }

    #[test]
    fn test_apply_advances_and_reports() {
        let config = RoundRobinConfig::new(4).with_round_robin(true);
        let events = Arc::new(Mutex::new(Vec::<CoordinationEvent>::new()));
        let sink = Arc::clone(&events);
        let callback: ProgressCallback = Box::new(move |e| sink.lock().unwrap().push(e));

        let outcome =
            apply_round_robin_bucketing(&config, Some(&last(2)), Some(&callback)).unwrap();

        assert_eq!(outcome.config.bucket_id, Some(3));
        assert_eq!(outcome.state, Some(last(3)));
        assert_eq!(
            events.lock().unwrap().as_slice(),
            &[CoordinationEvent::BucketSelected {
                bucket_id: 3,
                bucket_total: 4,
                previous_bucket_id: Some(2),
            }]
        );
    }

    #[test]
    fn test_apply_full_cycle_before_repeat() {
        let config = RoundRobinConfig::new(10)
            .with_round_robin(true)
            .with_bucket_ranges("2-3,6,9");
        let mut state = None;
        let mut visited = Vec::new();

        for _ in 0..4 {
            let outcome = apply_round_robin_bucketing(&config, state.as_ref(), None).unwrap();
            visited.push(outcome.config.bucket_id.unwrap());
            state = outcome.state;
        }

        assert_eq!(visited, vec![2, 3, 6, 9]);
        let outcome = apply_round_robin_bucketing(&config, state.as_ref(), None).unwrap();
        assert_eq!(outcome.config.bucket_id, Some(2));
    }

    #[derive(Clone, Default)]
    struct CapturedLog(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn log_output(level: tracing::Level, f: impl FnOnce()) -> String {
        let captured = CapturedLog::default();
        let sink = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_ansi(false)
            .with_writer(move || sink.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        let bytes = captured.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_bucket_selection_logs_at_debug_only() {
        let config = RoundRobinConfig::new(4).with_round_robin(true);
        let schedule = || {
            apply_round_robin_bucketing(&config, None, None).unwrap();
        };

        assert_eq!(log_output(tracing::Level::INFO, schedule), "");
        assert!(log_output(tracing::Level::DEBUG, schedule).contains("Using bucket 1"));
    }

    #[test]
    fn test_config_deserializes_persisted_field_names() {
        let config: RoundRobinConfig = serde_json::from_str(
            r#"{"bucket_total": 5, "bucket_ranges": "1-3,5", "round_robin_bucket_execution": true}"#,
        )
        .unwrap();

        assert_eq!(config.bucket_total, 5);
        assert_eq!(config.bucket_id, None);
        assert!(config.round_robin_bucket_execution);
        assert_eq!(config.bucket_ranges, Some(BucketRanges::from("1-3,5")));
    }
}
