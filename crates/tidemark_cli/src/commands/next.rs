use std::sync::Arc;

use tidemark::{PersistedState, RunPlan, plan_run};

use crate::commands::shared::Settings;
use crate::progress::LoggingReporter;
use crate::store::StateStore;

/// Active buckets as printed on stdout, comma-separated.
fn format_buckets(plan: &RunPlan<'_>) -> String {
    plan.filter()
        .active_buckets()
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

fn schedule(
    settings: &Settings,
    persisted: PersistedState,
) -> Result<(String, PersistedState), Box<dyn std::error::Error>> {
    let reporter = Arc::new(LoggingReporter::new());
    let callback = reporter.as_callback();
    let plan = plan_run(
        &settings.namespace,
        &settings.bucketing,
        persisted,
        Some(&callback),
    )?;
    let buckets = format_buckets(&plan);
    Ok((buckets, plan.finish()))
}

pub(crate) fn handle_next(
    settings: &Settings,
    dry_run: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let persisted = settings.store.load()?;
    let (buckets, next_state) = schedule(settings, persisted)?;

    println!("{buckets}");

    if dry_run {
        tracing::info!("Dry run, state not written");
    } else {
        settings.store.save(&next_state)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use tidemark::{BucketExecutionState, RoundRobinConfig};

    use super::*;
    use crate::store::FileStateStore;

    fn settings(bucketing: RoundRobinConfig) -> Settings {
        Settings {
            namespace: "tidemark-test".to_string(),
            bucketing,
            store: FileStateStore::new("/nonexistent/state.json"),
        }
    }

    #[test]
    fn test_schedule_advances_round_robin() {
        let settings = settings(RoundRobinConfig::new(3).with_round_robin(true));
        let persisted = PersistedState {
            bucket_execution_state: Some(BucketExecutionState {
                last_executed_bucket_id: 3,
            }),
            ..PersistedState::default()
        };

        let (buckets, next_state) = schedule(&settings, persisted).unwrap();

        assert_eq!(buckets, "1");
        assert_eq!(
            next_state.bucket_execution_state,
            Some(BucketExecutionState {
                last_executed_bucket_id: 1
            })
        );
    }

    #[test]
    fn test_schedule_without_round_robin_lists_ranges() {
        let settings = settings(RoundRobinConfig::new(8).with_bucket_ranges("2-3,7"));

        let (buckets, next_state) = schedule(&settings, PersistedState::default()).unwrap();

        assert_eq!(buckets, "2,3,7");
        assert_eq!(next_state, PersistedState::default());
    }

    #[test]
    fn test_schedule_rejects_invalid_config() {
        let settings = settings(RoundRobinConfig::new(3).with_bucket_id(4));

        assert!(schedule(&settings, PersistedState::default()).is_err());
    }
}
