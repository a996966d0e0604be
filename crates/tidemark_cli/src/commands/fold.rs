use std::io::BufRead;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tidemark::{CutoffStateManager, RunPlan, resume_run};

use crate::commands::shared::{Settings, open_input};
use crate::config::CutoffConfig;
use crate::progress::LoggingReporter;
use crate::store::StateStore;

/// One input line: a synced record and the partition it was read from.
#[derive(Debug, Deserialize)]
struct FoldLine {
    record: Value,
    #[serde(default)]
    slice: Value,
}

/// Fold every parsable line into the plan. Returns the number of lines
/// that were not valid JSON.
fn fold_lines(
    plan: &mut RunPlan<'_>,
    manager: &CutoffStateManager,
    input: impl BufRead,
) -> std::io::Result<usize> {
    let mut malformed = 0;
    for (index, line) in input.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<FoldLine>(&line) {
            Ok(parsed) => plan.fold(manager, &parsed.record, &parsed.slice),
            Err(e) => {
                malformed += 1;
                tracing::warn!(line = index + 1, error = %e, "Skipping malformed line");
            }
        }
    }
    Ok(malformed)
}

pub(crate) fn handle_fold(
    settings: &Settings,
    cutoff: &CutoffConfig,
    input: Option<&Path>,
    dry_run: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let manager = CutoffStateManager::new(cutoff.timestamp_state_config()?);
    let persisted = settings.store.load()?;

    let reporter = Arc::new(LoggingReporter::new());
    let callback = reporter.as_callback();
    let mut plan = resume_run(
        &settings.namespace,
        &settings.bucketing,
        persisted,
        Some(&callback),
    )?;

    let reader = open_input(input)?;
    let malformed = fold_lines(&mut plan, &manager, reader)?;

    let stats = plan.stats();
    tracing::info!(
        records = stats.records,
        advanced = stats.advanced,
        skipped = stats.skipped,
        malformed,
        "Fold complete"
    );
    println!(
        "{} records, {} advanced, {} skipped, {} malformed",
        stats.records, stats.advanced, stats.skipped, malformed
    );

    if dry_run {
        tracing::info!("Dry run, state not written");
    } else {
        settings.store.save(&plan.finish())?;
    }

    Ok(())
}
