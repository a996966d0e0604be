use std::io::Write;

use chrono::SecondsFormat;
use tidemark::PersistedState;

use crate::commands::shared::Settings;
use crate::store::StateStore;

fn write_summary(out: &mut impl Write, state: &PersistedState) -> std::io::Result<()> {
    match state.bucket_execution_state {
        Some(execution) => writeln!(
            out,
            "last executed bucket: {}",
            execution.last_executed_bucket_id
        )?,
        None => writeln!(out, "last executed bucket: none")?,
    }

    if state.streams.is_empty() {
        writeln!(out, "no cutoffs recorded")?;
        return Ok(());
    }

    let width = state
        .streams
        .iter()
        .map(|(key, _)| key.len())
        .max()
        .unwrap_or(0);
    for (key, cutoff) in state.streams.iter() {
        let when = cutoff
            .as_datetime()
            .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
            .unwrap_or_else(|| cutoff.cutoff.to_string());
        writeln!(out, "{key:<width$}  {when}")?;
    }
    Ok(())
}

pub(crate) fn handle_show(
    settings: &Settings,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let state = settings.store.load()?;
    let mut out = std::io::stdout().lock();

    if json {
        writeln!(out, "{}", state.to_json()?)?;
    } else {
        tracing::debug!(path = %settings.store.path().display(), "Showing state");
        write_summary(&mut out, &state)?;
    }
    Ok(())
}
