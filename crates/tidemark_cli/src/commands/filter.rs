use std::io::{BufRead, Write};
use std::path::Path;

use tidemark::{BucketFilter, resume_run};

use crate::commands::shared::{Settings, open_input};
use crate::store::StateStore;

/// Copy the entity lines that belong to the active bucket(s).
///
/// Returns `(kept, total)`; blank lines are ignored.
fn filter_lines(
    filter: &BucketFilter,
    input: impl BufRead,
    out: &mut impl Write,
) -> std::io::Result<(usize, usize)> {
    let mut kept = 0;
    let mut total = 0;
    for line in input.lines() {
        let line = line?;
        let entity = line.trim();
        if entity.is_empty() {
            continue;
        }
        total += 1;
        if filter.contains(entity) {
            kept += 1;
            writeln!(out, "{entity}")?;
        }
    }
    Ok((kept, total))
}

pub(crate) fn handle_filter(
    settings: &Settings,
    input: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let persisted = settings.store.load()?;
    let plan = resume_run(&settings.namespace, &settings.bucketing, persisted, None)?;

    let reader = open_input(input)?;
    let mut out = std::io::stdout().lock();
    let (kept, total) = filter_lines(plan.filter(), reader, &mut out)?;

    tracing::info!(
        kept,
        total,
        buckets = ?plan.filter().active_buckets(),
        "Filtered entities"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use tidemark::RoundRobinConfig;

    use super::*;

    #[test]
    fn test_keeps_only_active_bucket() {
        let config = RoundRobinConfig::new(3).with_bucket_id(2);
        let filter = BucketFilter::new("tidemark-test", &config).unwrap();
        let repos: Vec<String> = (0..30).map(|i| format!("acme/repo-{i}")).collect();
        let input = repos.join("\n");
        let mut out = Vec::new();

        let (kept, total) = filter_lines(&filter, Cursor::new(input), &mut out).unwrap();

        let output = String::from_utf8(out).unwrap();
        let expected: Vec<&str> = repos
            .iter()
            .map(String::as_str)
            .filter(|r| filter.bucket_of(r) == 2)
            .collect();
        assert_eq!(total, 30);
        assert_eq!(kept, expected.len());
        assert_eq!(output.lines().collect::<Vec<_>>(), expected);
    }

    #[test]
    fn test_blank_lines_and_whitespace() {
        let filter = BucketFilter::new("tidemark-test", &RoundRobinConfig::new(1)).unwrap();
        let mut out = Vec::new();

        let (kept, total) =
            filter_lines(&filter, Cursor::new("  acme/a  \n\n\nacme/b\n"), &mut out).unwrap();

        assert_eq!((kept, total), (2, 2));
        assert_eq!(String::from_utf8(out).unwrap(), "acme/a\nacme/b\n");
    }
}
