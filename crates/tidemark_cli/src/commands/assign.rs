use std::io::Write;

use tidemark::{BucketFilter, digest_prefix};

use crate::commands::shared::Settings;

fn write_assignments(
    out: &mut impl Write,
    filter: &BucketFilter,
    ids: &[String],
    digest: bool,
) -> std::io::Result<()> {
    for id in ids {
        let bucket_id = filter.bucket_of(id);
        if digest {
            let prefix = digest_prefix(filter.namespace_key(), &id.to_lowercase());
            writeln!(out, "{id}\t{bucket_id}\t{prefix}")?;
        } else {
            writeln!(out, "{id}\t{bucket_id}")?;
        }
    }
    Ok(())
}

pub(crate) fn handle_assign(
    settings: &Settings,
    ids: &[String],
    digest: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let filter = BucketFilter::new(settings.namespace.as_str(), &settings.bucketing)?;
    let mut out = std::io::stdout().lock();
    write_assignments(&mut out, &filter, ids, digest)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use tidemark::{RoundRobinConfig, bucket};

    use super::*;

    fn render(filter: &BucketFilter, ids: &[&str], digest: bool) -> String {
        let ids: Vec<String> = ids.iter().map(|s| s.to_string()).collect();
        let mut out = Vec::new();
        write_assignments(&mut out, filter, &ids, digest).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_assignments_are_tab_separated() {
        let filter = BucketFilter::new("tidemark-test", &RoundRobinConfig::new(10)).unwrap();

        let output = render(&filter, &["acme/widgets", "acme/gadgets"], false);

        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            format!(
                "acme/widgets\t{}",
                bucket("tidemark-test", "acme/widgets", 10)
            )
        );
    }

    #[test]
    fn test_assignment_ignores_case() {
        let filter = BucketFilter::new("tidemark-test", &RoundRobinConfig::new(10)).unwrap();

        let output = render(&filter, &["Acme/Widgets", "acme/widgets"], false);

        let buckets: Vec<&str> = output
            .lines()
            .filter_map(|line| line.split('\t').nth(1))
            .collect();
        assert_eq!(buckets[0], buckets[1]);
    }

    #[test]
    fn test_digest_column() {
        let filter = BucketFilter::new("tidemark-test", &RoundRobinConfig::new(4)).unwrap();

        let output = render(&filter, &["acme/widgets"], true);

        let columns: Vec<&str> = output.trim_end().split('\t').collect();
        assert_eq!(columns.len(), 3);
        assert_eq!(columns[2], digest_prefix("tidemark-test", "acme/widgets"));
    }
}
