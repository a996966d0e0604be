use crate::round_robin::{RoundRobinConfig, validate_bucketing_config};

use super::{BucketSet, ConfigurationError, bucket};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Selection {
    Single(u32),
    Ranges(BucketSet),
}

/// Selects the entities that belong to a run's active bucket(s).
///
/// Identifiers are case-folded before hashing, so `Org/Repo` and `org/repo`
/// always share a bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketFilter {
    namespace_key: String,
    bucket_total: u32,
    selection: Selection,
}

impl BucketFilter {
    /// Build a filter from a validated configuration.
    ///
    /// A configured `bucket_id` wins; otherwise `bucket_ranges` selects a set
    /// of buckets; otherwise bucket 1 is active.
    pub fn new(
        namespace_key: impl Into<String>,
        config: &RoundRobinConfig,
    ) -> Result<Self, ConfigurationError> {
        validate_bucketing_config(config)?;

        let selection = match (config.bucket_id, &config.bucket_ranges) {
            (Some(bucket_id), _) => Selection::Single(bucket_id),
            (None, Some(ranges)) => Selection::Ranges(BucketSet::new(config.bucket_total, ranges)?),
            (None, None) => Selection::Single(1),
        };

        Ok(Self {
            namespace_key: namespace_key.into(),
            bucket_total: config.bucket_total,
            selection,
        })
    }

    /// The bucket an entity is assigned to.
    pub fn bucket_of(&self, entity: &str) -> u32 {
        bucket(
            &self.namespace_key,
            &entity.to_lowercase(),
            self.bucket_total,
        )
    }

    /// Whether the entity belongs to this run.
    pub fn contains(&self, entity: &str) -> bool {
        let assigned = self.bucket_of(entity);
        match &self.selection {
            Selection::Single(bucket_id) => assigned == *bucket_id,
            Selection::Ranges(set) => set.contains(assigned),
        }
    }

    /// Keep only the entities that belong to this run.
    pub fn filter<'a, I, T>(&'a self, entities: I) -> impl Iterator<Item = T> + 'a
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: 'a,
        T: AsRef<str> + 'a,
    {
        entities
            .into_iter()
            .filter(move |entity| self.contains(entity.as_ref()))
    }

    /// Active bucket ids in ascending order.
    pub fn active_buckets(&self) -> Vec<u32> {
        match &self.selection {
            Selection::Single(bucket_id) => vec![*bucket_id],
            Selection::Ranges(set) => set.iter().collect(),
        }
    }

    /// The namespace key entities are hashed under.
    pub fn namespace_key(&self) -> &str {
        &self.namespace_key
    }

    /// Total bucket count.
    pub fn bucket_total(&self) -> u32 {
        self.bucket_total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NS: &str = "tidemark-test";

    fn repos() -> Vec<String> {
        (0..50).map(|i| format!("acme/repo-{i}")).collect()
    }

    #[test]
    fn test_single_bucket_matches_assignment() {
        let config = RoundRobinConfig::new(4).with_bucket_id(2);
        let filter = BucketFilter::new(NS, &config).unwrap();

        for repo in repos() {
            assert_eq!(filter.contains(&repo), bucket(NS, &repo, 4) == 2);
        }
    }

    #[test]
    fn test_buckets_partition_entities() {
        let all = repos();
        let mut seen = 0;
        for bucket_id in 1..=4 {
            let config = RoundRobinConfig::new(4).with_bucket_id(bucket_id);
            let filter = BucketFilter::new(NS, &config).unwrap();
            seen += filter.filter(all.iter()).count();
        }
        assert_eq!(seen, all.len());
    }

    #[test]
    fn test_case_folds_identifiers() {
        let config = RoundRobinConfig::new(8).with_bucket_id(1);
        let filter = BucketFilter::new(NS, &config).unwrap();

        assert_eq!(filter.bucket_of("Acme/Widget"), filter.bucket_of("acme/widget"));
    }

    #[test]
    fn test_ranges_select_union_of_buckets() {
        let config = RoundRobinConfig::new(4).with_bucket_ranges("1,3");
        let filter = BucketFilter::new(NS, &config).unwrap();

        assert_eq!(filter.active_buckets(), vec![1, 3]);
        for repo in repos() {
            let assigned = filter.bucket_of(&repo);
            assert_eq!(filter.contains(&repo), assigned == 1 || assigned == 3);
        }
    }

    #[test]
    fn test_bucket_id_wins_over_ranges() {
        let config = RoundRobinConfig::new(4)
            .with_bucket_ranges("1-3")
            .with_bucket_id(4);
        let filter = BucketFilter::new(NS, &config).unwrap();

        assert_eq!(filter.active_buckets(), vec![4]);
    }

    #[test]
    fn test_default_config_includes_everything() {
        let filter = BucketFilter::new(NS, &RoundRobinConfig::default()).unwrap();

        assert_eq!(filter.filter(repos()).count(), 50);
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = RoundRobinConfig::new(3).with_bucket_id(4);

        assert!(BucketFilter::new(NS, &config).is_err());
    }
}
