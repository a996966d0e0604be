use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use tidemark::{BucketRanges, RoundRobinConfig};

use crate::RunOptions;
use crate::config::Config;
use crate::store::FileStateStore;

/// Configuration merged with command-line overrides.
#[derive(Debug)]
pub(crate) struct Settings {
    pub(crate) namespace: String,
    pub(crate) bucketing: RoundRobinConfig,
    pub(crate) store: FileStateStore,
}

impl Settings {
    /// Apply command-line overrides on top of the loaded configuration.
    pub(crate) fn resolve(
        config: &Config,
        opts: &RunOptions,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let mut bucketing = config.bucketing.round_robin_config();
        if let Some(bucket_total) = opts.bucket_total {
            bucketing.bucket_total = bucket_total;
        }
        if let Some(bucket_id) = opts.bucket_id {
            bucketing.bucket_id = Some(bucket_id);
        }
        if let Some(ranges) = &opts.bucket_ranges {
            bucketing.bucket_ranges = Some(BucketRanges::from(ranges.as_str()));
        }
        if opts.round_robin {
            bucketing.round_robin_bucket_execution = true;
        } else if opts.no_round_robin {
            bucketing.round_robin_bucket_execution = false;
        }

        let namespace = opts
            .namespace
            .clone()
            .unwrap_or_else(|| config.bucketing.namespace.clone());

        let path = opts
            .state
            .clone()
            .or_else(|| config.state_path())
            .ok_or("Could not determine state file path; pass --state or set state.path")?;

        Ok(Self {
            namespace,
            bucketing,
            store: FileStateStore::new(path),
        })
    }
}

/// Open a line-oriented input, treating a missing path or "-" as stdin.
pub(crate) fn open_input(path: Option<&Path>) -> io::Result<Box<dyn BufRead>> {
    match path {
        Some(path) if path != Path::new("-") => Ok(Box::new(BufReader::new(File::open(path)?))),
        _ => Ok(Box::new(io::stdin().lock())),
    }
}
