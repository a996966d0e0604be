//! Configuration file support for tidemark.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (prefixed with `TIDEMARK_`, nested keys separated
//!    by `__`, e.g., `TIDEMARK_BUCKETING__BUCKET_TOTAL`)
//! 3. Config file (./tidemark.toml, then ~/.config/tidemark/config.toml)
//! 4. Built-in defaults
//!
//! The state file defaults to `~/.local/state/tidemark/state.json` on Linux
//! (using the XDG state directory) if not explicitly configured.
//!
//! Example config file:
//! ```toml
//! [bucketing]
//! namespace = "github-repos"
//! bucket_total = 10
//! bucket_ranges = "1-3,5,7-8"
//! round_robin_bucket_execution = true
//!
//! [cutoff]
//! cutoff_lag_days = 1
//! timestamp_field = "updated_at"      # dotted paths reach nested fields
//! key_fields = ["org", "repo"]
//!
//! [state]
//! path = "/var/lib/tidemark/github-repos.json"
//! ```

use std::path::PathBuf;

use config::builder::DefaultState;
use config::{Config as ConfigBuilder, ConfigError, Environment, File, FileFormat};
use directories::ProjectDirs;
use serde::Deserialize;
use tidemark::{
    BucketRanges, FieldKey, FieldPairKey, KeyGenerator, RoundRobinConfig, TimestampStateConfig,
    extractor_for,
};

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Bucket assignment and round-robin scheduling.
    pub bucketing: BucketingConfig,
    /// Cutoff tracking.
    pub cutoff: CutoffConfig,
    /// State file location.
    pub state: StateConfig,
}

/// Bucket assignment and round-robin scheduling.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BucketingConfig {
    /// Key the entity digest is computed under.
    /// Changing it reassigns every entity.
    pub namespace: String,
    /// Total number of buckets.
    pub bucket_total: u32,
    /// Fixed bucket for this run (ignored when round-robin picks one).
    pub bucket_id: Option<u32>,
    /// Buckets in scope, e.g. "1-3,5" or ["1-3", "5"].
    pub bucket_ranges: Option<BucketRanges>,
    /// Advance one bucket per invocation.
    pub round_robin_bucket_execution: bool,
}

impl Default for BucketingConfig {
    fn default() -> Self {
        Self {
            namespace: "tidemark".to_string(),
            bucket_total: 1,
            bucket_id: None,
            bucket_ranges: None,
            round_robin_bucket_execution: false,
        }
    }
}

impl BucketingConfig {
    /// The library-level bucketing configuration.
    pub fn round_robin_config(&self) -> RoundRobinConfig {
        RoundRobinConfig {
            bucket_total: self.bucket_total,
            bucket_id: self.bucket_id,
            bucket_ranges: self.bucket_ranges.clone(),
            round_robin_bucket_execution: self.round_robin_bucket_execution,
        }
    }
}

/// Cutoff tracking.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct CutoffConfig {
    /// Days subtracted from observed timestamps before storing them.
    pub cutoff_lag_days: u32,
    /// Record field holding the cursor timestamp; dotted for nested fields.
    pub timestamp_field: String,
    /// Slice fields forming the partition key (one or two).
    pub key_fields: Vec<String>,
    /// Separator between the two key fields.
    pub key_separator: String,
}

impl Default for CutoffConfig {
    fn default() -> Self {
        Self {
            cutoff_lag_days: 0,
            timestamp_field: "updated_at".to_string(),
            key_fields: vec!["org".to_string(), "repo".to_string()],
            key_separator: "/".to_string(),
        }
    }
}

impl CutoffConfig {
    /// Build the library-level cutoff configuration.
    pub fn timestamp_state_config(&self) -> Result<TimestampStateConfig, String> {
        let key_generator: Box<dyn KeyGenerator> = match self.key_fields.as_slice() {
            [field] => Box::new(FieldKey::new(field.as_str())),
            [first, second] => Box::new(
                FieldPairKey::new(first.as_str(), second.as_str())
                    .with_separator(self.key_separator.as_str()),
            ),
            other => {
                return Err(format!(
                    "cutoff.key_fields must name one or two fields, got {}",
                    other.len()
                ));
            }
        };

        Ok(
            TimestampStateConfig::from_boxed(extractor_for(&self.timestamp_field), key_generator)
                .with_cutoff_lag_days(self.cutoff_lag_days),
        )
    }
}

/// State file location.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    /// Path to the JSON state file.
    /// Defaults to `~/.local/state/tidemark/state.json` if not specified.
    pub path: Option<PathBuf>,
}

impl Config {
    /// Load configuration using the config crate's layered approach.
    ///
    /// Sources are loaded in order (later sources override earlier):
    /// 1. Built-in defaults
    /// 2. XDG config file (~/.config/tidemark/config.toml)
    /// 3. Local config file (./tidemark.toml)
    /// 4. Environment variables with TIDEMARK_ prefix
    ///
    /// Fails if any source does not parse or holds a value of the wrong type.
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        if let Some(xdg_config) = Self::default_config_path()
            && xdg_config.exists()
        {
            tracing::debug!("Loading config from {:?}", xdg_config);
            builder = builder.add_source(
                File::from(xdg_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        let local_config = PathBuf::from("tidemark.toml");
        if local_config.exists() {
            tracing::debug!("Loading config from ./tidemark.toml");
            builder = builder.add_source(
                File::from(local_config)
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        // TIDEMARK_BUCKETING__BUCKET_TOTAL -> bucketing.bucket_total
        builder = builder.add_source(Self::environment());

        Self::from_builder(builder)
    }

    fn from_builder(
        builder: config::builder::ConfigBuilder<DefaultState>,
    ) -> Result<Self, ConfigError> {
        builder.build()?.try_deserialize()
    }

    fn environment() -> Environment {
        Environment::with_prefix("TIDEMARK")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    /// Get the state file path, falling back to the default state directory.
    pub fn state_path(&self) -> Option<PathBuf> {
        self.state.path.clone().or_else(|| {
            Self::default_state_dir().map(|state_dir| state_dir.join("state.json"))
        })
    }

    /// Get the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "tidemark").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get the default state directory path.
    ///
    /// On Linux, this is `$XDG_STATE_HOME/tidemark` or `~/.local/state/tidemark`.
    /// On macOS/Windows, falls back to the data directory.
    pub fn default_state_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "tidemark").map(|dirs| {
            dirs.state_dir()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| dirs.data_dir().to_path_buf())
        })
    }
}
