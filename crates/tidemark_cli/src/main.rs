//! Tidemark CLI - runs bucket scheduling and cutoff tracking against a state file.

mod commands;
mod config;
mod progress;
mod store;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use console::Term;
use tracing_subscriber::EnvFilter;

use crate::commands::shared::Settings;

#[derive(Parser)]
#[command(name = "tidemark")]
#[command(version)]
#[command(about = "Bucket scheduling and cutoff tracking for partitioned incremental syncs")]
#[command(
    long_about = "Tidemark spreads a large catalog of entities (repositories, projects, boards) \
across numbered buckets, advances a persisted round-robin pointer so each invocation \
handles one bucket, and tracks a per-partition high-water mark so re-runs only fetch \
new data. State lives in a single JSON file."
)]
#[command(after_long_help = r#"EXAMPLES
    Schedule the next bucket and record it:
        $ tidemark --round-robin --bucket-total 10 next

    Keep only the repositories in the scheduled bucket:
        $ gh repo list acme --json nameWithOwner -q '.[].nameWithOwner' | tidemark filter

    Fold synced records into the cutoff state:
        $ tidemark fold records.jsonl

    Show which bucket each repository lands in:
        $ tidemark --bucket-total 10 assign acme/widgets acme/gadgets

    Generate shell completions:
        $ tidemark completions bash > ~/.local/share/bash-completion/completions/tidemark

CONFIGURATION
    Tidemark reads configuration from:
      1. ~/.config/tidemark/config.toml (or $XDG_CONFIG_HOME/tidemark/config.toml)
      2. ./tidemark.toml
      3. Environment variables (TIDEMARK_* prefix, sections separated by __)
      4. .env file in current directory
    Command-line flags override all of the above.

ENVIRONMENT VARIABLES
    TIDEMARK_BUCKETING__NAMESPACE                       Digest key (default: tidemark)
    TIDEMARK_BUCKETING__BUCKET_TOTAL                    Number of buckets (default: 1)
    TIDEMARK_BUCKETING__BUCKET_RANGES                   Buckets in scope, e.g. 1-3,5
    TIDEMARK_BUCKETING__ROUND_ROBIN_BUCKET_EXECUTION    Advance one bucket per run
    TIDEMARK_CUTOFF__CUTOFF_LAG_DAYS                    Days subtracted from cutoffs
    TIDEMARK_STATE__PATH                                State file (default: ~/.local/state/tidemark/state.json)
    RUST_LOG                                            Log filter (default: tidemark=info,tidemark_cli=info)
"#)]
struct Cli {
    #[command(flatten)]
    opts: RunOptions,

    #[command(subcommand)]
    command: Commands,
}

/// Overrides for configured bucketing and state location.
#[derive(Debug, Clone, Default, clap::Args)]
struct RunOptions {
    /// State file (default from config or ~/.local/state/tidemark/state.json)
    #[arg(short = 's', long, global = true)]
    state: Option<PathBuf>,

    /// Key entity digests are computed under
    #[arg(short = 'N', long, global = true)]
    namespace: Option<String>,

    /// Total number of buckets
    #[arg(short = 't', long, global = true)]
    bucket_total: Option<u32>,

    /// Fixed bucket to process
    #[arg(short = 'b', long, global = true)]
    bucket_id: Option<u32>,

    /// Buckets in scope, e.g. "1-3,5"
    #[arg(short = 'r', long, global = true)]
    bucket_ranges: Option<String>,

    /// Advance one bucket per invocation (overrides config)
    #[arg(short = 'R', long, global = true, conflicts_with = "no_round_robin")]
    round_robin: bool,

    /// Process the configured bucket(s) without advancing (overrides config)
    #[arg(long, global = true)]
    no_round_robin: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Schedule the bucket for this run and record it in the state file
    Next {
        /// Dry run - print the bucket without writing state
        #[arg(short = 'n', long)]
        dry_run: bool,
    },
    /// Print the bucket each entity is assigned to
    Assign {
        /// Entity identifiers, e.g. acme/widgets
        #[arg(required = true)]
        ids: Vec<String>,

        /// Also print the digest prefix the bucket is derived from
        #[arg(short = 'd', long)]
        digest: bool,
    },
    /// Keep only the entities (one per line) in the scheduled bucket
    Filter {
        /// Input file (reads stdin if omitted or "-")
        input: Option<PathBuf>,
    },
    /// Fold JSON-lines records into the cutoff state
    Fold {
        /// Input file of {"record": ..., "slice": ...} lines (reads stdin if omitted or "-")
        input: Option<PathBuf>,

        /// Dry run - report what would change without writing state
        #[arg(short = 'n', long)]
        dry_run: bool,
    },
    /// Show the stored state
    Show {
        /// Print the raw JSON blob
        #[arg(short, long)]
        json: bool,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
    /// Generate man page(s)
    Man {
        /// Output directory for man pages (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Logs go to stderr; stdout carries command output.
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new("tidemark=info,tidemark_cli=info"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(Term::stderr().is_term())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Handle commands that don't need bucketing or state first
    match &cli.command {
        Commands::Completions { shell } => {
            commands::meta::handle_completions(*shell)?;
            return Ok(());
        }
        Commands::Man { output } => {
            commands::meta::handle_man(output.clone())?;
            return Ok(());
        }
        _ => {}
    }

    // Load configuration (config file -> env vars -> defaults)
    let config = config::Config::load()?;
    let settings = Settings::resolve(&config, &cli.opts)?;

    match cli.command {
        Commands::Next { dry_run } => {
            commands::next::handle_next(&settings, dry_run)?;
        }
        Commands::Assign { ids, digest } => {
            commands::assign::handle_assign(&settings, &ids, digest)?;
        }
        Commands::Filter { input } => {
            commands::filter::handle_filter(&settings, input.as_deref())?;
        }
        Commands::Fold { input, dry_run } => {
            commands::fold::handle_fold(&settings, &config.cutoff, input.as_deref(), dry_run)?;
        }
        Commands::Show { json } => {
            commands::show::handle_show(&settings, json)?;
        }
        Commands::Completions { .. } | Commands::Man { .. } => {}
    }

    Ok(())
}
