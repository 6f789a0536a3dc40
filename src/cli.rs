//! Command-line interface: worker count and queue file, plus a few paths.

use std::path::PathBuf;

use clap::Parser;

use crate::config::{DEFAULT_CONFIG_FILE, DEFAULT_ENV_FILE};
use crate::dispatch::DEFAULT_FAILURE_LOG;

/// Subscribe every device listed in a queue file, resumably.
///
/// Successfully subscribed identifiers are removed from QUEUE_FILE as they
/// complete, so rerunning with the same file picks up where a previous run
/// stopped.
#[derive(Debug, Parser)]
#[command(
    name = "bulksub",
    version,
    about,
    after_help = "Example: bulksub 12 ./sourcefile.txt"
)]
pub struct Cli {
    /// Number of concurrent workers (positive integer).
    #[arg(allow_negative_numbers = true)]
    pub workers: i64,

    /// Text file with one device identifier per line.
    pub queue_file: PathBuf,

    /// File that timed-out and rejected identifiers are appended to.
    #[arg(long, default_value = DEFAULT_FAILURE_LOG)]
    pub failed_log: PathBuf,

    /// Env file with SUB_* and AUTH_* settings.
    #[arg(long, default_value = DEFAULT_ENV_FILE)]
    pub env_file: PathBuf,

    /// Optional TOML settings file.
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Enable debug logging.
    #[arg(long, short, default_value_t = false)]
    pub verbose: bool,
}
