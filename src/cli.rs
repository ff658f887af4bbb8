//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use media_backup::FailurePolicy;
use media_backup::download::MAX_WORKERS;

/// Back up a photo library to local directories.
///
/// Signs in (or refreshes the saved token), lists the whole library, and
/// downloads every item not downloaded by an earlier run.
#[derive(Parser, Debug)]
#[command(name = "media-backup")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Download videos only (two workers, unmodified URLs)
    #[arg(long)]
    pub videos_only: bool,

    /// Concurrent downloads (1-64; default 5, or 2 with --videos-only)
    #[arg(short = 'c', long, value_parser = clap::value_parser!(u8).range(1..=MAX_WORKERS as i64))]
    pub workers: Option<u8>,

    /// Config file of flat `key = value` lines, a TOML subset without tables
    /// (default: $XDG_CONFIG_HOME/media-backup/config.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Ignore the saved token and sign in again
    #[arg(long, conflicts_with = "no_interactive")]
    pub reauthorize: bool,

    /// Fail instead of opening an interactive sign-in
    #[arg(long)]
    pub no_interactive: bool,

    /// What to do with an item whose download fails (retry_later, drop_silently)
    #[arg(long, value_name = "POLICY")]
    pub on_download_failure: Option<FailurePolicy>,
}
