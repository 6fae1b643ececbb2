//! CLI argument definitions for vulnmend-daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// Vulnmend dependency remediation daemon.
///
/// Exposes an HTTP surface for triggering per-repository remediation
/// runs (clone, image build, scan, patch, test, pull request) and for
/// polling their status.
#[derive(Parser, Debug)]
#[command(name = "vulnmend-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to vulnmend.toml configuration file.
    #[arg(short, long, default_value = "/etc/vulnmend/vulnmend.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Validate configuration file and exit without starting the daemon.
    #[arg(long)]
    pub validate: bool,
}
