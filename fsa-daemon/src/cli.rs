//! CLI argument definitions for fsa-daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// FSA (File System Agent) analysis service.
///
/// Accepts dependency-analysis requests over HTTP and scans source
/// trees under bounded concurrency.
#[derive(Parser, Debug)]
#[command(name = "fsa-daemon")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to fsa.toml configuration file.
    ///
    /// When the file does not exist, defaults and `FSA_*` environment
    /// variables are used.
    #[arg(short, long, default_value = "/etc/fsa/fsa.toml")]
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

    /// Override the HTTP listen port.
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Validate configuration file and exit without starting the service.
    #[arg(long)]
    pub validate: bool,
}
