//! CLI arguments and subcommands for herakles-traffic.
//!
//! Defines the command-line interface using clap, including all flags,
//! options and subcommands.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Log level options for CLI parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }

    /// Parses a level name as written in a config file.
    pub fn from_name(name: &str) -> Option<Self> {
        <Self as ValueEnum>::from_str(name, true).ok()
    }
}

/// Configuration format options for output
#[derive(Debug, Clone, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "herakles-traffic",
    about = "Per-process I/O traffic sampler with a stacked chart of the top talkers",
    long_about = "Per-process I/O traffic sampler.\n\n\
                  Samples cumulative per-process I/O counters in the background, measures \
                  once per second on an absolute schedule for the requested duration, and \
                  renders the busiest processes (plus an aggregated \"Others\" band) as a \
                  stacked area chart.",
    version,
    propagate_version = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Measurement duration in seconds
    #[arg(short = 'd', long)]
    pub duration: Option<usize>,

    /// Number of processes shown individually
    #[arg(short = 'n', long)]
    pub top_n: Option<usize>,

    /// Chart output file (.png, or .svg)
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Render an empty chart without collecting any counters
    #[arg(long)]
    pub force_empty: bool,

    /// Also write chart data and per-tick timing as JSON
    #[arg(long)]
    pub export_json: Option<PathBuf>,

    /// Time given to the sampler before the first measurement (ms)
    #[arg(long)]
    pub warmup_ms: Option<u64>,

    /// Pause between two sampler cycles (ms)
    #[arg(long)]
    pub poll_interval_ms: Option<u64>,

    /// How long to wait for the sampler to stop (ms)
    #[arg(long)]
    pub shutdown_timeout_ms: Option<u64>,

    /// Root of the proc filesystem
    #[arg(long)]
    pub proc_root: Option<PathBuf>,

    /// Include only processes matching these names (comma-separated)
    #[arg(long)]
    pub include_names: Option<String>,

    /// Exclude processes matching these names (comma-separated)
    #[arg(long)]
    pub exclude_names: Option<String>,

    /// Maximum number of processes to scan
    #[arg(long)]
    pub max_processes: Option<usize>,

    /// Parallel processing threads (0 = auto)
    #[arg(long)]
    pub parallelism: Option<usize>,

    /// Chart width in pixels
    #[arg(long)]
    pub chart_width: Option<u32>,

    /// Chart height in pixels
    #[arg(long)]
    pub chart_height: Option<u32>,

    /// Log level
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,
}

/// Subcommands for additional functionality
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate configuration and system requirements
    Check {
        /// Run one test collection and print the busiest processes
        #[arg(long)]
        collect: bool,
    },

    /// Generate configuration files
    Config {
        /// Output file path
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "yaml")]
        format: ConfigFormat,

        /// Include comments and examples
        #[arg(long)]
        commented: bool,
    },
}
