//! Config command implementation.
//!
//! Generates configuration files in various formats.

use std::fs;
use std::path::PathBuf;

use crate::cli::ConfigFormat;
use crate::config::{format_config, Config};

/// Generates configuration files. An output of `-` prints to stdout.
pub fn command_config(
    output: Option<PathBuf>,
    format: ConfigFormat,
    commented: bool,
) -> anyhow::Result<()> {
    let config = Config::default();
    let output = output.unwrap_or_else(|| PathBuf::from("herakles-traffic.yaml"));

    let mut content = format_config(&config, &format)?;
    if commented && matches!(format, ConfigFormat::Yaml) {
        content = add_config_comments(content);
    }

    if output.to_string_lossy() == "-" {
        print!("{}", content);
    } else {
        fs::write(&output, content)?;
        println!("✅ Configuration written to: {}", output.display());
    }

    Ok(())
}

/// Adds comments to YAML configuration.
fn add_config_comments(yaml: String) -> String {
    let comments = r#"# Herakles Traffic Sampler Configuration
# ======================================
#
# Measurement
# -----------
# duration_secs: 10            # Number of one-second ticks
# top_n: 5                     # Processes shown individually, the rest is "Others"
# output: network_traffic.png  # Chart file (.png or .svg)
# force_empty: false           # Render an empty chart without reading counters
# export_json: null            # Also write chart data + tick timing as JSON
#
# Sampler
# -------
# warmup_ms: 2000              # Wait before the baseline snapshot
# poll_interval_ms: 100        # Pause between sampler cycles (1..=1000)
# shutdown_timeout_ms: 1000    # Wait for the sampler to stop
#
# Process Scanning
# ----------------
# proc_root: /proc             # Root of the proc filesystem
# include_names: null          # Include only processes matching these names
# exclude_names: null          # Exclude processes matching these names
# max_processes: null          # Maximum processes to scan
# parallelism: null            # Parallel threads (null = auto)
#
# Chart
# -----
# chart_width: 1200
# chart_height: 700
#
# Logging
# -------
# log_level: "info"            # off, error, warn, info, debug, trace
"#;

    format!("{comments}\n{yaml}")
}
