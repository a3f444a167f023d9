//! Configuration management for herakles-traffic.
//!
//! Loads, merges and validates configuration from files and CLI arguments.
//! YAML, JSON and TOML are supported.

use crate::cli::{Args, ConfigFormat};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

// Default configuration constants
pub const DEFAULT_DURATION_SECS: usize = 10;
pub const DEFAULT_TOP_N: usize = 5;
pub const DEFAULT_OUTPUT: &str = "network_traffic.png";
pub const DEFAULT_WARMUP_MS: u64 = 2000;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;
pub const DEFAULT_SHUTDOWN_TIMEOUT_MS: u64 = 1000;
pub const DEFAULT_PROC_ROOT: &str = "/proc";
/// Longest accepted measurement window (one day of one-second ticks).
pub const MAX_DURATION_SECS: usize = 86_400;
pub const DEFAULT_CHART_WIDTH: u32 = 1200;
pub const DEFAULT_CHART_HEIGHT: u32 = 700;

const DEFAULT_CONFIG_PATHS: [&str; 4] = [
    "/etc/herakles/traffic.yaml",
    "/etc/herakles/traffic.yml",
    "./herakles-traffic.yaml",
    "./herakles-traffic.json",
];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("reading config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing {format} config {path}: {message}")]
    Parse {
        path: PathBuf,
        format: &'static str,
        message: String,
    },

    #[error("serializing config: {0}")]
    Serialize(String),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("duration_secs must be at least 1")]
    ZeroDuration,

    #[error("duration_secs must be at most {max}, got {0}", max = MAX_DURATION_SECS)]
    DurationTooLong(usize),

    #[error("top_n must be at least 1")]
    ZeroTopN,

    #[error("poll_interval_ms must be between 1 and 1000, got {0}")]
    PollInterval(u64),

    #[error("chart_width and chart_height must be non-zero")]
    ChartSize,

    #[error("output path must not be empty")]
    EmptyOutput,

    #[error("invalid log_level '{0}'")]
    LogLevel(String),
}

/// Effective configuration. Every field is optional so a file only needs to
/// carry what it overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Measurement
    #[serde(alias = "duration-secs", alias = "duration")]
    pub duration_secs: Option<usize>,
    #[serde(alias = "top-n")]
    pub top_n: Option<usize>,
    pub output: Option<PathBuf>,
    #[serde(alias = "force-empty")]
    pub force_empty: Option<bool>,
    #[serde(alias = "export-json")]
    pub export_json: Option<PathBuf>,

    // Sampler
    #[serde(alias = "warmup-ms")]
    pub warmup_ms: Option<u64>,
    #[serde(alias = "poll-interval-ms")]
    pub poll_interval_ms: Option<u64>,
    #[serde(alias = "shutdown-timeout-ms")]
    pub shutdown_timeout_ms: Option<u64>,

    // Process scanning
    #[serde(alias = "proc-root")]
    pub proc_root: Option<PathBuf>,
    #[serde(alias = "include-names")]
    pub include_names: Option<Vec<String>>,
    #[serde(alias = "exclude-names")]
    pub exclude_names: Option<Vec<String>>,
    #[serde(alias = "max-processes")]
    pub max_processes: Option<usize>,
    pub parallelism: Option<usize>,

    // Chart
    #[serde(alias = "chart-width")]
    pub chart_width: Option<u32>,
    #[serde(alias = "chart-height")]
    pub chart_height: Option<u32>,

    // Logging
    #[serde(alias = "log-level")]
    pub log_level: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            duration_secs: Some(DEFAULT_DURATION_SECS),
            top_n: Some(DEFAULT_TOP_N),
            output: Some(PathBuf::from(DEFAULT_OUTPUT)),
            force_empty: Some(false),
            export_json: None,
            warmup_ms: Some(DEFAULT_WARMUP_MS),
            poll_interval_ms: Some(DEFAULT_POLL_INTERVAL_MS),
            shutdown_timeout_ms: Some(DEFAULT_SHUTDOWN_TIMEOUT_MS),
            proc_root: Some(PathBuf::from(DEFAULT_PROC_ROOT)),
            include_names: None,
            exclude_names: None,
            max_processes: None,
            parallelism: None,
            chart_width: Some(DEFAULT_CHART_WIDTH),
            chart_height: Some(DEFAULT_CHART_HEIGHT),
            log_level: Some("info".into()),
        }
    }
}

impl Config {
    pub fn duration(&self) -> usize {
        self.duration_secs.unwrap_or(DEFAULT_DURATION_SECS)
    }

    pub fn top_n(&self) -> usize {
        self.top_n.unwrap_or(DEFAULT_TOP_N)
    }

    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT))
    }

    pub fn proc_root(&self) -> PathBuf {
        self.proc_root
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PROC_ROOT))
    }

    pub fn warmup(&self) -> Duration {
        Duration::from_millis(self.warmup_ms.unwrap_or(DEFAULT_WARMUP_MS))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS))
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(
            self.shutdown_timeout_ms
                .unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT_MS),
        )
    }

    pub fn chart_size(&self) -> (u32, u32) {
        (
            self.chart_width.unwrap_or(DEFAULT_CHART_WIDTH),
            self.chart_height.unwrap_or(DEFAULT_CHART_HEIGHT),
        )
    }
}

/// Validate effective config (used by --check-config and at startup)
pub fn validate_effective_config(cfg: &Config) -> Result<(), ValidationError> {
    if cfg.duration() == 0 {
        return Err(ValidationError::ZeroDuration);
    }
    if cfg.duration() > MAX_DURATION_SECS {
        return Err(ValidationError::DurationTooLong(cfg.duration()));
    }
    if cfg.top_n() == 0 {
        return Err(ValidationError::ZeroTopN);
    }

    let poll = cfg.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS);
    if !(1..=1000).contains(&poll) {
        return Err(ValidationError::PollInterval(poll));
    }

    let (w, h) = cfg.chart_size();
    if w == 0 || h == 0 {
        return Err(ValidationError::ChartSize);
    }

    if cfg.output_path().as_os_str().is_empty() {
        return Err(ValidationError::EmptyOutput);
    }

    if let Some(level) = cfg.log_level.as_deref() {
        if !matches!(
            level.to_ascii_lowercase().as_str(),
            "off" | "error" | "warn" | "info" | "debug" | "trace"
        ) {
            return Err(ValidationError::LogLevel(level.to_string()));
        }
    }

    Ok(())
}

fn split_names(list: &str) -> Vec<String> {
    list.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Resolves configuration from CLI args, config file, and defaults.
/// This enforces precedence: CLI (if provided) > config file > default.
pub fn resolve_config(args: &Args) -> Result<Config, ConfigError> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref())?
    };

    if let Some(d) = args.duration {
        config.duration_secs = Some(d);
    }
    if let Some(n) = args.top_n {
        config.top_n = Some(n);
    }
    if let Some(output) = &args.output {
        config.output = Some(output.clone());
    }
    if args.force_empty {
        config.force_empty = Some(true);
    }
    if let Some(path) = &args.export_json {
        config.export_json = Some(path.clone());
    }

    if let Some(ms) = args.warmup_ms {
        config.warmup_ms = Some(ms);
    }
    if let Some(ms) = args.poll_interval_ms {
        config.poll_interval_ms = Some(ms);
    }
    if let Some(ms) = args.shutdown_timeout_ms {
        config.shutdown_timeout_ms = Some(ms);
    }

    if let Some(root) = &args.proc_root {
        config.proc_root = Some(root.clone());
    }
    if let Some(include_str) = &args.include_names {
        config.include_names = Some(split_names(include_str));
    }
    if let Some(exclude_str) = &args.exclude_names {
        config.exclude_names = Some(split_names(exclude_str));
    }
    if args.max_processes.is_some() {
        config.max_processes = args.max_processes;
    }
    if args.parallelism.is_some() {
        config.parallelism = args.parallelism;
    }

    if let Some(w) = args.chart_width {
        config.chart_width = Some(w);
    }
    if let Some(h) = args.chart_height {
        config.chart_height = Some(h);
    }

    if let Some(level) = &args.log_level {
        config.log_level = Some(level.as_str().to_string());
    }

    Ok(config)
}

fn find_default_config() -> Option<PathBuf> {
    DEFAULT_CONFIG_PATHS
        .iter()
        .map(Path::new)
        .find(|p| p.exists())
        .map(Path::to_path_buf)
}

/// Loads a config file, or the first default location that exists. Missing
/// files fall back to defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = match path.map(Path::to_path_buf).or_else(find_default_config) {
        Some(p) if p.exists() => p,
        _ => return Ok(Config::default()),
    };

    let content = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;

    let parse_err = |format: &'static str, message: String| ConfigError::Parse {
        path: path.clone(),
        format,
        message,
    };

    let config: Config = match path.extension().and_then(|s| s.to_str()) {
        Some("json") => {
            serde_json::from_str(&content).map_err(|e| parse_err("JSON", e.to_string()))?
        }
        Some("toml") => toml::from_str(&content).map_err(|e| parse_err("TOML", e.to_string()))?,
        _ => serde_yaml::from_str(&content).map_err(|e| parse_err("YAML", e.to_string()))?,
    };
    info!("Loaded configuration from: {}", path.display());

    Ok(merge_with_defaults(config))
}

/// Fills every field the file left out with its default.
fn merge_with_defaults(file: Config) -> Config {
    let d = Config::default();
    Config {
        duration_secs: file.duration_secs.or(d.duration_secs),
        top_n: file.top_n.or(d.top_n),
        output: file.output.or(d.output),
        force_empty: file.force_empty.or(d.force_empty),
        export_json: file.export_json.or(d.export_json),
        warmup_ms: file.warmup_ms.or(d.warmup_ms),
        poll_interval_ms: file.poll_interval_ms.or(d.poll_interval_ms),
        shutdown_timeout_ms: file.shutdown_timeout_ms.or(d.shutdown_timeout_ms),
        proc_root: file.proc_root.or(d.proc_root),
        include_names: file.include_names.or(d.include_names),
        exclude_names: file.exclude_names.or(d.exclude_names),
        max_processes: file.max_processes.or(d.max_processes),
        parallelism: file.parallelism.or(d.parallelism),
        chart_width: file.chart_width.or(d.chart_width),
        chart_height: file.chart_height.or(d.chart_height),
        log_level: file.log_level.or(d.log_level),
    }
}

/// Renders the configuration in the requested format.
pub fn format_config(config: &Config, format: &ConfigFormat) -> Result<String, ConfigError> {
    match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)
            .map_err(|e| ConfigError::Serialize(e.to_string())),
        ConfigFormat::Toml => {
            toml::to_string_pretty(config).map_err(|e| ConfigError::Serialize(e.to_string()))
        }
        ConfigFormat::Yaml => {
            serde_yaml::to_string(config).map_err(|e| ConfigError::Serialize(e.to_string()))
        }
    }
}

/// Shows configuration in requested format
pub fn show_config(config: &Config, format: &ConfigFormat) -> Result<(), ConfigError> {
    println!("{}", format_config(config, format)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = Config::default();
        assert!(validate_effective_config(&cfg).is_ok());
        assert_eq!(cfg.duration(), 10);
        assert_eq!(cfg.top_n(), 5);
        assert_eq!(cfg.output_path(), PathBuf::from("network_traffic.png"));
        assert_eq!(cfg.warmup(), Duration::from_secs(2));
        assert_eq!(cfg.chart_size(), (1200, 700));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut cfg = Config::default();
        cfg.duration_secs = Some(0);
        assert_eq!(
            validate_effective_config(&cfg),
            Err(ValidationError::ZeroDuration)
        );

        let mut cfg = Config::default();
        cfg.duration_secs = Some(1 << 40);
        assert_eq!(
            validate_effective_config(&cfg),
            Err(ValidationError::DurationTooLong(1 << 40))
        );

        let mut cfg = Config::default();
        cfg.top_n = Some(0);
        assert_eq!(validate_effective_config(&cfg), Err(ValidationError::ZeroTopN));

        let mut cfg = Config::default();
        cfg.poll_interval_ms = Some(0);
        assert_eq!(
            validate_effective_config(&cfg),
            Err(ValidationError::PollInterval(0))
        );

        let mut cfg = Config::default();
        cfg.chart_height = Some(0);
        assert_eq!(validate_effective_config(&cfg), Err(ValidationError::ChartSize));

        let mut cfg = Config::default();
        cfg.output = Some(PathBuf::new());
        assert_eq!(
            validate_effective_config(&cfg),
            Err(ValidationError::EmptyOutput)
        );

        let mut cfg = Config::default();
        cfg.log_level = Some("loud".into());
        assert!(matches!(
            validate_effective_config(&cfg),
            Err(ValidationError::LogLevel(_))
        ));
    }

    #[test]
    fn test_validation_accepts_limits() {
        let mut cfg = Config::default();
        cfg.duration_secs = Some(MAX_DURATION_SECS);
        cfg.top_n = Some(usize::MAX);
        assert_eq!(validate_effective_config(&cfg), Ok(()));
    }

    #[test]
    fn test_load_yaml_merges_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("traffic.yaml");
        fs::write(&path, "top-n: 3\nexclude_names: [kworker]\n").unwrap();

        let cfg = load_config(Some(&path)).unwrap();
        assert_eq!(cfg.top_n(), 3);
        assert_eq!(cfg.exclude_names, Some(vec!["kworker".to_string()]));
        assert_eq!(cfg.duration(), 10);
        assert_eq!(cfg.poll_interval_ms, Some(DEFAULT_POLL_INTERVAL_MS));
    }

    #[test]
    fn test_load_json_and_toml() {
        let dir = TempDir::new().unwrap();
        let json = dir.path().join("traffic.json");
        fs::write(&json, r#"{"duration_secs": 30}"#).unwrap();
        assert_eq!(load_config(Some(&json)).unwrap().duration(), 30);

        let toml_path = dir.path().join("traffic.toml");
        fs::write(&toml_path, "chart_width = 800\n").unwrap();
        assert_eq!(load_config(Some(&toml_path)).unwrap().chart_size(), (800, 700));
    }

    #[test]
    fn test_load_reports_parse_errors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            load_config(Some(&path)),
            Err(ConfigError::Parse { format: "JSON", .. })
        ));
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = load_config(Some(&dir.path().join("absent.yaml"))).unwrap();
        assert_eq!(cfg.top_n(), DEFAULT_TOP_N);
    }

    #[test]
    fn test_cli_overrides_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("traffic.yaml");
        fs::write(&path, "duration_secs: 20\ntop_n: 2\n").unwrap();

        let args = Args::parse_from([
            "herakles-traffic",
            "--config",
            path.to_str().unwrap(),
            "--duration",
            "7",
            "--exclude-names",
            "kthreadd, ,rcu_sched",
        ]);
        let cfg = resolve_config(&args).unwrap();

        assert_eq!(cfg.duration(), 7);
        assert_eq!(cfg.top_n(), 2);
        assert_eq!(
            cfg.exclude_names,
            Some(vec!["kthreadd".to_string(), "rcu_sched".to_string()])
        );
    }

    #[test]
    fn test_no_config_ignores_file() {
        let args = Args::parse_from(["herakles-traffic", "--no-config", "--top-n", "9"]);
        let cfg = resolve_config(&args).unwrap();
        assert_eq!(cfg.top_n(), 9);
        assert_eq!(cfg.duration(), DEFAULT_DURATION_SECS);
    }

    #[test]
    fn test_format_config_round_trips_yaml() {
        let text = format_config(&Config::default(), &ConfigFormat::Yaml).unwrap();
        let back: Config = serde_yaml::from_str(&text).unwrap();
        assert_eq!(back.top_n, Some(DEFAULT_TOP_N));
    }
}
