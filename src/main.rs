//! herakles-traffic
//!
//! Per-process I/O traffic sampler with tracing logging.
//! Entry point: resolves configuration, handles subcommands and runs one
//! measurement followed by chart rendering.

use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::watch;
use tracing::level_filters::LevelFilter;
use tracing::{debug, error, info, warn};

use herakles_traffic::cli::{Args, Commands, LogLevel};
use herakles_traffic::commands::{command_check, command_config};
use herakles_traffic::config::{resolve_config, show_config, validate_effective_config, Config};
use herakles_traffic::export::{write_json, RunExport};
use herakles_traffic::run::{run_measurement, RunReport, RunSettings, EXIT_FAILURE};
use herakles_traffic::startup_checks;
use herakles_traffic::{
    aggregate, render_chart, EmptySource, ProcfsSource, RenderOptions, SamplerStats,
};

/// Initializes tracing logging subsystem with configured log level.
fn setup_logging(config: &Config) {
    let level = config
        .log_level
        .as_deref()
        .and_then(LogLevel::from_name)
        .unwrap_or(LogLevel::Info);
    let filter = match level {
        LogLevel::Off => LevelFilter::OFF,
        LogLevel::Error => LevelFilter::ERROR,
        LogLevel::Warn => LevelFilter::WARN,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Debug => LevelFilter::DEBUG,
        LogLevel::Trace => LevelFilter::TRACE,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    info!("Logging initialized with level: {:?}", level);
}

/// Raises the interrupt flag on SIGINT or SIGTERM.
fn spawn_signal_listener(interrupt: watch::Sender<bool>) {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = signal::ctrl_c().await {
                error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut sig) => {
                    sig.recv().await;
                }
                Err(e) => {
                    error!("Failed to install SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => info!("Received SIGINT (Ctrl+C), stopping measurement..."),
            _ = terminate => info!("Received SIGTERM, stopping measurement..."),
        }
        let _ = interrupt.send(true);
    });
}

/// Runs the measurement, renders the chart and returns the exit code.
async fn measure(config: Config) -> anyhow::Result<i32> {
    let force_empty = config.force_empty.unwrap_or(false);
    if !force_empty {
        startup_checks::validate_requirements(&config.proc_root())
            .context("startup validation failed")?;
    }

    // Configure parallel processing
    if let Some(threads) = config.parallelism.filter(|&t| t > 0) {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .unwrap_or_else(|e| error!("Failed to set rayon thread pool: {}", e));
        debug!("Rayon thread pool configured with {} threads", threads);
    }

    let (interrupt_tx, interrupt_rx) = watch::channel(false);
    spawn_signal_listener(interrupt_tx);

    let settings = RunSettings::from(&config);
    let stats = Arc::new(SamplerStats::new());
    let result = if force_empty {
        info!("Forced empty run: no counters will be read");
        run_measurement(EmptySource, settings, stats, interrupt_rx).await
    } else {
        let source = ProcfsSource::from_config(Arc::new(config.clone()), stats.clone());
        run_measurement(source, settings, stats, interrupt_rx).await
    };
    let report: RunReport = result.context("measurement aborted")?;

    if report.interrupted() {
        warn!(
            "Measurement interrupted after {} of {} ticks, rendering partial chart",
            report.ticks.len(),
            settings.duration
        );
    }

    let chart = aggregate(&report.history, config.top_n());
    info!(
        "Chart: {} series in {}, peak {:.3}",
        chart.series.len(),
        chart.unit.label(),
        chart.max_value()
    );

    let output = config.output_path();
    let (width, height) = config.chart_size();
    render_chart(&chart, &output, &RenderOptions { width, height })
        .with_context(|| format!("rendering chart to {}", output.display()))?;
    println!("Chart saved to {}", output.display());

    if let Some(path) = &config.export_json {
        let export = RunExport::new(&chart, &report.ticks, report.started_at, report.interrupted());
        write_json(&export, path)
            .with_context(|| format!("exporting run data to {}", path.display()))?;
    }

    Ok(report.exit_code())
}

async fn run(args: Args) -> anyhow::Result<i32> {
    let config = resolve_config(&args)?;

    // Early exits for show/check modes
    if args.check_config {
        return Ok(match validate_effective_config(&config) {
            Ok(()) => {
                println!("✅ Configuration is valid");
                0
            }
            Err(e) => {
                eprintln!("❌ Configuration invalid: {}", e);
                EXIT_FAILURE
            }
        });
    }
    if args.show_config {
        show_config(&config, &args.config_format)?;
        return Ok(0);
    }

    if let Some(Commands::Config {
        output,
        format,
        commented,
    }) = &args.command
    {
        command_config(output.clone(), format.clone(), *commented)?;
        return Ok(0);
    }

    if let Err(e) = validate_effective_config(&config) {
        eprintln!("❌ Configuration invalid: {}", e);
        return Ok(EXIT_FAILURE);
    }

    setup_logging(&config);

    if let Some(Commands::Check { collect }) = &args.command {
        let ok = command_check(*collect, &config)?;
        return Ok(if ok { 0 } else { EXIT_FAILURE });
    }

    info!("Starting herakles-traffic");
    measure(config).await
}

/// Main application entry point.
#[tokio::main]
async fn main() {
    let code = match run(Args::parse()).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("❌ {:#}", e);
            EXIT_FAILURE
        }
    };
    // A sampler thread that missed its shutdown timeout must not keep us alive.
    std::process::exit(code);
}
