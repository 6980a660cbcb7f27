use anyhow::Result;
use clap::{Parser, Subcommand};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use delivery_pulse::adapters::types::ReportWindow;
use delivery_pulse::config::DeliveryPulseConfig;
use delivery_pulse::report::{format_report, MetricKind, ReportOrchestrator};
use delivery_pulse::telemetry;

#[derive(Parser)]
#[command(name = "delivery-pulse")]
#[command(about = "Engineering delivery metrics from board, pipeline, and codebase data")]
#[command(
    long_about = "delivery-pulse turns raw activity records from an issue tracker, a CI/CD \
                  pipeline tool, and a source-control system into delivery metrics: cycle \
                  time, velocity, rework, and the four DORA metrics. Run 'delivery-pulse \
                  report' to produce a report for the configured providers."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Produce a delivery metrics report for a time window
    Report {
        /// Configuration file (defaults to delivery-pulse.toml / environment)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Override the providers' data directory
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// Window length in days, ending now
        #[arg(long, default_value = "14")]
        days: u32,
        /// Metrics to compute (defaults to every metric the config can serve)
        #[arg(long, value_enum, value_delimiter = ',')]
        metrics: Vec<MetricKind>,
        /// Print the raw report as JSON instead of text
        #[arg(long)]
        json: bool,
        /// Include per-field classification and per-state rework detail
        #[arg(long, short = 'v')]
        detailed: bool,
    },
    /// Check a configuration file and report what it can serve
    Validate {
        /// Configuration file (defaults to delivery-pulse.toml / environment)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Report {
            config,
            data_dir,
            days,
            metrics,
            json,
            detailed,
        } => tokio::runtime::Runtime::new()?.block_on(async {
            report_command(config, data_dir, days, metrics, json, detailed).await
        }),
        Commands::Validate { config } => validate_command(config),
    }
}

fn load_config(path: Option<PathBuf>) -> Result<DeliveryPulseConfig> {
    match path {
        Some(path) => DeliveryPulseConfig::load_from(path),
        None => DeliveryPulseConfig::load(),
    }
}

async fn report_command(
    config_path: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    days: u32,
    metrics: Vec<MetricKind>,
    json: bool,
    detailed: bool,
) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(data_dir) = data_dir {
        config.providers.data_dir = data_dir.display().to_string();
    }
    if config.observability.tracing_enabled {
        telemetry::init_telemetry()?;
    }

    let requested: BTreeSet<MetricKind> = if metrics.is_empty() {
        config.available_metrics()
    } else {
        metrics.into_iter().collect()
    };
    if requested.is_empty() {
        anyhow::bail!("configuration has no sections to serve any metric");
    }

    let end = chrono::Utc::now();
    let window = ReportWindow::new(end - chrono::Duration::days(i64::from(days)), end);

    let request = config.to_request(requested, window);
    let clients = config.clients();
    let orchestrator = ReportOrchestrator::start_fetch(request, clients)?;
    let snapshot = orchestrator
        .run_to_completion(Duration::from_millis(50))
        .await;

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print!("{}", format_report(&snapshot, detailed));
    }

    if config.observability.metrics_enabled {
        delivery_pulse::observability::adapter_metrics().log_stats();
    }
    telemetry::shutdown_telemetry();
    Ok(())
}

fn validate_command(config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config(config_path)?;

    println!("Configuration OK");
    println!(
        "  providers: issue_tracker={:?} pipeline={:?} codebase={:?} (data: {})",
        config.providers.issue_tracker,
        config.providers.pipeline,
        config.providers.codebase,
        config.providers.data_dir
    );
    match &config.board {
        Some(board) => println!(
            "  board: {} ({} mapping rows)",
            board.board_id,
            board.columns.len()
        ),
        None => println!("  board: not configured: board metrics unavailable"),
    }
    println!("  pipelines: {}", config.pipelines.len());
    match &config.codebase {
        Some(codebase) => println!("  codebase: {}", codebase.repo_id),
        None => println!("  codebase: not configured: lead time unavailable"),
    }

    let available = config.available_metrics();
    let names: Vec<String> = available.iter().map(|m| m.to_string()).collect();
    println!("  serves: {}", names.join(", "));
    Ok(())
}
