use anyhow::Context;
use api_client::HttpAnalysisClient;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use configuration::LoggingConfig;
use configuration::settings::Config;
use core_types::Action;
use indicatif::ProgressStyle;
use orchestrator::{Applied, DisplayState, Session};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Instrument;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_indicatif::IndicatifLayer;
use tracing_indicatif::span_ext::IndicatifSpanExt;
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Name of the span that carries the progress bar.
const PROGRESS_SPAN: &str = "analysis_progress";

/// The main entry point for the frontier-desk analysis client.
///
/// Remote calls are interleaved on a single thread; nothing here needs locking.
#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Load FRONTIER__* overrides from a .env file when one exists.
    dotenvy::dotenv().ok();

    // Parse command-line arguments
    let cli = Cli::parse();

    let config = configuration::load_config(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    let _log_guard = init_tracing(&config.logging)?;

    // Execute the appropriate command
    match cli.command {
        Commands::Catalog => {
            print_catalog(&config);
            Ok(())
        }
        Commands::Analyze(args) => handle_analyze(args, &config).await,
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Assemble a working set of instruments and run a remote portfolio analysis on it.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the instruments that can be added to the working set.
    Catalog,
    /// Validate a window and run a baseline or optimization over the selected instruments.
    Analyze(AnalyzeArgs),
}

#[derive(Parser)]
struct AnalyzeArgs {
    /// Instrument identifiers, in the order their weights should be reported (e.g., "AAPL").
    #[arg(long = "ticker", short = 't', required = true, value_delimiter = ',')]
    tickers: Vec<String>,

    /// The start of the analysis window (format: YYYY-MM-DD).
    #[arg(long)]
    from: NaiveDate,

    /// The end of the analysis window (format: YYYY-MM-DD).
    #[arg(long)]
    to: NaiveDate,

    /// "optimize" for the frontier and portfolio table, "baseline" for equal weights.
    #[arg(long, default_value = "optimize")]
    action: Action,

    /// Print the display state as JSON instead of tables.
    #[arg(long)]
    json: bool,
}

// ==============================================================================
// Logging
// ==============================================================================

/// Installs the global subscriber. `RUST_LOG` takes precedence over the configured level.
///
/// Console output goes through the indicatif layer so log lines never tear the progress bar.
/// The returned guard flushes the file writer and must be held until exit.
fn init_tracing(logging: &LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    let indicatif_layer = IndicatifLayer::new();
    let console_layer = fmt::layer()
        .with_writer(indicatif_layer.get_stderr_writer())
        .with_filter(level_filter(logging)?);

    let (file_layer, guard) = match &logging.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, "frontier-desk.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(level_filter(logging)?);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .with(indicatif_layer.with_filter(filter_fn(|meta| meta.name() == PROGRESS_SPAN)))
        .try_init()
        .context("Failed to install the tracing subscriber")?;
    Ok(guard)
}

fn level_filter(logging: &LoggingConfig) -> anyhow::Result<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .with_context(|| format!("Invalid log level: {}", logging.level))
}

// ==============================================================================
// Command Logic
// ==============================================================================

fn print_catalog(config: &Config) {
    if config.catalog.is_empty() {
        println!("The catalog is empty. Add [[catalog]] entries to the configuration.");
        return;
    }
    for instrument in &config.catalog {
        println!("{:<8} {}", instrument.identifier, instrument.label);
    }
}

/// Builds the working set, submits it and renders whatever comes back.
async fn handle_analyze(args: AnalyzeArgs, config: &Config) -> anyhow::Result<()> {
    let client = HttpAnalysisClient::new(&config.service).context("Failed to build the HTTP client")?;
    let mut session = Session::new(config, Arc::new(client));

    // Selection errors only reject the one mutation; the rest of the list still applies.
    for ticker in &args.tickers {
        let ticker = ticker.trim().to_uppercase();
        match session.add_by_identifier(&ticker) {
            Ok(availability) => tracing::debug!(%ticker, size = availability.size, "Selected."),
            Err(e) => eprintln!("Skipping {}: {}", ticker, e),
        }
    }

    let sequence = session
        .submit(args.from, args.to, args.action)
        .context("Submission blocked")?;
    tracing::info!(sequence, "Submission dispatched.");

    let progress = tracing::info_span!(PROGRESS_SPAN);
    progress.pb_set_style(
        &ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
        )?
        .progress_chars("#>-"),
    );
    progress.pb_set_length(session.pending() as u64);

    async {
        while session.pending() > 0 {
            let message = match session.next_event().await {
                Some(Applied::Rendered { call, .. }) => format!("{} ready", call),
                Some(Applied::Failed { call, .. }) => format!("{} failed", call),
                Some(Applied::Stale { .. }) => continue,
                None => break,
            };
            let bar = tracing::Span::current();
            bar.pb_inc(1);
            bar.pb_set_message(&message);
        }
    }
    .instrument(progress)
    .await;

    let display = session.display();
    if args.json {
        println!("{}", serde_json::to_string_pretty(display)?);
    } else {
        print_display(display);
    }
    Ok(())
}

fn print_display(display: &DisplayState) {
    if let (Some(action), Some(range)) = (display.action, display.date_range) {
        println!(
            "Submission #{}: {} for {} over {}\n",
            display.sequence,
            action,
            display.tickers.join(", "),
            range
        );
    }

    if let Some(baseline) = &display.baseline {
        println!("Equal-weight portfolio\n{}\n", baseline.table);
    }
    if let Some(summary) = &display.summary {
        println!("Optimal portfolio\n{}\n", summary.allocation);
        println!("Reference portfolios\n{}\n", summary.metrics);
        if let Some(simulated) = &summary.simulated {
            println!("Simulated portfolios: {}", simulated.len());
        }
        if let Some(frontier) = &summary.frontier {
            println!("Frontier points: {}", frontier.len());
        }
    }
    if let Some(chart) = &display.frontier_chart {
        println!("Efficient frontier chart: {}", chart.uri);
    }
    if let Some(table) = &display.portfolio_table {
        println!("\nPortfolio breakdown\n{}\n", table);
    }
    if let Some(chart) = &display.cumulative_chart {
        println!("Cumulative performance chart: {}", chart.uri);
    }

    for failure in &display.failures {
        println!("[{}] unavailable: {}", failure.call, failure.message);
    }
    if let Some(disclaimer) = display.disclaimer() {
        println!("\n{}", disclaimer);
    }
}
