//! Metallum-Crawl main entry point
//!
//! This is the command-line interface for the Metallum-Crawl catalog crawler.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use metallum_crawl::config::{load_config_with_hash, validate, Config};
use metallum_crawl::crawler::{Coordinator, PipelineOutcome, StageKind};
use metallum_crawl::{CrawlError, ProgressReporter};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Metallum-Crawl: a resumable Encyclopaedia Metallum crawler
///
/// Downloads the band listing, every band's discography, and every album's
/// tracklist into CSV files. Interrupted runs resume from those files.
#[derive(Parser, Debug)]
#[command(name = "metallum-crawl")]
#[command(version = "1.0.0")]
#[command(about = "A resumable Encyclopaedia Metallum crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults apply when omitted)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Stage to run
    #[arg(long, value_enum, default_value_t = StageArg::All)]
    stage: StageArg,

    /// Number of concurrent workers (overrides the configuration)
    #[arg(long, value_name = "N")]
    workers: Option<usize>,

    /// Do not write progress lines
    #[arg(long)]
    no_progress: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StageArg {
    Bands,
    Albums,
    Tracks,
    All,
}

impl StageArg {
    fn stages(self) -> Vec<StageKind> {
        match self {
            Self::Bands => vec![StageKind::Bands],
            Self::Albums => vec![StageKind::Albums],
            Self::Tracks => vec![StageKind::Tracks],
            Self::All => StageKind::ALL.to_vec(),
        }
    }
}

const EXIT_CANCELLED: u8 = 1;
const EXIT_FAILURE: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(PipelineOutcome::Completed(_)) => ExitCode::SUCCESS,
        Ok(PipelineOutcome::Cancelled(_)) => {
            tracing::warn!("Crawl cancelled; rerun to resume");
            ExitCode::from(EXIT_CANCELLED)
        }
        Err(e) => {
            match e.downcast_ref::<CrawlError>() {
                Some(crawl) if crawl.is_fatal_configuration() => {
                    tracing::error!("Configuration error: {}", crawl)
                }
                _ => tracing::error!("Crawl failed: {:#}", e),
            }
            ExitCode::from(EXIT_FAILURE)
        }
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("metallum_crawl=info,warn"),
            1 => EnvFilter::new("metallum_crawl=debug,info"),
            2 => EnvFilter::new("metallum_crawl=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path).map_err(CrawlError::from)?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => {
            tracing::info!("No configuration file given, using defaults");
            Config::default()
        }
    };

    if let Some(workers) = cli.workers {
        config.crawler.workers = Some(workers);
    }
    if cli.no_progress {
        config.progress.enabled = false;
    }
    validate(&config).map_err(CrawlError::from)?;
    Ok(config)
}

async fn run(cli: Cli) -> anyhow::Result<PipelineOutcome> {
    let config = load(&cli)?;
    let stages = cli.stage.stages();

    std::fs::create_dir_all(&config.output.directory).with_context(|| {
        format!(
            "Failed to create output directory {}",
            config.output.directory.display()
        )
    })?;

    let progress = ProgressReporter::from_config(&config.progress)
        .context("Failed to open progress log")?;
    let cancel = CancellationToken::new();

    if cli.dry_run {
        handle_dry_run(config, &stages, progress, cancel)?;
        return Ok(PipelineOutcome::Completed(Vec::new()));
    }

    // Ctrl-C stops the workers after their current item; results are flushed
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, finishing in-flight items");
                cancel.cancel();
            }
        }
    });

    handle_crawl(config, &stages, progress, cancel).await
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(
    config: Config,
    stages: &[StageKind],
    progress: ProgressReporter,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    println!("=== Metallum-Crawl Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Workers: {}", config.crawler.worker_count());
    println!("  Max attempts: {}", config.crawler.max_attempts);
    println!(
        "  Network backoff: {}s",
        config.crawler.network_backoff_secs
    );
    println!(
        "  Overload status: {} (cooldown {}s)",
        config.crawler.overload_status, config.crawler.overload_cooldown_secs
    );
    println!("  Courtesy delay: {}ms", config.crawler.courtesy_delay_ms);
    println!("  Page size: {}", config.crawler.page_size);

    println!("\nUpstream:");
    println!("  Base URL: {}", config.upstream.base_url);
    println!("  User agent: {}", config.upstream.user_agent);

    println!("\nOutput:");
    println!("  Bands: {}", config.output.bands_path().display());
    println!("  Albums: {}", config.output.albums_path().display());
    println!("  Tracks: {}", config.output.tracks_path().display());

    let coordinator = Coordinator::new(config, progress, cancel)?;
    println!("\nStages:");
    for plan in coordinator.plan(stages)? {
        match plan.seeds {
            Some(seeds) => println!(
                "  - {}: {} seeds, {} already done",
                plan.stage, seeds, plan.already_done
            ),
            None => println!("  - {}: seed file not written yet", plan.stage),
        }
    }

    println!("\n✓ Configuration is valid");
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: Config,
    stages: &[StageKind],
    progress: ProgressReporter,
    cancel: CancellationToken,
) -> anyhow::Result<PipelineOutcome> {
    let coordinator = Coordinator::new(config, progress, cancel)?;
    tracing::info!(
        "Starting crawl of stages {:?} with {} workers",
        stages,
        coordinator.workers()
    );

    let outcome = coordinator.run(stages).await?;
    for report in outcome.reports() {
        tracing::info!(
            "{}: {} completed, {} failed, {} skipped, {} rows on disk",
            report.stage,
            report.completed,
            report.failed,
            report.skipped,
            report.total_records
        );
    }
    Ok(outcome)
}
