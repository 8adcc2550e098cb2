//! CDP Import - bulk snapshot import tool

use anyhow::Result;
use cdp_common::logging::{init_logging, LogConfig, LogLevel};
use cdp_import::config::ImportConfig;
use cdp_import::orchestrator::{ImportOrchestrator, RunMode, RunSummary};
use cdp_import::store::{EntityStore, PgEntityStore};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "cdp-import")]
#[command(author, version, about = "Bulk court/judge snapshot import tool")]
struct Cli {
    /// Import only the courts dataset
    #[arg(long)]
    courts_only: bool,

    /// Import only the judges dataset
    #[arg(long)]
    judges_only: bool,

    /// Resume from the last saved checkpoint
    #[arg(long)]
    resume: bool,

    /// Reuse cached archives without downloading
    #[arg(long)]
    skip_download: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Remote base URL the archives are fetched from
    #[arg(long, env = "CDP_BASE_URL")]
    base_url: Option<String>,

    /// Local cache directory for archives and checkpoints
    #[arg(long, env = "CDP_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    /// Entity store connection string
    #[arg(long, env = "DATABASE_URL")]
    database_url: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbose flag
    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("cdp-import".to_string())
        .build();

    // Merge with environment variables (they take precedence)
    let log_config = LogConfig::from_env().unwrap_or(log_config);

    init_logging(&log_config)?;

    info!("Starting CDP import");

    let mut config = ImportConfig::load()?;
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }
    if let Some(cache_dir) = cli.cache_dir {
        config.cache_dir = cache_dir;
    }
    if let Some(database_url) = cli.database_url {
        config.database.url = database_url;
    }

    let mode = RunMode {
        courts_only: cli.courts_only,
        judges_only: cli.judges_only,
        resume: cli.resume,
        skip_download: cli.skip_download,
    };

    let store: Arc<dyn EntityStore> = Arc::new(PgEntityStore::connect(&config.database).await?);

    // Cooperative shutdown: the in-flight line finishes reconciling and a
    // final checkpoint is flushed before the chain unwinds.
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing current record and flushing checkpoints");
            signal_cancel.cancel();
        }
    });

    let orchestrator = ImportOrchestrator::new(config, store, cancel)?;
    let summary = orchestrator.run(mode).await?;

    print_summary(&summary);

    if summary.failed() {
        std::process::exit(1);
    }

    if summary.interrupted() {
        info!("Import interrupted; checkpoints flushed, rerun with --resume to continue");
    } else {
        info!("Import complete");
    }
    Ok(())
}

/// Per-dataset counts, always printed so partial success is observable
fn print_summary(summary: &RunSummary) {
    println!();
    println!("Import summary");
    println!("--------------");
    for report in &summary.reports {
        let status = if report.interrupted {
            "interrupted".to_string()
        } else {
            report.state.to_string()
        };
        println!(
            "{:<8} [{}] {}",
            report.dataset, status, report.stats
        );
        if report.resumed_from > 0 {
            println!("         resumed from line {}", report.resumed_from);
        }
        if let Some(error) = &report.error {
            println!("         error: {error}");
        }
    }
    let totals = summary.totals();
    println!("total    {totals}");
}
