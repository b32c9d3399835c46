//! doc-mirror main entry point
//!
//! This is the command-line interface for the doc-mirror documentation mirror.

use anyhow::Context;
use clap::Parser;
use doc_mirror::checkpoint::open_store;
use doc_mirror::config::{load_config_with_hash, Config};
use doc_mirror::crawler::{CrawlOutcome, Driver, ResumeMode};
use doc_mirror::output::print_report;
use doc_mirror::MirrorError;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const EXIT_FAILURE: u8 = 1;
const EXIT_STARTUP: u8 = 2;
const EXIT_INTERRUPTED: u8 = 3;

/// doc-mirror: a resumable documentation site mirror
///
/// doc-mirror crawls the pages under one documentation site, converts their
/// main content to Markdown and mirrors the URL hierarchy as a directory
/// tree. Interrupted crawls resume from a checkpoint.
#[derive(Parser, Debug)]
#[command(name = "doc-mirror")]
#[command(version)]
#[command(about = "A resumable documentation site mirror", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG", default_value = "config.toml")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Resume from the checkpoint without asking; fail if it is unreadable
    #[arg(long, conflicts_with = "fresh")]
    resume: bool,

    /// Start a fresh crawl, discarding any checkpoint
    #[arg(long, conflicts_with = "resume")]
    fresh: bool,

    /// Validate config and print the effective settings without crawling
    #[arg(long, conflicts_with = "show_checkpoint")]
    dry_run: bool,

    /// Print a summary of the saved checkpoint and exit
    #[arg(long, conflicts_with = "dry_run")]
    show_checkpoint: bool,
}

impl Cli {
    fn resume_mode(&self) -> ResumeMode {
        if self.fresh {
            ResumeMode::Fresh
        } else if self.resume {
            ResumeMode::Resume
        } else {
            ResumeMode::Ask
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = load_config_with_hash(&cli.config);
    let (level, log_file) = match &loaded {
        Ok((config, _)) => (config.logging.level.clone(), config.logging.log_file.clone()),
        Err(_) => ("info".to_string(), None),
    };

    if let Err(e) = setup_logging(cli.verbose, cli.quiet, &level, log_file.as_deref()) {
        eprintln!("Failed to set up logging: {:#}", e);
        return ExitCode::from(EXIT_STARTUP);
    }

    let (config, config_hash) = match loaded {
        Ok((config, hash)) => {
            tracing::info!(path = %cli.config.display(), hash = %hash, "Configuration loaded");
            (config, hash)
        }
        Err(e) => {
            tracing::error!(path = %cli.config.display(), error = %e, "Failed to load configuration");
            return ExitCode::from(EXIT_STARTUP);
        }
    };

    let result = if cli.dry_run {
        handle_dry_run(&config).map(|()| ExitCode::SUCCESS)
    } else if cli.show_checkpoint {
        handle_show_checkpoint(&config, &config_hash).map(|()| ExitCode::SUCCESS)
    } else {
        handle_crawl(config, &config_hash, cli.resume_mode()).await
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::from(EXIT_STARTUP)
        }
    }
}

/// Sets up the tracing subscriber from the CLI flags and `[logging]`
///
/// `-q` and `-v` override the configured level; `RUST_LOG` is not consulted.
/// With `log-file` set, every event is also appended to that file.
fn setup_logging(verbose: u8, quiet: bool, level: &str, log_file: Option<&Path>) -> anyhow::Result<()> {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::try_new(format!("doc_mirror={},warn", level))
                .with_context(|| format!("invalid log level '{}'", level))?,
            1 => EnvFilter::new("doc_mirror=debug,info"),
            2 => EnvFilter::new("doc_mirror=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_writer(std::io::stderr),
        )
        .with(file_layer)
        .try_init()?;

    Ok(())
}

/// Handles the --dry-run mode: prints the effective configuration
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    println!("=== doc-mirror Dry Run ===\n");

    println!("Target Site:");
    println!("  Start URL: {}", config.target_site.start_url);
    println!("  Allowed prefix: {}", config.target_site.allowed_domain);

    println!("\nCrawler:");
    println!("  Navigation selector: {}", config.crawler.navigation_selector);
    println!("  Content selector: {}", config.extractor.content_selector);
    println!("  User agent: {}", config.crawler.user_agent);
    println!("  Request timeout: {}s", config.crawler.request_timeout);
    println!("  Request delay: {}s", config.execution.request_delay);
    println!("\nExclude Patterns ({}):", config.crawler.exclude_patterns.len());
    for pattern in &config.crawler.exclude_patterns {
        println!("  - {}", pattern);
    }

    println!("\nRetry:");
    println!("  Max retries: {}", config.retry.max_retries);
    println!(
        "  Backoff: {}s x{} (max {}s)",
        config.retry.initial_delay, config.retry.backoff_factor, config.retry.max_delay
    );
    println!("  Retryable status codes: {:?}", config.retry.retryable_status_codes);
    println!("  Skip after failures: {}", config.retry.skip_after_failures);

    println!("\nOutput:");
    println!("  Base directory: {}", config.output.base_dir.display());
    println!(
        "  Images: {} ({})",
        config.output.image_dir_name,
        if config.output.download_images { "downloaded" } else { "linked" }
    );
    if let Some(report) = &config.output.report_path {
        println!("  Report: {}", report.display());
    }

    println!("\nRecovery:");
    if config.recovery.enable_recovery {
        println!("  Checkpoint: {}", config.recovery.recovery_file.display());
        println!("  Save interval: {} pages", config.recovery.save_interval);
        println!("  Auto resume: {}", config.recovery.auto_resume);
    } else {
        println!("  Disabled");
    }

    println!("\n✓ Configuration is valid");
    Ok(())
}

/// Handles the --show-checkpoint mode
fn handle_show_checkpoint(config: &Config, config_hash: &str) -> anyhow::Result<()> {
    let path = &config.recovery.recovery_file;
    let store = open_store(path, config_hash);

    let Some(checkpoint) = store
        .try_load()
        .with_context(|| format!("cannot read checkpoint {}", path.display()))?
    else {
        println!("No checkpoint at {}", path.display());
        return Ok(());
    };

    let stats = &checkpoint.stats;
    println!("=== Checkpoint {} ===\n", path.display());
    println!("  Start URL: {}", checkpoint.start_url);
    println!("  Saved at: {}", checkpoint.saved_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("  Known URLs: {}", checkpoint.frontier.records.len());
    println!("  Visited: {}", checkpoint.frontier.visited_set.len());
    println!("  Pending: {}", checkpoint.frontier.pending_order.len());
    println!("  Skipped: {}", checkpoint.frontier.skipped_set.len());
    println!(
        "  Pages processed: {} ({} succeeded, {} failed)",
        checkpoint.pages_processed, stats.pages_succeeded, stats.pages_failed
    );
    for (kind, count) in &stats.errors_by_kind {
        println!("  {} errors: {}", kind, count);
    }

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, config_hash: &str, mode: ResumeMode) -> anyhow::Result<ExitCode> {
    let cancel = CancellationToken::new();

    let mut driver = match Driver::new(config, config_hash, cancel.clone()) {
        Ok(driver) => driver.with_resume_mode(mode),
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize crawler");
            return Ok(ExitCode::from(EXIT_STARTUP));
        }
    };

    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current page");
            signal_token.cancel();
        }
    });

    let code = match driver.run().await {
        Ok(CrawlOutcome::Completed(_)) => ExitCode::SUCCESS,
        Ok(CrawlOutcome::Interrupted(_)) => ExitCode::from(EXIT_INTERRUPTED),
        Err(MirrorError::Startup(message)) => {
            tracing::error!("{}", message);
            return Ok(ExitCode::from(EXIT_STARTUP));
        }
        Err(e) => {
            tracing::error!(error = %e, "Crawl failed");
            ExitCode::from(EXIT_FAILURE)
        }
    };

    print_report(&driver.report());
    Ok(code)
}
