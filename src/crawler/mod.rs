//! Crawler module for fetching and processing documentation pages
//!
//! This module contains the core crawling logic, including:
//! - The frontier: URL records, FIFO pending queue and failure bookkeeping
//! - HTTP fetching with retry, backoff and a politeness delay
//! - Main content and navigation link extraction
//! - The driver that runs the crawl loop and checkpoints progress

mod driver;
mod extractor;
mod fetcher;
mod frontier;

pub use driver::{CrawlOutcome, Driver, DriverState, ResumeMode};
pub use extractor::{ContentError, ContentExtractor, Extracted, SelectorExtractor};
pub use fetcher::{
    build_http_client, classify_status, FetchError, FetchedPage, Fetcher, RetryPolicy,
};
pub use frontier::{FailureDecision, Frontier, FrontierSnapshot};

use crate::config::Config;
use crate::Result;
use tokio_util::sync::CancellationToken;

/// Runs a complete crawl
///
/// This is the main entry point for a crawl. It will:
/// 1. Resume from a checkpoint or seed the frontier with `start-url`
/// 2. Fetch pages and follow their navigation links
/// 3. Write each page's main content as Markdown
/// 4. Checkpoint periodically and once more on exit
///
/// # Arguments
///
/// * `config` - Validated configuration
/// * `config_hash` - Hash of the configuration file
/// * `mode` - What to do with an existing checkpoint
/// * `cancel` - Cancels the crawl at the next loop boundary
pub async fn crawl(
    config: Config,
    config_hash: &str,
    mode: ResumeMode,
    cancel: CancellationToken,
) -> Result<CrawlOutcome> {
    let mut driver = Driver::new(config, config_hash, cancel)?.with_resume_mode(mode);
    driver.run().await
}
