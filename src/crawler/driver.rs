//! Crawl driver - main crawl orchestration logic
//!
//! This module contains the sequential crawl loop that coordinates:
//! - Resuming from a checkpoint or seeding the frontier
//! - Fetching, extracting, rendering and writing pages
//! - Feeding discovered links back into the frontier
//! - Periodic and final checkpoints
//! - Cancellation at loop boundaries

use crate::checkpoint::{open_store, Checkpoint, CheckpointStore};
use crate::config::Config;
use crate::crawler::extractor::{ContentExtractor, SelectorExtractor};
use crate::crawler::fetcher::{FetchedPage, Fetcher};
use crate::crawler::frontier::{FailureDecision, Frontier};
use crate::output::{
    log_suggestions, output_path, write_markdown_report, write_page, CrawlReport, CrawlStats,
    Html2MdRenderer, ImageHandler, MarkdownRenderer,
};
use crate::state::ErrorKind;
use crate::url::{accept_link, normalize_absolute, ScopeFilter};
use crate::{MirrorError, Result};
use std::io::{BufRead, IsTerminal, Write};
use tokio_util::sync::CancellationToken;
use url::Url;

/// What to do with an existing checkpoint at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeMode {
    /// Prompt on the terminal; resume when there is no terminal.
    /// With `recovery.auto-resume` set, resume without asking.
    Ask,

    /// Resume; an unreadable checkpoint is a startup error
    Resume,

    /// Discard any checkpoint and start from `start-url`
    Fresh,
}

/// Lifecycle of a driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    Running,
    Completed,
    Interrupted,
}

/// How a run ended
#[derive(Debug, Clone)]
pub enum CrawlOutcome {
    /// The frontier was exhausted
    Completed(CrawlStats),

    /// Cancelled or aborted; a checkpoint was written and the crawl can be resumed
    Interrupted(CrawlStats),
}

impl CrawlOutcome {
    pub fn stats(&self) -> &CrawlStats {
        match self {
            Self::Completed(stats) | Self::Interrupted(stats) => stats,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }
}

/// Owns the frontier and runs the crawl loop
pub struct Driver {
    config: Config,
    config_hash: String,
    start_url: Url,
    allowed_prefix: Url,
    scope: ScopeFilter,
    fetcher: Fetcher,
    extractor: Box<dyn ContentExtractor>,
    renderer: Box<dyn MarkdownRenderer>,
    images: ImageHandler,
    store: Option<Box<dyn CheckpointStore>>,
    frontier: Frontier,
    stats: CrawlStats,
    state: DriverState,
    resume_mode: ResumeMode,
    cancel: CancellationToken,
    since_save: u32,
}

impl Driver {
    /// Creates a driver in the `Idle` state
    ///
    /// # Arguments
    ///
    /// * `config` - Validated configuration
    /// * `config_hash` - Hash of the configuration file, stored in checkpoints
    /// * `cancel` - Token observed at the top of every loop iteration
    ///
    /// # Returns
    ///
    /// * `Ok(Driver)` - Selectors, patterns and HTTP client are ready
    /// * `Err(MirrorError)` - Configuration could not be turned into a crawler
    pub fn new(config: Config, config_hash: &str, cancel: CancellationToken) -> Result<Self> {
        let start_url = normalize_absolute(&config.target_site.start_url)?;
        let allowed_prefix = Url::parse(&config.target_site.allowed_domain)?;
        let scope = ScopeFilter::new(
            &config.target_site.allowed_domain,
            &config.crawler.exclude_patterns,
        )?;
        let extractor = SelectorExtractor::from_config(&config.extractor, &config.crawler)?;
        let fetcher = Fetcher::from_config(&config)?;
        let images = ImageHandler::new(fetcher.clone(), &config.output);

        let store = if config.recovery.enable_recovery {
            Some(open_store(&config.recovery.recovery_file, config_hash))
        } else {
            None
        };

        Ok(Self {
            frontier: Frontier::new(config.retry.skip_after_failures),
            config_hash: config_hash.to_string(),
            start_url,
            allowed_prefix,
            scope,
            fetcher,
            extractor: Box::new(extractor),
            renderer: Box::new(Html2MdRenderer),
            images,
            store,
            stats: CrawlStats::new(),
            state: DriverState::Idle,
            resume_mode: ResumeMode::Ask,
            cancel,
            since_save: 0,
            config,
        })
    }

    pub fn with_resume_mode(mut self, mode: ResumeMode) -> Self {
        self.resume_mode = mode;
        self
    }

    pub fn with_extractor(mut self, extractor: Box<dyn ContentExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_renderer(mut self, renderer: Box<dyn MarkdownRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn frontier(&self) -> &Frontier {
        &self.frontier
    }

    pub fn stats(&self) -> &CrawlStats {
        &self.stats
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Report for the current state of the crawl
    pub fn report(&self) -> CrawlReport {
        CrawlReport::new(
            &self.stats,
            &self.frontier,
            self.state == DriverState::Completed,
        )
        .with_advice(&self.config)
    }

    /// Resumes from a checkpoint or seeds the frontier (`Idle -> Running`)
    pub fn start(&mut self) -> Result<()> {
        if self.state != DriverState::Idle {
            return Ok(());
        }

        let resumed = self.try_resume()?;
        if !resumed || self.frontier.is_empty() {
            self.seed();
        }

        self.state = DriverState::Running;
        Ok(())
    }

    /// Runs the crawl until the frontier is exhausted or the token fires
    ///
    /// A final checkpoint is written after the loop whichever way it exits.
    /// After a completed crawl the checkpoint is then discarded, or archived
    /// when `recovery.keep-completed` is set. A loop error after which the
    /// final checkpoint was written is reported as `Interrupted`; without a
    /// checkpoint the error is returned.
    pub async fn run(&mut self) -> Result<CrawlOutcome> {
        self.start()?;

        tracing::info!(
            start_url = %self.start_url,
            pending = self.frontier.pending_len(),
            visited = self.frontier.visited_len(),
            "Starting crawl"
        );

        let loop_result = self.crawl_loop().await;

        // Cleanup path: runs for every exit route
        let saved = self.save_checkpoint();

        let exhausted = match loop_result {
            Ok(exhausted) => exhausted,
            Err(e) => {
                self.state = DriverState::Interrupted;
                self.emit_report();
                if !saved {
                    tracing::error!(error = %e, "Crawl aborted without a checkpoint");
                    return Err(e);
                }
                // Progress is on disk, so the run is resumable
                tracing::error!(error = %e, "Crawl aborted, progress checkpointed");
                return Ok(CrawlOutcome::Interrupted(self.stats.clone()));
            }
        };

        if exhausted {
            self.state = DriverState::Completed;
            self.finish_checkpoint();
            tracing::info!(
                processed = self.stats.pages_processed,
                succeeded = self.stats.pages_succeeded,
                failed = self.stats.pages_failed,
                "Crawl completed"
            );
        } else {
            self.state = DriverState::Interrupted;
            tracing::warn!(
                pending = self.frontier.pending_len(),
                "Crawl interrupted, resume to continue"
            );
        }

        self.emit_report();

        let stats = self.stats.clone();
        Ok(if exhausted {
            CrawlOutcome::Completed(stats)
        } else {
            CrawlOutcome::Interrupted(stats)
        })
    }

    /// Returns `Ok(true)` when the frontier is exhausted, `Ok(false)` when cancelled
    async fn crawl_loop(&mut self) -> Result<bool> {
        let save_interval = self.config.recovery.save_interval.max(1);

        loop {
            if self.cancel.is_cancelled() {
                tracing::info!("Cancellation requested");
                return Ok(false);
            }

            let Some(url) = self.frontier.next_pending() else {
                return Ok(true);
            };

            self.process_url(&url).await?;

            if self.since_save >= save_interval {
                self.save_checkpoint();
            }
        }
    }

    async fn process_url(&mut self, url: &str) -> Result<()> {
        let page_url = Url::parse(url)?;
        tracing::debug!(url = %page_url, "Processing URL");

        match self.fetcher.fetch(&page_url).await {
            Ok(page) => self.process_page(url, &page_url, page).await,
            Err(e) => {
                let kind = e.kind();
                self.stats.record_fetch_failure(kind);

                match self.frontier.mark_failed(url, kind)? {
                    FailureDecision::AutoSkip => {
                        self.stats.record_skipped();
                        tracing::warn!(
                            url = %url,
                            error = %e,
                            failures = self.frontier.skip_after_failures(),
                            "Skipping URL after repeated failures"
                        );
                    }
                    FailureDecision::Requeued => {
                        tracing::warn!(url = %url, error = %e, kind = %kind, "Fetch failed, requeued");
                    }
                }
                Ok(())
            }
        }
    }

    async fn process_page(&mut self, url: &str, page_url: &Url, page: FetchedPage) -> Result<()> {
        let extracted = match self.extractor.extract(&page.body, &page.final_url) {
            Ok(extracted) => extracted,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Content extraction failed");
                return self.finish_with_error(url, ErrorKind::Content);
            }
        };

        let markdown = match self.renderer.render(&extracted.main_html) {
            Ok(markdown) => markdown,
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Markdown rendering failed");
                return self.finish_with_error(url, ErrorKind::Content);
            }
        };

        let mut discovered = 0;
        for link in &extracted.links {
            if let Some(next) = accept_link(link, &page.final_url, &self.scope) {
                if self.frontier.enqueue(next.as_str()) {
                    discovered += 1;
                }
            }
        }
        tracing::debug!(
            url = %url,
            title = extracted.title.as_deref().unwrap_or(""),
            links = extracted.links.len(),
            discovered,
            "Links extracted"
        );

        let relative = output_path(page_url, &self.allowed_prefix);
        let images = self.images.process(&markdown, &page.final_url, &relative).await;
        self.stats.record_images(images.downloaded, images.failed);

        match write_page(&self.config.output.base_dir, &relative, &images.markdown) {
            Ok(path) => {
                self.frontier.mark_visited(url)?;
                self.stats.record_success();
                self.since_save += 1;
                tracing::info!(url = %url, path = %path.display(), "Saved page");
                Ok(())
            }
            Err(e) => {
                tracing::error!(url = %url, error = %e, "Failed to write page");
                self.finish_with_error(url, ErrorKind::System)
            }
        }
    }

    fn finish_with_error(&mut self, url: &str, kind: ErrorKind) -> Result<()> {
        self.frontier.mark_visited_with_error(url, kind)?;
        self.stats.record_visited_with_error(kind);
        self.since_save += 1;
        Ok(())
    }

    fn seed(&mut self) {
        let seed = self.start_url.to_string();
        if self.frontier.enqueue(&seed) {
            tracing::info!(url = %seed, "Seeded frontier");
        }
    }

    /// Loads a checkpoint according to the resume mode
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - Frontier and statistics were restored
    /// * `Ok(false)` - Starting fresh
    /// * `Err(MirrorError::Startup)` - Explicit resume with an unusable checkpoint
    fn try_resume(&mut self) -> Result<bool> {
        let auto_resume = self.config.recovery.auto_resume;
        let mode = self.resume_mode;

        let Some(store) = self.store.as_mut() else {
            return Ok(false);
        };

        if !store.exists() {
            if mode == ResumeMode::Resume {
                tracing::warn!(
                    path = %store.location().display(),
                    "No checkpoint to resume from, starting fresh"
                );
            }
            return Ok(false);
        }

        let checkpoint = match mode {
            ResumeMode::Fresh => {
                tracing::info!(path = %store.location().display(), "Discarding existing checkpoint");
                if let Err(e) = store.discard() {
                    tracing::warn!(error = %e, "Failed to discard checkpoint");
                }
                return Ok(false);
            }
            ResumeMode::Resume => match store.try_load() {
                Ok(Some(checkpoint)) => checkpoint,
                Ok(None) => return Ok(false),
                Err(e) => {
                    return Err(MirrorError::Startup(format!(
                        "cannot resume from {}: {}",
                        store.location().display(),
                        e
                    )))
                }
            },
            ResumeMode::Ask => {
                let Some(checkpoint) = store.load() else {
                    return Ok(false);
                };
                if !auto_resume && !prompt_resume(&checkpoint) {
                    if let Err(e) = store.discard() {
                        tracing::warn!(error = %e, "Failed to discard checkpoint");
                    }
                    return Ok(false);
                }
                checkpoint
            }
        };

        tracing::info!(
            saved_at = %checkpoint.saved_at,
            processed = checkpoint.pages_processed,
            pending = checkpoint.frontier.pending_order.len(),
            "Resuming from checkpoint"
        );

        self.frontier = Frontier::restore(checkpoint.frontier, self.config.retry.skip_after_failures);
        self.stats = checkpoint.stats;
        Ok(true)
    }

    /// Writes a checkpoint; failures are logged and the crawl continues
    fn save_checkpoint(&mut self) -> bool {
        self.since_save = 0;

        let Some(store) = self.store.as_mut() else {
            return false;
        };

        let checkpoint = Checkpoint::new(
            self.start_url.as_str(),
            &self.config_hash,
            self.frontier.snapshot(),
            self.stats.clone(),
        );

        match store.save(&checkpoint) {
            Ok(()) => {
                tracing::debug!(
                    visited = self.frontier.visited_len(),
                    pending = self.frontier.pending_len(),
                    "Checkpoint written"
                );
                true
            }
            Err(e) => {
                tracing::error!(
                    path = %store.location().display(),
                    error = %e,
                    "Failed to save checkpoint"
                );
                false
            }
        }
    }

    fn finish_checkpoint(&mut self) {
        let keep = self.config.recovery.keep_completed;
        let Some(store) = self.store.as_mut() else {
            return;
        };
        if !store.exists() {
            return;
        }

        if keep {
            match store.archive() {
                Ok(path) => tracing::info!(path = %path.display(), "Checkpoint archived"),
                Err(e) => tracing::warn!(error = %e, "Failed to archive checkpoint"),
            }
        } else if let Err(e) = store.discard() {
            tracing::warn!(error = %e, "Failed to remove checkpoint");
        }
    }

    /// Logs improvement suggestions and writes the Markdown report if configured
    fn emit_report(&self) {
        let report = self.report();
        log_suggestions(&report.advice);

        if let Some(path) = &self.config.output.report_path {
            match write_markdown_report(&report, path) {
                Ok(()) => tracing::info!(path = %path.display(), "Report written"),
                Err(e) => tracing::warn!(error = %e, "Failed to write report"),
            }
        }
    }
}

/// Asks on the terminal whether to resume; resumes when stdin is not a terminal
fn prompt_resume(checkpoint: &Checkpoint) -> bool {
    let stdin = std::io::stdin();
    if !stdin.is_terminal() {
        return true;
    }

    let mut stderr = std::io::stderr();
    let _ = write!(
        stderr,
        "Found a checkpoint from {} ({} pages processed, {} pending). Resume? [Y/n] ",
        checkpoint.saved_at.format("%Y-%m-%d %H:%M:%S UTC"),
        checkpoint.pages_processed,
        checkpoint.frontier.pending_order.len()
    );
    let _ = stderr.flush();

    let mut answer = String::new();
    if stdin.lock().read_line(&mut answer).is_err() {
        return true;
    }

    !matches!(answer.trim().to_ascii_lowercase().as_str(), "n" | "no")
}
