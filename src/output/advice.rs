//! End-of-run improvement suggestions
//!
//! The advisor looks at run statistics together with the configuration and
//! proposes concrete configuration changes: network error rates, content
//! extraction failures, image failures, throughput, abandoned URLs and
//! filesystem errors.

use crate::config::Config;
use crate::output::stats::CrawlStats;
use crate::state::ErrorKind;
use std::fmt;

/// Urgency of a suggestion; sorts `High` first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        })
    }
}

/// Area a suggestion belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Performance,
    Reliability,
    Configuration,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Category::Performance => "performance",
            Category::Reliability => "reliability",
            Category::Configuration => "configuration",
        })
    }
}

/// One observed problem and what to change about it
#[derive(Debug, Clone, PartialEq)]
pub struct Suggestion {
    pub issue: String,
    pub suggestion: String,
    pub priority: Priority,
    pub category: Category,
}

impl Suggestion {
    fn new(priority: Priority, category: Category, issue: String, suggestion: String) -> Self {
        Self {
            issue,
            suggestion,
            priority,
            category,
        }
    }
}

/// Pages per minute below which throughput is reported
const SLOW_PAGES_PER_MINUTE: f64 = 5.0;

/// Downloaded images above which storage use is reported
const MANY_IMAGES: u64 = 100;

/// Derives suggestions from a run, most urgent first
///
/// # Arguments
///
/// * `stats` - Statistics of the run (across resumes)
/// * `skipped` - Number of URLs abandoned after repeated failures
/// * `config` - Configuration the run used
pub fn analyze(stats: &CrawlStats, skipped: usize, config: &Config) -> Vec<Suggestion> {
    let mut suggestions = Vec::new();
    let skipped = skipped as u64;
    // Every URL the run finished with, successfully or not
    let attempted = stats.pages_processed + skipped;

    if attempted > 0 {
        analyze_network(stats, attempted, config, &mut suggestions);
        analyze_reliability(stats, attempted, &mut suggestions);
    }
    analyze_content(stats, &mut suggestions);
    analyze_performance(stats, config, &mut suggestions);
    analyze_skipped(stats, skipped, config, &mut suggestions);

    suggestions.sort_by_key(|s| s.priority);
    suggestions
}

fn rate(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

fn analyze_network(stats: &CrawlStats, attempted: u64, config: &Config, out: &mut Vec<Suggestion>) {
    let network_rate = rate(stats.errors_of(ErrorKind::Network), attempted);
    let delay = config.execution.request_delay;

    if network_rate > 0.3 {
        if delay < 2.0 {
            out.push(Suggestion::new(
                Priority::High,
                Category::Reliability,
                format!("Network errors are frequent ({:.1}%)", network_rate * 100.0),
                format!(
                    "Raise execution.request-delay to at least {:.1}s and retry.max-retries above {}",
                    delay + 1.0,
                    config.retry.max_retries
                ),
            ));
        } else {
            out.push(Suggestion::new(
                Priority::Medium,
                Category::Reliability,
                format!("Network errors are frequent ({:.1}%)", network_rate * 100.0),
                "The server may be overloaded; resume the crawl at a quieter time".to_string(),
            ));
        }
    } else if network_rate > 0.1 {
        out.push(Suggestion::new(
            Priority::Medium,
            Category::Reliability,
            format!("Network errors are occurring ({:.1}%)", network_rate * 100.0),
            format!(
                "Raising execution.request-delay to {:.1}s may stabilize the crawl",
                delay + 0.5
            ),
        ));
    }
}

fn analyze_content(stats: &CrawlStats, out: &mut Vec<Suggestion>) {
    let content_rate = rate(stats.errors_of(ErrorKind::Content), stats.pages_processed);

    if content_rate > 0.2 {
        out.push(Suggestion::new(
            Priority::High,
            Category::Configuration,
            format!("Content extraction fails often ({:.1}%)", content_rate * 100.0),
            "extractor.content-selector probably does not match the site; check the page structure"
                .to_string(),
        ));
    } else if content_rate > 0.05 {
        out.push(Suggestion::new(
            Priority::Medium,
            Category::Configuration,
            format!("Content extraction fails on some pages ({:.1}%)", content_rate * 100.0),
            "Adjust extractor.content-selector for the pages listed as content errors".to_string(),
        ));
    }

    let images_total = stats.images_downloaded + stats.images_failed;
    let image_failure_rate = rate(stats.images_failed, images_total);
    if stats.images_failed > 0 && image_failure_rate > 0.3 {
        out.push(Suggestion::new(
            Priority::Medium,
            Category::Configuration,
            format!("Image downloads fail often ({:.1}%)", image_failure_rate * 100.0),
            "Consider output.download-images = false to link images instead".to_string(),
        ));
    }
}

fn analyze_performance(stats: &CrawlStats, config: &Config, out: &mut Vec<Suggestion>) {
    let elapsed_ms = stats.elapsed().num_milliseconds();
    if stats.pages_processed > 0 && elapsed_ms > 0 {
        let pages_per_minute = stats.pages_processed as f64 / (elapsed_ms as f64 / 60_000.0);
        if pages_per_minute < SLOW_PAGES_PER_MINUTE {
            out.push(Suggestion::new(
                Priority::Low,
                Category::Performance,
                format!("Crawl is slow ({:.1} pages/min)", pages_per_minute),
                format!(
                    "Lower execution.request-delay (currently {}s) if the site allows it",
                    config.execution.request_delay
                ),
            ));
        }
    }

    if stats.images_downloaded > MANY_IMAGES {
        out.push(Suggestion::new(
            Priority::Low,
            Category::Performance,
            format!("Many images were downloaded ({})", stats.images_downloaded),
            "Set output.download-images = false if local copies are not needed".to_string(),
        ));
    }

    let level = config.logging.level.to_ascii_lowercase();
    if (level == "debug" || level == "trace") && stats.pages_processed > 20 {
        out.push(Suggestion::new(
            Priority::Low,
            Category::Performance,
            format!("Logging level is {}", level),
            "Use logging.level = \"info\" for large crawls".to_string(),
        ));
    }
}

fn analyze_skipped(stats: &CrawlStats, skipped: u64, config: &Config, out: &mut Vec<Suggestion>) {
    if skipped == 0 {
        return;
    }

    let skip_rate = rate(skipped, stats.pages_succeeded + skipped);
    let priority = if skip_rate > 0.5 {
        Priority::Medium
    } else {
        Priority::Low
    };
    out.push(Suggestion::new(
        priority,
        Category::Configuration,
        format!(
            "{} URL(s) were abandoned after {} failures ({:.1}%)",
            skipped,
            config.retry.skip_after_failures,
            skip_rate * 100.0
        ),
        "Add crawler.exclude-patterns for URLs that never load, or raise retry.skip-after-failures"
            .to_string(),
    ));
}

fn analyze_reliability(stats: &CrawlStats, attempted: u64, out: &mut Vec<Suggestion>) {
    let error_rate = rate(stats.total_errors(), attempted);

    if error_rate > 0.4 {
        out.push(Suggestion::new(
            Priority::High,
            Category::Reliability,
            format!("Overall error rate is high ({:.1}%)", error_rate * 100.0),
            "Review start-url, allowed-domain and the CSS selectors against the site".to_string(),
        ));
    } else if error_rate > 0.2 {
        out.push(Suggestion::new(
            Priority::Medium,
            Category::Reliability,
            format!("Error rate is elevated ({:.1}%)", error_rate * 100.0),
            "Tuning the retry and delay settings may reduce errors".to_string(),
        ));
    }

    let system_errors = stats.errors_of(ErrorKind::System);
    if system_errors > 0 {
        out.push(Suggestion::new(
            Priority::High,
            Category::Reliability,
            format!("{} page(s) could not be written", system_errors),
            "Check permissions and free space of output.base-dir".to_string(),
        ));
    }
}

/// Emits suggestions as log events: high as warnings, the rest lower
pub fn log_suggestions(suggestions: &[Suggestion]) {
    if suggestions.is_empty() {
        tracing::info!("No improvement suggestions");
        return;
    }

    for s in suggestions {
        match s.priority {
            Priority::High => {
                tracing::warn!(category = %s.category, suggestion = %s.suggestion, "{}", s.issue)
            }
            Priority::Medium => {
                tracing::info!(category = %s.category, suggestion = %s.suggestion, "{}", s.issue)
            }
            Priority::Low => {
                tracing::debug!(category = %s.category, suggestion = %s.suggestion, "{}", s.issue)
            }
        }
    }
}
