//! End-of-run report
//!
//! This module combines run statistics with frontier data into a report that
//! is printed to stdout and optionally written as Markdown.

use crate::config::Config;
use crate::crawler::Frontier;
use crate::output::advice::{analyze, Suggestion};
use crate::output::stats::CrawlStats;
use crate::output::OutputResult;
use crate::state::{ErrorKind, UrlState};
use std::path::Path;

/// How many failed URLs are listed before the rest is summarized
const MAX_LISTED_FAILURES: usize = 50;

/// A URL that failed at least once or finished with an error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedUrl {
    pub url: String,
    pub state: UrlState,
    pub failures: u32,
    pub last_error: Option<ErrorKind>,
}

/// Snapshot of a finished (or interrupted) run
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub completed: bool,
    pub stats: CrawlStats,
    pub total_urls: usize,
    pub visited: usize,
    pub pending: usize,
    pub skipped_urls: Vec<String>,
    pub failed_urls: Vec<FailedUrl>,
    /// Improvement suggestions, most urgent first
    pub advice: Vec<Suggestion>,
}

impl CrawlReport {
    pub fn new(stats: &CrawlStats, frontier: &Frontier, completed: bool) -> Self {
        let failed_urls = frontier
            .failed_records()
            .into_iter()
            .map(|record| FailedUrl {
                url: record.url.clone(),
                state: record.state,
                failures: record.consecutive_failures,
                last_error: record.last_error,
            })
            .collect();

        Self {
            completed,
            stats: stats.clone(),
            total_urls: frontier.len(),
            visited: frontier.visited_len(),
            pending: frontier.pending_len(),
            skipped_urls: frontier.skipped_urls(),
            failed_urls,
            advice: Vec::new(),
        }
    }

    /// Attaches suggestions derived from the statistics and `config`
    pub fn with_advice(mut self, config: &Config) -> Self {
        self.advice = analyze(&self.stats, self.skipped_urls.len(), config);
        self
    }

    fn status(&self) -> &'static str {
        if self.completed {
            "completed"
        } else {
            "interrupted (resumable)"
        }
    }
}

/// Prints the report to stdout in a formatted manner
pub fn print_report(report: &CrawlReport) {
    print!("{}", format_report(report));
}

/// Formats the plain-text report printed at the end of a run
pub fn format_report(report: &CrawlReport) -> String {
    let stats = &report.stats;
    let mut out = String::new();

    out.push_str("=== Crawl Report ===\n\n");

    out.push_str(&format!("Status: {}\n", report.status()));
    out.push_str(&format!("Elapsed: {}s\n\n", stats.elapsed().num_seconds()));

    out.push_str("Pages:\n");
    out.push_str(&format!("  Discovered: {}\n", report.total_urls));
    out.push_str(&format!("  Processed: {}\n", stats.pages_processed));
    out.push_str(&format!("  Succeeded: {}\n", stats.pages_succeeded));
    out.push_str(&format!("  Failed: {}\n", stats.pages_failed));
    out.push_str(&format!("  Still pending: {}\n\n", report.pending));

    if stats.images_downloaded > 0 || stats.images_failed > 0 {
        out.push_str("Images:\n");
        out.push_str(&format!("  Downloaded: {}\n", stats.images_downloaded));
        out.push_str(&format!("  Failed: {}\n\n", stats.images_failed));
    }

    if !stats.errors_by_kind.is_empty() {
        out.push_str("Errors by Kind:\n");
        for (kind, count) in &stats.errors_by_kind {
            out.push_str(&format!("  {}: {}\n", kind, count));
        }
        out.push('\n');
    }

    if !report.skipped_urls.is_empty() {
        out.push_str(&format!("Auto-skipped URLs ({}):\n", report.skipped_urls.len()));
        for url in &report.skipped_urls {
            match report.failed_urls.iter().find(|f| &f.url == url) {
                Some(failed) => out.push_str(&format!(
                    "  - {} ({} failures, last: {})\n",
                    url,
                    failed.failures,
                    last_error_label(failed)
                )),
                None => out.push_str(&format!("  - {}\n", url)),
            }
        }
        out.push('\n');
    }

    if !report.failed_urls.is_empty() {
        out.push_str(&format!("Failed URLs ({}):\n", report.failed_urls.len()));
        for failed in report.failed_urls.iter().take(MAX_LISTED_FAILURES) {
            out.push_str(&format!(
                "  {} [{}] failures={} last_error={}\n",
                failed.url,
                failed.state,
                failed.failures,
                last_error_label(failed)
            ));
        }
        if report.failed_urls.len() > MAX_LISTED_FAILURES {
            out.push_str(&format!(
                "  ... and {} more\n",
                report.failed_urls.len() - MAX_LISTED_FAILURES
            ));
        }
        out.push('\n');
    }

    out.push_str("Suggestions:\n");
    if report.advice.is_empty() {
        out.push_str("  No problems detected\n");
    }
    for s in &report.advice {
        out.push_str(&format!("  [{}] {}: {}\n", s.priority, s.issue, s.suggestion));
    }
    out.push('\n');

    out.push_str(&format!(
        "Success Rate: {:.1}% ({} / {} pages)\n",
        stats.success_rate(),
        stats.pages_succeeded,
        stats.pages_processed
    ));

    out
}

fn last_error_label(failed: &FailedUrl) -> String {
    failed
        .last_error
        .map(|kind| kind.to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Formats the report as Markdown
pub fn format_markdown_report(report: &CrawlReport) -> String {
    let stats = &report.stats;
    let mut md = String::new();

    md.push_str("# doc-mirror Crawl Report\n\n");

    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Status**: {}\n", report.status()));
    md.push_str(&format!("- **Started**: {}\n", stats.started_at.to_rfc3339()));
    md.push_str(&format!(
        "- **Elapsed**: {} seconds\n\n",
        stats.elapsed().num_seconds()
    ));

    md.push_str("## Overall Statistics\n\n");
    md.push_str("| Metric | Count |\n");
    md.push_str("|--------|-------|\n");
    md.push_str(&format!("| URLs discovered | {} |\n", report.total_urls));
    md.push_str(&format!("| Pages processed | {} |\n", stats.pages_processed));
    md.push_str(&format!("| Pages succeeded | {} |\n", stats.pages_succeeded));
    md.push_str(&format!("| Pages failed | {} |\n", stats.pages_failed));
    md.push_str(&format!("| Pending | {} |\n", report.pending));
    md.push_str(&format!("| Images downloaded | {} |\n", stats.images_downloaded));
    md.push_str(&format!("| Images failed | {} |\n", stats.images_failed));
    md.push_str(&format!(
        "\n- **Success Rate**: {:.2}%\n\n",
        stats.success_rate()
    ));

    if !stats.errors_by_kind.is_empty() {
        md.push_str("## Error Summary\n\n");
        md.push_str("| Error Kind | Count |\n");
        md.push_str("|------------|-------|\n");
        for (kind, count) in &stats.errors_by_kind {
            md.push_str(&format!("| {} | {} |\n", kind, count));
        }
        md.push('\n');
    }

    if !report.skipped_urls.is_empty() {
        md.push_str("## Auto-skipped URLs\n\n");
        for url in &report.skipped_urls {
            md.push_str(&format!("- {}\n", url));
        }
        md.push('\n');
    }

    if !report.failed_urls.is_empty() {
        md.push_str("## Failed URLs\n\n");
        md.push_str("| URL | State | Failures | Last Error |\n");
        md.push_str("|-----|-------|----------|------------|\n");
        for failed in report.failed_urls.iter().take(MAX_LISTED_FAILURES) {
            md.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                failed.url,
                failed.state,
                failed.failures,
                last_error_label(failed)
            ));
        }
        if report.failed_urls.len() > MAX_LISTED_FAILURES {
            md.push_str(&format!(
                "\n... and {} more\n",
                report.failed_urls.len() - MAX_LISTED_FAILURES
            ));
        }
        md.push('\n');
    }

    md.push_str("## Suggestions\n\n");
    if report.advice.is_empty() {
        md.push_str("No problems detected.\n");
    } else {
        md.push_str("| Priority | Category | Issue | Suggestion |\n");
        md.push_str("|----------|----------|-------|------------|\n");
        for s in &report.advice {
            md.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                s.priority, s.category, s.issue, s.suggestion
            ));
        }
    }

    md
}

/// Writes the Markdown report, creating parent directories as needed
pub fn write_markdown_report(report: &CrawlReport, path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_report(report);
    crate::output::writer::write_atomic(path, markdown.as_bytes())
}
