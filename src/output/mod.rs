//! Output module for the mirrored tree and the end-of-run report
//!
//! This module handles:
//! - Mapping page URLs to Markdown files and writing them atomically
//! - Rendering extracted HTML to Markdown
//! - Rewriting or downloading images referenced by a page
//! - Run statistics, improvement suggestions and the crawl report

mod advice;
mod images;
mod render;
mod report;
pub mod stats;
pub(crate) mod writer;

pub use advice::{analyze, log_suggestions, Category, Priority, Suggestion};
pub use images::{image_file_name, relative_image_ref, ImageHandler, ImageOutcome};
pub use render::{Html2MdRenderer, MarkdownRenderer};
pub use report::{
    format_markdown_report, format_report, print_report, write_markdown_report, CrawlReport,
    FailedUrl,
};
pub use stats::CrawlStats;
pub use writer::{output_path, write_atomic, write_page, INDEX_FILE};

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while writing output
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
