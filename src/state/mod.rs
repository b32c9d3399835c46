//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `UrlState`: The state of one URL (pending, in progress, visited, skipped)
//! - `ErrorKind`: Classified failure recorded against a URL
//! - `UrlRecord`: Per-URL bookkeeping held by the frontier and checkpoints

mod url_record;
mod url_state;

// Re-export main types
pub use url_record::UrlRecord;
pub use url_state::{ErrorKind, UrlState};
