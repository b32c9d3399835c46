use crate::state::{ErrorKind, UrlState};
use serde::{Deserialize, Serialize};

/// Tracks one discovered URL
///
/// There is exactly one record per canonical URL for the lifetime of a crawl,
/// including across checkpoint/resume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlRecord {
    /// Canonical absolute URL (frontier key)
    pub url: String,

    /// Current crawl state
    pub state: UrlState,

    /// Retry-exhausted fetches since the last success
    pub consecutive_failures: u32,

    /// Last classified error, if any
    pub last_error: Option<ErrorKind>,
}

impl UrlRecord {
    /// Creates a freshly discovered record
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            state: UrlState::Pending,
            consecutive_failures: 0,
            last_error: None,
        }
    }

    /// Returns true if this URL ever failed or finished with an error
    pub fn has_error(&self) -> bool {
        self.consecutive_failures > 0 || self.last_error.is_some()
    }
}
