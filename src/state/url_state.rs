//! URL state definitions for tracking crawl progress
//!
//! This module defines the states a URL moves through during a crawl and the
//! error kinds recorded against it.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents the current state of a URL in the crawl
///
/// Allowed transitions:
///
/// ```text
/// Pending -> InProgress -> Visited
///                       -> Pending   (failure below the skip threshold, or resume)
///                       -> Skipped   (auto-skip)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UrlState {
    /// Discovered and waiting in the queue
    Pending,

    /// Popped from the queue and currently being fetched/processed
    InProgress,

    /// Fetched and processed (possibly with a content/output error)
    Visited,

    /// Abandoned after too many failed fetches
    Skipped,
}

impl UrlState {
    /// Returns true if no further processing will happen for this URL
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Visited | Self::Skipped)
    }

    /// Returns true if moving from `self` to `to` is allowed
    pub fn can_transition_to(&self, to: UrlState) -> bool {
        matches!(
            (self, to),
            (Self::Pending, Self::InProgress)
                | (Self::InProgress, Self::Visited)
                | (Self::InProgress, Self::Pending)
                | (Self::InProgress, Self::Skipped)
        )
    }

    /// Converts the state to its persisted string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Visited => "visited",
            Self::Skipped => "skipped",
        }
    }

    /// Parses a state from its persisted string representation
    ///
    /// Returns None if the string doesn't match any known state.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "in_progress" => Some(Self::InProgress),
            "visited" => Some(Self::Visited),
            "skipped" => Some(Self::Skipped),
            _ => None,
        }
    }

    pub fn all_states() -> [Self; 4] {
        [Self::Pending, Self::InProgress, Self::Visited, Self::Skipped]
    }
}

impl fmt::Display for UrlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}

/// Classified error recorded against a URL and counted in the statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Transport failure or retryable/5xx status, after retries ran out
    Network,

    /// Non-retryable 4xx status
    Client,

    /// The page was fetched but its content could not be extracted or rendered
    Content,

    /// Local failure: disk, checkpoint, configuration
    System,
}

impl ErrorKind {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Client => "client",
            Self::Content => "content",
            Self::System => "system",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "network" => Some(Self::Network),
            "client" => Some(Self::Client),
            "content" => Some(Self::Content),
            "system" => Some(Self::System),
            _ => None,
        }
    }

    pub fn all_kinds() -> [Self; 4] {
        [Self::Network, Self::Client, Self::Content, Self::System]
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_string())
    }
}
