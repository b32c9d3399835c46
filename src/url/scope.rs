use crate::ConfigError;
use regex::Regex;
use url::Url;

/// Decides whether a URL belongs to the mirrored site
///
/// A URL is in scope iff it starts with the allowed prefix and matches none
/// of the exclude patterns. Patterns are unanchored and evaluated against the
/// full URL. The prefix without its trailing slash is accepted as well, since
/// canonical URLs never end in a slash. The prefix itself is parsed once so
/// that its host is compared in the same lowercase form the frontier uses.
#[derive(Debug, Clone)]
pub struct ScopeFilter {
    allowed_prefix: String,
    excludes: Vec<Regex>,
}

impl ScopeFilter {
    /// Compiles the exclude patterns once
    ///
    /// # Returns
    ///
    /// * `Ok(ScopeFilter)` - All patterns compiled
    /// * `Err(ConfigError::InvalidPattern)` - A pattern is not a valid regex
    pub fn new(allowed_prefix: &str, exclude_patterns: &[String]) -> Result<Self, ConfigError> {
        let excludes = exclude_patterns
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| {
                    ConfigError::InvalidPattern(format!("'{}' is not a valid regex: {}", pattern, e))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            allowed_prefix: canonical_prefix(allowed_prefix),
            excludes,
        })
    }

    pub fn allowed_prefix(&self) -> &str {
        &self.allowed_prefix
    }

    /// Returns true if the URL is in scope
    pub fn is_in_scope(&self, url: &str) -> bool {
        has_prefix(url, &self.allowed_prefix) && !self.excludes.iter().any(|re| re.is_match(url))
    }

    pub fn allows(&self, url: &Url) -> bool {
        self.is_in_scope(url.as_str())
    }
}

/// One-shot scope check
///
/// Compiles `exclude_patterns` on every call; prefer [`ScopeFilter`] in loops.
/// Patterns that fail to compile never match.
///
/// # Examples
///
/// ```
/// use doc_mirror::url::is_in_scope;
///
/// let excludes = vec![".*#.*".to_string(), ".*/search.*".to_string()];
/// assert!(is_in_scope("https://x.test/docs/a.html", "https://x.test/docs/", &excludes));
/// assert!(!is_in_scope("https://x.test/other/a.html", "https://x.test/docs/", &excludes));
/// ```
pub fn is_in_scope(url: &str, allowed_prefix: &str, exclude_patterns: &[String]) -> bool {
    if !has_prefix(url, &canonical_prefix(allowed_prefix)) {
        return false;
    }

    !exclude_patterns
        .iter()
        .filter_map(|pattern| Regex::new(pattern).ok())
        .any(|re| re.is_match(url))
}

/// Lowercased scheme and host, trailing slash kept; unparsable prefixes are used as written
fn canonical_prefix(raw: &str) -> String {
    match Url::parse(raw.trim()) {
        Ok(url) => url.to_string(),
        Err(_) => raw.to_string(),
    }
}

fn has_prefix(url: &str, prefix: &str) -> bool {
    if url.starts_with(prefix) {
        return true;
    }

    match prefix.strip_suffix('/') {
        Some(bare) => url == bare,
        None => false,
    }
}
