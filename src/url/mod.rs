//! URL handling module for doc-mirror
//!
//! This module provides link resolution, URL canonicalization and the scope
//! filter that decides which discovered links belong to the mirrored site.
//! Everything here is pure: no network or disk access.

mod normalize;
mod scope;

pub use normalize::{normalize_absolute, normalize_url, resolve_link};
pub use scope::{is_in_scope, ScopeFilter};

use url::Url;

/// Resolves a discovered link and applies the scope filter
///
/// The link is checked twice: once as written (resolved, fragment kept) so
/// exclude patterns such as `.*#.*` can reject anchor links, and once in
/// canonical form so the frontier key itself is in scope.
///
/// # Returns
///
/// * `Some(Url)` - Canonical URL to enqueue
/// * `None` - Link is malformed, not HTTP(S), or out of scope
pub fn accept_link(raw: &str, page_url: &Url, scope: &ScopeFilter) -> Option<Url> {
    let resolved = resolve_link(raw, page_url).ok()?;
    if !scope.allows(&resolved) {
        return None;
    }

    let canonical = normalize_url(raw, page_url).ok()?;
    if !scope.allows(&canonical) {
        return None;
    }

    Some(canonical)
}
