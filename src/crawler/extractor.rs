//! Content extraction from fetched HTML
//!
//! This module handles parsing HTML content to extract:
//! - The main content element (by CSS selector)
//! - Links to follow, taken from the navigation element(s) only
//! - The page title

use crate::config::{CrawlerConfig, ExtractorConfig};
use crate::ConfigError;
use scraper::{Html, Selector};
use thiserror::Error;
use url::Url;

/// Errors raised when a fetched page cannot be turned into Markdown
///
/// These are recorded as `ErrorKind::Content`; the page is not retried.
#[derive(Debug, Error)]
pub enum ContentError {
    #[error("No element matches content selector '{selector}'")]
    MissingContent { selector: String },

    #[error("Rendered Markdown is empty")]
    EmptyMarkdown,

    #[error("Failed to render Markdown: {0}")]
    Render(String),
}

/// Output of a successful extraction
#[derive(Debug, Clone, Default)]
pub struct Extracted {
    /// Outer HTML of the first element matching the content selector
    pub main_html: String,

    /// Raw `href` values found inside the navigation element(s), in document order
    pub links: Vec<String>,

    pub title: Option<String>,
}

/// Splits a fetched page into main content and navigation links
pub trait ContentExtractor: Send + Sync {
    fn extract(&self, html: &str, page_url: &Url) -> Result<Extracted, ContentError>;
}

/// CSS-selector based extractor
///
/// Selectors are compiled once at construction.
#[derive(Debug, Clone)]
pub struct SelectorExtractor {
    content_source: String,
    content: Selector,
    navigation: Selector,
    anchors: Selector,
    title: Selector,
}

impl SelectorExtractor {
    /// # Returns
    ///
    /// * `Ok(SelectorExtractor)` - Both selectors parsed
    /// * `Err(ConfigError::InvalidSelector)` - A selector is not valid CSS
    pub fn new(content_selector: &str, navigation_selector: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            content_source: content_selector.to_string(),
            content: parse_selector(content_selector)?,
            navigation: parse_selector(navigation_selector)?,
            anchors: parse_selector("a[href]")?,
            title: parse_selector("title")?,
        })
    }

    pub fn from_config(extractor: &ExtractorConfig, crawler: &CrawlerConfig) -> Result<Self, ConfigError> {
        Self::new(&extractor.content_selector, &crawler.navigation_selector)
    }

    fn extract_title(&self, document: &Html) -> Option<String> {
        document
            .select(&self.title)
            .next()
            .map(|element| element.text().collect::<String>().trim().to_string())
            .filter(|s| !s.is_empty())
    }

    fn extract_links(&self, document: &Html) -> Vec<String> {
        let mut links = Vec::new();

        for nav in document.select(&self.navigation) {
            for element in nav.select(&self.anchors) {
                // Skip if it has the download attribute
                if element.value().attr("download").is_some() {
                    continue;
                }

                if let Some(href) = element.value().attr("href") {
                    if is_followable(href) {
                        links.push(href.trim().to_string());
                    }
                }
            }
        }

        links
    }
}

impl ContentExtractor for SelectorExtractor {
    fn extract(&self, html: &str, page_url: &Url) -> Result<Extracted, ContentError> {
        let document = Html::parse_document(html);

        let main_html = document
            .select(&self.content)
            .next()
            .map(|element| element.html())
            .ok_or_else(|| ContentError::MissingContent {
                selector: self.content_source.clone(),
            })?;

        let links = self.extract_links(&document);
        tracing::trace!(url = %page_url, links = links.len(), "Extracted page content");

        Ok(Extracted {
            main_html,
            links,
            title: self.extract_title(&document),
        })
    }
}

fn parse_selector(selector: &str) -> Result<Selector, ConfigError> {
    Selector::parse(selector)
        .map_err(|e| ConfigError::InvalidSelector(format!("'{}': {:?}", selector, e)))
}

/// Filters hrefs that can never be a page of the mirrored site
///
/// Excludes empty hrefs, same-page anchors and the
/// `javascript:`/`mailto:`/`tel:`/`data:` schemes.
fn is_followable(href: &str) -> bool {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return false;
    }

    let lower = href.to_ascii_lowercase();
    !(lower.starts_with("javascript:")
        || lower.starts_with("mailto:")
        || lower.starts_with("tel:")
        || lower.starts_with("data:"))
}
