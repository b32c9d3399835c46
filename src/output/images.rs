//! Image reference handling for rendered pages
//!
//! Image links in the rendered Markdown are either rewritten to absolute URLs
//! or downloaded into the image directory and rewritten to a path relative to
//! the page file. Image failures never fail the page.

use crate::config::OutputConfig;
use crate::crawler::Fetcher;
use crate::output::writer::{sha256_hex, write_atomic};
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;
use url::Url;

const HASH_PREFIX_LEN: usize = 12;

// ![alt](src) or ![alt](src "title")
static IMAGE_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r#"!\[([^\]]*)\]\(\s*([^)\s]+)(\s+"[^"]*")?\s*\)"#).ok());

/// Result of processing one page's images
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageOutcome {
    pub markdown: String,
    pub downloaded: u64,
    pub failed: u64,
}

/// Rewrites or downloads the images referenced by a page
#[derive(Debug, Clone)]
pub struct ImageHandler {
    fetcher: Fetcher,
    base_dir: PathBuf,
    image_dir_name: String,
    download: bool,
}

impl ImageHandler {
    pub fn new(fetcher: Fetcher, config: &OutputConfig) -> Self {
        Self {
            fetcher,
            base_dir: config.base_dir.clone(),
            image_dir_name: config.image_dir_name.clone(),
            download: config.download_images,
        }
    }

    /// Processes every image reference in `markdown`
    ///
    /// # Arguments
    ///
    /// * `markdown` - Rendered page
    /// * `page_url` - URL the page was fetched from (base for relative sources)
    /// * `page_path` - Page file path relative to the output directory
    pub async fn process(&self, markdown: &str, page_url: &Url, page_path: &Path) -> ImageOutcome {
        let mut outcome = ImageOutcome {
            markdown: markdown.to_string(),
            ..ImageOutcome::default()
        };
        let Some(pattern) = IMAGE_PATTERN.as_ref() else {
            return outcome;
        };

        let matches: Vec<(std::ops::Range<usize>, String, String, String)> = pattern
            .captures_iter(markdown)
            .filter_map(|caps: Captures<'_>| {
                let whole = caps.get(0)?;
                Some((
                    whole.range(),
                    caps.get(1).map(|m| m.as_str().to_string()).unwrap_or_default(),
                    caps.get(2)?.as_str().to_string(),
                    caps.get(3).map(|m| m.as_str().to_string()).unwrap_or_default(),
                ))
            })
            .collect();

        if matches.is_empty() {
            return outcome;
        }

        let mut resolved: HashMap<String, String> = HashMap::new();
        let mut out = String::with_capacity(markdown.len());
        let mut last = 0;

        for (range, alt, src, title) in matches {
            out.push_str(&markdown[last..range.start]);
            last = range.end;

            let target = match resolved.get(&src) {
                Some(target) => target.clone(),
                None => {
                    let target = self.resolve_image(&src, page_url, page_path, &mut outcome).await;
                    resolved.insert(src.clone(), target.clone());
                    target
                }
            };

            out.push_str(&format!("![{}]({}{})", alt, target, title));
        }
        out.push_str(&markdown[last..]);

        outcome.markdown = out;
        outcome
    }

    async fn resolve_image(
        &self,
        src: &str,
        page_url: &Url,
        page_path: &Path,
        outcome: &mut ImageOutcome,
    ) -> String {
        if src.starts_with("data:") {
            return src.to_string();
        }

        let absolute = match page_url.join(src) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => url,
            _ => {
                tracing::debug!(page = %page_url, src = %src, "Leaving unresolvable image source");
                return src.to_string();
            }
        };

        if !self.download {
            return absolute.to_string();
        }

        let file_name = image_file_name(&absolute);
        let local = self.base_dir.join(&self.image_dir_name).join(&file_name);

        if !local.exists() {
            match self.fetcher.fetch_bytes(&absolute).await {
                Ok(bytes) => {
                    if let Err(e) = write_atomic(&local, &bytes) {
                        tracing::warn!(image = %absolute, error = %e, "Failed to save image");
                        outcome.failed += 1;
                        return absolute.to_string();
                    }
                    tracing::debug!(image = %absolute, path = %local.display(), "Downloaded image");
                    outcome.downloaded += 1;
                }
                Err(e) => {
                    tracing::warn!(image = %absolute, error = %e, "Failed to download image");
                    outcome.failed += 1;
                    return absolute.to_string();
                }
            }
        }

        relative_image_ref(page_path, &self.image_dir_name, &file_name)
    }
}

/// `<12 hex of SHA-256(url)>-<sanitized last segment>`
pub fn image_file_name(url: &Url) -> String {
    let hash = sha256_hex(url.as_str().as_bytes());
    let raw = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|s| !s.is_empty())
        .unwrap_or("image");

    let name: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    format!("{}-{}", &hash[..HASH_PREFIX_LEN], name)
}

/// Path from the page's directory to the image, with `/` separators
pub fn relative_image_ref(page_path: &Path, image_dir_name: &str, file_name: &str) -> String {
    let depth = page_path
        .parent()
        .map(|parent| {
            parent
                .components()
                .filter(|c| matches!(c, Component::Normal(_)))
                .count()
        })
        .unwrap_or(0);

    format!("{}{}/{}", "../".repeat(depth), image_dir_name, file_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CrawlerConfig, RetryConfig};
    use crate::crawler::{build_http_client, RetryPolicy};
    use std::time::Duration;

    fn handler(base_dir: &Path, download: bool) -> ImageHandler {
        let fetcher = Fetcher::new(
            build_http_client(&CrawlerConfig::default()).unwrap(),
            RetryPolicy::from_config(&RetryConfig::default()),
            Duration::ZERO,
        );
        let config = OutputConfig {
            base_dir: base_dir.to_path_buf(),
            download_images: download,
            ..OutputConfig::default()
        };
        ImageHandler::new(fetcher, &config)
    }

    fn page_url() -> Url {
        Url::parse("https://x.test/docs/guide/intro.html").unwrap()
    }

    #[test]
    fn test_image_file_name() {
        let url = Url::parse("https://x.test/docs/_static/logo%20big.png").unwrap();
        let name = image_file_name(&url);
        assert_eq!(name.len(), HASH_PREFIX_LEN + 1 + "logo_20big.png".len());
        assert!(name.ends_with("-logo_20big.png"));

        let other = Url::parse("https://x.test/docs/img/logo%20big.png").unwrap();
        assert_ne!(image_file_name(&other), name);
    }

    #[test]
    fn test_image_file_name_without_segment() {
        let url = Url::parse("https://x.test/").unwrap();
        assert!(image_file_name(&url).ends_with("-image"));
    }

    #[test]
    fn test_relative_image_ref() {
        assert_eq!(
            relative_image_ref(Path::new("guide/intro.md"), "images", "abc-logo.png"),
            "../images/abc-logo.png"
        );
        assert_eq!(
            relative_image_ref(Path::new("_index.md"), "images", "abc-logo.png"),
            "images/abc-logo.png"
        );
        assert_eq!(
            relative_image_ref(Path::new("a/b/c.md"), "img", "x.png"),
            "../../img/x.png"
        );
    }

    #[tokio::test]
    async fn test_rewrites_to_absolute_when_not_downloading() {
        let dir = tempfile::tempdir().unwrap();
        let handler = handler(dir.path(), false);

        let markdown = "Intro\n\n![Logo](../_static/logo.png \"The logo\")\n\n![](diagram.svg)\n";
        let outcome = handler
            .process(markdown, &page_url(), Path::new("guide/intro.md"))
            .await;

        assert!(outcome
            .markdown
            .contains("![Logo](https://x.test/docs/_static/logo.png \"The logo\")"));
        assert!(outcome
            .markdown
            .contains("![](https://x.test/docs/guide/diagram.svg)"));
        assert!(outcome.markdown.starts_with("Intro\n\n"));
        assert_eq!(outcome.downloaded, 0);
        assert_eq!(outcome.failed, 0);
    }

    #[tokio::test]
    async fn test_data_uri_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let handler = handler(dir.path(), true);

        let markdown = "![dot](data:image/png;base64,AAAA)";
        let outcome = handler
            .process(markdown, &page_url(), Path::new("guide/intro.md"))
            .await;
        assert_eq!(outcome.markdown, markdown);
    }

    #[tokio::test]
    async fn test_no_images() {
        let dir = tempfile::tempdir().unwrap();
        let handler = handler(dir.path(), true);

        let outcome = handler
            .process("# Title\n\n[link](a.html)\n", &page_url(), Path::new("a.md"))
            .await;
        assert_eq!(outcome.markdown, "# Title\n\n[link](a.html)\n");
    }

    #[tokio::test]
    async fn test_existing_image_is_reused() {
        let dir = tempfile::tempdir().unwrap();
        let handler = handler(dir.path(), true);

        let absolute = Url::parse("https://x.test/docs/guide/logo.png").unwrap();
        let file_name = image_file_name(&absolute);
        let local = dir.path().join("images").join(&file_name);
        std::fs::create_dir_all(local.parent().unwrap()).unwrap();
        std::fs::write(&local, b"png").unwrap();

        let outcome = handler
            .process("![Logo](logo.png)", &page_url(), Path::new("guide/intro.md"))
            .await;

        assert_eq!(
            outcome.markdown,
            format!("![Logo](../images/{})", file_name)
        );
        assert_eq!(outcome.downloaded, 0);
        assert_eq!(outcome.failed, 0);
    }
}
