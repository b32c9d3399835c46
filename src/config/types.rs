use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for doc-mirror
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(rename = "target-site")]
    pub target_site: TargetSiteConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub extractor: ExtractorConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub execution: ExecutionConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub recovery: RecoveryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// The site being mirrored
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct TargetSiteConfig {
    /// First page fetched on a fresh crawl
    pub start_url: String,

    /// URL prefix every crawled page must start with
    pub allowed_domain: String,
}

/// Link discovery configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CrawlerConfig {
    /// CSS selector of the elements whose links are followed
    pub navigation_selector: String,

    /// Regular expressions; a URL matching any of them is never crawled
    pub exclude_patterns: Vec<String>,

    /// User-Agent header sent with every request
    pub user_agent: String,

    /// Per-request timeout in seconds
    pub request_timeout: f64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            navigation_selector: "nav".to_string(),
            exclude_patterns: vec![
                r".*#.*".to_string(),
                r".*/search\.html".to_string(),
                r".*/genindex\.html".to_string(),
            ],
            user_agent: format!("doc-mirror/{}", env!("CARGO_PKG_VERSION")),
            request_timeout: 30.0,
        }
    }
}

impl CrawlerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.request_timeout)
    }
}

/// Main content extraction configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ExtractorConfig {
    /// CSS selector of the element holding the page's main content
    pub content_selector: String,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            content_selector: "main".to_string(),
        }
    }
}

/// Output tree configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct OutputConfig {
    /// Root of the mirrored Markdown tree
    pub base_dir: PathBuf,

    /// Directory (under `base_dir`) receiving downloaded images
    pub image_dir_name: String,

    /// Download images instead of linking to them
    pub download_images: bool,

    /// Optional path of the end-of-run Markdown report
    pub report_path: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("./output"),
            image_dir_name: "images".to_string(),
            download_images: true,
            report_path: None,
        }
    }
}

/// Execution pacing
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ExecutionConfig {
    /// Politeness delay before every HTTP request, in seconds
    pub request_delay: f64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self { request_delay: 1.0 }
    }
}

impl ExecutionConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_secs_f64(self.request_delay)
    }
}

/// Retry and auto-skip policy
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct RetryConfig {
    /// Retries after the first attempt of a single fetch
    pub max_retries: u32,

    /// Multiplier applied to the delay after each retry
    pub backoff_factor: f64,

    /// Delay before the first retry, in seconds
    pub initial_delay: f64,

    /// Ceiling for any retry delay, in seconds
    pub max_delay: f64,

    /// HTTP status codes worth retrying
    pub retryable_status_codes: Vec<u16>,

    /// Failed fetches after which a URL is abandoned
    pub skip_after_failures: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_factor: 2.0,
            initial_delay: 1.0,
            max_delay: 60.0,
            retryable_status_codes: vec![429, 500, 502, 503, 504],
            skip_after_failures: 5,
        }
    }
}

/// Checkpoint and resume configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct RecoveryConfig {
    /// Write checkpoints at all
    pub enable_recovery: bool,

    /// Checkpoint location; `.db`/`.sqlite`/`.sqlite3` selects the SQLite backend
    pub recovery_file: PathBuf,

    /// Successfully processed pages between two checkpoints
    pub save_interval: u32,

    /// Resume from an existing checkpoint without asking
    pub auto_resume: bool,

    /// Keep the checkpoint as `<file>.completed` after a finished crawl
    pub keep_completed: bool,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            enable_recovery: true,
            recovery_file: PathBuf::from("./recovery_state.json"),
            save_interval: 10,
            auto_resume: false,
            keep_completed: false,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct LoggingConfig {
    /// Default filter directive when no -v/-q flag is given
    pub level: String,

    /// Optional file receiving a copy of every log line
    pub log_file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_file: None,
        }
    }
}
