use crate::config::types::{
    Config, CrawlerConfig, ExecutionConfig, ExtractorConfig, OutputConfig, RecoveryConfig,
    RetryConfig, TargetSiteConfig,
};
use crate::url::{normalize_absolute, ScopeFilter};
use crate::ConfigError;
use regex::Regex;
use scraper::Selector;
use std::time::Duration;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_target_site(&config.target_site)?;
    validate_crawler_config(&config.crawler)?;
    validate_extractor_config(&config.extractor)?;
    validate_output_config(&config.output)?;
    validate_execution_config(&config.execution)?;
    validate_retry_config(&config.retry)?;
    validate_recovery_config(&config.recovery)?;

    // The start page has to survive the same filter every discovered link goes through
    let scope = ScopeFilter::new(
        &config.target_site.allowed_domain,
        &config.crawler.exclude_patterns,
    )?;
    let start_url = normalize_absolute(&config.target_site.start_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid start-url: {}", e)))?;
    if !scope.allows(&start_url) {
        return Err(ConfigError::Validation(format!(
            "start-url '{}' is outside allowed-domain '{}' or matches an exclude pattern",
            config.target_site.start_url, config.target_site.allowed_domain
        )));
    }

    Ok(())
}

/// Validates the target site URLs
fn validate_target_site(config: &TargetSiteConfig) -> Result<(), ConfigError> {
    validate_http_url("start-url", &config.start_url)?;
    validate_http_url("allowed-domain", &config.allowed_domain)?;
    Ok(())
}

fn validate_http_url(key: &str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{} cannot be empty", key)));
    }

    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", key, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "{} must be an HTTP or HTTPS URL, got '{}'",
            key, value
        )));
    }

    Ok(())
}

/// Validates link discovery configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    validate_selector("navigation-selector", &config.navigation_selector)?;

    for pattern in &config.exclude_patterns {
        Regex::new(pattern).map_err(|e| {
            ConfigError::InvalidPattern(format!("'{}' is not a valid regex: {}", pattern, e))
        })?;
    }

    if !(config.request_timeout > 0.0) {
        return Err(ConfigError::Validation(format!(
            "request-timeout must be > 0, got {}",
            config.request_timeout
        )));
    }
    validate_seconds("request-timeout", config.request_timeout)?;

    Ok(())
}

/// A number of seconds must be finite and fit in a `Duration`
fn validate_seconds(key: &str, seconds: f64) -> Result<(), ConfigError> {
    if !seconds.is_finite() || Duration::try_from_secs_f64(seconds).is_err() {
        return Err(ConfigError::Validation(format!(
            "{} must be a finite number of seconds, got {}",
            key, seconds
        )));
    }
    Ok(())
}

fn validate_extractor_config(config: &ExtractorConfig) -> Result<(), ConfigError> {
    validate_selector("content-selector", &config.content_selector)
}

fn validate_selector(key: &str, selector: &str) -> Result<(), ConfigError> {
    if selector.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{} cannot be empty", key)));
    }

    Selector::parse(selector)
        .map_err(|e| ConfigError::InvalidSelector(format!("{} '{}': {:?}", key, selector, e)))?;

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.base_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "base-dir cannot be empty".to_string(),
        ));
    }

    if config.image_dir_name.is_empty()
        || config.image_dir_name.contains('/')
        || config.image_dir_name.contains('\\')
        || config.image_dir_name == ".."
    {
        return Err(ConfigError::Validation(format!(
            "image-dir-name must be a single directory name, got '{}'",
            config.image_dir_name
        )));
    }

    Ok(())
}

/// Validates the politeness delay
fn validate_execution_config(config: &ExecutionConfig) -> Result<(), ConfigError> {
    if !(0.0..=60.0).contains(&config.request_delay) {
        return Err(ConfigError::Validation(format!(
            "request-delay must be between 0 and 60 seconds, got {}",
            config.request_delay
        )));
    }

    Ok(())
}

/// Validates the retry policy
fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if !(config.backoff_factor >= 1.0) {
        return Err(ConfigError::Validation(format!(
            "backoff-factor must be >= 1, got {}",
            config.backoff_factor
        )));
    }

    if !(config.initial_delay >= 0.0) {
        return Err(ConfigError::Validation(format!(
            "initial-delay must be >= 0, got {}",
            config.initial_delay
        )));
    }

    validate_seconds("initial-delay", config.initial_delay)?;
    validate_seconds("max-delay", config.max_delay)?;

    if !(config.max_delay >= config.initial_delay) {
        return Err(ConfigError::Validation(format!(
            "max-delay ({}) must be >= initial-delay ({})",
            config.max_delay, config.initial_delay
        )));
    }

    if config.skip_after_failures < 1 {
        return Err(ConfigError::Validation(
            "skip-after-failures must be >= 1".to_string(),
        ));
    }

    if let Some(code) = config
        .retryable_status_codes
        .iter()
        .find(|code| !(100..=599).contains(*code))
    {
        return Err(ConfigError::Validation(format!(
            "retryable-status-codes contains invalid HTTP status {}",
            code
        )));
    }

    Ok(())
}

/// Validates checkpoint configuration
fn validate_recovery_config(config: &RecoveryConfig) -> Result<(), ConfigError> {
    if config.save_interval < 1 {
        return Err(ConfigError::Validation(
            "save-interval must be >= 1".to_string(),
        ));
    }

    if config.recovery_file.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "recovery-file cannot be empty".to_string(),
        ));
    }

    Ok(())
}
