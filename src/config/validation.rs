use crate::config::types::{Config, CrawlSettings, FetchSettings, OutputSettings};
use crate::ConfigError;
use url::Url;

/// Dataset formats the exporter understands
pub const OUTPUT_FORMATS: &[&str] = &["parquet", "csv", "jsonl"];

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawl_settings(&config.crawl)?;
    validate_fetch_settings(&config.fetch)?;
    validate_output_settings(&config.output)?;
    Ok(())
}

fn validate_crawl_settings(settings: &CrawlSettings) -> Result<(), ConfigError> {
    validate_start_url(&settings.start_url)?;

    if !(1..=20).contains(&settings.max_depth) {
        return Err(ConfigError::Validation(format!(
            "max-depth must be between 1 and 20, got {}",
            settings.max_depth
        )));
    }

    if !(1..=10_000).contains(&settings.page_limit) {
        return Err(ConfigError::Validation(format!(
            "page-limit must be between 1 and 10000, got {}",
            settings.page_limit
        )));
    }

    if settings
        .allowed_domains
        .iter()
        .any(|d| d.trim().is_empty() || d.contains('/'))
    {
        return Err(ConfigError::Validation(
            "allowed-domains entries must be bare hosts (optionally with a port)".to_string(),
        ));
    }

    Ok(())
}

fn validate_start_url(start_url: &str) -> Result<(), ConfigError> {
    let url = Url::parse(start_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid start-url '{}': {}", start_url, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "start-url scheme must be http or https, got '{}'",
            url.scheme()
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(ConfigError::InvalidUrl(
            "start-url must have a valid domain".to_string(),
        ));
    }

    Ok(())
}

fn validate_fetch_settings(settings: &FetchSettings) -> Result<(), ConfigError> {
    if !settings.rate_limit.is_finite() || settings.rate_limit <= 0.0 {
        return Err(ConfigError::Validation(format!(
            "rate-limit must be a positive number of seconds, got {}",
            settings.rate_limit
        )));
    }

    if !(5..=120).contains(&settings.request_timeout) {
        return Err(ConfigError::Validation(format!(
            "request-timeout must be between 5 and 120 seconds, got {}",
            settings.request_timeout
        )));
    }

    if settings.max_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "max-retries must be between 0 and 10, got {}",
            settings.max_retries
        )));
    }

    if settings.user_agents.iter().all(|ua| ua.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "user-agents must contain at least one non-empty entry".to_string(),
        ));
    }

    if settings.bot_user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "bot-user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_output_settings(settings: &OutputSettings) -> Result<(), ConfigError> {
    if settings.output_dir.trim().is_empty() {
        return Err(ConfigError::Validation(
            "output-dir cannot be empty".to_string(),
        ));
    }

    if !OUTPUT_FORMATS.contains(&settings.output_format.as_str()) {
        return Err(ConfigError::Validation(format!(
            "output-format must be parquet|csv|jsonl, got '{}'",
            settings.output_format
        )));
    }

    Ok(())
}
