use crate::config::types::{Config, CrawlerConfig, FetchConfig, OutputConfig};
use crate::ConfigError;
use scraper::Selector;

/// Largest accepted retry delay or jitter, in seconds
const MAX_DELAY_SECONDS: f64 = 3600.0;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_fetch_config(&config.fetch)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_concurrent_seeds < 1 || config.max_concurrent_seeds > 64 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent_seeds must be between 1 and 64, got {}",
            config.max_concurrent_seeds
        )));
    }

    if config.max_pages == Some(0) {
        return Err(ConfigError::Validation(
            "max_pages must be >= 1 when set".to_string(),
        ));
    }

    if let Some(selector) = &config.custom_next_selector {
        validate_selector(selector)?;
    }

    Ok(())
}

/// Validates fetch configuration
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    validate_seconds("base_retry_delay", config.base_retry_delay)?;
    validate_seconds("retry_jitter", config.retry_jitter)?;

    if config.fetch_timeout < 1 {
        return Err(ConfigError::Validation(
            "fetch_timeout must be >= 1 second".to_string(),
        ));
    }

    if config.user_agents.iter().any(|ua| ua.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "user_agents cannot contain empty entries".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.directory.trim().is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    if matches!(&config.log_file, Some(path) if path.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "log_file cannot be empty when set".to_string(),
        ));
    }

    Ok(())
}

/// Parses a CSS selector once so a bad one fails before any fetch
fn validate_selector(selector: &str) -> Result<(), ConfigError> {
    if selector.trim().is_empty() {
        return Err(ConfigError::Validation(
            "custom_next_selector cannot be empty when set".to_string(),
        ));
    }

    Selector::parse(selector)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidSelector {
            selector: selector.to_string(),
            message: format!("{:?}", e),
        })
}

fn validate_seconds(name: &str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || !(0.0..=MAX_DELAY_SECONDS).contains(&value) {
        return Err(ConfigError::Validation(format!(
            "{} must be between 0 and {} seconds, got {}",
            name, MAX_DELAY_SECONDS, value
        )));
    }
    Ok(())
}
