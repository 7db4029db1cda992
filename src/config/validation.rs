use crate::config::types::{Config, ExtractionConfig, OutputConfig, ProxyConfig, ScraperConfig};
use crate::session::TemplateProxyProvider;
use crate::ConfigError;

/// Validates the entire configuration
///
/// Input URLs are not checked here; invalid entries are dropped when the
/// work list is built.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_scraper_config(&config.scraper)?;
    validate_proxy_config(&config.proxy)?;
    validate_extraction_config(&config.extraction)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates scraper configuration
fn validate_scraper_config(config: &ScraperConfig) -> Result<(), ConfigError> {
    if config.concurrency < 1 || config.concurrency > 100 {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and 100, got {}",
            config.concurrency
        )));
    }

    if config.session_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "session_pages must be >= 1, got {}",
            config.session_pages
        )));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout_secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    if config.resolve_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "resolve_timeout_secs must be >= 1, got {}",
            config.resolve_timeout_secs
        )));
    }

    if config.delay_ms_min > config.delay_ms_max {
        return Err(ConfigError::Validation(format!(
            "delay_ms_min ({}) must not exceed delay_ms_max ({})",
            config.delay_ms_min, config.delay_ms_max
        )));
    }

    Ok(())
}

/// Validates the proxy template by rendering it once
fn validate_proxy_config(config: &ProxyConfig) -> Result<(), ConfigError> {
    match config.url_template.as_deref().map(str::trim) {
        Some(template) if !template.is_empty() => TemplateProxyProvider::new(template)
            .map(|_| ())
            .map_err(|e| ConfigError::Validation(format!("proxy url_template: {}", e))),
        _ => Ok(()),
    }
}

/// Validates entity selection configuration
fn validate_extraction_config(config: &ExtractionConfig) -> Result<(), ConfigError> {
    if config.target_types.is_empty() {
        return Err(ConfigError::Validation(
            "target_types cannot be empty".to_string(),
        ));
    }

    if let Some(blank) = config.target_types.iter().find(|t| t.trim().is_empty()) {
        return Err(ConfigError::Validation(format!(
            "target_types contains a blank entry: {:?}",
            blank
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    let paths = [
        ("database_path", &config.database_path),
        ("jsonl_path", &config.jsonl_path),
    ];

    for (name, path) in paths {
        if path.as_ref().is_some_and(|p| p.as_os_str().is_empty()) {
            return Err(ConfigError::Validation(format!(
                "{} cannot be empty",
                name
            )));
        }
    }

    Ok(())
}
