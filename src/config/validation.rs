use crate::config::types::{
    BrowserConfig, Config, CrawlerConfig, FetchConfig, IdentityConfig, OutputConfig, SiteConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_crawler_config(&config.crawler)?;
    validate_fetch_config(&config.fetch)?;
    validate_browser_config(&config.browser)?;
    validate_identity_config(&config.identity)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates the target site configuration
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid base-url '{}': {}", config.base_url, e))
    })?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url '{}' must use http or https",
            config.base_url
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "base-url '{}' has no host",
            config.base_url
        )));
    }

    if config.listing_marker.trim().is_empty() {
        return Err(ConfigError::Validation(
            "listing-marker cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates pagination and batching configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max-pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if config.chunk_size < 1 || config.chunk_size > 64 {
        return Err(ConfigError::Validation(format!(
            "chunk-size must be between 1 and 64, got {}",
            config.chunk_size
        )));
    }

    Ok(())
}

/// Validates HTTP retry configuration
fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.max_retries < 1 {
        return Err(ConfigError::Validation(format!(
            "max-retries must be >= 1, got {}",
            config.max_retries
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "request-timeout-secs must be >= 1, got {}",
            config.request_timeout_secs
        )));
    }

    Ok(())
}

/// Validates browser configuration
fn validate_browser_config(config: &BrowserConfig) -> Result<(), ConfigError> {
    if config.viewport_width == 0 || config.viewport_height == 0 {
        return Err(ConfigError::Validation(format!(
            "viewport must be non-zero, got {}x{}",
            config.viewport_width, config.viewport_height
        )));
    }

    if config.load_timeout_ms == 0 || config.reveal_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "load-timeout-ms and reveal-timeout-ms must be > 0".to_string(),
        ));
    }

    if let Some(path) = &config.chrome_path {
        if path.trim().is_empty() {
            return Err(ConfigError::Validation(
                "chrome-path cannot be empty when set".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates the user agent pool override
fn validate_identity_config(config: &IdentityConfig) -> Result<(), ConfigError> {
    if let Some(agents) = &config.user_agents {
        if agents.is_empty() {
            return Err(ConfigError::Validation(
                "user-agents cannot be an empty list".to_string(),
            ));
        }

        if agents.iter().any(|agent| agent.trim().is_empty()) {
            return Err(ConfigError::Validation(
                "user-agents cannot contain empty strings".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.path.is_empty() {
        return Err(ConfigError::Validation(
            "output path cannot be empty".to_string(),
        ));
    }

    Ok(())
}
