use crate::config::types::{
    Config, CrawlerConfig, FetchConfig, HistoryConfig, OutputConfig, TorConfig,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_tor_config(&config.tor)?;
    validate_fetch_config(&config.fetch)?;
    validate_history_config(&config.history)?;
    validate_output_config(&config.output)?;
    Ok(())
}

fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    let seed = config
        .seed_url
        .as_deref()
        .ok_or_else(|| ConfigError::Validation("seed-url is required".to_string()))?;

    let url = Url::parse(seed)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "Seed URL '{}' must use http or https",
            seed
        )));
    }

    if config.max_concurrent_fetches < 1 || config.max_concurrent_fetches > 64 {
        return Err(ConfigError::Validation(format!(
            "max-concurrent-fetches must be between 1 and 64, got {}",
            config.max_concurrent_fetches
        )));
    }

    if config.max_pages == Some(0) {
        return Err(ConfigError::Validation(
            "max-pages must be >= 1 when set".to_string(),
        ));
    }

    Ok(())
}

fn validate_tor_config(config: &TorConfig) -> Result<(), ConfigError> {
    if config.socks_host.is_empty() || config.control_host.is_empty() {
        return Err(ConfigError::Validation(
            "Tor socks-host and control-host cannot be empty".to_string(),
        ));
    }

    if config.socks_port == 0 || config.control_port == 0 {
        return Err(ConfigError::Validation(format!(
            "Tor ports must be non-zero, got socks-port {} and control-port {}",
            config.socks_port, config.control_port
        )));
    }

    if let Some(verify_url) = &config.verify_url {
        Url::parse(verify_url).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid verify-url '{}': {}", verify_url, e))
        })?;
    }

    Ok(())
}

fn validate_fetch_config(config: &FetchConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max-attempts must be >= 1, got {}",
            config.max_attempts
        )));
    }

    if config.request_timeout_secs < 1 || config.connect_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeouts must be >= 1s, got request {}s and connect {}s",
            config.request_timeout_secs, config.connect_timeout_secs
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.max_body_bytes == 0 {
        return Err(ConfigError::Validation(
            "max-body-bytes must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_history_config(config: &HistoryConfig) -> Result<(), ConfigError> {
    if config.path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "history path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.path.trim().is_empty() {
        return Err(ConfigError::Validation(
            "output path cannot be empty".to_string(),
        ));
    }
    Ok(())
}
