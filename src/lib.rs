//! Umbra: a depth-bounded anonymous web crawler
//!
//! This crate crawls a site from a seed URL up to a configured depth, routing
//! every request through a Tor SOCKS proxy, classifying what it fetches into
//! text pages and media assets, and remembering visited URLs across runs.

pub mod config;
pub mod crawler;
pub mod history;
pub mod output;
pub mod state;
pub mod tor;
pub mod transform;
pub mod url;

use thiserror::Error;

/// Main error type for Umbra operations
///
/// Everything surfaced through this type is fatal for a crawl. Per-URL fetch
/// failures never end up here; they are counted in the crawl report instead.
#[derive(Debug, Error)]
pub enum UmbraError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Tor proxy unavailable at {endpoint}: {reason}")]
    ProxyUnavailable { endpoint: String, reason: String },

    #[error("History error: {0}")]
    History(#[from] history::HistoryError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for Umbra operations
pub type Result<T> = std::result::Result<T, UmbraError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlReport, Coordinator};
pub use output::SiteContent;
pub use state::UnitState;
pub use url::normalize_url;
