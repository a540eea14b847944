//! Configuration module for Umbra
//!
//! This module handles loading, parsing, and validating TOML configuration files,
//! and layering command-line overrides on top of them.
//!
//! # Example
//!
//! ```no_run
//! use umbra_crawler::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("umbra.toml")).unwrap();
//! println!("Crawler will use max depth: {}", config.crawler.max_depth);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{
    ClassifierConfig, Config, CrawlerConfig, DescriberKind, FetchConfig, HistoryBackend,
    HistoryConfig, OutputConfig, SimplifierKind, TorConfig, TransformConfig,
};

pub use parser::{compute_config_hash, load_config, parse_config};
pub use validation::validate;

/// Values given on the command line that take precedence over the file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub seed_url: Option<String>,
    pub max_depth: Option<u32>,
    pub output_path: Option<String>,
    pub history_path: Option<String>,
}

impl ConfigOverrides {
    /// Writes every present override into `config`
    pub fn apply(self, config: &mut Config) {
        if let Some(seed_url) = self.seed_url {
            config.crawler.seed_url = Some(seed_url);
        }
        if let Some(max_depth) = self.max_depth {
            config.crawler.max_depth = max_depth;
        }
        if let Some(path) = self.output_path {
            config.output.path = path;
        }
        if let Some(path) = self.history_path {
            config.history.path = path;
        }
    }
}
