use serde::{Deserialize, Serialize};

/// Main configuration structure for Umbra
///
/// Every section is optional in the TOML file; missing values fall back to
/// the defaults below.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub tor: TorConfig,
    pub fetch: FetchConfig,
    pub classifier: ClassifierConfig,
    pub history: HistoryConfig,
    pub output: OutputConfig,
    pub transforms: TransformConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// URL the crawl starts from (depth 0)
    pub seed_url: Option<String>,

    /// Maximum depth to crawl from the seed URL
    pub max_depth: u32,

    /// Maximum number of fetches in flight at once
    pub max_concurrent_fetches: u32,

    /// Delay before each request (milliseconds)
    pub request_delay_ms: u64,

    /// Only follow page links on the seed's host
    pub same_host_only: bool,

    /// Stop dispatching after this many fetches
    pub max_pages: Option<u64>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            seed_url: None,
            max_depth: 2,
            max_concurrent_fetches: 4,
            request_delay_ms: 1000,
            same_host_only: true,
            max_pages: None,
        }
    }
}

/// Tor proxy and control-port configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct TorConfig {
    pub socks_host: String,
    pub socks_port: u16,
    pub control_host: String,
    pub control_port: u16,

    /// Password for `HashedControlPassword` authentication
    pub control_password: Option<String>,

    /// Path to Tor's control auth cookie, used when no password is set
    pub cookie_path: Option<String>,

    /// Page fetched through the proxy at startup to confirm Tor routing
    pub verify_url: Option<String>,
}

impl Default for TorConfig {
    fn default() -> Self {
        Self {
            socks_host: "127.0.0.1".to_string(),
            socks_port: 9050,
            control_host: "127.0.0.1".to_string(),
            control_port: 9051,
            control_password: None,
            cookie_path: None,
            verify_url: None,
        }
    }
}

impl TorConfig {
    /// Proxy URL handed to the HTTP client; `socks5h` resolves DNS through Tor
    pub fn proxy_url(&self) -> String {
        format!("socks5h://{}:{}", self.socks_host, self.socks_port)
    }

    pub fn socks_endpoint(&self) -> String {
        format!("{}:{}", self.socks_host, self.socks_port)
    }

    pub fn control_endpoint(&self) -> String {
        format!("{}:{}", self.control_host, self.control_port)
    }
}

/// Fetch retry and timeout configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FetchConfig {
    /// Total attempts per URL, including the first
    pub max_attempts: u32,

    /// Base backoff between attempts (milliseconds), multiplied by the attempt number
    pub retry_backoff_ms: u64,

    /// Consecutive failures, across URLs, that force a circuit rotation
    pub rotate_after_failures: u32,

    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub user_agent: String,

    /// Responses larger than this (bytes) fail without being buffered
    pub max_body_bytes: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_backoff_ms: 2000,
            rotate_after_failures: 5,
            request_timeout_secs: 30,
            connect_timeout_secs: 10,
            // Tor Browser's UA keeps requests indistinguishable from it
            user_agent: "Mozilla/5.0 (Windows NT 10.0; rv:128.0) Gecko/20100101 Firefox/128.0"
                .to_string(),
            max_body_bytes: 64 * 1024 * 1024,
        }
    }
}

/// Content classification configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ClassifierConfig {
    /// Media smaller than this (bytes) is ignored
    pub min_media_size: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            min_media_size: 100 * 1024,
        }
    }
}

/// History store backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryBackend {
    /// Append-only text file, one URL per line
    #[default]
    File,
    /// SQLite database
    Sqlite,
}

/// History store configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct HistoryConfig {
    pub backend: HistoryBackend,
    pub path: String,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            backend: HistoryBackend::File,
            path: ".scrape_history".to_string(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Path of the JSON document with the crawled site content
    pub path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: "output.json".to_string(),
        }
    }
}

/// Which text simplifier to construct
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SimplifierKind {
    #[default]
    None,
    Compact,
}

/// Which media describer to construct
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DescriberKind {
    #[default]
    None,
    Metadata,
}

/// Post-processing transform configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct TransformConfig {
    pub simplify: SimplifierKind,
    pub describe: DescriberKind,

    /// Character cap applied by the compact simplifier
    pub max_text_chars: Option<usize>,
}
