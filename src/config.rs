use anyhow::{Context, Result};
use serde::Deserialize;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub kgflat: KgflatConfig,
    #[serde(default)]
    pub pubmed: PubMedConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub http_server: HttpServerConfig,
}

/// KGFlat-specific configuration
#[derive(Debug, Clone, Deserialize)]
pub struct KgflatConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Default environment tag recorded in flatten metadata (test, CI, dev, prod).
    #[serde(default = "default_environment")]
    pub environment: String,
}

/// PubMed E-utilities client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PubMedConfig {
    #[serde(default = "default_pubmed_base_url")]
    pub base_url: String,
    /// Environment variable holding an optional NCBI API key.
    /// Without a key NCBI allows a lower request rate; that is still valid.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    /// Identifiers per EFetch request.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Minimum delay between requests, shared across all in-flight lookups.
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

/// Path analysis configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PathsConfig {
    /// Cap on total discovered paths; analyses hitting it are marked truncated.
    #[serde(default = "default_max_paths")]
    pub max_paths: usize,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpServerConfig {
    #[serde(default = "default_http_enabled")]
    pub enabled: bool,
    #[serde(default = "default_http_port")]
    pub port: u16,
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_environment() -> String {
    "test".to_string()
}

fn default_pubmed_base_url() -> String {
    "https://eutils.ncbi.nlm.nih.gov/entrez/eutils".to_string()
}

fn default_api_key_env() -> String {
    "PUBMED_API_KEY".to_string()
}

fn default_batch_size() -> usize {
    5
}

fn default_min_interval_ms() -> u64 {
    350
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> usize {
    3
}

fn default_cache_capacity() -> usize {
    1000
}

fn default_max_paths() -> usize {
    10_000
}

fn default_http_enabled() -> bool {
    false
}

fn default_http_port() -> u16 {
    8080
}

fn default_allowed_origins() -> Vec<String> {
    // Default empty — set allowed_origins in config.toml for production
    vec![]
}

impl Default for KgflatConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            environment: default_environment(),
        }
    }
}

impl Default for PubMedConfig {
    fn default() -> Self {
        Self {
            base_url: default_pubmed_base_url(),
            api_key_env: default_api_key_env(),
            batch_size: default_batch_size(),
            min_interval_ms: default_min_interval_ms(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            max_paths: default_max_paths(),
        }
    }
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            enabled: default_http_enabled(),
            port: default_http_port(),
            allowed_origins: default_allowed_origins(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            kgflat: KgflatConfig::default(),
            pubmed: PubMedConfig::default(),
            paths: PathsConfig::default(),
            http_server: HttpServerConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in KGFLAT_CONFIG environment variable
    /// 2. ./config.toml in current directory
    ///
    /// Every setting has a default, so a missing config file is not an error:
    /// the defaults are used and a warning is logged.
    pub fn load() -> Result<Self> {
        // Load .env file if it exists (ignore errors - file is optional)
        let _ = dotenv::dotenv();

        let config_path = std::env::var("KGFLAT_CONFIG")
            .unwrap_or_else(|_| "config.toml".to_string());

        let config = match std::fs::read_to_string(&config_path) {
            Ok(config_str) => toml::from_str::<Config>(&config_str)
                .with_context(|| format!("Failed to parse {}", config_path))?,
            Err(_) => {
                log::warn!(
                    "Config file {} not found, using defaults. Set KGFLAT_CONFIG or create config.toml to override.",
                    config_path
                );
                Config::default()
            }
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.pubmed.batch_size == 0 || self.pubmed.batch_size > 200 {
            anyhow::bail!("pubmed.batch_size must be between 1 and 200");
        }

        if self.pubmed.timeout_secs == 0 {
            anyhow::bail!("pubmed.timeout_secs must be greater than 0");
        }

        if self.paths.max_paths == 0 {
            anyhow::bail!("paths.max_paths must be greater than 0");
        }

        if self.pubmed.base_url.is_empty() {
            anyhow::bail!("pubmed.base_url must not be empty");
        }

        Ok(())
    }

    /// Optional NCBI API key resolved from the configured environment variable.
    pub fn pubmed_api_key(&self) -> Option<String> {
        std::env::var(&self.pubmed.api_key_env).ok()
    }
}
