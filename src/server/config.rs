//! Configuration loading for munind.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. `--config <path>` (CLI flag)
//! 2. `~/.munin/config.toml` (user)
//! 3. `/etc/munin/config.toml` (system)
//!
//! An explicit path must exist. When neither implicit file exists the
//! built-in defaults are used. The model server bearer token is read from
//! `MUNIN_MODEL_TOKEN` rather than the config file.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::CacheConfig;
use crate::pipeline::{PipelineConfig, PipelineVariant};
use crate::providers::RetryConfig;
use crate::providers::tgi::DEFAULT_BASE_URL;
use crate::service::DEFAULT_MAX_TOPIC_CHARS;
use crate::{MuninError, Result};

/// Environment variable holding the model server bearer token.
pub const MODEL_TOKEN_ENV: &str = "MUNIN_MODEL_TOKEN";

/// Daemon configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub cache: CacheSection,
    #[serde(default)]
    pub pipeline: PipelineSection,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to bind to (default: 127.0.0.1:3000).
    #[serde(default = "default_address")]
    pub address: String,
    /// Longest accepted topic in characters (default: 200).
    #[serde(default = "default_max_topic_chars")]
    pub max_topic_chars: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            max_topic_chars: default_max_topic_chars(),
        }
    }
}

fn default_address() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_max_topic_chars() -> usize {
    DEFAULT_MAX_TOPIC_CHARS
}

/// Text-generation server connection.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request HTTP timeout in seconds (default: 60).
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Start loading the model at startup instead of on first request.
    #[serde(default = "default_true")]
    pub preload: bool,
    /// Issue a short generation after loading.
    #[serde(default = "default_true")]
    pub warmup: bool,
    #[serde(default)]
    pub retry: RetrySection,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_secs: default_request_timeout(),
            preload: true,
            warmup: true,
            retry: RetrySection::default(),
        }
    }
}

impl ModelConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_request_timeout() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

/// Retry settings for generation calls.
#[derive(Debug, Clone, Deserialize)]
pub struct RetrySection {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter: true,
        }
    }
}

fn default_max_attempts() -> u32 {
    2
}

fn default_initial_delay_ms() -> u64 {
    250
}

fn default_max_delay_ms() -> u64 {
    5_000
}

impl From<&RetrySection> for RetryConfig {
    fn from(section: &RetrySection) -> Self {
        RetryConfig::new()
            .max_attempts(section.max_attempts)
            .initial_delay(Duration::from_millis(section.initial_delay_ms))
            .max_delay(Duration::from_millis(section.max_delay_ms))
            .jitter(section.jitter)
    }
}

/// Result cache settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSection {
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
    /// Entry lifetime in seconds. Entries never expire when unset.
    #[serde(default)]
    pub ttl_secs: Option<u64>,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            ttl_secs: None,
        }
    }
}

fn default_max_entries() -> usize {
    CacheConfig::default().max_entries
}

impl From<&CacheSection> for CacheConfig {
    fn from(section: &CacheSection) -> Self {
        let config = CacheConfig::new().max_entries(section.max_entries);
        match section.ttl_secs {
            Some(secs) => config.ttl(Duration::from_secs(secs)),
            None => config,
        }
    }
}

/// Synthesis pipeline settings.
///
/// Unset fields keep the values of the selected variant's preset.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PipelineSection {
    #[serde(default)]
    pub variant: PipelineVariant,
    pub max_gap_fill: Option<usize>,
    pub gap_fill_batch: Option<usize>,
    pub generation_timeout_secs: Option<u64>,
    pub structured_templates: Option<Vec<String>>,
    pub single_starters: Option<Vec<String>>,
    pub fallback_statements: Option<Vec<String>>,
}

impl PipelineSection {
    /// Build and validate the pipeline configuration.
    pub fn to_pipeline_config(&self) -> Result<PipelineConfig> {
        let mut config = PipelineConfig::for_variant(self.variant);
        if let Some(n) = self.max_gap_fill {
            config = config.max_gap_fill(n);
        }
        if let Some(n) = self.gap_fill_batch {
            config = config.gap_fill_batch(n);
        }
        if let Some(secs) = self.generation_timeout_secs {
            config = config.generation_timeout(Duration::from_secs(secs));
        }
        if let Some(ref templates) = self.structured_templates {
            config = config.structured_templates(templates.clone());
        }
        if let Some(ref starters) = self.single_starters {
            config = config.single_starters(starters.clone());
        }
        if let Some(ref statements) = self.fallback_statements {
            config = config.fallback_statements(statements.clone());
        }
        config.validate()?;
        Ok(config)
    }
}

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// Resolution order:
    /// 1. Explicit path (if provided)
    /// 2. `~/.munin/config.toml`
    /// 3. `/etc/munin/config.toml`
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::load_from_file(&path),
            None => Ok(Config::default()),
        }
    }

    /// Parse a config file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            MuninError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            MuninError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }

    /// Resolve the config file path, if any.
    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(MuninError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        // User config
        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".munin").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        // System config
        let system_config = PathBuf::from("/etc/munin/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }

    /// Bearer token for the model server, if set in the environment.
    pub fn model_token() -> Option<String> {
        std::env::var(MODEL_TOKEN_ENV)
            .ok()
            .filter(|token| !token.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = Config::default();
        assert_eq!(config.server.address, "127.0.0.1:3000");
        assert_eq!(config.server.max_topic_chars, 200);
        assert_eq!(config.model.base_url, DEFAULT_BASE_URL);
        assert!(config.model.preload);
        assert_eq!(config.cache.max_entries, 100);
        assert_eq!(config.cache.ttl_secs, None);
        assert_eq!(config.pipeline.variant, PipelineVariant::Benefits);
    }

    #[test]
    fn parse_minimal_config() {
        let toml = r#"
            [server]
            address = "0.0.0.0:3000"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.address, "0.0.0.0:3000");
        // Defaults preserved
        assert_eq!(config.server.max_topic_chars, 200);
        assert_eq!(config.model.retry.max_attempts, 2);
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
            [server]
            address = "127.0.0.1:8000"
            max_topic_chars = 80

            [model]
            base_url = "http://gpu-box:8080/"
            request_timeout_secs = 20
            preload = false
            warmup = false

            [model.retry]
            max_attempts = 4
            initial_delay_ms = 100
            max_delay_ms = 1000
            jitter = false

            [cache]
            max_entries = 10
            ttl_secs = 600

            [pipeline]
            variant = "insights"
            max_gap_fill = 2
            gap_fill_batch = 1
            generation_timeout_secs = 12
            fallback_statements = ["{topic} is worth a closer look."]
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.max_topic_chars, 80);
        assert!(!config.model.preload);
        assert_eq!(config.model.request_timeout(), Duration::from_secs(20));

        let retry = RetryConfig::from(&config.model.retry);
        assert_eq!(retry.max_attempts, 4);
        assert_eq!(retry.initial_delay, Duration::from_millis(100));
        assert!(!retry.jitter);

        let cache = CacheConfig::from(&config.cache);
        assert_eq!(cache.max_entries, 10);
        assert_eq!(cache.ttl, Some(Duration::from_secs(600)));

        let pipeline = config.pipeline.to_pipeline_config().unwrap();
        assert_eq!(pipeline.max_gap_fill, 2);
        assert_eq!(pipeline.gap_fill_batch, 1);
        assert_eq!(pipeline.generation_timeout, Duration::from_secs(12));
        assert_eq!(pipeline.fallback_statements.len(), 1);
        assert_eq!(
            pipeline.structured_templates,
            PipelineConfig::insights().structured_templates
        );
    }

    #[test]
    fn unknown_section_is_rejected() {
        let toml = r#"
            [providers]
            openrouter = {}
        "#;
        assert!(toml::from_str::<Config>(toml).is_err());
    }

    #[test]
    fn invalid_pipeline_override_fails_validation() {
        let section = PipelineSection {
            gap_fill_batch: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            section.to_pipeline_config(),
            Err(MuninError::Configuration(_))
        ));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let result = Config::load(Some(Path::new("/nonexistent/munin.toml")));
        assert!(matches!(result, Err(MuninError::Configuration(_))));
    }

    #[test]
    fn explicit_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[cache]\nmax_entries = 7\n").unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.cache.max_entries, 7);
    }
}
