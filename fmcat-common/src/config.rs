//! Configuration loading and config-file resolution
//!
//! Config file priority order:
//! 1. Command-line argument (highest priority)
//! 2. `FMCAT_CONFIG` environment variable
//! 3. Platform config directory (`<config_dir>/fmcat/config.toml`)
//! 4. Compiled defaults (fallback)
//!
//! A missing config file is never fatal: a warning is logged and the
//! compiled defaults are used.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "FMCAT_CONFIG";

/// Top-level TOML configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// SQLite database holding libraries and session state
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub fuzzy: FuzzyConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    /// External code-generation providers (order is irrelevant, priority decides)
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
}

/// Logging section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Fuzzy-match thresholds, expressed as distances (0 = identical, 1 = unrelated)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FuzzyConfig {
    /// New taxonomy values closer than this to an existing entry raise a conflict
    #[serde(default = "default_taxonomy_threshold")]
    pub taxonomy_threshold: f64,

    /// Lexicon fuzzy matches closer than this are accepted
    #[serde(default = "default_lexicon_threshold")]
    pub lexicon_threshold: f64,
}

impl Default for FuzzyConfig {
    fn default() -> Self {
        Self {
            taxonomy_threshold: default_taxonomy_threshold(),
            lexicon_threshold: default_lexicon_threshold(),
        }
    }
}

fn default_taxonomy_threshold() -> f64 {
    0.4
}

fn default_lexicon_threshold() -> f64 {
    0.7
}

/// Provider retry/backoff settings
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1_000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

/// One external text-generation provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Display name used in logs
    pub name: String,
    /// Stable identifier used for health tracking and telemetry
    pub id: String,
    /// Model name sent in the request body
    pub model: String,
    /// Chat-completion endpoint URL
    pub endpoint: String,
    /// Literal API key (lowest priority)
    #[serde(default)]
    pub api_key: Option<String>,
    /// Environment variable holding the API key (checked first)
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,
    /// Lower value is tried first
    #[serde(default)]
    pub priority: u32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

fn default_requests_per_minute() -> u32 {
    30
}

fn default_max_tokens() -> u32 {
    16
}

impl ProviderConfig {
    /// Resolve the API key: environment variable, then TOML value
    ///
    /// Blank values are ignored at every tier.
    pub fn resolve_api_key(&self) -> Option<String> {
        let env_key = self
            .api_key_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok())
            .filter(|key| is_valid_key(key));

        if let (Some(_), Some(toml_key)) = (&env_key, &self.api_key) {
            if is_valid_key(toml_key) {
                warn!(
                    provider = %self.id,
                    "API key found in both environment and TOML. Using environment."
                );
            }
        }

        env_key.or_else(|| self.api_key.clone().filter(|key| is_valid_key(key)))
    }
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Resolve which config file to read, if any
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Platform config directory
    dirs::config_dir()
        .map(|d| d.join("fmcat").join("config.toml"))
        .filter(|p| p.exists())
}

/// Parse a config file
pub fn load_config(path: &Path) -> Result<CatalogConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Load config with graceful degradation to compiled defaults
///
/// A file that exists but fails to parse is still an error.
pub fn load_or_default(cli_arg: Option<&Path>) -> Result<CatalogConfig> {
    match resolve_config_path(cli_arg) {
        Some(path) if path.exists() => {
            info!("Loading configuration from {}", path.display());
            load_config(&path)
        }
        Some(path) => {
            warn!(
                "Config file {} not found, using compiled defaults",
                path.display()
            );
            Ok(CatalogConfig::default())
        }
        None => {
            info!("No config file found, using compiled defaults");
            Ok(CatalogConfig::default())
        }
    }
}

impl CatalogConfig {
    /// Database path from config, or the OS-dependent default
    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(default_database_path)
    }
}

/// Get OS-dependent default database path
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("fmcat").join("fmcat.db"))
        .unwrap_or_else(|| PathBuf::from("./fmcat_data/fmcat.db"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    fn provider(api_key: Option<&str>, api_key_env: Option<&str>) -> ProviderConfig {
        ProviderConfig {
            name: "Test".to_string(),
            id: "test".to_string(),
            model: "m".to_string(),
            endpoint: "http://localhost".to_string(),
            api_key: api_key.map(str::to_string),
            api_key_env: api_key_env.map(str::to_string),
            requests_per_minute: 30,
            priority: 0,
            max_tokens: 16,
        }
    }

    #[test]
    fn test_defaults() {
        let config = CatalogConfig::default();
        assert_eq!(config.fuzzy.taxonomy_threshold, 0.4);
        assert_eq!(config.fuzzy.lexicon_threshold, 0.7);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.base_delay_ms, 1_000);
        assert_eq!(config.retry.max_delay_ms, 30_000);
        assert_eq!(config.logging.level, "info");
        assert!(config.providers.is_empty());
    }

    #[test]
    fn test_load_config_with_providers() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
database_path = "/tmp/fmcat-test.db"

[fuzzy]
taxonomy_threshold = 0.3

[[providers]]
name = "Primary"
id = "primary"
model = "small-model"
endpoint = "https://example.invalid/v1/chat/completions"
api_key = "abc"
requests_per_minute = 20
priority = 1
"#
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.database_path(), PathBuf::from("/tmp/fmcat-test.db"));
        assert_eq!(config.fuzzy.taxonomy_threshold, 0.3);
        // Unset field falls back to its default
        assert_eq!(config.fuzzy.lexicon_threshold, 0.7);
        assert_eq!(config.providers.len(), 1);
        assert_eq!(config.providers[0].requests_per_minute, 20);
        assert_eq!(config.providers[0].max_tokens, 16);
    }

    #[test]
    fn test_load_config_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "this is = = not toml").unwrap();
        assert!(matches!(load_config(file.path()), Err(Error::Config(_))));
    }

    #[test]
    #[serial]
    fn test_missing_cli_file_uses_defaults() {
        std::env::remove_var(CONFIG_ENV_VAR);
        let config = load_or_default(Some(Path::new("/nonexistent/fmcat.toml"))).unwrap();
        assert!(config.providers.is_empty());
    }

    #[test]
    #[serial]
    fn test_env_var_config_path() {
        std::env::set_var(CONFIG_ENV_VAR, "/some/where/config.toml");
        let path = resolve_config_path(None);
        std::env::remove_var(CONFIG_ENV_VAR);
        assert_eq!(path, Some(PathBuf::from("/some/where/config.toml")));
    }

    #[test]
    #[serial]
    fn test_api_key_env_takes_priority() {
        std::env::set_var("FMCAT_TEST_PROVIDER_KEY", "from-env");
        let key = provider(Some("from-toml"), Some("FMCAT_TEST_PROVIDER_KEY")).resolve_api_key();
        std::env::remove_var("FMCAT_TEST_PROVIDER_KEY");
        assert_eq!(key.as_deref(), Some("from-env"));
    }

    #[test]
    #[serial]
    fn test_api_key_blank_values_ignored() {
        std::env::set_var("FMCAT_TEST_BLANK_KEY", "   ");
        let key = provider(Some(""), Some("FMCAT_TEST_BLANK_KEY")).resolve_api_key();
        std::env::remove_var("FMCAT_TEST_BLANK_KEY");
        assert_eq!(key, None);

        let key = provider(Some("toml-only"), None).resolve_api_key();
        assert_eq!(key.as_deref(), Some("toml-only"));
    }
}
