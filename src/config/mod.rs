//! Layered configuration for the retry driver and the directory layer.
//!
//! Sources, lowest precedence first:
//!
//! 1. Built-in defaults
//! 2. A TOML file (`TESSERA_CONFIG_FILE`, else `./tessera.toml`)
//! 3. `TESSERA_*` environment variables
//!
//! ```toml
//! [retry]
//! initial_backoff_ms = 10
//! max_backoff_ms = 1000
//! max_attempts = 20
//!
//! [directory]
//! node_prefix = "fe"
//! content_prefix = ""
//! ```

mod directory;
mod error;
mod retry;

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use snafu::ResultExt;
use tessera_core::Directory;
use tessera_core::TransactionRunner;
use tessera_kv::Database;

pub use directory::DirectoryConfig;
pub use error::ConfigError;
pub use retry::RetryConfig;

/// Environment variable naming an explicit configuration file.
pub const CONFIG_FILE_ENV: &str = "TESSERA_CONFIG_FILE";

/// File consulted when `TESSERA_CONFIG_FILE` is unset.
pub const DEFAULT_CONFIG_FILE: &str = "./tessera.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TesseraConfig {
    pub retry: RetryConfig,
    pub directory: DirectoryConfig,
}

impl TesseraConfig {
    /// Defaults with environment overrides applied.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file. Missing keys take their defaults.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).context(error::ReadFileSnafu { path })?;
        let config: Self = toml::from_str(&contents).context(error::ParseFileSnafu { path })?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults, then the first configuration file found, then environment overrides.
    pub fn load_with_layers() -> Result<Self, ConfigError> {
        let mut config = Self::load_toml_with_fallbacks()?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    fn load_toml_with_fallbacks() -> Result<Self, ConfigError> {
        if let Ok(config_path) = std::env::var(CONFIG_FILE_ENV) {
            let path = Path::new(&config_path);
            if path.exists() {
                tracing::info!(path = %config_path, "loading configuration from {CONFIG_FILE_ENV}");
                return Self::from_toml_file(path);
            }
            tracing::warn!(path = %config_path, "{CONFIG_FILE_ENV} specified but not found");
        }

        let local_config = Path::new(DEFAULT_CONFIG_FILE);
        if local_config.exists() {
            tracing::info!(path = DEFAULT_CONFIG_FILE, "loading configuration");
            return Self::from_toml_file(local_config);
        }

        tracing::info!("no configuration file found, using defaults");
        Ok(Self::default())
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(&|key: &str| std::env::var(key).ok())
    }

    /// Apply `TESSERA_*` overrides read through `lookup`.
    pub fn apply_overrides(&mut self, lookup: &impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        self.retry.apply_overrides(lookup)?;
        self.directory.apply_overrides(lookup)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.retry.validate()?;
        self.directory.validate()?;
        Ok(())
    }

    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = toml::to_string_pretty(self).context(error::SerializeSnafu)?;
        std::fs::write(path, contents).context(error::WriteFileSnafu { path })?;
        tracing::info!(path = %path.display(), "configuration saved");
        Ok(())
    }

    /// Transaction runner over `db` using the configured retry policy.
    pub fn runner<D: Database>(&self, db: Arc<D>) -> TransactionRunner<D> {
        TransactionRunner::with_policy(db, self.retry.policy())
    }

    /// Directory facade over `db` with the configured layout and retry policy.
    pub fn directory<D: Database>(&self, db: Arc<D>) -> Directory<D> {
        Directory::with_layer(self.runner(db), self.directory.layer())
    }
}

pub(crate) fn parse_env<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::invalid(key, raw.as_str(), e.to_string())),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use tessera_constants::directory::DEFAULT_NODE_PREFIX;
    use tessera_constants::retry::DEFAULT_INITIAL_BACKOFF_MS;
    use tessera_constants::retry::DEFAULT_MAX_BACKOFF_MS;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key: &str| vars.get(key).cloned()
    }

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("tessera-config-{}-{name}.toml", std::process::id()))
    }

    #[test]
    fn test_defaults() {
        let config = TesseraConfig::default();
        assert_eq!(config.retry.initial_backoff_ms, DEFAULT_INITIAL_BACKOFF_MS);
        assert_eq!(config.retry.max_backoff_ms, DEFAULT_MAX_BACKOFF_MS);
        assert_eq!(config.retry.max_attempts, None);
        assert_eq!(config.directory.node_prefix, vec![DEFAULT_NODE_PREFIX]);
        assert!(config.directory.content_prefix.is_empty());
        config.validate().unwrap();
    }

    #[test]
    fn test_policy_from_config() {
        let config = RetryConfig {
            initial_backoff_ms: 5,
            max_backoff_ms: 200,
            max_attempts: Some(3),
            timeout_ms: Some(1_500),
        };
        let policy = config.policy();
        assert_eq!(policy.initial_backoff, Duration::from_millis(5));
        assert_eq!(policy.max_backoff, Duration::from_millis(200));
        assert_eq!(policy.max_attempts, Some(3));
        assert_eq!(policy.timeout, Some(Duration::from_millis(1_500)));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = TesseraConfig::default();
        config
            .apply_overrides(&env(&[
                ("TESSERA_RETRY_MAX_BACKOFF_MS", "250"),
                ("TESSERA_RETRY_MAX_ATTEMPTS", " 7 "),
                ("TESSERA_DIRECTORY_NODE_PREFIX", "ff01"),
                ("TESSERA_DIRECTORY_CONTENT_PREFIX", "02"),
            ]))
            .unwrap();

        assert_eq!(config.retry.initial_backoff_ms, DEFAULT_INITIAL_BACKOFF_MS);
        assert_eq!(config.retry.max_backoff_ms, 250);
        assert_eq!(config.retry.max_attempts, Some(7));
        assert_eq!(config.directory.node_prefix, vec![0xFF, 0x01]);
        assert_eq!(config.directory.content_prefix, vec![0x02]);
        config.validate().unwrap();
    }

    #[test]
    fn test_env_override_rejects_garbage() {
        let mut config = TesseraConfig::default();
        let err = config.apply_overrides(&env(&[("TESSERA_RETRY_TIMEOUT_MS", "soon")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "TESSERA_RETRY_TIMEOUT_MS"));

        let err = config.apply_overrides(&env(&[("TESSERA_DIRECTORY_NODE_PREFIX", "zz")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "TESSERA_DIRECTORY_NODE_PREFIX"));
    }

    #[test]
    fn test_backoff_validation() {
        let mut config = TesseraConfig::default();
        config.retry.initial_backoff_ms = 0;
        assert!(config.validate().is_err());

        config.retry.initial_backoff_ms = 100;
        config.retry.max_backoff_ms = 50;
        assert!(config.validate().is_err());

        config.retry.max_backoff_ms = 100;
        config.validate().unwrap();

        config.retry.max_attempts = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_prefix_validation() {
        let mut dir = DirectoryConfig::default();

        dir.node_prefix = Vec::new();
        assert!(dir.validate().is_err());

        // Integer type codes would collide with allocated prefixes.
        dir.node_prefix = vec![0x15];
        assert!(dir.validate().is_err());

        dir.node_prefix = vec![0xFE];
        dir.content_prefix = vec![0xFE, 0x01];
        assert!(dir.validate().is_err());

        dir.content_prefix = vec![0xFE];
        assert!(dir.validate().is_err());

        dir.content_prefix = vec![0x01];
        dir.validate().unwrap();
    }

    #[test]
    fn test_toml_partial_file() {
        let path = temp_path("partial");
        std::fs::write(&path, "[retry]\nmax_backoff_ms = 400\n\n[directory]\ncontent_prefix = \"0a\"\n").unwrap();

        let config = TesseraConfig::from_toml_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.retry.initial_backoff_ms, DEFAULT_INITIAL_BACKOFF_MS);
        assert_eq!(config.retry.max_backoff_ms, 400);
        assert_eq!(config.directory.node_prefix, vec![DEFAULT_NODE_PREFIX]);
        assert_eq!(config.directory.content_prefix, vec![0x0A]);
    }

    #[test]
    fn test_toml_invalid_file() {
        let path = temp_path("invalid");
        std::fs::write(&path, "[retry]\ninitial_backoff_ms = 0\n").unwrap();
        let err = TesseraConfig::from_toml_file(&path).unwrap_err();
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        let missing = temp_path("missing");
        let err = TesseraConfig::from_toml_file(&missing).unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }

    #[test]
    fn test_save_and_reload() {
        let path = temp_path("saved");
        let mut config = TesseraConfig::default();
        config.retry.max_attempts = Some(12);
        config.retry.timeout_ms = Some(3_000);
        config.directory.content_prefix = vec![0x01, 0x02];

        config.save_to_file(&path).unwrap();
        let reloaded = TesseraConfig::from_toml_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(reloaded, config);
    }
}
