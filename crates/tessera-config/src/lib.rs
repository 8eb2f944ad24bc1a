//! # tessera-config
//!
//! Configuration management for Tessera.
//!
//! Loads configuration from:
//! 1. `~/.tessera/config.toml` (global)
//! 2. `.tessera/config.toml` (project-local, overrides global key by key)
//! 3. Environment variables (highest priority)

pub mod logging;
pub mod testing;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard};
use tracing::debug;

pub use logging::{init_logging, LogLevel};

/// Global config instance
static CONFIG: Lazy<RwLock<Config>> = Lazy::new(|| RwLock::new(Config::load().unwrap_or_default()));

/// Get global config (read-only)
pub fn config() -> RwLockReadGuard<'static, Config> {
    CONFIG.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Reload config from disk
pub fn reload() -> Result<(), ConfigError> {
    let new_config = Config::load()?;
    *CONFIG.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = new_config;
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load config from standard locations
    pub fn load() -> Result<Self, ConfigError> {
        let global = Self::global_config_path();
        let project = Path::new(".tessera/config.toml");
        let mut config = Self::load_from_paths(global.as_deref(), Some(project))?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load and layer the given files without looking at the environment.
    ///
    /// Missing files are skipped. Keys present in `project` replace the same
    /// keys from `global`; tables are merged recursively.
    pub fn load_from_paths(
        global: Option<&Path>,
        project: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        let mut merged = toml::Value::Table(toml::map::Map::new());

        for path in [global, project].into_iter().flatten() {
            if path.exists() {
                debug!("Loading config from {:?}", path);
                let contents = std::fs::read_to_string(path)?;
                let layer: toml::Value = toml::from_str(&contents)?;
                merge_toml(&mut merged, layer);
            }
        }

        let config: Config = merged.try_into()?;
        config.validate()?;
        Ok(config)
    }

    /// Global config path: ~/.tessera/config.toml
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".tessera/config.toml"))
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("TESSERA_WORLD_ROOT") {
            self.storage.world_root = PathBuf::from(path);
        }
        if let Ok(level) = std::env::var("TESSERA_COMPRESSION_LEVEL") {
            if let Ok(n) = level.parse() {
                self.storage.compression_level = n;
            }
        }
        if let Ok(sync) = std::env::var("TESSERA_SYNC_WRITES") {
            match sync.as_str() {
                "1" | "true" | "yes" => self.storage.sync_writes = true,
                "0" | "false" | "no" => self.storage.sync_writes = false,
                _ => {}
            }
        }
        if let Ok(level) = std::env::var("TESSERA_LOG") {
            self.logging.level = level;
        }
    }

    /// Reject values the storage layer cannot use.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.compression_level > 9 {
            return Err(ConfigError::Invalid(format!(
                "storage.compression_level must be 0-9, got {}",
                self.storage.compression_level
            )));
        }
        if self.logging.level.parse::<LogLevel>().is_err() {
            return Err(ConfigError::Invalid(format!(
                "logging.level '{}' is not one of error, warn, info, debug, trace",
                self.logging.level
            )));
        }
        Ok(())
    }

    /// Generate default config TOML string
    pub fn default_toml() -> String {
        toml::to_string_pretty(&Config::default()).unwrap_or_default()
    }
}

/// Recursively overlay `layer` onto `base`. Non-table values replace.
fn merge_toml(base: &mut toml::Value, layer: toml::Value) {
    match (base, layer) {
        (toml::Value::Table(base), toml::Value::Table(layer)) => {
            for (key, value) in layer {
                match base.get_mut(&key) {
                    Some(existing) => merge_toml(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

/// Region storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the `r.<x>.<z>.mca` region files
    pub world_root: PathBuf,
    /// Zlib level used when writing chunk payloads (0-9)
    pub compression_level: u32,
    /// Flush payload bytes to disk before the header entry that points at them
    pub sync_writes: bool,
    /// Create a region file on first write when it does not exist yet
    pub create_missing: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            world_root: PathBuf::from("world/region"),
            compression_level: 6,
            sync_writes: true,
            create_missing: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// One of error, warn, info, debug, trace
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Parsed level; falls back to `Warn` for values `validate` would reject.
    pub fn level(&self) -> LogLevel {
        self.level.parse().unwrap_or(LogLevel::Warn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.storage.compression_level, 6);
        assert!(config.storage.sync_writes);
        assert_eq!(config.logging.level(), LogLevel::Warn);
        config.validate().unwrap();
    }

    #[test]
    fn test_reload_replaces_global() {
        match Config::load() {
            Ok(expected) => {
                reload().unwrap();
                let current = config();
                assert_eq!(current.storage.world_root, expected.storage.world_root);
                assert_eq!(current.logging.level, expected.logging.level);
            }
            Err(_) => assert!(reload().is_err()),
        }
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[storage]"));
        assert!(toml_str.contains("[logging]"));
        assert!(toml_str.contains("compression_level = 6"));
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.storage.world_root, parsed.storage.world_root);
        assert_eq!(config.logging.level, parsed.logging.level);
    }

    #[test]
    fn test_merge_toml_nested() {
        let mut base: toml::Value = toml::from_str(
            r#"
[storage]
compression_level = 3
sync_writes = false
"#,
        )
        .unwrap();
        let layer: toml::Value = toml::from_str(
            r#"
[storage]
compression_level = 9
"#,
        )
        .unwrap();
        merge_toml(&mut base, layer);
        let config: Config = base.try_into().unwrap();
        assert_eq!(config.storage.compression_level, 9);
        assert!(!config.storage.sync_writes);
    }

    #[test]
    fn test_validate_rejects_bad_level() {
        let mut config = Config::default();
        config.storage.compression_level = 12;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = Config::default();
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());
    }
}
