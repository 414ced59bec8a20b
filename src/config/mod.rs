//! Configuration management.
//!
//! Values come from, in increasing precedence: built-in defaults, the
//! platform data directory, an optional `config.toml`, and `FRESHKEEP_*`
//! environment variables.

use crate::models::Language;
use crate::observability::{LogFormat, LoggingConfig};
use crate::storage::DEFAULT_DATABASE_NAME;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default value of [`StoreConfig::cache_max_age_secs`].
pub const DEFAULT_CACHE_MAX_AGE_SECS: u64 = 300;

const APP_DIR: &str = "freshkeep";
const FLAT_STORE_DIR: &str = "flat";

/// Main configuration for freshkeep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Directory holding the structured database.
    pub data_dir: PathBuf,
    /// File name of the structured database inside `data_dir`.
    pub database_name: String,
    /// Directory of the degraded-mode flat store. Defaults to `<data_dir>/flat`.
    pub flat_store_dir: Option<PathBuf>,
    /// Language default categories and locations are seeded in.
    pub language: Language,
    /// Age after which the cache refetches on `ensure_fresh`.
    pub cache_max_age_secs: u64,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Data directory.
    pub data_dir: Option<String>,
    /// Database file name.
    pub database_name: Option<String>,
    /// Flat store directory.
    pub flat_store_dir: Option<String>,
    /// Language code or name.
    pub language: Option<String>,
    /// Cache max age in seconds.
    pub cache_max_age_secs: Option<u64>,
    /// Logging section.
    pub logging: Option<ConfigFileLogging>,
}

/// Logging section in config file.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFileLogging {
    /// "pretty" or "json".
    pub format: Option<String>,
    /// Default filter directive.
    pub level: Option<String>,
    /// Log file path.
    pub file: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".freshkeep"),
            database_name: DEFAULT_DATABASE_NAME.to_string(),
            flat_store_dir: None,
            language: Language::default(),
            cache_max_age_secs: DEFAULT_CACHE_MAX_AGE_SECS,
            logging: LoggingConfig::default(),
        }
    }
}

impl StoreConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a default configuration rooted at `data_dir`.
    #[must_use]
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Sets the seeding language.
    #[must_use]
    pub const fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    /// Directory of the flat store.
    #[must_use]
    pub fn flat_store_path(&self) -> PathBuf {
        self.flat_store_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join(FLAT_STORE_DIR))
    }

    /// Full path of the structured database.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_name)
    }

    /// Loads configuration from a file path, on top of the platform defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file cannot be read or parsed, or
    /// holds invalid values.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        let file: ConfigFile = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("cannot parse {}: {e}", path.display())))?;
        let config = Self::platform_defaults().merge(file)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from the default location.
    ///
    /// Looks for `config.toml` in the platform config directory
    /// (`~/.config/freshkeep/` on Linux). Falls back to platform defaults if
    /// there is none or it cannot be loaded.
    #[must_use]
    pub fn load_default() -> Self {
        if let Some(path) = Self::default_config_path() {
            if path.exists() {
                match Self::load_from_file(&path) {
                    Ok(config) => return config,
                    Err(e) => tracing::warn!(error = %e, "Ignoring config file"),
                }
            }
        }
        Self::platform_defaults()
    }

    /// Path of the default config file, if a home directory is known.
    #[must_use]
    pub fn default_config_path() -> Option<PathBuf> {
        directories::BaseDirs::new()
            .map(|dirs| dirs.config_dir().join(APP_DIR).join("config.toml"))
    }

    fn platform_defaults() -> Self {
        directories::BaseDirs::new().map_or_else(Self::default, |dirs| {
            Self::with_data_dir(dirs.data_dir().join(APP_DIR))
        })
    }

    fn merge(mut self, file: ConfigFile) -> Result<Self> {
        if let Some(data_dir) = file.data_dir {
            self.data_dir = PathBuf::from(data_dir);
        }
        if let Some(name) = file.database_name {
            self.database_name = name;
        }
        if let Some(dir) = file.flat_store_dir {
            self.flat_store_dir = Some(PathBuf::from(dir));
        }
        if let Some(language) = file.language {
            self.language = Language::parse(&language)
                .ok_or_else(|| Error::Config(format!("unknown language '{language}'")))?;
        }
        if let Some(secs) = file.cache_max_age_secs {
            self.cache_max_age_secs = secs;
        }
        if let Some(logging) = file.logging {
            if let Some(format) = logging.format {
                self.logging.format = LogFormat::parse(&format);
            }
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(file) = logging.file {
                self.logging.file = Some(PathBuf::from(file));
            }
        }
        Ok(self)
    }

    /// Applies `FRESHKEEP_*` environment overrides. Malformed values are ignored.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Applies overrides looked up by environment variable name.
    #[must_use]
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(v) = lookup("FRESHKEEP_DATA_DIR") {
            self.data_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("FRESHKEEP_DATABASE") {
            if is_plain_file_name(&v) {
                self.database_name = v;
            }
        }
        if let Some(v) = lookup("FRESHKEEP_FLAT_DIR") {
            self.flat_store_dir = Some(PathBuf::from(v));
        }
        if let Some(language) = lookup("FRESHKEEP_LANGUAGE").as_deref().and_then(Language::parse) {
            self.language = language;
        }
        if let Some(v) = lookup("FRESHKEEP_CACHE_MAX_AGE_SECS") {
            if let Ok(parsed) = v.parse::<u64>() {
                self.cache_max_age_secs = parsed;
            }
        }
        if let Some(v) = lookup("FRESHKEEP_LOG_FORMAT") {
            self.logging.format = LogFormat::parse(&v);
        }
        if let Some(v) = lookup("FRESHKEEP_LOG_FILE") {
            self.logging.file = Some(PathBuf::from(v));
        }
        self
    }

    /// Checks values that cannot be expressed in the types.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the database name is not a plain file name.
    pub fn validate(&self) -> Result<()> {
        if !is_plain_file_name(&self.database_name) {
            return Err(Error::Config(format!(
                "database_name must be a file name, got '{}'",
                self.database_name
            )));
        }
        Ok(())
    }
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\'])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = StoreConfig::with_data_dir("/tmp/fk");
        assert_eq!(config.database_path(), PathBuf::from("/tmp/fk/freshkeep.db"));
        assert_eq!(config.flat_store_path(), PathBuf::from("/tmp/fk/flat"));
        assert_eq!(config.language, Language::En);
        assert_eq!(config.cache_max_age_secs, DEFAULT_CACHE_MAX_AGE_SECS);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
data_dir = "/var/lib/freshkeep"
language = "de"
cache_max_age_secs = 60

[logging]
format = "json"
level = "debug"
"#,
        )
        .unwrap();

        let config = StoreConfig::load_from_file(&path).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/freshkeep"));
        assert_eq!(config.language, Language::De);
        assert_eq!(config.cache_max_age_secs, 60);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.database_name, DEFAULT_DATABASE_NAME);
    }

    #[test]
    fn test_load_from_file_rejects_bad_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        std::fs::write(&path, "language = \"klingon\"\n").unwrap();
        assert!(matches!(StoreConfig::load_from_file(&path), Err(Error::Config(_))));

        std::fs::write(&path, "database_name = \"../escape.db\"\n").unwrap();
        assert!(matches!(StoreConfig::load_from_file(&path), Err(Error::Config(_))));

        std::fs::write(&path, "colour = \"blue\"\n").unwrap();
        assert!(matches!(StoreConfig::load_from_file(&path), Err(Error::Config(_))));
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("FRESHKEEP_DATA_DIR", "/data"),
            ("FRESHKEEP_LANGUAGE", "es-MX"),
            ("FRESHKEEP_CACHE_MAX_AGE_SECS", "not-a-number"),
            ("FRESHKEEP_DATABASE", "nested/inventory.db"),
            ("FRESHKEEP_FLAT_DIR", "/flat"),
        ]
        .into_iter()
        .collect();

        let config = StoreConfig::default()
            .with_overrides_from(|key| env.get(key).map(|v| (*v).to_string()));
        assert_eq!(config.data_dir, PathBuf::from("/data"));
        assert_eq!(config.language, Language::Es);
        assert_eq!(config.cache_max_age_secs, DEFAULT_CACHE_MAX_AGE_SECS);
        assert_eq!(config.database_name, DEFAULT_DATABASE_NAME);
        assert_eq!(config.flat_store_path(), PathBuf::from("/flat"));
    }
}
