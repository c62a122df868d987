//! Configuration management for payroll.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults. Paths
//! are resolved into [`Sourced`] values so callers can report where each one
//! came from.

use std::fmt;
use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Directory under the user's config dir holding the config file.
const CONFIG_DIR_NAME: &str = "payroll";

/// Default database file name, relative to the working directory.
pub const DATABASE_FILE_NAME: &str = "employee_db_2025.sqlite";

/// Default documents directory name, next to the database.
pub const DOCUMENTS_DIR_NAME: &str = "employee_files";

/// Default key file name, relative to the working directory.
pub const KEY_FILE_NAME: &str = "secret.key";

/// Prefix of environment variables overriding configuration keys.
const ENV_PREFIX: &str = "PAYROLL_";

/// Environment variable naming the database file directly.
pub const DATABASE_ENV_VAR: &str = "PAYROLL_DB";

/// Where a resolved configuration value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueSource {
    /// Built-in default.
    Default,
    /// Set in the config file or environment.
    Configured,
    /// Derived from another resolved value.
    Computed,
}

impl fmt::Display for ValueSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Default => "default",
            Self::Configured => "configured",
            Self::Computed => "computed",
        };
        f.write_str(label)
    }
}

/// A resolved value together with its origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Sourced<T> {
    /// The resolved value.
    pub value: T,
    /// Where it came from.
    pub source: ValueSource,
}

impl<T> Sourced<T> {
    fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }

    /// Consume the wrapper and return the value.
    pub fn into_inner(self) -> T {
        self.value
    }
}

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. `PAYROLL_DB` (database path only)
/// 2. Environment variables prefixed with `PAYROLL_`, `__` separating
///    sections, e.g. `PAYROLL_AUDIT__PAGE_SIZE`
/// 3. TOML config file at `~/.config/payroll/config.toml`
/// 4. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Audit configuration.
    pub audit: AuditConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `employee_db_2025.sqlite` in the working directory.
    pub database_path: Option<PathBuf>,
    /// Directory holding scanned documents and photos.
    /// Defaults to `employee_files` next to the database.
    pub documents_dir: Option<PathBuf>,
    /// Path to the encryption key file.
    /// Defaults to `secret.key` in the working directory.
    pub key_path: Option<PathBuf>,
}

/// Audit-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Actor recorded when a command does not name one.
    pub default_actor: String,
    /// Entries fetched per page when listing the audit trail.
    pub page_size: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            default_actor: "admin".to_string(),
            page_size: crate::store::audit::DEFAULT_PAGE_SIZE,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, parsing or validation fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading, parsing or validation fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);
        let config: Config = Self::figment(&config_file).extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Build the provider stack for the given config file.
    #[must_use]
    pub fn figment(config_file: &Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_file).nested())
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(
                Env::raw()
                    .only(&[DATABASE_ENV_VAR])
                    .map(|_| "storage.database_path".into()),
            )
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.audit.page_size == 0 {
            return Err(Error::ConfigValidation {
                message: "audit.page_size must be greater than 0".to_string(),
            });
        }

        if self.audit.default_actor.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "audit.default_actor must not be empty".to_string(),
            });
        }

        for (key, path) in [
            ("storage.database_path", &self.storage.database_path),
            ("storage.documents_dir", &self.storage.documents_dir),
            ("storage.key_path", &self.storage.key_path),
        ] {
            if path.as_ref().is_some_and(|p| p.as_os_str().is_empty()) {
                return Err(Error::ConfigValidation {
                    message: format!("{key} must not be empty"),
                });
            }
        }

        Ok(())
    }

    /// Get the database path, resolving the default if not set.
    #[must_use]
    pub fn database_path(&self) -> Sourced<PathBuf> {
        match &self.storage.database_path {
            Some(path) => Sourced::new(path.clone(), ValueSource::Configured),
            None => Sourced::new(PathBuf::from(DATABASE_FILE_NAME), ValueSource::Default),
        }
    }

    /// Get the documents directory, placing it next to the database if not set.
    #[must_use]
    pub fn documents_dir(&self) -> Sourced<PathBuf> {
        if let Some(path) = &self.storage.documents_dir {
            return Sourced::new(path.clone(), ValueSource::Configured);
        }

        let database = self.database_path();
        let dir = database
            .value
            .parent()
            .map_or_else(|| PathBuf::from(DOCUMENTS_DIR_NAME), |p| p.join(DOCUMENTS_DIR_NAME));
        Sourced::new(dir, ValueSource::Computed)
    }

    /// Get the key file path, resolving the default if not set.
    #[must_use]
    pub fn key_path(&self) -> Sourced<PathBuf> {
        match &self.storage.key_path {
            Some(path) => Sourced::new(path.clone(), ValueSource::Configured),
            None => Sourced::new(PathBuf::from(KEY_FILE_NAME), ValueSource::Default),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert!(config.storage.database_path.is_none());
        assert!(config.storage.documents_dir.is_none());
        assert!(config.storage.key_path.is_none());
        assert_eq!(config.audit.default_actor, "admin");
        assert_eq!(config.audit.page_size, 100);
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_zero_page_size() {
        let mut config = Config::default();
        config.audit.page_size = 0;

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("page_size"));
    }

    #[test]
    fn test_validate_blank_actor() {
        let mut config = Config::default();
        config.audit.default_actor = "  ".to_string();

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("default_actor"));
    }

    #[test]
    fn test_validate_empty_path() {
        let mut config = Config::default();
        config.storage.key_path = Some(PathBuf::new());

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("storage.key_path"));
    }

    #[test]
    fn test_default_paths() {
        let config = Config::default();

        let db = config.database_path();
        assert_eq!(db.value, PathBuf::from("employee_db_2025.sqlite"));
        assert_eq!(db.source, ValueSource::Default);

        let docs = config.documents_dir();
        assert_eq!(docs.value, PathBuf::from("employee_files"));
        assert_eq!(docs.source, ValueSource::Computed);

        let key = config.key_path();
        assert_eq!(key.value, PathBuf::from("secret.key"));
        assert_eq!(key.source, ValueSource::Default);
    }

    #[test]
    fn test_documents_dir_follows_database() {
        let mut config = Config::default();
        config.storage.database_path = Some(PathBuf::from("/srv/payroll/records.sqlite"));

        let docs = config.documents_dir();
        assert_eq!(docs.value, PathBuf::from("/srv/payroll/employee_files"));
        assert_eq!(docs.source, ValueSource::Computed);
        assert_eq!(config.database_path().source, ValueSource::Configured);
    }

    #[test]
    fn test_documents_dir_configured() {
        let mut config = Config::default();
        config.storage.documents_dir = Some(PathBuf::from("/mnt/scans"));

        let docs = config.documents_dir();
        assert_eq!(docs.into_inner(), PathBuf::from("/mnt/scans"));
    }

    #[test]
    fn test_value_source_display() {
        assert_eq!(ValueSource::Default.to_string(), "default");
        assert_eq!(ValueSource::Configured.to_string(), "configured");
        assert_eq!(ValueSource::Computed.to_string(), "computed");
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.to_string_lossy().contains("payroll"));
        assert!(path.to_string_lossy().contains("config.toml"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        Jail::expect_with(|_jail| {
            let config = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml")))
                .map_err(|e| e.to_string())?;
            assert_eq!(config, Config::default());
            Ok(())
        });
    }

    #[test]
    fn test_load_from_toml() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
                [storage]
                database_path = "data/records.sqlite"
                key_path = "keys/payroll.key"

                [audit]
                default_actor = "hr"
                page_size = 25
                "#,
            )?;

            let config: Config = Config::figment(Path::new("config.toml")).extract()?;
            assert_eq!(
                config.storage.database_path,
                Some(PathBuf::from("data/records.sqlite"))
            );
            assert_eq!(config.key_path().value, PathBuf::from("keys/payroll.key"));
            assert_eq!(config.audit.default_actor, "hr");
            assert_eq!(config.audit.page_size, 25);
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", "[audit]\npage_size = 25\n")?;
            jail.set_env("PAYROLL_AUDIT__PAGE_SIZE", "7");
            jail.set_env("PAYROLL_STORAGE__KEY_PATH", "/etc/payroll/secret.key");

            let config: Config = Config::figment(Path::new("config.toml")).extract()?;
            assert_eq!(config.audit.page_size, 7);
            assert_eq!(
                config.storage.key_path,
                Some(PathBuf::from("/etc/payroll/secret.key"))
            );
            Ok(())
        });
    }

    #[test]
    fn test_database_env_var() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                "[storage]\ndatabase_path = \"from_file.sqlite\"\n",
            )?;
            jail.set_env("PAYROLL_DB", "/var/lib/payroll/live.sqlite");

            let config: Config = Config::figment(Path::new("config.toml")).extract()?;
            let db = config.database_path();
            assert_eq!(db.value, PathBuf::from("/var/lib/payroll/live.sqlite"));
            assert_eq!(db.source, ValueSource::Configured);
            Ok(())
        });
    }

    #[test]
    fn test_config_serialize() {
        let json = serde_json::to_string(&Config::default()).unwrap();
        assert!(json.contains("database_path"));
        assert!(json.contains("page_size"));
    }

    #[test]
    fn test_audit_config_deserialize_partial() {
        let audit: AuditConfig = serde_json::from_str(r#"{"page_size": 10}"#).unwrap();
        assert_eq!(audit.page_size, 10);
        assert_eq!(audit.default_actor, "admin");
    }
}
