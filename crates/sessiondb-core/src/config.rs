//! Configuration system for sessiondb.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Error;
use crate::expiry::{ExpiryPolicy, DEFAULT_TTL};

/// Default session table name.
pub const DEFAULT_TABLE_NAME: &str = "sessions";

/// Default reclamation interval in milliseconds.
pub const DEFAULT_CLEANUP_INTERVAL_MS: u64 = 5 * 60 * 1000;

/// Default busy timeout in milliseconds.
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

/// Main configuration struct for sessiondb.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Connection settings
    pub database: DatabaseConfig,
    /// Session table and reclamation settings
    pub store: StoreConfig,
    /// Logging settings
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database file; defaults to `<data_dir>/sessiondb/sessions.db`
    pub path: Option<PathBuf>,
    /// How long a statement waits on a conflicting writer
    pub busy_timeout_ms: u64,
    /// `PRAGMA synchronous` value: OFF, NORMAL, FULL or EXTRA
    pub synchronous: String,
    /// `PRAGMA foreign_keys`
    pub foreign_keys: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: None,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            synchronous: "NORMAL".to_string(),
            foreign_keys: true,
        }
    }
}

impl DatabaseConfig {
    /// The configured path, or the default one under the data directory.
    pub fn resolved_path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| Config::data_dir().join("sessions.db"))
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Session table name
    pub table_name: String,
    /// Interval between reclamation passes
    pub cleanup_interval_ms: u64,
    /// Lifetime for sessions whose cookie has no expiry
    pub default_ttl_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            table_name: DEFAULT_TABLE_NAME.to_string(),
            cleanup_interval_ms: DEFAULT_CLEANUP_INTERVAL_MS,
            default_ttl_ms: DEFAULT_TTL.as_millis() as u64,
        }
    }
}

impl StoreConfig {
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_millis(self.cleanup_interval_ms)
    }

    pub fn expiry_policy(&self) -> ExpiryPolicy {
        ExpiryPolicy::new(Duration::from_millis(self.default_ttl_ms))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `tracing` filter, overridden by `RUST_LOG`
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Whether `name` can be interpolated into SQL as a bare identifier.
pub fn is_sql_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    name.len() <= 64 && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Validation result with multiple issues.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    /// List of validation issues
    pub issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self { issues: Vec::new() }
    }

    /// Check if validation passed (no errors).
    pub fn is_ok(&self) -> bool {
        !self.issues.iter().any(|i| i.severity == IssueSeverity::Error)
    }

    pub fn errors(&self) -> Vec<&ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == IssueSeverity::Error).collect()
    }

    pub fn warnings(&self) -> Vec<&ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == IssueSeverity::Warning).collect()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            severity: IssueSeverity::Error,
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            severity: IssueSeverity::Warning,
            field: field.into(),
            message: message.into(),
        });
    }
}

/// A single validation issue.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    pub severity: IssueSeverity,
    /// Field path (e.g., "store.table_name")
    pub field: String,
    pub message: String,
}

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueSeverity {
    /// Warnings don't prevent loading
    Warning,
    /// Errors prevent loading
    Error,
}

impl Config {
    /// Load configuration from all sources.
    pub fn load() -> Result<Self, figment::Error> {
        let config_dir = Self::config_dir();

        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            // User config
            .merge(Toml::file(config_dir.join("config.toml")))
            // Project config
            .merge(Toml::file(".sessiondb/config.toml"))
            .merge(Env::prefixed("SESSIONDB_").split("__"))
            .extract()
    }

    /// Load configuration from an explicit file, still honouring the environment.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("SESSIONDB_").split("__"))
            .extract()
    }

    /// Load and validate configuration.
    pub fn load_validated(path: Option<&Path>) -> Result<Self, Error> {
        let config = match path {
            Some(path) => Self::load_from(path)?,
            None => Self::load()?,
        };
        config.into_validated()
    }

    /// Fail on validation errors, logging warnings.
    pub fn into_validated(self) -> Result<Self, Error> {
        let result = self.validate();

        if !result.is_ok() {
            let errors: Vec<String> = result
                .errors()
                .iter()
                .map(|e| format!("{}: {}", e.field, e.message))
                .collect();
            return Err(Error::Validation(format!(
                "Configuration validation failed:\n  {}",
                errors.join("\n  ")
            )));
        }

        for warning in result.warnings() {
            tracing::warn!("Config warning - {}: {}", warning.field, warning.message);
        }

        Ok(self)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::new();

        if !is_sql_identifier(&self.store.table_name) {
            result.add_error(
                "store.table_name",
                format!(
                    "'{}' is not a plain SQL identifier (letters, digits, underscore)",
                    self.store.table_name
                ),
            );
        }

        if self.store.cleanup_interval_ms == 0 {
            result.add_error("store.cleanup_interval_ms", "cleanup_interval_ms must be greater than 0");
        } else if self.store.cleanup_interval_ms < 1000 {
            result.add_warning(
                "store.cleanup_interval_ms",
                "cleanup interval under one second will keep the database busy",
            );
        }

        if self.store.default_ttl_ms == 0 {
            result.add_error("store.default_ttl_ms", "default_ttl_ms must be greater than 0");
        }

        if self.database.busy_timeout_ms == 0 {
            result.add_warning(
                "database.busy_timeout_ms",
                "busy timeout of 0 makes concurrent writers fail immediately",
            );
        }

        let valid_synchronous = ["OFF", "NORMAL", "FULL", "EXTRA"];
        if !valid_synchronous.contains(&self.database.synchronous.to_ascii_uppercase().as_str()) {
            result.add_error(
                "database.synchronous",
                format!(
                    "Invalid synchronous mode '{}'. Valid values: {:?}",
                    self.database.synchronous, valid_synchronous
                ),
            );
        }

        result
    }

    /// Render the effective configuration as TOML.
    pub fn to_toml_string(&self) -> Result<String, Error> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Get the configuration directory.
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|p| p.join("sessiondb"))
            .unwrap_or_else(|| PathBuf::from("~/.config/sessiondb"))
    }

    /// Get the data directory (for the default database file).
    pub fn data_dir() -> PathBuf {
        dirs::data_dir()
            .map(|p| p.join("sessiondb"))
            .unwrap_or_else(|| PathBuf::from("~/.local/share/sessiondb"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        let result = config.validate();
        assert!(result.is_ok(), "Default config should be valid: {:?}", result.issues);
        assert_eq!(config.store.table_name, "sessions");
        assert_eq!(config.store.cleanup_interval(), Duration::from_secs(300));
        assert_eq!(config.database.busy_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_table_name_must_be_identifier() {
        let mut config = Config::default();
        config.store.table_name = "sessions; DROP TABLE users".to_string();
        let result = config.validate();
        assert!(!result.is_ok());
        assert!(result.errors().iter().any(|e| e.field == "store.table_name"));
    }

    #[test]
    fn test_zero_interval_is_error() {
        let mut config = Config::default();
        config.store.cleanup_interval_ms = 0;
        assert!(config.validate().errors().iter().any(|e| e.field == "store.cleanup_interval_ms"));
    }

    #[test]
    fn test_short_interval_is_warning() {
        let mut config = Config::default();
        config.store.cleanup_interval_ms = 50;
        let result = config.validate();
        assert!(result.is_ok());
        assert!(result.warnings().iter().any(|e| e.field == "store.cleanup_interval_ms"));
    }

    #[test]
    fn test_invalid_synchronous_mode() {
        let mut config = Config::default();
        config.database.synchronous = "sometimes".to_string();
        let result = config.validate();
        assert!(!result.is_ok());
        assert!(result.errors().iter().any(|e| e.field == "database.synchronous"));
    }

    #[test]
    fn test_into_validated_rejects_errors() {
        let mut config = Config::default();
        config.store.default_ttl_ms = 0;
        let err = config.into_validated().unwrap_err();
        assert!(err.to_string().contains("store.default_ttl_ms"));
    }

    #[test]
    fn test_sql_identifier() {
        assert!(is_sql_identifier("sessions"));
        assert!(is_sql_identifier("_app_sessions2"));
        assert!(!is_sql_identifier(""));
        assert!(!is_sql_identifier("2fast"));
        assert!(!is_sql_identifier("web-sessions"));
        assert!(!is_sql_identifier("\"quoted\""));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[store]\ntable_name = \"web_sessions\"\ncleanup_interval_ms = 60000\n\n[database]\nbusy_timeout_ms = 250"
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.store.table_name, "web_sessions");
        assert_eq!(config.store.cleanup_interval_ms, 60_000);
        assert_eq!(config.store.default_ttl_ms, 86_400_000);
        assert_eq!(config.database.busy_timeout_ms, 250);
        assert_eq!(config.database.synchronous, "NORMAL");
    }

    #[test]
    fn test_toml_round_trip() {
        let config = Config::default();
        let rendered = config.to_toml_string().unwrap();
        assert!(rendered.contains("table_name = \"sessions\""));
    }
}
