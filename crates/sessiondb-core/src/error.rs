//! Error types for sessiondb configuration and core types.
//!
//! Storage failures live in `sessiondb-store`; this module covers the errors
//! that can happen before a connection exists.

use thiserror::Error;

/// Result type alias using the core [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration loaded but failed validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML rendering error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::ser::Error),
}

impl Error {
    /// Get a recovery suggestion for this error.
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            Error::Config(_) => Some("Check your config file at ~/.config/sessiondb/config.toml"),
            Error::Validation(_) => Some("Run 'sessiondb config show' to inspect the effective settings"),
            Error::Io(_) => Some("Check that the data directory exists and is writable"),
            _ => None,
        }
    }
}

impl From<figment::Error> for Error {
    fn from(e: figment::Error) -> Self {
        Error::Config(e.to_string())
    }
}

/// Format an error with its recovery suggestion.
pub fn format_error_with_suggestion(error: &Error) -> String {
    let mut output = error.to_string();
    if let Some(suggestion) = error.recovery_suggestion() {
        output.push_str(&format!("\n  Suggestion: {}", suggestion));
    }
    output
}
