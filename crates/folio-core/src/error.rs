//! Error types for the Folio core library.

use thiserror::Error;

/// Result type alias using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core error types for Folio.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration loading or parsing error.
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Metadata header present but not parseable, or failing its schema.
    #[error("Malformed metadata at line {line}: {message}")]
    MalformedMetadata { line: usize, message: String },

    /// A document identifier that cannot be mapped to a storage location.
    #[error("Invalid document identifier '{0}'")]
    InvalidIdentifier(String),

    /// File system I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// YAML parsing or serialization error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Generic configuration crate error.
    #[error("Config crate error: {0}")]
    ConfigCrate(#[from] config::ConfigError),
}

impl CoreError {
    /// Create a new configuration error with a message.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    /// Create a new configuration error with source.
    pub fn config_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a new malformed metadata error at a 1-based line.
    pub fn malformed(line: usize, message: impl Into<String>) -> Self {
        Self::MalformedMetadata {
            line,
            message: message.into(),
        }
    }

    /// Line reported by a metadata error, if this is one.
    pub fn metadata_line(&self) -> Option<usize> {
        match self {
            Self::MalformedMetadata { line, .. } => Some(*line),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error() {
        let err = CoreError::config("missing field");
        assert!(err.to_string().contains("Configuration error"));
        assert!(err.to_string().contains("missing field"));
    }

    #[test]
    fn test_malformed_error_reports_line() {
        let err = CoreError::malformed(4, "unterminated header");
        assert!(err.to_string().contains("line 4"));
        assert!(err.to_string().contains("unterminated header"));
        assert_eq!(err.metadata_line(), Some(4));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: CoreError = io_err.into();
        assert!(err.to_string().contains("IO error"));
        assert_eq!(err.metadata_line(), None);
    }
}
