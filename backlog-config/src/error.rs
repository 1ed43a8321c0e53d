//! Error types for the Backlog configuration system

use backlog_common::{ErrorSeverity, Severity};
use std::path::PathBuf;
use thiserror::Error;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration-related errors
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ConfigError {
    /// No configuration file exists where an initialized project needs one
    #[error("No backlog configuration found in {dir}. Initialize the project first.")]
    ConfigMissing { dir: PathBuf },

    /// Configuration parsing failed
    #[error("Failed to parse configuration: {source}")]
    ParseError {
        #[source]
        source: Box<figment::Error>,
    },

    /// Configuration validation failed
    #[error("Configuration validation failed: {message}")]
    ValidationError { message: String },
}

impl ConfigError {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }
}

impl From<figment::Error> for ConfigError {
    fn from(error: figment::Error) -> Self {
        ConfigError::ParseError {
            source: Box::new(error),
        }
    }
}

impl Severity for ConfigError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            ConfigError::ConfigMissing { .. } => ErrorSeverity::Critical,
            ConfigError::ParseError { .. } | ConfigError::ValidationError { .. } => {
                ErrorSeverity::Error
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_missing_is_critical() {
        let err = ConfigError::ConfigMissing {
            dir: PathBuf::from("/repo/backlog"),
        };
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert!(err.to_string().contains("/repo/backlog"));
    }

    #[test]
    fn test_validation_message() {
        let err = ConfigError::validation("status order is empty");
        assert_eq!(
            err.to_string(),
            "Configuration validation failed: status order is empty"
        );
        assert_eq!(err.severity(), ErrorSeverity::Error);
    }
}
