//! Git-specific error types and handling
//!
//! Errors carry the operation and ref they came from so a skipped branch can be
//! reported precisely. Network failures get their own variant because callers
//! treat them as soft: an unreachable remote means "work offline", not "fail".

use backlog_common::{ErrorSeverity, Severity};
use std::path::PathBuf;
use thiserror::Error;

/// Result type for Git operations
pub type GitResult<T> = Result<T, GitError>;

/// Message fragments that identify a transport-level failure
const NETWORK_MARKERS: &[&str] = &[
    "could not resolve host",
    "failed to resolve address",
    "name or service not known",
    "temporary failure in name resolution",
    "timed out",
    "connection refused",
    "connection reset",
    "network is unreachable",
    "no route to host",
    "unsupported url protocol",
];

/// Comprehensive Git error types
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GitError {
    /// Repository not found or invalid
    #[error("Git repository not found at '{path}': {details}")]
    RepositoryNotFound { path: PathBuf, details: String },

    /// A ref exists but could not be read
    #[error("Git ref '{reference}' could not be read: {details}")]
    RefAccessFailed { reference: String, details: String },

    /// Remote could not be reached
    #[error("Git remote '{remote}' is unreachable: {details}")]
    NetworkUnavailable { remote: String, details: String },

    /// Git2 library error
    #[error("Git2 operation '{operation}' failed: {source}")]
    Git2Error {
        operation: String,
        #[source]
        source: git2::Error,
    },

    /// Generic git error
    #[error("Git error: {message}")]
    Generic { message: String },
}

impl GitError {
    /// Create a repository not found error
    pub fn repository_not_found<P: Into<PathBuf>>(path: P, details: String) -> Self {
        Self::RepositoryNotFound {
            path: path.into(),
            details,
        }
    }

    /// Create a ref access error
    pub fn ref_access_failed(reference: impl Into<String>, details: impl Into<String>) -> Self {
        Self::RefAccessFailed {
            reference: reference.into(),
            details: details.into(),
        }
    }

    /// Create a network unavailable error
    pub fn network_unavailable(remote: impl Into<String>, details: impl Into<String>) -> Self {
        Self::NetworkUnavailable {
            remote: remote.into(),
            details: details.into(),
        }
    }

    /// Create a git2 error with operation context
    pub fn from_git2(operation: String, error: git2::Error) -> Self {
        Self::Git2Error {
            operation,
            source: error,
        }
    }

    /// Create a generic git error
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Whether this failure means the remote side could not be reached
    ///
    /// Covers the dedicated variant, git2 errors raised by the transport layers
    /// and any error whose message looks like a DNS, timeout or connection failure.
    pub fn is_network(&self) -> bool {
        match self {
            GitError::NetworkUnavailable { .. } => true,
            GitError::Git2Error { source, .. } => is_network_git2_error(source),
            other => looks_like_network_failure(&other.to_string()),
        }
    }
}

impl Severity for GitError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            GitError::NetworkUnavailable { .. } | GitError::RefAccessFailed { .. } => {
                ErrorSeverity::Warning
            }
            GitError::RepositoryNotFound { .. } => ErrorSeverity::Critical,
            other if other.is_network() => ErrorSeverity::Warning,
            _ => ErrorSeverity::Error,
        }
    }
}

/// Check whether a git2 error originates from the network transports
pub fn is_network_git2_error(error: &git2::Error) -> bool {
    matches!(
        error.class(),
        git2::ErrorClass::Net
            | git2::ErrorClass::Http
            | git2::ErrorClass::Ssh
            | git2::ErrorClass::Ssl
    ) || looks_like_network_failure(error.message())
}

fn looks_like_network_failure(message: &str) -> bool {
    let message = message.to_lowercase();
    NETWORK_MARKERS.iter().any(|marker| message.contains(marker))
}

/// Convert git2::Error to GitError with operation context
pub fn convert_git2_error(operation: &str, error: git2::Error) -> GitError {
    GitError::from_git2(operation.to_string(), error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_variant_is_network() {
        let err = GitError::network_unavailable("origin", "offline");
        assert!(err.is_network());
        assert_eq!(err.severity(), ErrorSeverity::Warning);
    }

    #[test]
    fn test_git2_net_class_is_network() {
        let err = convert_git2_error(
            "fetch",
            git2::Error::new(
                git2::ErrorCode::GenericError,
                git2::ErrorClass::Net,
                "failed to connect",
            ),
        );
        assert!(err.is_network());
    }

    #[test]
    fn test_message_heuristics() {
        let err = GitError::generic("Could not resolve host: github.com");
        assert!(err.is_network());

        let err = GitError::generic("object not found");
        assert!(!err.is_network());
        assert_eq!(err.severity(), ErrorSeverity::Error);
    }

    #[test]
    fn test_repository_not_found_is_critical() {
        let err = GitError::repository_not_found("/nowhere", "missing".to_string());
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert!(!err.is_network());
    }
}
