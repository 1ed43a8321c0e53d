//! Error types for reconciliation
//!
//! Only [`ReconcileError::LocalStore`], configuration errors and non-network
//! fetch failures ever reach a caller of `reconcile`. The per-branch and
//! per-file variants are produced inside scans, recorded as skipped units and
//! logged; they never abort the whole view.

use backlog_common::{ErrorSeverity, Severity};
use backlog_config::ConfigError;
use backlog_git::GitError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for reconciliation operations
pub type Result<T> = std::result::Result<T, ReconcileError>;

/// Errors that can occur while reconciling entities across branches
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ReconcileError {
    /// A remote could not be reached; work continues local-only
    #[error("remote '{remote}' is unreachable: {details}")]
    NetworkUnavailable { remote: String, details: String },

    /// One branch could not be read; its contribution is dropped
    #[error("branch '{branch}' could not be read: {source}")]
    RefAccess {
        branch: String,
        #[source]
        source: GitError,
    },

    /// One entity file could not be parsed; it is skipped
    #[error("could not parse entity file '{path}': {message}")]
    Parse { path: String, message: String },

    /// Configuration could not be loaded, including a missing project config
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The local entity store could not be read at all
    #[error("local entity store at '{}' could not be read: {source}", path.display())]
    LocalStore {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The highest existing id leaves no room for another
    #[error("no {kind} id is left after '{stem}' {highest}")]
    IdSpaceExhausted {
        kind: String,
        stem: String,
        highest: u64,
    },

    /// A backend failure that is not tied to a single branch
    #[error("git error: {0}")]
    Git(#[from] GitError),
}

impl ReconcileError {
    /// Create a parse error for one file
    pub fn parse(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Wrap a backend error raised while reading `branch`
    ///
    /// Network failures keep their own classification.
    pub fn ref_access(branch: impl Into<String>, source: GitError) -> Self {
        let branch = branch.into();
        match source {
            GitError::NetworkUnavailable { remote, details } => {
                Self::NetworkUnavailable { remote, details }
            }
            source => Self::RefAccess { branch, source },
        }
    }

    /// Create a local store error
    pub fn local_store(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::LocalStore {
            path: path.into(),
            source,
        }
    }

    /// Whether this failure is network-classified and should stay out of default output
    pub fn is_network(&self) -> bool {
        match self {
            ReconcileError::NetworkUnavailable { .. } => true,
            ReconcileError::RefAccess { source, .. } | ReconcileError::Git(source) => {
                source.is_network()
            }
            _ => false,
        }
    }

    /// Whether a caller required an initialized project and none was found
    pub fn is_config_missing(&self) -> bool {
        matches!(
            self,
            ReconcileError::Config(ConfigError::ConfigMissing { .. })
        )
    }
}

impl Severity for ReconcileError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            ReconcileError::NetworkUnavailable { .. }
            | ReconcileError::RefAccess { .. }
            | ReconcileError::Parse { .. } => ErrorSeverity::Warning,
            ReconcileError::Config(err) => err.severity(),
            ReconcileError::LocalStore { .. } => ErrorSeverity::Critical,
            ReconcileError::IdSpaceExhausted { .. } => ErrorSeverity::Error,
            ReconcileError::Git(err) => err.severity(),
        }
    }
}
