//! Error severity classification
//!
//! Every Backlog error type implements [`Severity`] so callers can decide how
//! loudly to report a failure. Reconciliation in particular tolerates most
//! failures: a branch that cannot be read is a `Warning`, not a reason to stop.

/// Severity levels for error classification
///
/// - **Warning**: the operation continues with reduced input (a skipped file,
///   an unreachable remote).
/// - **Error**: the operation failed but the process can carry on.
/// - **Critical**: nothing useful can be produced (the local store cannot be read).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    /// Potential issue but operation can proceed
    Warning,
    /// Operation failed but system can continue
    Error,
    /// System cannot continue, requires immediate attention
    Critical,
}

impl ErrorSeverity {
    /// Whether the failure still lets the surrounding operation produce a result
    pub fn is_recoverable(self) -> bool {
        !matches!(self, ErrorSeverity::Critical)
    }
}

/// Trait for error types that have severity levels
///
/// # Example
///
/// ```rust
/// use backlog_common::{ErrorSeverity, Severity};
///
/// #[derive(Debug)]
/// enum ScanError {
///     StoreUnreadable,
///     BranchGone,
/// }
///
/// impl Severity for ScanError {
///     fn severity(&self) -> ErrorSeverity {
///         match self {
///             ScanError::StoreUnreadable => ErrorSeverity::Critical,
///             ScanError::BranchGone => ErrorSeverity::Warning,
///         }
///     }
/// }
///
/// assert_eq!(ScanError::BranchGone.severity(), ErrorSeverity::Warning);
/// ```
pub trait Severity {
    /// Get the severity level of this error
    fn severity(&self) -> ErrorSeverity;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(ErrorSeverity::Warning < ErrorSeverity::Error);
        assert!(ErrorSeverity::Error < ErrorSeverity::Critical);
    }

    #[test]
    fn test_recoverable() {
        assert!(ErrorSeverity::Warning.is_recoverable());
        assert!(ErrorSeverity::Error.is_recoverable());
        assert!(!ErrorSeverity::Critical.is_recoverable());
    }
}
