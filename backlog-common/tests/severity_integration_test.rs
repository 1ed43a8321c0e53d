//! Integration tests for the Severity trait
//!
//! Validates that custom error types can plug into the shared classification
//! and that severities sort from least to most serious.

use backlog_common::{ErrorSeverity, Severity};

#[derive(Debug)]
enum BranchScanFailure {
    Unreachable,
    CorruptRef,
    StoreGone,
}

impl Severity for BranchScanFailure {
    fn severity(&self) -> ErrorSeverity {
        match self {
            BranchScanFailure::Unreachable => ErrorSeverity::Warning,
            BranchScanFailure::CorruptRef => ErrorSeverity::Error,
            BranchScanFailure::StoreGone => ErrorSeverity::Critical,
        }
    }
}

#[test]
fn test_severity_levels_are_distinct() {
    assert_ne!(ErrorSeverity::Warning, ErrorSeverity::Error);
    assert_ne!(ErrorSeverity::Error, ErrorSeverity::Critical);
    assert_ne!(ErrorSeverity::Warning, ErrorSeverity::Critical);
}

#[test]
fn test_custom_error_classification() {
    assert_eq!(
        BranchScanFailure::Unreachable.severity(),
        ErrorSeverity::Warning
    );
    assert_eq!(BranchScanFailure::CorruptRef.severity(), ErrorSeverity::Error);
    assert_eq!(
        BranchScanFailure::StoreGone.severity(),
        ErrorSeverity::Critical
    );
}

#[test]
fn test_worst_severity_wins() {
    let failures = [
        BranchScanFailure::Unreachable,
        BranchScanFailure::StoreGone,
        BranchScanFailure::CorruptRef,
    ];
    let worst = failures.iter().map(Severity::severity).max();
    assert_eq!(worst, Some(ErrorSeverity::Critical));
}

#[test]
fn test_only_critical_is_unrecoverable() {
    let unrecoverable: Vec<_> = [
        BranchScanFailure::Unreachable,
        BranchScanFailure::CorruptRef,
        BranchScanFailure::StoreGone,
    ]
    .iter()
    .filter(|f| !f.severity().is_recoverable())
    .map(|f| format!("{:?}", f))
    .collect();
    assert_eq!(unrecoverable, vec!["StoreGone"]);
}
