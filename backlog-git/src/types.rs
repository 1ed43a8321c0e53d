//! Shared value types for ref access

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Last-change timestamps keyed by repository-relative path
pub type FileTimestamps = BTreeMap<String, DateTime<Utc>>;

/// A short branch name as git reports it: `main`, `feature/login`, `origin/main`
///
/// Names only ever come back from the repository, so no validation happens
/// here. Ordering is plain string order, which is the order branches are
/// folded in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BranchName(String);

impl BranchName {
    pub fn from_ref_name<S: Into<String>>(name: S) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Whether this is a symbolic head such as `HEAD` or `origin/HEAD`
    pub fn is_symbolic_head(&self) -> bool {
        self.0 == "HEAD" || self.0.ends_with("/HEAD")
    }

    /// The bare branch name behind a `<remote>/` prefix
    ///
    /// ```
    /// use backlog_git::BranchName;
    ///
    /// let tracking = BranchName::from_ref_name("origin/feature/login");
    /// assert_eq!(tracking.strip_remote("origin").unwrap().as_str(), "feature/login");
    /// assert!(tracking.strip_remote("upstream").is_none());
    /// ```
    pub fn strip_remote(&self, remote: &str) -> Option<BranchName> {
        self.0
            .strip_prefix(remote)
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|bare| !bare.is_empty())
            .map(BranchName::from_ref_name)
    }
}

impl fmt::Display for BranchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for BranchName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Git's seconds-since-epoch as a UTC timestamp
pub(crate) fn timestamp_from_seconds(seconds: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(seconds, 0).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbolic_head_detection() {
        assert!(BranchName::from_ref_name("HEAD").is_symbolic_head());
        assert!(BranchName::from_ref_name("origin/HEAD").is_symbolic_head());
        assert!(!BranchName::from_ref_name("origin/HEADLINE").is_symbolic_head());
        assert!(!BranchName::from_ref_name("main").is_symbolic_head());
    }

    #[test]
    fn test_strip_remote_requires_separator() {
        assert!(BranchName::from_ref_name("originals/x").strip_remote("origin").is_none());
        assert!(BranchName::from_ref_name("origin/").strip_remote("origin").is_none());
    }

    #[test]
    fn test_branch_names_sort_lexicographically() {
        let mut names = vec![
            BranchName::from_ref_name("zeta"),
            BranchName::from_ref_name("alpha"),
            BranchName::from_ref_name("origin/alpha"),
        ];
        names.sort();
        let sorted: Vec<_> = names.iter().map(BranchName::as_str).collect();
        assert_eq!(sorted, vec!["alpha", "origin/alpha", "zeta"]);
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let json = serde_json::to_string(&BranchName::from_ref_name("main")).unwrap();
        assert_eq!(json, "\"main\"");
    }

    #[test]
    fn test_timestamp_from_seconds() {
        assert_eq!(timestamp_from_seconds(1_700_000_000).timestamp(), 1_700_000_000);
    }
}
