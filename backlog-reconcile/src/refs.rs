//! Branch enumeration and read-only tree access

use crate::error::{ReconcileError, Result};
use backlog_git::{FileTimestamps, RefBackend};
use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Lists every branch worth scanning
///
/// Remote-tracking branches are reported both qualified (`origin/feature`)
/// and bare (`feature`), symbolic heads are dropped and the result is a sorted
/// set. Enumeration never fails: an unreadable listing contributes nothing.
#[derive(Debug, Clone, Copy)]
pub struct RefEnumerator<'a> {
    backend: &'a dyn RefBackend,
    active_within_days: Option<u32>,
}

impl<'a> RefEnumerator<'a> {
    pub fn new(backend: &'a dyn RefBackend) -> Self {
        Self {
            backend,
            active_within_days: None,
        }
    }

    /// Drop branches whose tip commit is older than `days`
    ///
    /// Branches whose tip time cannot be determined are kept.
    pub fn active_within_days(mut self, days: Option<u32>) -> Self {
        self.active_within_days = days;
        self
    }

    pub async fn list_branches(&self, include_remote: bool) -> BTreeSet<String> {
        let mut names = BTreeSet::new();

        match self.backend.list_local_refs().await {
            Ok(refs) => names.extend(
                refs.into_iter()
                    .filter(|name| !name.is_symbolic_head())
                    .map(|name| name.into_string()),
            ),
            Err(e) => warn!("Could not list local branches: {}", e),
        }

        if include_remote {
            let remotes = match self.backend.list_remotes().await {
                Ok(remotes) => remotes,
                Err(e) => {
                    debug!("Could not list remotes: {}", e);
                    Vec::new()
                }
            };
            for remote in remotes {
                match self.backend.list_remote_refs(&remote).await {
                    Ok(refs) => {
                        for name in refs.into_iter().filter(|name| !name.is_symbolic_head()) {
                            if let Some(bare) = name.strip_remote(&remote) {
                                names.insert(bare.into_string());
                            }
                            names.insert(name.into_string());
                        }
                    }
                    Err(e) => debug!("Could not list branches of remote '{}': {}", remote, e),
                }
            }
        }

        match self.active_within_days {
            Some(days) => self.retain_recent(names, days).await,
            None => names,
        }
    }

    async fn retain_recent(&self, names: BTreeSet<String>, days: u32) -> BTreeSet<String> {
        let Some(cutoff) = Utc::now().checked_sub_signed(Duration::days(i64::from(days))) else {
            debug!(
                "Branch window of {} days reaches before the earliest date; keeping all branches",
                days
            );
            return names;
        };
        let tips = join_all(names.iter().map(|name| self.backend.tip_time(name))).await;

        names
            .into_iter()
            .zip(tips)
            .filter(|(name, tip)| match tip {
                Ok(Some(when)) if *when < cutoff => {
                    debug!(
                        "Ignoring branch '{}': last commit {} is older than {} days",
                        name, when, days
                    );
                    false
                }
                _ => true,
            })
            .map(|(name, _)| name)
            .collect()
    }
}

/// Read-only access to one branch's tree
///
/// Unknown branches and paths read as empty; only genuine backend failures
/// become [`ReconcileError::RefAccess`].
#[derive(Debug, Clone, Copy)]
pub struct RefTreeReader<'a> {
    backend: &'a dyn RefBackend,
}

impl<'a> RefTreeReader<'a> {
    pub fn new(backend: &'a dyn RefBackend) -> Self {
        Self { backend }
    }

    pub async fn list_files(&self, branch: &str, prefix: &str) -> Result<Vec<String>> {
        self.backend
            .list_files_at_ref(branch, prefix)
            .await
            .map_err(|e| ReconcileError::ref_access(branch, e))
    }

    pub async fn read_file(&self, branch: &str, path: &str) -> Result<Option<String>> {
        self.backend
            .read_file_at_ref(branch, path)
            .await
            .map_err(|e| ReconcileError::ref_access(branch, e))
    }

    pub async fn last_modified(&self, branch: &str, path: &str) -> Result<Option<DateTime<Utc>>> {
        self.backend
            .last_modified_at(branch, path)
            .await
            .map_err(|e| ReconcileError::ref_access(branch, e))
    }

    pub async fn last_modified_map(&self, branch: &str, prefix: &str) -> Result<FileTimestamps> {
        self.backend
            .last_modified_map_at(branch, prefix)
            .await
            .map_err(|e| ReconcileError::ref_access(branch, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backlog_git::InMemoryRefBackend;

    fn days_ago(days: i64) -> DateTime<Utc> {
        Utc::now() - Duration::days(days)
    }

    #[tokio::test]
    async fn test_remote_branches_are_listed_qualified_and_bare() {
        let backend = InMemoryRefBackend::new();
        backend
            .add_local_branch("main")
            .add_remote_branch("origin", "main")
            .add_remote_branch("origin", "feature/login")
            .add_remote_head("origin");

        let branches = RefEnumerator::new(&backend).list_branches(true).await;
        let branches: Vec<_> = branches.iter().map(String::as_str).collect();
        assert_eq!(
            branches,
            vec!["feature/login", "main", "origin/feature/login", "origin/main"]
        );
    }

    #[tokio::test]
    async fn test_local_only_enumeration_skips_remotes() {
        let backend = InMemoryRefBackend::new();
        backend.add_local_branch("main").add_remote_branch("origin", "feature");

        let branches = RefEnumerator::new(&backend).list_branches(false).await;
        assert_eq!(branches.into_iter().collect::<Vec<_>>(), vec!["main".to_string()]);
        assert_eq!(backend.call_count("list_remotes"), 0);
    }

    #[tokio::test]
    async fn test_no_remotes_is_not_an_error() {
        let backend = InMemoryRefBackend::new();
        let branches = RefEnumerator::new(&backend).list_branches(true).await;
        assert!(branches.is_empty());
    }

    #[tokio::test]
    async fn test_stale_branches_are_dropped_when_window_is_set() {
        let backend = InMemoryRefBackend::new();
        backend
            .put_local_file("fresh", "backlog/tasks/task-1.md", "", days_ago(1))
            .put_local_file("stale", "backlog/tasks/task-2.md", "", days_ago(90))
            .add_local_branch("empty");

        let branches = RefEnumerator::new(&backend)
            .active_within_days(Some(30))
            .list_branches(false)
            .await;
        let branches: Vec<_> = branches.iter().map(String::as_str).collect();
        assert_eq!(branches, vec!["empty", "fresh"]);
    }

    #[tokio::test]
    async fn test_window_past_the_earliest_date_keeps_every_branch() {
        let backend = InMemoryRefBackend::new();
        backend
            .put_local_file("ancient", "backlog/tasks/task-1.md", "", days_ago(10_000))
            .add_local_branch("main");

        let branches = RefEnumerator::new(&backend)
            .active_within_days(Some(u32::MAX))
            .list_branches(false)
            .await;
        assert_eq!(branches.len(), 2);
    }

    #[tokio::test]
    async fn test_reader_maps_failures_to_ref_access() {
        let backend = InMemoryRefBackend::new();
        backend
            .put_local_file("main", "backlog/tasks/task-1.md", "content", days_ago(2))
            .fail_ref("broken");

        let reader = RefTreeReader::new(&backend);
        assert_eq!(reader.list_files("main", "backlog/tasks").await.unwrap().len(), 1);
        assert_eq!(
            reader.read_file("main", "backlog/tasks/task-1.md").await.unwrap().as_deref(),
            Some("content")
        );
        assert!(reader.read_file("ghost", "backlog/tasks/task-1.md").await.unwrap().is_none());
        assert!(reader.last_modified("main", "missing.md").await.unwrap().is_none());

        let err = reader.list_files("broken", "backlog").await.unwrap_err();
        assert!(matches!(err, ReconcileError::RefAccess { ref branch, .. } if branch == "broken"));
    }
}
