//! In-memory [`RefBackend`]
//!
//! Serves refs, files and timestamps from plain maps. Used by tests and dry
//! runs where a real repository would be noise. Every call is recorded so tests
//! can assert which backend operations an engine path performed, and failures
//! can be injected per ref, per file read or for `fetch`.

use crate::backend::RefBackend;
use crate::error::{GitError, GitResult};
use crate::types::{BranchName, FileTimestamps};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, Default)]
struct RefSnapshot {
    files: BTreeMap<String, (String, DateTime<Utc>)>,
}

impl RefSnapshot {
    fn tip(&self) -> Option<DateTime<Utc>> {
        self.files.values().map(|(_, when)| *when).max()
    }
}

/// How an injected fetch failure presents itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchFailure {
    /// Transport failure, classified as network
    Network,
    /// Any other failure
    Other,
}

#[derive(Debug, Default)]
struct State {
    local: BTreeSet<String>,
    remotes: BTreeMap<String, BTreeSet<String>>,
    refs: BTreeMap<String, RefSnapshot>,
    failing_refs: BTreeSet<String>,
    failing_reads: BTreeSet<(String, String)>,
    fetch_failure: Option<FetchFailure>,
    calls: Vec<String>,
}

/// [`RefBackend`] over in-memory refs
#[derive(Debug, Default)]
pub struct InMemoryRefBackend {
    state: Mutex<State>,
}

impl InMemoryRefBackend {
    /// Create an empty backend with no refs
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a local branch, even if it holds no files
    pub fn add_local_branch(&self, branch: &str) -> &Self {
        let mut state = self.state();
        state.local.insert(branch.to_string());
        state.refs.entry(branch.to_string()).or_default();
        drop(state);
        self
    }

    /// Register a remote-tracking branch as `<remote>/<branch>`
    pub fn add_remote_branch(&self, remote: &str, branch: &str) -> &Self {
        let qualified = format!("{}/{}", remote, branch);
        let mut state = self.state();
        state
            .remotes
            .entry(remote.to_string())
            .or_default()
            .insert(qualified.clone());
        state.refs.entry(qualified).or_default();
        drop(state);
        self
    }

    /// Register a symbolic `<remote>/HEAD` entry in the remote listing
    ///
    /// Mimics a backend that does not filter symbolic heads itself.
    pub fn add_remote_head(&self, remote: &str) -> &Self {
        self.state()
            .remotes
            .entry(remote.to_string())
            .or_default()
            .insert(format!("{}/HEAD", remote));
        self
    }

    /// Put a file on a local branch, registering the branch if needed
    pub fn put_local_file(
        &self,
        branch: &str,
        path: &str,
        content: &str,
        modified: DateTime<Utc>,
    ) -> &Self {
        self.add_local_branch(branch);
        self.put_file(branch, path, content, modified)
    }

    /// Put a file on a remote-tracking branch, registering it if needed
    pub fn put_remote_file(
        &self,
        remote: &str,
        branch: &str,
        path: &str,
        content: &str,
        modified: DateTime<Utc>,
    ) -> &Self {
        self.add_remote_branch(remote, branch);
        self.put_file(&format!("{}/{}", remote, branch), path, content, modified)
    }

    fn put_file(
        &self,
        reference: &str,
        path: &str,
        content: &str,
        modified: DateTime<Utc>,
    ) -> &Self {
        self.state()
            .refs
            .entry(reference.to_string())
            .or_default()
            .files
            .insert(path.to_string(), (content.to_string(), modified));
        self
    }

    /// Make every read of `reference` fail as an inaccessible ref
    pub fn fail_ref(&self, reference: &str) -> &Self {
        self.state().failing_refs.insert(reference.to_string());
        self
    }

    /// Make reads of one file on `reference` fail while the rest of the ref stays readable
    pub fn fail_read(&self, reference: &str, path: &str) -> &Self {
        self.state()
            .failing_reads
            .insert((reference.to_string(), path.to_string()));
        self
    }

    /// Make `fetch` fail
    pub fn fail_fetch(&self, failure: FetchFailure) -> &Self {
        self.state().fetch_failure = Some(failure);
        self
    }

    /// Names of the backend operations called so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    /// Number of calls to a given operation
    pub fn call_count(&self, operation: &str) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|call| call.as_str() == operation)
            .count()
    }

    fn record(&self, operation: &str) {
        self.state().calls.push(operation.to_string());
    }

    fn snapshot(&self, operation: &str, reference: &str) -> GitResult<Option<RefSnapshot>> {
        let mut state = self.state();
        state.calls.push(operation.to_string());
        if state.failing_refs.contains(reference) {
            return Err(GitError::ref_access_failed(reference, "injected failure"));
        }
        Ok(state.refs.get(reference).cloned())
    }
}

fn under_prefix(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_matches('/');
    prefix.is_empty()
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

#[async_trait]
impl RefBackend for InMemoryRefBackend {
    async fn list_local_refs(&self) -> GitResult<Vec<BranchName>> {
        self.record("list_local_refs");
        Ok(self
            .state()
            .local
            .iter()
            .map(BranchName::from_ref_name)
            .collect())
    }

    async fn list_remotes(&self) -> GitResult<Vec<String>> {
        self.record("list_remotes");
        Ok(self.state().remotes.keys().cloned().collect())
    }

    async fn list_remote_refs(&self, remote: &str) -> GitResult<Vec<BranchName>> {
        self.record("list_remote_refs");
        Ok(self
            .state()
            .remotes
            .get(remote)
            .map(|names| names.iter().map(BranchName::from_ref_name).collect())
            .unwrap_or_default())
    }

    async fn fetch(&self, remote: &str) -> GitResult<()> {
        self.record("fetch");
        match self.state().fetch_failure {
            Some(FetchFailure::Network) => Err(GitError::network_unavailable(
                remote,
                "could not resolve host",
            )),
            Some(FetchFailure::Other) => Err(GitError::generic(format!(
                "remote '{}' rejected the fetch",
                remote
            ))),
            None => Ok(()),
        }
    }

    async fn list_files_at_ref(&self, reference: &str, prefix: &str) -> GitResult<Vec<String>> {
        Ok(self
            .snapshot("list_files_at_ref", reference)?
            .map(|snapshot| {
                snapshot
                    .files
                    .keys()
                    .filter(|path| under_prefix(path, prefix))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn read_file_at_ref(&self, reference: &str, path: &str) -> GitResult<Option<String>> {
        let snapshot = self.snapshot("read_file_at_ref", reference)?;
        let failing = self
            .state()
            .failing_reads
            .contains(&(reference.to_string(), path.to_string()));
        if failing {
            return Err(GitError::ref_access_failed(
                reference,
                format!("could not read blob for '{}'", path),
            ));
        }
        Ok(snapshot.and_then(|snapshot| {
            snapshot
                .files
                .get(path)
                .map(|(content, _)| content.clone())
        }))
    }

    async fn last_modified_at(
        &self,
        reference: &str,
        path: &str,
    ) -> GitResult<Option<DateTime<Utc>>> {
        Ok(self
            .snapshot("last_modified_at", reference)?
            .and_then(|snapshot| snapshot.files.get(path).map(|(_, when)| *when)))
    }

    async fn last_modified_map_at(
        &self,
        reference: &str,
        prefix: &str,
    ) -> GitResult<FileTimestamps> {
        Ok(self
            .snapshot("last_modified_map_at", reference)?
            .map(|snapshot| {
                snapshot
                    .files
                    .iter()
                    .filter(|(path, _)| under_prefix(path, prefix))
                    .map(|(path, (_, when))| (path.clone(), *when))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn tip_time(&self, reference: &str) -> GitResult<Option<DateTime<Utc>>> {
        Ok(self
            .snapshot("tip_time", reference)?
            .and_then(|snapshot| snapshot.tip()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(seconds: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(seconds, 0).unwrap()
    }

    #[tokio::test]
    async fn test_prefix_filtering_is_directory_aware() {
        let backend = InMemoryRefBackend::new();
        backend
            .put_local_file("main", "backlog/tasks/task-1.md", "one", at(10))
            .put_local_file("main", "backlog/tasks-old/task-2.md", "two", at(20));

        let files = backend
            .list_files_at_ref("main", "backlog/tasks")
            .await
            .unwrap();
        assert_eq!(files, vec!["backlog/tasks/task-1.md".to_string()]);
        assert_eq!(backend.tip_time("main").await.unwrap(), Some(at(20)));
    }

    #[tokio::test]
    async fn test_unknown_ref_is_empty_and_failing_ref_errors() {
        let backend = InMemoryRefBackend::new();
        backend.add_local_branch("main").fail_ref("broken");

        assert!(backend.list_files_at_ref("ghost", "").await.unwrap().is_empty());
        assert!(backend.read_file_at_ref("ghost", "x").await.unwrap().is_none());
        let err = backend.list_files_at_ref("broken", "").await.unwrap_err();
        assert!(matches!(err, GitError::RefAccessFailed { .. }));
    }

    #[tokio::test]
    async fn test_failing_read_only_affects_that_file() {
        let backend = InMemoryRefBackend::new();
        backend
            .put_local_file("main", "backlog/tasks/task-1.md", "one", at(1))
            .put_local_file("main", "backlog/tasks/task-2.md", "two", at(2))
            .fail_read("main", "backlog/tasks/task-2.md");

        assert_eq!(backend.list_files_at_ref("main", "backlog").await.unwrap().len(), 2);
        let one = backend.read_file_at_ref("main", "backlog/tasks/task-1.md").await;
        assert_eq!(one.unwrap().as_deref(), Some("one"));
        let err = backend
            .read_file_at_ref("main", "backlog/tasks/task-2.md")
            .await
            .unwrap_err();
        assert!(matches!(err, GitError::RefAccessFailed { .. }));
    }

    #[tokio::test]
    async fn test_remote_listing_and_fetch_failures() {
        let backend = InMemoryRefBackend::new();
        backend
            .put_remote_file("origin", "feature", "backlog/tasks/task-5.md", "five", at(5))
            .add_remote_head("origin")
            .fail_fetch(FetchFailure::Network);

        let names: Vec<String> = backend
            .list_remote_refs("origin")
            .await
            .unwrap()
            .into_iter()
            .map(BranchName::into_string)
            .collect();
        assert_eq!(names, vec!["origin/HEAD", "origin/feature"]);

        let err = backend.fetch("origin").await.unwrap_err();
        assert!(err.is_network());
        assert_eq!(backend.call_count("fetch"), 1);
        assert_eq!(backend.calls()[0], "list_remote_refs");
    }
}
