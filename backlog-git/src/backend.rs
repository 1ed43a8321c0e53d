//! The ref backend seam
//!
//! [`RefBackend`] is everything the reconciliation engine needs from version
//! control. [`GitRefBackend`] implements it on top of [`GitOperations`],
//! running each call on tokio's blocking pool with its own repository handle so
//! concurrent branch scans do not share a non-`Sync` `git2::Repository`.

use crate::error::{GitError, GitResult};
use crate::operations::GitOperations;
use crate::repository::GitRepository;
use crate::types::{BranchName, FileTimestamps};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::trace;

/// Read access to refs, trees and history
///
/// Contract shared by every implementation:
/// - unknown refs or paths produce empty results or `None`, never errors;
/// - errors mean the ref exists but could not be read, or the backend itself failed;
/// - `fetch` is idempotent and is the only call allowed to change repository state.
#[async_trait]
pub trait RefBackend: Send + Sync + std::fmt::Debug {
    /// Local branch names
    async fn list_local_refs(&self) -> GitResult<Vec<BranchName>>;

    /// Configured remote names
    async fn list_remotes(&self) -> GitResult<Vec<String>>;

    /// Remote-tracking branches of `remote`, as `<remote>/<name>`
    async fn list_remote_refs(&self, remote: &str) -> GitResult<Vec<BranchName>>;

    /// Update remote-tracking refs of `remote`
    async fn fetch(&self, remote: &str) -> GitResult<()>;

    /// Recursive file listing under `prefix` on `reference`
    async fn list_files_at_ref(&self, reference: &str, prefix: &str) -> GitResult<Vec<String>>;

    /// File content on `reference`
    async fn read_file_at_ref(&self, reference: &str, path: &str) -> GitResult<Option<String>>;

    /// Time of the newest change to `path` reachable from `reference`
    async fn last_modified_at(
        &self,
        reference: &str,
        path: &str,
    ) -> GitResult<Option<DateTime<Utc>>>;

    /// Last-change times of every file under `prefix` on `reference`
    ///
    /// The default asks for each file separately; backends that can answer in
    /// one history walk should override it.
    async fn last_modified_map_at(
        &self,
        reference: &str,
        prefix: &str,
    ) -> GitResult<FileTimestamps> {
        let mut map = FileTimestamps::new();
        for path in self.list_files_at_ref(reference, prefix).await? {
            if let Some(when) = self.last_modified_at(reference, &path).await? {
                map.insert(path, when);
            }
        }
        Ok(map)
    }

    /// Commit time of the tip of `reference`
    async fn tip_time(&self, reference: &str) -> GitResult<Option<DateTime<Utc>>>;
}

/// [`RefBackend`] backed by a git repository on disk
#[derive(Debug, Clone)]
pub struct GitRefBackend {
    /// Repository root; every call reopens the repository from here
    root: PathBuf,
}

impl GitRefBackend {
    /// Locate the repository containing `path`
    ///
    /// Fails immediately when no repository exists, so later calls only fail
    /// for reasons specific to the ref being read.
    pub fn discover<P: AsRef<Path>>(path: P) -> GitResult<Self> {
        let repo = GitRepository::open(path)?;
        Ok(Self {
            root: repo.path().to_path_buf(),
        })
    }

    /// Repository root this backend reads from
    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn run<T, F>(&self, operation: &'static str, f: F) -> GitResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&GitOperations) -> GitResult<T> + Send + 'static,
    {
        let root = self.root.clone();
        trace!("Running git operation '{}' in {}", operation, root.display());
        tokio::task::spawn_blocking(move || {
            let ops = GitOperations::with_work_dir(root)?;
            f(&ops)
        })
        .await
        .map_err(|e| {
            GitError::generic(format!(
                "git operation '{}' did not complete: {}",
                operation, e
            ))
        })?
    }
}

#[async_trait]
impl RefBackend for GitRefBackend {
    async fn list_local_refs(&self) -> GitResult<Vec<BranchName>> {
        self.run("list_local_refs", |ops| ops.list_local_branches())
            .await
    }

    async fn list_remotes(&self) -> GitResult<Vec<String>> {
        self.run("list_remotes", |ops| ops.list_remotes()).await
    }

    async fn list_remote_refs(&self, remote: &str) -> GitResult<Vec<BranchName>> {
        let remote = remote.to_string();
        self.run("list_remote_refs", move |ops| ops.list_remote_branches(&remote))
            .await
    }

    async fn fetch(&self, remote: &str) -> GitResult<()> {
        let remote = remote.to_string();
        self.run("fetch", move |ops| ops.fetch(&remote)).await
    }

    async fn list_files_at_ref(&self, reference: &str, prefix: &str) -> GitResult<Vec<String>> {
        let (reference, prefix) = (reference.to_string(), prefix.to_string());
        self.run("list_files_at_ref", move |ops| ops.list_files(&reference, &prefix))
            .await
    }

    async fn read_file_at_ref(&self, reference: &str, path: &str) -> GitResult<Option<String>> {
        let (reference, path) = (reference.to_string(), path.to_string());
        self.run("read_file_at_ref", move |ops| ops.read_file(&reference, &path))
            .await
    }

    async fn last_modified_at(
        &self,
        reference: &str,
        path: &str,
    ) -> GitResult<Option<DateTime<Utc>>> {
        let (reference, path) = (reference.to_string(), path.to_string());
        self.run("last_modified_at", move |ops| ops.last_modified(&reference, &path))
            .await
    }

    async fn last_modified_map_at(
        &self,
        reference: &str,
        prefix: &str,
    ) -> GitResult<FileTimestamps> {
        let (reference, prefix) = (reference.to_string(), prefix.to_string());
        self.run("last_modified_map_at", move |ops| {
            ops.last_modified_map(&reference, &prefix)
        })
        .await
    }

    async fn tip_time(&self, reference: &str) -> GitResult<Option<DateTime<Utc>>> {
        let reference = reference.to_string();
        self.run("tip_time", move |ops| ops.tip_time(&reference))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::{Repository, Signature, Time};
    use tempfile::TempDir;

    fn repo_with_task() -> TempDir {
        let temp_dir = TempDir::new().unwrap();
        let repo = Repository::init(temp_dir.path()).unwrap();
        let path = temp_dir.path().join("backlog/tasks/task-3 - Third.md");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "---\nstatus: Done\n---\n").unwrap();

        let mut index = repo.index().unwrap();
        index
            .add_path(Path::new("backlog/tasks/task-3 - Third.md"))
            .unwrap();
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let sig = Signature::new("Test", "test@example.com", &Time::new(1_700_000_000, 0)).unwrap();
        repo.commit(Some("HEAD"), &sig, &sig, "initial", &tree, &[])
            .unwrap();
        temp_dir
    }

    #[tokio::test]
    async fn test_git_backend_reads_through_blocking_pool() {
        let temp_dir = repo_with_task();
        let backend = GitRefBackend::discover(temp_dir.path()).unwrap();

        let branches = backend.list_local_refs().await.unwrap();
        assert_eq!(branches.len(), 1);
        let branch = branches[0].as_str();

        let map = backend
            .last_modified_map_at(branch, "backlog/tasks")
            .await
            .unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(
            map["backlog/tasks/task-3 - Third.md"].timestamp(),
            1_700_000_000
        );

        let content = backend
            .read_file_at_ref(branch, "backlog/tasks/task-3 - Third.md")
            .await
            .unwrap();
        assert!(content.unwrap().contains("Done"));
        assert!(backend.list_remotes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_reads_share_nothing() {
        let temp_dir = repo_with_task();
        let backend = GitRefBackend::discover(temp_dir.path()).unwrap();
        let branch = backend.list_local_refs().await.unwrap()[0].to_string();

        let (a, b) = tokio::join!(
            backend.list_files_at_ref(&branch, "backlog"),
            backend.tip_time(&branch)
        );
        assert_eq!(a.unwrap().len(), 1);
        assert!(b.unwrap().is_some());
    }

    #[test]
    fn test_discover_outside_repository_fails() {
        let temp_dir = TempDir::new().unwrap();
        let err = GitRefBackend::discover(temp_dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, GitError::RepositoryNotFound { .. }));
    }
}
