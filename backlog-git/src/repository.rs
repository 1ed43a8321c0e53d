//! Repository discovery
//!
//! [`GitRepository`] pairs a `git2::Repository` with the root path the
//! backend needs to reopen the same repository from blocking-pool threads.

use crate::error::{GitError, GitResult};
use git2::Repository;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// An opened repository and its root
pub struct GitRepository {
    repo: Repository,
    /// Working directory, or the directory above `.git` for bare repositories
    root: PathBuf,
}

impl std::fmt::Debug for GitRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitRepository")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl GitRepository {
    /// Open the repository containing `path`, searching parent directories
    pub fn open<P: AsRef<Path>>(path: P) -> GitResult<Self> {
        let path = path.as_ref();
        debug!("Discovering git repository from {}", path.display());

        let repo = Repository::discover(path).map_err(|e| {
            let reason = match e.code() {
                git2::ErrorCode::NotFound => {
                    "no repository in this directory or any parent".to_string()
                }
                git2::ErrorCode::Invalid => "repository metadata is corrupt".to_string(),
                _ => e.message().to_string(),
            };
            warn!("Could not open repository at {}: {}", path.display(), reason);
            GitError::repository_not_found(path, reason)
        })?;

        let root = repo
            .workdir()
            .or_else(|| repo.path().parent())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| path.to_path_buf());

        Ok(Self { repo, root })
    }

    pub fn inner(&self) -> &Repository {
        &self.repo
    }

    /// Root directory the repository was discovered at
    pub fn path(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_discovery_from_backlog_subdirectory() {
        let temp_dir = TempDir::new().unwrap();
        Repository::init(temp_dir.path()).unwrap();
        let root = GitRepository::open(temp_dir.path()).unwrap();

        let tasks = temp_dir.path().join("backlog").join("tasks");
        std::fs::create_dir_all(&tasks).unwrap();

        let discovered = GitRepository::open(&tasks).unwrap();
        assert_eq!(root.path(), discovered.path());
        assert!(discovered.inner().is_empty().unwrap());
    }

    #[test]
    fn test_missing_repository() {
        let temp_dir = TempDir::new().unwrap();
        let err = GitRepository::open(temp_dir.path().join("nowhere")).unwrap_err();
        assert!(matches!(err, GitError::RepositoryNotFound { .. }));
    }
}
