//! Read-only git operations
//!
//! [`GitOperations`] answers every question the reconciliation engine asks of
//! a repository using git2 directly: ref listing, tree listing and blob reads
//! at a ref, and last-change timestamps from history. None of these touch the
//! index or the working tree.
//!
//! Unknown refs and paths are not errors. They produce empty listings and
//! `None`, so a branch that was deleted between enumeration and reading simply
//! contributes nothing.

use crate::error::{convert_git2_error, GitError, GitResult};
use crate::repository::GitRepository;
use crate::types::{timestamp_from_seconds, BranchName, FileTimestamps};
use chrono::{DateTime, Utc};
use git2::{
    BranchType, Commit, ErrorCode, ObjectType, Oid, Sort, Tree, TreeWalkMode, TreeWalkResult,
};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Main struct for performing read-only Git operations
#[derive(Debug)]
pub struct GitOperations {
    /// The underlying git repository
    repo: GitRepository,
}

impl GitOperations {
    /// Open the repository containing `work_dir`
    pub fn with_work_dir<P: Into<PathBuf>>(work_dir: P) -> GitResult<Self> {
        let work_dir = work_dir.into();
        debug!(
            "Creating GitOperations for directory: {}",
            work_dir.display()
        );

        let repo = GitRepository::open(&work_dir)?;
        Ok(Self { repo })
    }

    /// Get the repository instance
    pub fn repository(&self) -> &GitRepository {
        &self.repo
    }

    /// List all local branches
    pub fn list_local_branches(&self) -> GitResult<Vec<BranchName>> {
        self.list_branches_of_type(BranchType::Local)
    }

    /// List configured remote names
    pub fn list_remotes(&self) -> GitResult<Vec<String>> {
        let remotes = self
            .repo
            .inner()
            .remotes()
            .map_err(|e| convert_git2_error("list_remotes", e))?;

        Ok(remotes.iter().flatten().map(str::to_string).collect())
    }

    /// List remote-tracking branches of one remote as `<remote>/<name>`
    ///
    /// Symbolic entries such as `origin/HEAD` are excluded. A remote with no
    /// tracking refs yields an empty list.
    pub fn list_remote_branches(&self, remote: &str) -> GitResult<Vec<BranchName>> {
        let prefix = format!("{}/", remote);
        Ok(self
            .list_branches_of_type(BranchType::Remote)?
            .into_iter()
            .filter(|name| name.as_str().starts_with(&prefix) && !name.is_symbolic_head())
            .collect())
    }

    fn list_branches_of_type(&self, branch_type: BranchType) -> GitResult<Vec<BranchName>> {
        let repo = self.repo.inner();
        let branches = repo
            .branches(Some(branch_type))
            .map_err(|e| convert_git2_error("list_branches", e))?;

        let mut branch_names = Vec::new();
        for branch_result in branches {
            let (branch, _) =
                branch_result.map_err(|e| convert_git2_error("iterate_branches", e))?;

            if branch.get().symbolic_target().is_some() {
                continue;
            }

            if let Some(name) = branch
                .name()
                .map_err(|e| convert_git2_error("get_branch_name", e))?
            {
                branch_names.push(BranchName::from_ref_name(name));
            }
        }

        branch_names.sort();
        Ok(branch_names)
    }

    /// Fetch a remote using its configured refspecs
    ///
    /// A remote that is not configured is a no-op. Transport failures are
    /// reported as [`GitError::NetworkUnavailable`].
    pub fn fetch(&self, remote_name: &str) -> GitResult<()> {
        let repo = self.repo.inner();
        let mut remote = match repo.find_remote(remote_name) {
            Ok(remote) => remote,
            Err(e) if e.code() == ErrorCode::NotFound => {
                debug!("Remote '{}' not configured, nothing to fetch", remote_name);
                return Ok(());
            }
            Err(e) => return Err(convert_git2_error("find_remote", e)),
        };

        remote
            .fetch(&[] as &[&str], None, None)
            .map_err(|e| {
                if crate::error::is_network_git2_error(&e) {
                    GitError::network_unavailable(remote_name, e.message())
                } else {
                    convert_git2_error("fetch", e)
                }
            })?;

        info!("Fetched remote {}", remote_name);
        Ok(())
    }

    /// List blob paths under `prefix` as they exist on `reference`
    pub fn list_files(&self, reference: &str, prefix: &str) -> GitResult<Vec<String>> {
        let Some(tree) = self.tree_at(reference)? else {
            return Ok(Vec::new());
        };

        let prefix = prefix.trim_matches('/');
        let Some(subtree) = self.subtree(&tree, prefix)? else {
            return Ok(Vec::new());
        };

        let mut files = Vec::new();
        subtree
            .walk(TreeWalkMode::PreOrder, |root, entry| {
                if entry.kind() == Some(ObjectType::Blob) {
                    if let Some(name) = entry.name() {
                        files.push(join_path(prefix, &format!("{}{}", root, name)));
                    }
                }
                TreeWalkResult::Ok
            })
            .map_err(|e| convert_git2_error("walk_tree", e))?;

        files.sort();
        Ok(files)
    }

    /// Read a file's content as it exists on `reference`
    pub fn read_file(&self, reference: &str, path: &str) -> GitResult<Option<String>> {
        let Some(tree) = self.tree_at(reference)? else {
            return Ok(None);
        };

        let entry = match tree.get_path(Path::new(path)) {
            Ok(entry) => entry,
            Err(e) if e.code() == ErrorCode::NotFound => return Ok(None),
            Err(e) => return Err(convert_git2_error("get_path", e)),
        };

        let object = entry
            .to_object(self.repo.inner())
            .map_err(|e| convert_git2_error("entry_to_object", e))?;
        match object.into_blob() {
            Ok(blob) => Ok(Some(String::from_utf8_lossy(blob.content()).into_owned())),
            Err(_) => Ok(None),
        }
    }

    /// Timestamp of the most recent commit reachable from `reference` that changed `path`
    pub fn last_modified(&self, reference: &str, path: &str) -> GitResult<Option<DateTime<Utc>>> {
        let mut found = self.last_modified_many(reference, &[path.to_string()])?;
        Ok(found.remove(path))
    }

    /// Last-change timestamps for every file under `prefix` on `reference`
    pub fn last_modified_map(&self, reference: &str, prefix: &str) -> GitResult<FileTimestamps> {
        let files = self.list_files(reference, prefix)?;
        self.last_modified_many(reference, &files)
    }

    /// Walk history once from the tip of `reference`, attributing each path to
    /// the newest commit whose first-parent diff touches it
    ///
    /// Paths that do not exist at the tip are never attributed.
    fn last_modified_many(&self, reference: &str, paths: &[String]) -> GitResult<FileTimestamps> {
        let mut found = FileTimestamps::new();
        let Some(tip) = self.commit_at(reference)? else {
            return Ok(found);
        };

        let tip_tree = tip
            .tree()
            .map_err(|e| convert_git2_error("tip_tree", e))?;
        let mut pending: BTreeSet<&str> = paths
            .iter()
            .map(String::as_str)
            .filter(|path| entry_id(&tip_tree, path).is_some())
            .collect();

        if pending.is_empty() {
            return Ok(found);
        }

        let repo = self.repo.inner();
        let mut revwalk = repo
            .revwalk()
            .map_err(|e| convert_git2_error("revwalk", e))?;
        revwalk
            .set_sorting(Sort::TIME)
            .map_err(|e| convert_git2_error("revwalk_sorting", e))?;
        revwalk
            .push(tip.id())
            .map_err(|e| convert_git2_error("revwalk_push", e))?;

        for oid in revwalk {
            if pending.is_empty() {
                break;
            }

            let oid = oid.map_err(|e| convert_git2_error("revwalk_next", e))?;
            let commit = repo
                .find_commit(oid)
                .map_err(|e| convert_git2_error("find_commit", e))?;
            let tree = commit
                .tree()
                .map_err(|e| convert_git2_error("commit_tree", e))?;
            let parent_tree = match commit.parent(0) {
                Ok(parent) => Some(
                    parent
                        .tree()
                        .map_err(|e| convert_git2_error("parent_tree", e))?,
                ),
                Err(_) => None,
            };
            let when = timestamp_from_seconds(commit.time().seconds());

            pending.retain(|path| {
                let current = entry_id(&tree, path);
                let previous = parent_tree.as_ref().and_then(|t| entry_id(t, path));
                if current.is_some() && current != previous {
                    found.insert((*path).to_string(), when);
                    false
                } else {
                    true
                }
            });
        }

        debug!(
            "Resolved {} of {} last-modified timestamps on {}",
            found.len(),
            paths.len(),
            reference
        );
        Ok(found)
    }

    /// Commit time of the tip of `reference`
    pub fn tip_time(&self, reference: &str) -> GitResult<Option<DateTime<Utc>>> {
        Ok(self
            .commit_at(reference)?
            .map(|commit| timestamp_from_seconds(commit.time().seconds())))
    }

    /// Resolve a short ref name (`main`, `origin/feature`) to its commit
    fn commit_at(&self, reference: &str) -> GitResult<Option<Commit<'_>>> {
        let repo = self.repo.inner();
        let resolved = match repo.resolve_reference_from_short_name(reference) {
            Ok(resolved) => resolved,
            Err(e) if matches!(e.code(), ErrorCode::NotFound | ErrorCode::InvalidSpec) => {
                debug!("Ref '{}' does not exist", reference);
                return Ok(None);
            }
            Err(e) => {
                return Err(GitError::ref_access_failed(reference, e.message()));
            }
        };

        resolved
            .peel_to_commit()
            .map(Some)
            .map_err(|e| GitError::ref_access_failed(reference, e.message()))
    }

    fn tree_at(&self, reference: &str) -> GitResult<Option<Tree<'_>>> {
        match self.commit_at(reference)? {
            Some(commit) => commit
                .tree()
                .map(Some)
                .map_err(|e| GitError::ref_access_failed(reference, e.message())),
            None => Ok(None),
        }
    }

    fn subtree<'r>(&'r self, tree: &Tree<'r>, prefix: &str) -> GitResult<Option<Tree<'r>>> {
        if prefix.is_empty() {
            return Ok(Some(tree.clone()));
        }

        let entry = match tree.get_path(Path::new(prefix)) {
            Ok(entry) => entry,
            Err(e) if e.code() == ErrorCode::NotFound => return Ok(None),
            Err(e) => return Err(convert_git2_error("get_path", e)),
        };

        let object = entry
            .to_object(self.repo.inner())
            .map_err(|e| convert_git2_error("entry_to_object", e))?;
        Ok(object.into_tree().ok())
    }
}

fn entry_id(tree: &Tree<'_>, path: &str) -> Option<Oid> {
    tree.get_path(Path::new(path)).ok().map(|entry| entry.id())
}

fn join_path(prefix: &str, relative: &str) -> String {
    if prefix.is_empty() {
        relative.to_string()
    } else {
        format!("{}/{}", prefix, relative)
    }
}
