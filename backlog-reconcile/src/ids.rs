//! Collision-free id allocation across branches
//!
//! The next id is one past the largest id seen in the local working set or on
//! any branch. Scanning unmerged branches means two people working on
//! different branches never mint the same id, even before either branch is
//! pushed back.

use crate::entity::EntityKind;
use crate::error::{ReconcileError, Result};
use crate::gather::gather_tolerant;
use crate::layout::EntityLayout;
use crate::refs::{RefEnumerator, RefTreeReader};
use crate::store::LocalEntityStore;
use backlog_common::ProgressSink;
use backlog_config::ReconciliationConfig;
use backlog_git::RefBackend;
use regex::Regex;
use tracing::{debug, info, warn};

/// Sub-ids are always two digits wide, whatever the top-level padding
const SUB_ID_WIDTH: usize = 2;

/// Allocates the next id for an entity kind
#[derive(Debug)]
pub struct IdAllocator<'a> {
    backend: &'a dyn RefBackend,
    store: &'a dyn LocalEntityStore,
    layout: &'a EntityLayout,
    config: &'a ReconciliationConfig,
}

/// What an allocation is looking for
#[derive(Debug)]
struct IdPattern {
    /// Text before the numeric suffix, such as `task` or `task-7`
    stem: String,
    separator: char,
    matcher: Regex,
}

impl IdPattern {
    fn new(kind: EntityKind, parent: Option<&str>) -> Result<Self> {
        let (stem, separator) = match parent {
            Some(parent) => (kind.normalize_id(parent), '.'),
            None => (kind.prefix().to_string(), '-'),
        };
        let matcher = Regex::new(&format!(
            r"(?i)^{}{}(\d+)",
            regex::escape(&stem),
            regex::escape(&separator.to_string())
        ))
        .map_err(|e| ReconcileError::parse(stem.clone(), e.to_string()))?;
        Ok(Self {
            stem,
            separator,
            matcher,
        })
    }

    /// Numeric suffix of an id or file name, if it belongs to this pattern
    fn suffix(&self, candidate: &str) -> Option<u64> {
        let name = candidate.rsplit('/').next().unwrap_or(candidate);
        let captures = self.matcher.captures(name)?;
        let end = captures.get(0)?.end();
        // `task-7.md` is task 7 but `task-7.2.md` must not count as a sub-id of `task-7`
        let rest = &name[end..];
        let deeper = rest
            .strip_prefix('.')
            .is_some_and(|tail| tail.starts_with(|c: char| c.is_ascii_digit()));
        if self.separator == '.' && deeper {
            return None;
        }
        captures[1].parse().ok()
    }

    fn format(&self, number: u64, padding: Option<usize>) -> String {
        match (self.separator, padding) {
            ('.', _) => format!("{}.{:0width$}", self.stem, number, width = SUB_ID_WIDTH),
            (_, Some(width)) => format!("{}-{:0width$}", self.stem, number, width = width),
            _ => format!("{}-{}", self.stem, number),
        }
    }
}

impl<'a> IdAllocator<'a> {
    pub fn new(
        backend: &'a dyn RefBackend,
        store: &'a dyn LocalEntityStore,
        layout: &'a EntityLayout,
        config: &'a ReconciliationConfig,
    ) -> Self {
        Self {
            backend,
            store,
            layout,
            config,
        }
    }

    /// Next id for `kind`, or the next sub-id under `parent`
    ///
    /// `parent` may be given with or without the kind prefix. Failure to read
    /// the local store is fatal; every branch-level failure only removes that
    /// branch from consideration.
    pub async fn allocate_next_id(
        &self,
        kind: EntityKind,
        parent: Option<&str>,
        progress: &dyn ProgressSink,
    ) -> Result<String> {
        let pattern = IdPattern::new(kind, parent)?;

        progress.report(&format!("Scanning local {} ids", kind));
        let mut highest = self.highest_local(kind, &pattern).await?;

        if self.config.remote_operations {
            highest = highest.max(self.highest_on_branches(kind, &pattern, progress).await);
        } else {
            debug!("Remote operations disabled; allocating from local {} ids only", kind);
        }

        let next = highest
            .checked_add(1)
            .ok_or_else(|| ReconcileError::IdSpaceExhausted {
                kind: kind.to_string(),
                stem: pattern.stem.clone(),
                highest,
            })?;
        let id = pattern.format(next, self.config.padding_width());
        info!("Allocated {} id {}", kind, id);
        Ok(id)
    }

    async fn highest_local(&self, kind: EntityKind, pattern: &IdPattern) -> Result<u64> {
        let mut highest = 0;
        for category in kind.id_space_categories() {
            for record in self.store.list_local_entities(kind, *category).await? {
                if let Some(number) = pattern.suffix(&record.id) {
                    highest = highest.max(number);
                }
            }
        }
        Ok(highest)
    }

    async fn highest_on_branches(
        &self,
        kind: EntityKind,
        pattern: &IdPattern,
        progress: &dyn ProgressSink,
    ) -> u64 {
        self.fetch_remotes(progress).await;

        let branches = RefEnumerator::new(self.backend)
            .active_within_days(self.config.active_branch_days)
            .list_branches(true)
            .await;
        progress.report(&format!("Checking {} branches for existing {} ids", branches.len(), kind));

        let directories = self.layout.id_space_directories(kind);
        let reader = RefTreeReader::new(self.backend);
        let units = branches.iter().map(|branch| {
            let directories = &directories;
            (branch.as_str(), async move {
                let mut highest = 0;
                for directory in directories {
                    for path in reader.list_files(branch, directory).await? {
                        if let Some(number) = pattern.suffix(&path) {
                            highest = highest.max(number);
                        }
                    }
                }
                Ok::<_, ReconcileError>(highest)
            })
        });

        let gathered = gather_tolerant(units).await;
        if !gathered.skipped.is_empty() {
            debug!("{} branches could not be scanned for ids", gathered.skipped.len());
        }
        gathered.into_values().max().unwrap_or(0)
    }

    /// Best-effort fetch so remote-tracking branches are current
    async fn fetch_remotes(&self, progress: &dyn ProgressSink) {
        let remotes = match self.backend.list_remotes().await {
            Ok(remotes) => remotes,
            Err(e) => {
                debug!("Could not list remotes: {}", e);
                return;
            }
        };
        for remote in remotes {
            progress.report(&format!("Fetching {}", remote));
            match self.backend.fetch(&remote).await {
                Ok(()) => {}
                Err(e) if e.is_network() => debug!("Fetch from '{}' skipped: {}", remote, e),
                Err(e) => warn!("Fetch from '{}' failed, using existing refs: {}", remote, e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_level_suffixes() {
        let pattern = IdPattern::new(EntityKind::Task, None).unwrap();
        assert_eq!(pattern.suffix("backlog/tasks/task-12 - Fix login.md"), Some(12));
        assert_eq!(pattern.suffix("TASK-3.md"), Some(3));
        assert_eq!(pattern.suffix("task-7.01 - Sub.md"), Some(7));
        assert_eq!(pattern.suffix("doc-9.md"), None);
        assert_eq!(pattern.suffix("taskforce-1.md"), None);
    }

    #[test]
    fn test_sub_id_suffixes() {
        let pattern = IdPattern::new(EntityKind::Task, Some("7")).unwrap();
        assert_eq!(pattern.stem, "task-7");
        assert_eq!(pattern.suffix("task-7.03 - Sub.md"), Some(3));
        assert_eq!(pattern.suffix("Task-7.1.md"), Some(1));
        assert_eq!(pattern.suffix("task-7.2.1.md"), None);
        assert_eq!(pattern.suffix("task-70.1.md"), None);
        assert_eq!(pattern.suffix("task-7.md"), None);
    }

    #[test]
    fn test_formatting() {
        let top = IdPattern::new(EntityKind::Task, None).unwrap();
        assert_eq!(top.format(8, None), "task-8");
        assert_eq!(top.format(8, Some(3)), "task-008");
        assert_eq!(top.format(1234, Some(3)), "task-1234");

        let sub = IdPattern::new(EntityKind::Task, Some("TASK-7")).unwrap();
        assert_eq!(sub.format(4, Some(5)), "task-7.04");
        assert_eq!(sub.format(123, None), "task-7.123");

        let doc = IdPattern::new(EntityKind::Document, None).unwrap();
        assert_eq!(doc.format(1, None), "doc-1");
    }
}
