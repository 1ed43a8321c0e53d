//! The local working set
//!
//! [`LocalEntityStore`] is the working tree's view of entities. It is the one
//! place reconciliation treats failure as fatal: if the local store cannot be
//! read at all there is nothing trustworthy to reconcile against.

use crate::entity::{compare_ids, Category, EntityKind, EntityRecord, Origin};
use crate::error::{ReconcileError, Result};
use crate::layout::EntityLayout;
use crate::parser::{EntityParser, FrontmatterParser};
use async_trait::async_trait;
use backlog_config::ReconciliationConfig;
use backlog_git::{FileTimestamps, RefBackend};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Read access to the entities in the working tree
#[async_trait]
pub trait LocalEntityStore: Send + Sync + std::fmt::Debug {
    /// Full records of `kind` stored locally in `category`, sorted by id
    async fn list_local_entities(
        &self,
        kind: EntityKind,
        category: Category,
    ) -> Result<Vec<EntityRecord>>;
}

/// Reads entity files from the project directory
///
/// `observed_at` is the file's modification time. With
/// [`with_history`](Self::with_history) committed files take the time of their
/// last commit on `HEAD` instead, which is comparable with the times branch
/// scans report; files git has never seen keep their modification time.
#[derive(Debug, Clone)]
pub struct FileSystemEntityStore {
    project_root: PathBuf,
    layout: EntityLayout,
    parser: Arc<dyn EntityParser>,
    history: Option<Arc<dyn RefBackend>>,
}

impl FileSystemEntityStore {
    pub fn new<P: Into<PathBuf>>(project_root: P, config: &ReconciliationConfig) -> Self {
        Self {
            project_root: project_root.into(),
            layout: EntityLayout::from_config(config),
            parser: Arc::new(FrontmatterParser),
            history: None,
        }
    }

    pub fn with_parser(mut self, parser: Arc<dyn EntityParser>) -> Self {
        self.parser = parser;
        self
    }

    /// Take timestamps of committed files from `HEAD` history
    pub fn with_history(mut self, backend: Arc<dyn RefBackend>) -> Self {
        self.history = Some(backend);
        self
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    async fn committed_times(&self, dir: &str) -> FileTimestamps {
        let Some(backend) = &self.history else {
            return FileTimestamps::new();
        };
        match backend.last_modified_map_at("HEAD", dir).await {
            Ok(times) => times,
            Err(e) => {
                debug!("No commit history for {}: {}", dir, e);
                FileTimestamps::new()
            }
        }
    }
}

#[async_trait]
impl LocalEntityStore for FileSystemEntityStore {
    async fn list_local_entities(
        &self,
        kind: EntityKind,
        category: Category,
    ) -> Result<Vec<EntityRecord>> {
        let Some(dir) = self.layout.directory(kind, category) else {
            return Ok(Vec::new());
        };
        let path = self.project_root.join(&dir);

        let mut entries = match tokio::fs::read_dir(&path).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ReconcileError::local_store(path, e)),
        };
        let committed = self.committed_times(&dir).await;

        let mut records = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ReconcileError::local_store(&path, e))?
        {
            let file_path = entry.path();
            let Some(name) = file_path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            if !name.ends_with(".md") {
                continue;
            }
            let metadata = match entry.metadata().await {
                Ok(metadata) if metadata.is_file() => metadata,
                Ok(_) => continue,
                Err(e) => {
                    debug!("Skipping {}: {}", file_path.display(), e);
                    continue;
                }
            };

            let relative = format!("{}/{}", dir, name);
            let content = match tokio::fs::read_to_string(&file_path).await {
                Ok(content) => content,
                Err(e) => {
                    warn!("Could not read {}: {}", file_path.display(), e);
                    continue;
                }
            };
            let parsed = match self.parser.parse(kind, &relative, &content) {
                Ok(parsed) => parsed,
                Err(e) => {
                    debug!("Skipping unparseable entity file: {}", e);
                    continue;
                }
            };

            let observed_at = committed
                .get(&relative)
                .copied()
                .or_else(|| metadata.modified().ok().map(DateTime::<Utc>::from))
                .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

            records.push(EntityRecord {
                id: parsed.id,
                category,
                status: parsed.status,
                fields: parsed.fields,
                branch: Origin::Local,
                observed_at,
            });
        }

        records.sort_by(|a, b| compare_ids(&a.id, &b.id));
        debug!("Found {} local {} entities in {}", records.len(), kind, dir);
        Ok(records)
    }
}

/// [`LocalEntityStore`] over records held in memory
///
/// Records are filed by their `category` and the kind owning their id.
#[derive(Debug, Default)]
pub struct InMemoryEntityStore {
    records: Mutex<Vec<EntityRecord>>,
    unreadable: AtomicBool,
}

impl InMemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record; its origin is forced to [`Origin::Local`]
    pub fn insert(&self, mut record: EntityRecord) -> &Self {
        record.branch = Origin::Local;
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(record);
        self
    }

    /// Make every listing fail as an unreadable store
    pub fn make_unreadable(&self) -> &Self {
        self.unreadable.store(true, Ordering::SeqCst);
        self
    }
}

#[async_trait]
impl LocalEntityStore for InMemoryEntityStore {
    async fn list_local_entities(
        &self,
        kind: EntityKind,
        category: Category,
    ) -> Result<Vec<EntityRecord>> {
        if self.unreadable.load(Ordering::SeqCst) {
            return Err(ReconcileError::local_store(
                "memory",
                std::io::Error::other("store is unreadable"),
            ));
        }
        let mut records: Vec<EntityRecord> = self
            .records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .filter(|record| record.category == category && kind.owns_id(&record.id))
            .cloned()
            .collect();
        records.sort_by(|a, b| compare_ids(&a.id, &b.id));
        Ok(records)
    }
}
