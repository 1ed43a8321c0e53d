//! Per-branch entity snapshots
//!
//! A snapshot is what every scanned branch says about a kind of entity: a
//! cheap [`LocationObservation`] for each file, and a full [`EntityRecord`]
//! only for the ids a caller actually needs. Reading file content is the
//! expensive part, so observations are built from tree listings and the batch
//! timestamp map alone.

use crate::entity::{Category, EntityKind, EntityRecord, LocationObservation, Origin};
use crate::error::{ReconcileError, Result};
use crate::gather::gather_tolerant;
use crate::layout::EntityLayout;
use crate::parser::EntityParser;
use crate::refs::RefTreeReader;
use backlog_git::RefBackend;
use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use tracing::debug;

/// Which ids need full records
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Interest {
    /// Observations only
    #[default]
    None,
    /// Every id found
    All,
    /// Only these ids, already normalized
    Ids(BTreeSet<String>),
}

impl Interest {
    /// Interest in a set of `kind` ids, given with or without the prefix
    pub fn ids<I, S>(kind: EntityKind, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Interest::Ids(ids.into_iter().map(|id| kind.normalize_id(id.as_ref())).collect())
    }

    pub fn wants(&self, id: &str) -> bool {
        match self {
            Interest::None => false,
            Interest::All => true,
            Interest::Ids(ids) => ids.contains(id),
        }
    }
}

/// Everything the scanned branches reported
#[derive(Debug, Default)]
pub struct Snapshot {
    /// Ordered by branch, then category, then path
    pub full_records: Vec<EntityRecord>,
    /// Ordered by branch, then category, then path
    pub observations: Vec<LocationObservation>,
    /// `(branch:category, reason)` for every unit that contributed nothing
    pub skipped: Vec<(String, ReconcileError)>,
}

#[derive(Debug, Default)]
struct UnitScan {
    records: Vec<EntityRecord>,
    observations: Vec<LocationObservation>,
}

/// Scans branches for entity files
#[derive(Debug, Clone, Copy)]
pub struct EntitySnapshotCollector<'a> {
    backend: &'a dyn RefBackend,
    layout: &'a EntityLayout,
    parser: &'a dyn EntityParser,
    read_categories: Option<&'a [Category]>,
}

impl<'a> EntitySnapshotCollector<'a> {
    pub fn new(
        backend: &'a dyn RefBackend,
        layout: &'a EntityLayout,
        parser: &'a dyn EntityParser,
    ) -> Self {
        Self {
            backend,
            layout,
            parser,
            read_categories: None,
        }
    }

    /// Only read full records from these categories; others yield observations only
    pub fn read_categories(mut self, categories: &'a [Category]) -> Self {
        self.read_categories = Some(categories);
        self
    }

    /// Scan every `branch x category` pair concurrently
    pub async fn collect(
        &self,
        branches: &BTreeSet<String>,
        kind: EntityKind,
        categories: &[Category],
        interest: &Interest,
    ) -> Snapshot {
        let units = branches.iter().flat_map(|branch| {
            categories.iter().filter_map(move |category| {
                let directory = self.layout.directory(kind, *category)?;
                Some((
                    format!("{}:{}", branch, category),
                    self.scan_unit(branch, kind, *category, directory, interest),
                ))
            })
        });

        let gathered = gather_tolerant(units).await;

        let mut snapshot = Snapshot {
            skipped: gathered.skipped,
            ..Snapshot::default()
        };
        for (_, unit) in gathered.contributed {
            snapshot.full_records.extend(unit.records);
            snapshot.observations.extend(unit.observations);
        }
        debug!(
            "Collected {} observations and {} full {} records from {} branches",
            snapshot.observations.len(),
            snapshot.full_records.len(),
            kind,
            branches.len()
        );
        snapshot
    }

    async fn scan_unit(
        &self,
        branch: &str,
        kind: EntityKind,
        category: Category,
        directory: String,
        interest: &Interest,
    ) -> Result<UnitScan> {
        let reader = RefTreeReader::new(self.backend);
        let files = reader.list_files(branch, &directory).await?;
        if files.is_empty() {
            return Ok(UnitScan::default());
        }
        let timestamps = reader.last_modified_map(branch, &directory).await?;
        let read_full = self
            .read_categories
            .is_none_or(|categories| categories.contains(&category));

        let origin = Origin::branch(branch);
        let mut scan = UnitScan::default();
        for path in files.iter().filter(|path| path.ends_with(".md")) {
            let Some(id) = self.parser.id_from_path(kind, path) else {
                debug!("Skipping {} on {}: no {} id in file name", path, branch, kind);
                continue;
            };
            let observed_at = timestamps
                .get(path)
                .copied()
                .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

            scan.observations.push(LocationObservation {
                id: id.clone(),
                branch: origin.clone(),
                category,
                observed_at,
            });

            if !(read_full && interest.wants(&id)) {
                continue;
            }
            let content = match reader.read_file(branch, path).await {
                Ok(Some(content)) => content,
                Ok(None) => continue,
                Err(e) => {
                    debug!("Skipping {} on {}: {}", path, branch, e);
                    continue;
                }
            };
            match self.parser.parse(kind, path, &content) {
                Ok(parsed) => scan.records.push(EntityRecord {
                    id,
                    category,
                    status: parsed.status,
                    fields: parsed.fields,
                    branch: origin.clone(),
                    observed_at,
                }),
                Err(e) => debug!("Skipping {} on {}: {}", path, branch, e),
            }
        }
        Ok(scan)
    }
}
