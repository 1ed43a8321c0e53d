//! Building the reconciled view
//!
//! [`ReconciledViewBuilder`] ties the pieces together:
//!
//! 1. load local records of the desired category;
//! 2. fetch remotes and enumerate branches, unless remote operations are off;
//! 3. fold local and then branch records per id with [`merge_record`];
//! 4. collect location observations from every category, local and remote;
//! 5. keep ids whose latest location is the desired category;
//! 6. return them in numeric-aware id order.

use crate::entity::{
    compare_ids, Category, EntityKind, EntityRecord, LocationObservation, MergedEntity,
};
use crate::error::{ReconcileError, Result};
use crate::layout::EntityLayout;
use crate::location::resolve_locations;
use crate::parser::EntityParser;
use crate::refs::RefEnumerator;
use crate::resolve::merge_record;
use crate::snapshot::{EntitySnapshotCollector, Interest, Snapshot};
use crate::store::LocalEntityStore;
use backlog_common::{Pretty, ProgressSink};
use backlog_config::ReconciliationConfig;
use backlog_git::RefBackend;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Orchestrates one reconciliation pass
#[derive(Debug, Clone, Copy)]
pub struct ReconciledViewBuilder<'a> {
    backend: &'a dyn RefBackend,
    store: &'a dyn LocalEntityStore,
    parser: &'a dyn EntityParser,
    layout: &'a EntityLayout,
    config: &'a ReconciliationConfig,
}

impl<'a> ReconciledViewBuilder<'a> {
    pub fn new(
        backend: &'a dyn RefBackend,
        store: &'a dyn LocalEntityStore,
        parser: &'a dyn EntityParser,
        layout: &'a EntityLayout,
        config: &'a ReconciliationConfig,
    ) -> Self {
        Self {
            backend,
            store,
            parser,
            layout,
            config,
        }
    }

    /// Entities of `kind` whose latest location is `desired`
    ///
    /// With `ids_of_interest`, only those ids are read in full and returned.
    pub async fn build(
        &self,
        kind: EntityKind,
        desired: Category,
        ids_of_interest: Option<&BTreeSet<String>>,
        progress: &dyn ProgressSink,
    ) -> Result<Vec<MergedEntity>> {
        let interest = ids_of_interest.map_or(Interest::All, |ids| Interest::ids(kind, ids));

        progress.report(&format!("Loading local {} {} entities", desired, kind));
        let local: Vec<EntityRecord> = self
            .store
            .list_local_entities(kind, desired)
            .await?
            .into_iter()
            .filter(|record| interest.wants(&record.id))
            .collect();
        let mut observations: Vec<LocationObservation> =
            local.iter().map(EntityRecord::observation).collect();

        let desired_only = [desired];
        let snapshot = match self.reachable_branches(progress).await? {
            Some(branches) => {
                progress.report(&format!(
                    "Scanning {} branches for {} entities",
                    branches.len(),
                    kind
                ));
                EntitySnapshotCollector::new(self.backend, self.layout, self.parser)
                    .read_categories(&desired_only)
                    .collect(&branches, kind, kind.categories(), &interest)
                    .await
            }
            None => Snapshot::default(),
        };

        progress.report("Resolving conflicting versions");
        let mut merged = BTreeMap::new();
        for record in local.into_iter().chain(snapshot.full_records) {
            merge_record(
                &mut merged,
                record,
                &self.config.status_order,
                self.config.resolution_strategy,
            );
        }

        progress.report("Resolving latest locations");
        observations.extend(self.local_observations(kind, Some(desired)).await?);
        observations.extend(snapshot.observations);
        let ids: BTreeSet<String> = merged.keys().cloned().collect();
        let locations = resolve_locations(&ids, &observations);
        debug!("Latest {} locations: {}", kind, Pretty(&locations));

        let mut view: Vec<MergedEntity> = merged
            .into_values()
            .filter(|entity| {
                let location = locations
                    .get(&entity.id)
                    .copied()
                    .unwrap_or(entity.canonical_record.category);
                if location != desired {
                    debug!(
                        "{} now lives in {}; leaving it out of {}",
                        entity.id, location, desired
                    );
                }
                location == desired
            })
            .collect();
        view.sort_by(|a, b| compare_ids(&a.id, &b.id));

        info!(
            "Reconciled {} {} {} entities ({} branch units skipped)",
            view.len(),
            desired,
            kind,
            snapshot.skipped.len()
        );
        Ok(view)
    }

    /// Latest category of each requested id, from observations only
    pub async fn locate(
        &self,
        kind: EntityKind,
        ids: &BTreeSet<String>,
        progress: &dyn ProgressSink,
    ) -> Result<BTreeMap<String, Category>> {
        let ids: BTreeSet<String> = ids.iter().map(|id| kind.normalize_id(id)).collect();

        progress.report(&format!("Loading local {} locations", kind));
        let mut observations = self.local_observations(kind, None).await?;

        if let Some(branches) = self.reachable_branches(progress).await? {
            progress.report(&format!(
                "Scanning {} branches for {} locations",
                branches.len(),
                kind
            ));
            let snapshot = EntitySnapshotCollector::new(self.backend, self.layout, self.parser)
                .collect(&branches, kind, kind.categories(), &Interest::None)
                .await;
            observations.extend(snapshot.observations);
        }

        progress.report("Resolving latest locations");
        Ok(resolve_locations(&ids, &observations))
    }

    async fn local_observations(
        &self,
        kind: EntityKind,
        skip: Option<Category>,
    ) -> Result<Vec<LocationObservation>> {
        let mut observations = Vec::new();
        for category in kind.categories().iter().filter(|c| Some(**c) != skip) {
            observations.extend(
                self.store
                    .list_local_entities(kind, *category)
                    .await?
                    .iter()
                    .map(EntityRecord::observation),
            );
        }
        Ok(observations)
    }

    /// Branches to scan, or `None` when working local-only
    ///
    /// An unreachable remote means local-only without any error. Any other
    /// fetch failure is returned to the caller.
    async fn reachable_branches(
        &self,
        progress: &dyn ProgressSink,
    ) -> Result<Option<BTreeSet<String>>> {
        if !self.config.remote_operations {
            progress.report("Remote operations disabled; using local entities only");
            return Ok(None);
        }

        let remotes = match self.backend.list_remotes().await {
            Ok(remotes) => remotes,
            Err(e) if e.is_network() => {
                debug!("Remotes unavailable, using local entities only: {}", e);
                return Ok(None);
            }
            Err(e) => {
                debug!("Could not list remotes: {}", e);
                Vec::new()
            }
        };
        for remote in &remotes {
            progress.report(&format!("Fetching {}", remote));
            if let Err(e) = self.backend.fetch(remote).await {
                if e.is_network() {
                    debug!("Remote '{}' unreachable, using local entities only: {}", remote, e);
                    return Ok(None);
                }
                return Err(ReconcileError::Git(e));
            }
        }

        Ok(Some(
            RefEnumerator::new(self.backend)
                .active_within_days(self.config.active_branch_days)
                .list_branches(true)
                .await,
        ))
    }
}
