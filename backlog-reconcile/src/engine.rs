//! The reconciliation engine
//!
//! [`Reconciler`] owns the backend, local store, parser and configuration and
//! exposes the three read operations. Configuration is an explicit value:
//! build a new engine to pick up changed settings.

use crate::entity::{Category, EntityKind, MergedEntity};
use crate::error::Result;
use crate::ids::IdAllocator;
use crate::layout::EntityLayout;
use crate::parser::{EntityParser, FrontmatterParser};
use crate::store::{FileSystemEntityStore, LocalEntityStore};
use crate::view::ReconciledViewBuilder;
use backlog_common::{NoProgress, ProgressSink};
use backlog_config::{ConfigLoader, ReconciliationConfig};
use backlog_git::{GitRefBackend, RefBackend};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Cross-branch entity reconciliation engine
#[derive(Debug, Clone)]
pub struct Reconciler {
    backend: Arc<dyn RefBackend>,
    store: Arc<dyn LocalEntityStore>,
    parser: Arc<dyn EntityParser>,
    layout: EntityLayout,
    config: ReconciliationConfig,
}

impl Reconciler {
    pub fn new(
        backend: Arc<dyn RefBackend>,
        store: Arc<dyn LocalEntityStore>,
        config: ReconciliationConfig,
    ) -> Self {
        Self {
            backend,
            store,
            parser: Arc::new(FrontmatterParser),
            layout: EntityLayout::from_config(&config),
            config,
        }
    }

    /// Engine for an initialized project in the git repository containing `path`
    ///
    /// Fails with a missing-config error when the project has no config file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let backend = Arc::new(GitRefBackend::discover(path.as_ref())?);
        let root = backend.root().to_path_buf();
        let config = ConfigLoader::new(root.clone()).load_required()?;
        debug!("Opened backlog project at {}", root.display());

        let store = FileSystemEntityStore::new(root, &config).with_history(backend.clone());
        Ok(Self::new(backend, Arc::new(store), config))
    }

    /// Use a different parser for branch files
    ///
    /// The local store keeps its own parser.
    pub fn with_parser(mut self, parser: Arc<dyn EntityParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn config(&self) -> &ReconciliationConfig {
        &self.config
    }

    pub fn layout(&self) -> &EntityLayout {
        &self.layout
    }

    fn view(&self) -> ReconciledViewBuilder<'_> {
        ReconciledViewBuilder::new(
            self.backend.as_ref(),
            self.store.as_ref(),
            self.parser.as_ref(),
            &self.layout,
            &self.config,
        )
    }

    /// Next free id for `kind`, or the next sub-id of `parent`
    pub async fn allocate_next_id(&self, kind: EntityKind, parent: Option<&str>) -> Result<String> {
        self.allocate_next_id_with_progress(kind, parent, &NoProgress).await
    }

    pub async fn allocate_next_id_with_progress(
        &self,
        kind: EntityKind,
        parent: Option<&str>,
        progress: &dyn ProgressSink,
    ) -> Result<String> {
        IdAllocator::new(
            self.backend.as_ref(),
            self.store.as_ref(),
            &self.layout,
            &self.config,
        )
        .allocate_next_id(kind, parent, progress)
        .await
    }

    /// Entities of `kind` whose latest location across branches is `desired`
    pub async fn reconcile(
        &self,
        kind: EntityKind,
        desired: Category,
        ids_of_interest: Option<&BTreeSet<String>>,
    ) -> Result<Vec<MergedEntity>> {
        self.reconcile_with_progress(kind, desired, ids_of_interest, &NoProgress)
            .await
    }

    pub async fn reconcile_with_progress(
        &self,
        kind: EntityKind,
        desired: Category,
        ids_of_interest: Option<&BTreeSet<String>>,
        progress: &dyn ProgressSink,
    ) -> Result<Vec<MergedEntity>> {
        self.view()
            .build(kind, desired, ids_of_interest, progress)
            .await
    }

    /// Latest category of each id; ids never observed are absent
    pub async fn resolve_locations(
        &self,
        kind: EntityKind,
        ids: &BTreeSet<String>,
    ) -> Result<BTreeMap<String, Category>> {
        self.resolve_locations_with_progress(kind, ids, &NoProgress)
            .await
    }

    pub async fn resolve_locations_with_progress(
        &self,
        kind: EntityKind,
        ids: &BTreeSet<String>,
        progress: &dyn ProgressSink,
    ) -> Result<BTreeMap<String, Category>> {
        self.view().locate(kind, ids, progress).await
    }
}
