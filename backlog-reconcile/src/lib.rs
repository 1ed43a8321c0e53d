//! Cross-branch entity reconciliation for Backlog
//!
//! Tasks, documents and decisions live as individual markdown files in
//! category directories (`active`, `draft`, `archived`, `completed`) of a git
//! working tree. Branches that have not been merged each hold their own view of
//! those files. This crate turns all of those views into one answer without
//! merging anything:
//!
//! - **Id allocation** that never hands out an id some unmerged branch already uses
//! - **Conflict resolution** between two branches' versions of one entity
//! - **Latest location** so an entity archived on another branch is not shown as active
//!
//! Everything is read-only and recomputed on every call.
//!
//! ## Basic Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use backlog_config::ConfigLoader;
//! use backlog_git::GitRefBackend;
//! use backlog_reconcile::{Category, EntityKind, FileSystemEntityStore, Reconciler};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigLoader::new(".").load_required()?;
//! let backend = Arc::new(GitRefBackend::discover(".")?);
//! let store = Arc::new(FileSystemEntityStore::new(".", &config));
//! let reconciler = Reconciler::new(backend, store, config);
//!
//! let next = reconciler.allocate_next_id(EntityKind::Task, None).await?;
//! println!("next task id: {next}");
//!
//! for entity in reconciler.reconcile(EntityKind::Task, Category::Active, None).await? {
//!     println!("{} [{}]", entity.id, entity.canonical_record.status);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Data Flow
//!
//! ```text
//! RefEnumerator -> RefTreeReader -> EntitySnapshotCollector
//!     -> { resolve_conflict, resolve_locations } -> ReconciledViewBuilder
//! IdAllocator -> RefEnumerator / RefTreeReader
//! ```

pub mod engine;
pub mod entity;
pub mod error;
pub mod gather;
pub mod ids;
pub mod layout;
pub mod location;
pub mod parser;
pub mod refs;
pub mod resolve;
pub mod snapshot;
pub mod store;
pub mod view;

pub use engine::Reconciler;
pub use entity::{Category, EntityKind, EntityRecord, LocationObservation, MergedEntity, Origin};
pub use error::{ReconcileError, Result};
pub use gather::{gather_tolerant, Gathered};
pub use ids::IdAllocator;
pub use layout::EntityLayout;
pub use location::resolve_locations;
pub use parser::{EntityParser, FrontmatterParser, ParsedEntity};
pub use refs::{RefEnumerator, RefTreeReader};
pub use resolve::{merge_record, resolve_conflict};
pub use snapshot::{EntitySnapshotCollector, Interest, Snapshot};
pub use store::{FileSystemEntityStore, InMemoryEntityStore, LocalEntityStore};
pub use view::ReconciledViewBuilder;

pub use backlog_config::{ReconciliationConfig, ResolutionStrategy};
pub use backlog_common::{NoProgress, ProgressSink};
