//! Reconciliation configuration values

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Directory under the project root that holds entity files
pub const DEFAULT_BACKLOG_DIR: &str = "backlog";

/// How two branches' views of the same entity are merged
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStrategy {
    /// The view with the newest observation time wins
    MostRecent,
    /// The view whose status is further along `status_order` wins
    #[default]
    MostProgressed,
}

/// Settings for cross-branch reconciliation
///
/// Field aliases accept the key names used in existing `config.yml` files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconciliationConfig {
    /// Workflow progression, least advanced first
    #[serde(alias = "statuses")]
    pub status_order: Vec<String>,

    /// Merge policy for competing views
    #[serde(alias = "task_resolution_strategy")]
    pub resolution_strategy: ResolutionStrategy,

    /// Whether other branches and remotes are consulted at all
    pub remote_operations: bool,

    /// Zero-padding width for top-level ids; `None` or `0` means unpadded
    #[serde(alias = "zero_padded_ids")]
    pub id_padding_width: Option<u32>,

    /// Root directory of entity storage, relative to the project root
    pub backlog_dir: String,

    /// Ignore branches whose tip commit is older than this many days
    pub active_branch_days: Option<u32>,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            status_order: vec![
                "To Do".to_string(),
                "In Progress".to_string(),
                "Done".to_string(),
            ],
            resolution_strategy: ResolutionStrategy::default(),
            remote_operations: true,
            id_padding_width: None,
            backlog_dir: DEFAULT_BACKLOG_DIR.to_string(),
            active_branch_days: None,
        }
    }
}

impl ReconciliationConfig {
    /// Padding width to apply to top-level ids, if any
    pub fn padding_width(&self) -> Option<usize> {
        self.id_padding_width
            .filter(|width| *width > 0)
            .map(|width| width as usize)
    }

    /// Copy with remote operations switched off
    pub fn offline(mut self) -> Self {
        self.remote_operations = false;
        self
    }

    /// Copy with a different resolution strategy
    pub fn with_strategy(mut self, strategy: ResolutionStrategy) -> Self {
        self.resolution_strategy = strategy;
        self
    }

    /// Copy with a different status order
    pub fn with_status_order<I, S>(mut self, statuses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.status_order = statuses.into_iter().map(Into::into).collect();
        self
    }

    /// Check invariants the engine relies on
    ///
    /// `status_order` must be a non-empty total order, so no duplicates.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.status_order.is_empty() {
            return Err(ConfigError::validation("status order must not be empty"));
        }

        let mut seen = HashSet::new();
        for status in &self.status_order {
            if !seen.insert(status.as_str()) {
                return Err(ConfigError::validation(format!(
                    "status '{}' appears more than once in the status order",
                    status
                )));
            }
        }

        if self.backlog_dir.trim().is_empty() {
            return Err(ConfigError::validation("backlog directory must not be empty"));
        }

        Ok(())
    }
}
