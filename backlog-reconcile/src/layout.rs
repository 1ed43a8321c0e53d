//! Where each kind and category lives on disk and in branch trees

use crate::entity::{Category, EntityKind};
use backlog_config::ReconciliationConfig;

/// Maps `(kind, category)` to a repository-relative directory
///
/// Paths always use `/` so they can be handed to the ref backend as tree
/// prefixes and joined onto the project root alike.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityLayout {
    root: String,
}

impl EntityLayout {
    pub fn new(backlog_dir: impl AsRef<str>) -> Self {
        Self {
            root: backlog_dir.as_ref().trim_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &ReconciliationConfig) -> Self {
        Self::new(&config.backlog_dir)
    }

    /// Root directory of entity storage
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Directory holding `kind` entities in `category`, if that combination exists
    pub fn directory(&self, kind: EntityKind, category: Category) -> Option<String> {
        let relative = match (kind, category) {
            (EntityKind::Task, Category::Active) => "tasks",
            (EntityKind::Task, Category::Draft) => "drafts",
            (EntityKind::Task, Category::Archived) => "archive/tasks",
            (EntityKind::Task, Category::Completed) => "completed",
            (EntityKind::Document, Category::Active) => "docs",
            (EntityKind::Document, Category::Archived) => "archive/docs",
            (EntityKind::Decision, Category::Active) => "decisions",
            (EntityKind::Decision, Category::Archived) => "archive/decisions",
            _ => return None,
        };
        Some(if self.root.is_empty() {
            relative.to_string()
        } else {
            format!("{}/{}", self.root, relative)
        })
    }

    /// Directories whose files count toward `kind`'s id-space
    pub fn id_space_directories(&self, kind: EntityKind) -> Vec<String> {
        kind.id_space_categories()
            .iter()
            .filter_map(|category| self.directory(kind, *category))
            .collect()
    }
}

impl Default for EntityLayout {
    fn default() -> Self {
        Self::from_config(&ReconciliationConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_directories() {
        let layout = EntityLayout::default();
        assert_eq!(
            layout.directory(EntityKind::Task, Category::Active).as_deref(),
            Some("backlog/tasks")
        );
        assert_eq!(
            layout.directory(EntityKind::Task, Category::Archived).as_deref(),
            Some("backlog/archive/tasks")
        );
        assert_eq!(
            layout.id_space_directories(EntityKind::Task),
            vec!["backlog/tasks".to_string(), "backlog/drafts".to_string()]
        );
    }

    #[test]
    fn test_documents_have_no_drafts() {
        let layout = EntityLayout::new("/planning/");
        assert_eq!(layout.root(), "planning");
        assert!(layout.directory(EntityKind::Document, Category::Draft).is_none());
        assert_eq!(
            layout.directory(EntityKind::Decision, Category::Archived).as_deref(),
            Some("planning/archive/decisions")
        );
    }

    #[test]
    fn test_every_declared_category_has_a_directory() {
        let layout = EntityLayout::default();
        for kind in EntityKind::ALL {
            for category in kind.categories() {
                assert!(layout.directory(kind, *category).is_some(), "{kind} {category}");
            }
        }
    }
}
