//! Entity model shared by every reconciliation component
//!
//! Records and observations are built fresh on every read and dropped once a
//! view or location map has been produced; nothing here is persisted.

use backlog_git::BranchName;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// The kind of entity, which fixes the id prefix and id-space
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Work items, ids `task-<n>` and sub-ids `task-<n>.<m>`
    Task,
    /// Documents, ids `doc-<n>`
    #[serde(rename = "doc")]
    Document,
    /// Decision records, ids `decision-<n>`
    Decision,
}

impl EntityKind {
    /// Every kind
    pub const ALL: [EntityKind; 3] = [EntityKind::Task, EntityKind::Document, EntityKind::Decision];

    /// Id prefix without the trailing dash
    pub fn prefix(self) -> &'static str {
        match self {
            EntityKind::Task => "task",
            EntityKind::Document => "doc",
            EntityKind::Decision => "decision",
        }
    }

    /// Lifecycle categories this kind can be stored in
    pub fn categories(self) -> &'static [Category] {
        match self {
            EntityKind::Task => &Category::ALL,
            EntityKind::Document | EntityKind::Decision => {
                &[Category::Active, Category::Archived]
            }
        }
    }

    /// Categories whose ids count toward the id-space
    ///
    /// Drafts hold real task ids; archived and completed entities do not
    /// block reuse.
    pub fn id_space_categories(self) -> &'static [Category] {
        match self {
            EntityKind::Task => &[Category::Active, Category::Draft],
            EntityKind::Document | EntityKind::Decision => &[Category::Active],
        }
    }

    /// Whether an id belongs to this kind's id-space
    pub fn owns_id(self, id: &str) -> bool {
        id.len() > self.prefix().len()
            && id.as_bytes()[..self.prefix().len()].eq_ignore_ascii_case(self.prefix().as_bytes())
            && id.as_bytes()[self.prefix().len()] == b'-'
    }

    /// Normalize an id or bare number into `<prefix>-<rest>`, lowercased
    ///
    /// ```
    /// use backlog_reconcile::EntityKind;
    ///
    /// assert_eq!(EntityKind::Task.normalize_id("7"), "task-7");
    /// assert_eq!(EntityKind::Task.normalize_id("TASK-7.01"), "task-7.01");
    /// ```
    pub fn normalize_id(self, id: &str) -> String {
        let id = id.trim().to_lowercase();
        if self.owns_id(&id) {
            id
        } else {
            format!("{}-{}", self.prefix(), id)
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "task" | "tasks" => Ok(EntityKind::Task),
            "doc" | "docs" | "document" | "documents" => Ok(EntityKind::Document),
            "decision" | "decisions" => Ok(EntityKind::Decision),
            other => Err(format!("unknown entity kind '{}'", other)),
        }
    }
}

/// Lifecycle bucket an entity file lives in
///
/// Declaration order is lifecycle order and is used as the final tie-break
/// when locating entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Active,
    Draft,
    Archived,
    Completed,
}

impl Category {
    /// Every category in lifecycle order
    pub const ALL: [Category; 4] = [
        Category::Active,
        Category::Draft,
        Category::Archived,
        Category::Completed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Active => "active",
            Category::Draft => "draft",
            Category::Archived => "archived",
            Category::Completed => "completed",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown category '{}'", s))
    }
}

/// Where a record was observed
///
/// `Local` is the working tree. It sorts before every branch, and branches
/// sort by name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Local,
    Branch(BranchName),
}

impl Origin {
    /// Origin for a branch name read back from the backend
    pub fn branch(name: impl Into<String>) -> Self {
        Origin::Branch(BranchName::from_ref_name(name))
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Origin::Local)
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Local => f.write_str("local"),
            Origin::Branch(name) => write!(f, "{}", name),
        }
    }
}

/// One branch's full view of one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub id: String,
    pub category: Category,
    /// Workflow status, empty when the file carries none
    pub status: String,
    /// Every other field of the file, including `body`
    pub fields: Map<String, Value>,
    pub branch: Origin,
    pub observed_at: DateTime<Utc>,
}

impl EntityRecord {
    /// Create a record with no extra fields
    pub fn new(
        id: impl Into<String>,
        category: Category,
        status: impl Into<String>,
        branch: Origin,
        observed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            category,
            status: status.into(),
            fields: Map::new(),
            branch,
            observed_at,
        }
    }

    /// Attach a field, replacing any previous value
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// The entity title, if the file has one
    pub fn title(&self) -> Option<&str> {
        self.fields.get("title").and_then(Value::as_str)
    }

    /// Project this record down to a location observation
    pub fn observation(&self) -> LocationObservation {
        LocationObservation {
            id: self.id.clone(),
            branch: self.branch.clone(),
            category: self.category,
            observed_at: self.observed_at,
        }
    }
}

/// The reconciled result for one id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedEntity {
    pub id: String,
    pub canonical_record: EntityRecord,
    /// Every origin whose record was folded in, in fold order
    pub considered_branches: Vec<Origin>,
}

impl MergedEntity {
    /// Start a merge from the first record seen for an id
    pub fn from_record(record: EntityRecord) -> Self {
        Self {
            id: record.id.clone(),
            considered_branches: vec![record.branch.clone()],
            canonical_record: record,
        }
    }
}

/// Lightweight evidence that an id sat in a category on some branch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationObservation {
    pub id: String,
    pub branch: Origin,
    pub category: Category,
    pub observed_at: DateTime<Utc>,
}

/// Compare ids the way people read them: `task-2` before `task-10`
///
/// Ids are split into their prefix and dot-separated numeric segments.
/// Anything that does not parse falls back to plain string order.
pub fn compare_ids(a: &str, b: &str) -> Ordering {
    match (id_sort_key(a), id_sort_key(b)) {
        (Some(left), Some(right)) => left.cmp(&right).then_with(|| a.cmp(b)),
        _ => a.cmp(b),
    }
}

fn id_sort_key(id: &str) -> Option<(String, Vec<u64>)> {
    let (prefix, number) = id.rsplit_once('-')?;
    let segments = number
        .split('.')
        .map(|segment| segment.parse::<u64>().ok())
        .collect::<Option<Vec<_>>>()?;
    Some((prefix.to_lowercase(), segments))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_aware_id_order() {
        let mut ids = vec!["task-10", "task-2", "task-2.10", "task-2.02", "task-1"];
        ids.sort_by(|a, b| compare_ids(a, b));
        assert_eq!(ids, vec!["task-1", "task-2", "task-2.02", "task-2.10", "task-10"]);
    }

    #[test]
    fn test_unparseable_ids_fall_back_to_string_order() {
        assert_eq!(compare_ids("task-x", "task-1"), "task-x".cmp("task-1"));
        assert_eq!(compare_ids("task-007", "task-7"), Ordering::Less);
    }

    #[test]
    fn test_origin_order_puts_local_first() {
        let mut origins = vec![Origin::branch("main"), Origin::Local, Origin::branch("feature")];
        origins.sort();
        assert_eq!(
            origins,
            vec![Origin::Local, Origin::branch("feature"), Origin::branch("main")]
        );
    }

    #[test]
    fn test_kind_owns_id_case_insensitively() {
        assert!(EntityKind::Task.owns_id("TASK-3"));
        assert!(!EntityKind::Task.owns_id("tasks-3"));
        assert!(!EntityKind::Document.owns_id("decision-1"));
        assert_eq!(EntityKind::Document.normalize_id(" Doc-4 "), "doc-4");
    }

    #[test]
    fn test_category_parsing() {
        assert_eq!("Archived".parse::<Category>().unwrap(), Category::Archived);
        assert!("finished".parse::<Category>().is_err());
        assert_eq!("decisions".parse::<EntityKind>().unwrap(), EntityKind::Decision);
    }

    #[test]
    fn test_record_helpers() {
        let epoch = DateTime::<Utc>::UNIX_EPOCH;
        let record = EntityRecord::new("task-1", Category::Active, "To Do", Origin::Local, epoch)
            .with_field("title", "Fix login");
        assert_eq!(record.title(), Some("Fix login"));

        let observation = record.observation();
        assert_eq!(observation.id, "task-1");
        assert_eq!(observation.category, Category::Active);
        assert!(observation.branch.is_local());
    }
}
