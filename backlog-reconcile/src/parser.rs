//! Entity file parsing
//!
//! The engine only needs three things from a file: its id, its status and the
//! remaining fields. [`EntityParser`] is the seam for that; the default
//! [`FrontmatterParser`] understands markdown files with YAML frontmatter.

use crate::entity::EntityKind;
use crate::error::{ReconcileError, Result};
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

static FILE_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^([a-z]+)-(\d+(?:\.\d+)*)").expect("file id pattern is valid")
});

/// Fields extracted from one entity file
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedEntity {
    pub id: String,
    pub status: String,
    pub fields: Map<String, Value>,
}

/// Turns entity files into ids and fields
pub trait EntityParser: Send + Sync + std::fmt::Debug {
    /// Id encoded in a file's name, lowercased, if the name carries one for `kind`
    fn id_from_path(&self, kind: EntityKind, path: &str) -> Option<String> {
        id_from_file_name(kind, path)
    }

    /// Parse a file's content
    fn parse(&self, kind: EntityKind, path: &str, content: &str) -> Result<ParsedEntity>;
}

/// Id from the file name part of `path`
///
/// ```
/// use backlog_reconcile::EntityKind;
/// use backlog_reconcile::parser::id_from_file_name;
///
/// let id = id_from_file_name(EntityKind::Task, "backlog/tasks/TASK-12.01 - Fix login.md");
/// assert_eq!(id.as_deref(), Some("task-12.01"));
/// assert!(id_from_file_name(EntityKind::Document, "backlog/tasks/task-1.md").is_none());
/// ```
pub fn id_from_file_name(kind: EntityKind, path: &str) -> Option<String> {
    let name = path.rsplit('/').next().unwrap_or(path);
    let captures = FILE_ID_PATTERN.captures(name)?;
    if !captures[1].eq_ignore_ascii_case(kind.prefix()) {
        return None;
    }
    Some(format!("{}-{}", kind.prefix(), &captures[2]))
}

/// Markdown with optional YAML frontmatter
///
/// ```markdown
/// ---
/// id: task-12
/// title: Fix login
/// status: In Progress
/// ---
/// The login form rejects valid passwords.
/// ```
///
/// Frontmatter keys become fields and the markdown after it becomes the
/// `body` field. The file name's id is preferred over an `id` key so that
/// full records and location observations always agree on the key.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrontmatterParser;

impl FrontmatterParser {
    pub fn new() -> Self {
        Self
    }
}

impl EntityParser for FrontmatterParser {
    fn parse(&self, kind: EntityKind, path: &str, content: &str) -> Result<ParsedEntity> {
        let (frontmatter, body) = split_frontmatter(content);

        let mut fields = match frontmatter {
            Some(yaml) if !yaml.trim().is_empty() => {
                match serde_yaml_ng::from_str::<Value>(yaml) {
                    Ok(Value::Object(map)) => map,
                    Ok(Value::Null) => Map::new(),
                    Ok(_) => {
                        return Err(ReconcileError::parse(path, "frontmatter is not a mapping"))
                    }
                    Err(e) => {
                        return Err(ReconcileError::parse(
                            path,
                            format!("failed to parse YAML frontmatter: {}", e),
                        ))
                    }
                }
            }
            _ => Map::new(),
        };

        let id = self
            .id_from_path(kind, path)
            .or_else(|| {
                fields
                    .get("id")
                    .and_then(scalar_string)
                    .map(|id| kind.normalize_id(&id))
            })
            .ok_or_else(|| ReconcileError::parse(path, "no id in file name or frontmatter"))?;

        let status = fields.get("status").and_then(scalar_string).unwrap_or_default();

        fields.insert("body".to_string(), Value::String(body.trim().to_string()));

        Ok(ParsedEntity { id, status, fields })
    }
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Split content into the frontmatter text and the remaining body
fn split_frontmatter(content: &str) -> (Option<&str>, &str) {
    let trimmed = content.trim_start_matches('\u{feff}');
    let Some(rest) = trimmed
        .strip_prefix("---\r\n")
        .or_else(|| trimmed.strip_prefix("---\n"))
    else {
        return (None, trimmed);
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            return (Some(&rest[..offset]), &rest[offset + line.len()..]);
        }
        offset += line.len();
    }

    (None, trimmed)
}
