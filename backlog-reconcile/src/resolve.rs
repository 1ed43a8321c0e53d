//! Choosing between two versions of one entity

use crate::entity::{EntityRecord, MergedEntity};
use backlog_config::ResolutionStrategy;
use std::collections::BTreeMap;

/// Pick the winner between the record kept so far and a newly seen one
///
/// - [`ResolutionStrategy::MostRecent`]: the later `observed_at` wins; an exact
///   tie keeps `existing`.
/// - [`ResolutionStrategy::MostProgressed`]: the candidate wins when its status
///   is further along `status_order`, when the existing status is not in the
///   order at all, or when both sit at the same position. A candidate with an
///   unknown status never displaces a known one.
///
/// Because ties go to the candidate under `MostProgressed`, the result of a
/// fold depends on the order records are offered; callers fold in a fixed order.
pub fn resolve_conflict(
    existing: EntityRecord,
    candidate: EntityRecord,
    status_order: &[String],
    strategy: ResolutionStrategy,
) -> EntityRecord {
    match strategy {
        ResolutionStrategy::MostRecent => {
            if candidate.observed_at > existing.observed_at {
                candidate
            } else {
                existing
            }
        }
        ResolutionStrategy::MostProgressed => {
            let current = status_index(status_order, &existing.status);
            let proposed = status_index(status_order, &candidate.status);
            match (current, proposed) {
                (None, _) => candidate,
                (Some(current), Some(proposed)) if proposed >= current => candidate,
                _ => existing,
            }
        }
    }
}

fn status_index(status_order: &[String], status: &str) -> Option<usize> {
    status_order.iter().position(|known| known == status)
}

/// Fold one record into the merge state for its id
pub fn merge_record(
    merged: &mut BTreeMap<String, MergedEntity>,
    record: EntityRecord,
    status_order: &[String],
    strategy: ResolutionStrategy,
) {
    match merged.remove(&record.id) {
        None => {
            merged.insert(record.id.clone(), MergedEntity::from_record(record));
        }
        Some(mut entity) => {
            entity.considered_branches.push(record.branch.clone());
            entity.canonical_record =
                resolve_conflict(entity.canonical_record, record, status_order, strategy);
            merged.insert(entity.id.clone(), entity);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Category, Origin};
    use chrono::{TimeZone, Utc};

    fn order() -> Vec<String> {
        vec!["To Do".into(), "In Progress".into(), "Done".into()]
    }

    fn record(status: &str, branch: &str, seconds: i64) -> EntityRecord {
        EntityRecord::new(
            "task-1",
            Category::Active,
            status,
            Origin::branch(branch),
            Utc.timestamp_opt(seconds, 0).unwrap(),
        )
    }

    #[test]
    fn test_most_progressed_prefers_later_status() {
        let winner = resolve_conflict(
            record("Done", "a", 10),
            record("In Progress", "b", 99),
            &order(),
            ResolutionStrategy::MostProgressed,
        );
        assert_eq!(winner.status, "Done");

        let winner = resolve_conflict(
            record("To Do", "a", 10),
            record("Done", "b", 1),
            &order(),
            ResolutionStrategy::MostProgressed,
        );
        assert_eq!(winner.status, "Done");
    }

    #[test]
    fn test_most_progressed_tie_goes_to_candidate() {
        let winner = resolve_conflict(
            record("In Progress", "a", 10),
            record("In Progress", "b", 5),
            &order(),
            ResolutionStrategy::MostProgressed,
        );
        assert_eq!(winner.branch, Origin::branch("b"));
    }

    #[test]
    fn test_most_progressed_unknown_statuses() {
        let winner = resolve_conflict(
            record("Blocked", "a", 10),
            record("To Do", "b", 5),
            &order(),
            ResolutionStrategy::MostProgressed,
        );
        assert_eq!(winner.branch, Origin::branch("b"));

        let winner = resolve_conflict(
            record("To Do", "a", 10),
            record("Blocked", "b", 50),
            &order(),
            ResolutionStrategy::MostProgressed,
        );
        assert_eq!(winner.branch, Origin::branch("a"));

        let winner = resolve_conflict(
            record("Blocked", "a", 10),
            record("Waiting", "b", 5),
            &order(),
            ResolutionStrategy::MostProgressed,
        );
        assert_eq!(winner.branch, Origin::branch("b"));
    }

    #[test]
    fn test_most_recent_uses_timestamps_and_keeps_existing_on_tie() {
        let winner = resolve_conflict(
            record("Done", "a", 10),
            record("To Do", "b", 20),
            &order(),
            ResolutionStrategy::MostRecent,
        );
        assert_eq!(winner.status, "To Do");

        let winner = resolve_conflict(
            record("Done", "a", 10),
            record("To Do", "b", 10),
            &order(),
            ResolutionStrategy::MostRecent,
        );
        assert_eq!(winner.branch, Origin::branch("a"));
    }

    #[test]
    fn test_merge_record_tracks_considered_branches() {
        let mut merged = BTreeMap::new();
        let records = [
            record("To Do", "a", 1),
            record("Done", "b", 2),
            record("In Progress", "c", 3),
        ];
        for record in records {
            merge_record(&mut merged, record, &order(), ResolutionStrategy::MostProgressed);
        }

        let entity = &merged["task-1"];
        assert_eq!(entity.canonical_record.status, "Done");
        assert_eq!(
            entity.considered_branches,
            vec![Origin::branch("a"), Origin::branch("b"), Origin::branch("c")]
        );
    }
}
