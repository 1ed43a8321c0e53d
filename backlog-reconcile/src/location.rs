//! Where each entity lives now
//!
//! An entity archived on one branch may still sit in `tasks/` on another. The
//! latest observation across every branch decides which category it belongs
//! to, so stale copies do not resurface in the active view.

use crate::entity::{Category, LocationObservation};
use std::collections::{BTreeMap, BTreeSet};

/// Category of the most recent observation for each requested id
///
/// Ties on `observed_at` prefer the local working tree, then the
/// lexicographically smallest branch name, then the earliest category in
/// lifecycle order, so the answer never depends on observation order. Ids
/// with no observation are absent from the result.
pub fn resolve_locations(
    ids: &BTreeSet<String>,
    observations: &[LocationObservation],
) -> BTreeMap<String, Category> {
    let mut latest: BTreeMap<&str, &LocationObservation> = BTreeMap::new();

    for observation in observations.iter().filter(|o| ids.contains(&o.id)) {
        latest
            .entry(observation.id.as_str())
            .and_modify(|best| {
                if supersedes(observation, *best) {
                    *best = observation;
                }
            })
            .or_insert(observation);
    }

    latest
        .into_iter()
        .map(|(id, observation)| (id.to_string(), observation.category))
        .collect()
}

fn supersedes(candidate: &LocationObservation, best: &LocationObservation) -> bool {
    candidate.observed_at > best.observed_at
        || (candidate.observed_at == best.observed_at
            && (&candidate.branch, candidate.category) < (&best.branch, best.category))
}
