//! Concurrent fan-out that tolerates individual failures
//!
//! Every branch scan is a unit of work. Units run concurrently and are joined
//! at one gather point; a failing unit is tagged as skipped with its reason
//! instead of aborting its siblings. Results keep input order, so callers that
//! sort their units first get deterministic output.

use crate::error::{ReconcileError, Result};
use futures::future::join_all;
use std::fmt::Display;
use std::future::Future;
use tracing::{debug, warn};

/// Outcome of a tolerant fan-out
#[derive(Debug)]
pub struct Gathered<K, T> {
    /// Units that produced a value, in input order
    pub contributed: Vec<(K, T)>,
    /// Units that failed, in input order
    pub skipped: Vec<(K, ReconcileError)>,
}

impl<K, T> Gathered<K, T> {
    pub fn into_values(self) -> impl Iterator<Item = T> {
        self.contributed.into_iter().map(|(_, value)| value)
    }
}

impl<K, T> Default for Gathered<K, T> {
    fn default() -> Self {
        Self {
            contributed: Vec::new(),
            skipped: Vec::new(),
        }
    }
}

/// Run every unit concurrently and tag each result
///
/// Network failures are logged at debug level only; anything else is a
/// warning. Neither stops the other units.
pub async fn gather_tolerant<K, T, F>(
    units: impl IntoIterator<Item = (K, F)>,
) -> Gathered<K, T>
where
    K: Display,
    F: Future<Output = Result<T>>,
{
    let (keys, futures): (Vec<K>, Vec<F>) = units.into_iter().unzip();
    let results = join_all(futures).await;

    let mut gathered = Gathered::default();
    for (key, result) in keys.into_iter().zip(results) {
        match result {
            Ok(value) => gathered.contributed.push((key, value)),
            Err(e) => {
                if e.is_network() {
                    debug!("Skipping {} (network unavailable): {}", key, e);
                } else {
                    warn!("Skipping {}: {}", key, e);
                }
                gathered.skipped.push((key, e));
            }
        }
    }
    gathered
}

#[cfg(test)]
mod tests {
    use super::*;
    use backlog_git::GitError;

    #[tokio::test]
    async fn test_failures_do_not_abort_siblings() {
        let units = ["alpha", "broken", "gamma"].into_iter().map(|name| {
            (name, async move {
                if name == "broken" {
                    let source = GitError::ref_access_failed(name, "bad object");
                    Err(ReconcileError::ref_access(name, source))
                } else {
                    Ok(name.len())
                }
            })
        });

        let gathered = gather_tolerant(units).await;
        assert_eq!(gathered.contributed, vec![("alpha", 5), ("gamma", 5)]);
        assert_eq!(gathered.skipped.len(), 1);
        assert_eq!(gathered.skipped[0].0, "broken");
    }

    #[tokio::test]
    async fn test_empty_input() {
        let units: Vec<(String, std::future::Ready<Result<()>>)> = Vec::new();
        let gathered = gather_tolerant(units).await;
        assert!(gathered.contributed.is_empty());
        assert!(gathered.skipped.is_empty());
    }
}
