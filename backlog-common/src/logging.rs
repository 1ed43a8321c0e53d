//! Logging utilities for Backlog
//!
//! Installs the tracing subscriber used by binaries and tests, and provides
//! [`Pretty`] for dumping structured values into log lines.

use serde::Serialize;
use std::fmt::Debug;
use tracing_subscriber::EnvFilter;

/// Wrapper for pretty-printing types in logs as YAML
///
/// ```ignore
/// use backlog_common::Pretty;
/// use tracing::debug;
///
/// debug!("Resolved locations: {}", Pretty(&locations));
/// ```
///
/// Outputs YAML with a leading newline. Debug is used as a fallback if YAML
/// serialization fails.
pub struct Pretty<T>(pub T);

impl<T: Serialize + Debug> std::fmt::Display for Pretty<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match serde_yaml_ng::to_string(&self.0) {
            Ok(yaml) => write!(f, "\n{}", yaml),
            Err(_) => write!(f, "\n{:#?}", self.0),
        }
    }
}

impl<T: Serialize + Debug> std::fmt::Debug for Pretty<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}

/// Install a global `fmt` subscriber writing to stderr
///
/// `RUST_LOG` takes precedence when set. Otherwise the level is `debug` when
/// `debug` is true and `info` when it is not; suppressed network failures only
/// show up at `debug`. Calling this twice is harmless, the second call is ignored.
pub fn init_tracing(debug: bool) {
    let default_level = if debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Debug, Serialize)]
    struct Sample {
        id: String,
        category: String,
    }

    #[test]
    fn test_pretty_renders_yaml() {
        let sample = Sample {
            id: "task-1".to_string(),
            category: "active".to_string(),
        };
        let rendered = format!("{}", Pretty(&sample));
        assert!(rendered.starts_with('\n'));
        assert!(rendered.contains("id: task-1"));
        assert!(rendered.contains("category: active"));
    }

    #[test]
    fn test_init_tracing_twice_is_harmless() {
        init_tracing(true);
        init_tracing(false);
    }
}
