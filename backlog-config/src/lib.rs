//! Backlog reconciliation configuration using Figment
//!
//! Loads the [`ReconciliationConfig`] that every reconciliation entry point
//! takes as an explicit argument. There is no process-wide cached config:
//! callers load a value and pass it along, so tests can run side by side with
//! different settings.
//!
//! # Sources
//!
//! Later sources override earlier ones:
//!
//! 1. Built-in defaults (`ReconciliationConfig::default()`)
//! 2. The project config file, the first of
//!    `<root>/<backlog_dir>/config.{toml,yaml,yml,json}` that exists
//! 3. `BACKLOG_`-prefixed environment variables (`BACKLOG_REMOTE_OPERATIONS=false`)
//!
//! # Example
//!
//! ```no_run
//! use backlog_config::ConfigLoader;
//!
//! let config = ConfigLoader::new(".").load()?;
//! println!("statuses: {:?}", config.status_order);
//! # Ok::<(), backlog_config::ConfigError>(())
//! ```
//!
//! ```yaml
//! # backlog/config.yml
//! statuses: ["To Do", "In Progress", "Done"]
//! task_resolution_strategy: most_progressed
//! remote_operations: true
//! zero_padded_ids: 3
//! active_branch_days: 30
//! ```

pub mod discovery;
pub mod error;
pub mod provider;
pub mod types;

pub use discovery::{ConfigFile, ConfigFormat};
pub use error::{ConfigError, ConfigResult};
pub use provider::ConfigLoader;
pub use types::{ReconciliationConfig, ResolutionStrategy, DEFAULT_BACKLOG_DIR};
