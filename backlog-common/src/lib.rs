//! # Backlog Common
//!
//! Foundational pieces shared by every Backlog crate:
//!
//! - [`error`] - severity classification implemented by all error types
//! - [`logging`] - tracing subscriber setup and the [`Pretty`] log formatter
//! - [`progress`] - the [`ProgressSink`] used by long-running reads to report steps

pub mod error;
pub mod logging;
pub mod progress;

pub use error::{ErrorSeverity, Severity};
pub use logging::{init_tracing, Pretty};
pub use progress::{NoProgress, ProgressSink};
