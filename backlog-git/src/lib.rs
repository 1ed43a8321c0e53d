//! Backlog Git Access
//!
//! Read-only access to the refs of a git repository: which branches exist
//! locally and on remotes, which files a branch holds under a directory, what
//! those files contain and when they last changed. Nothing in this crate
//! touches the working tree; the only write is `fetch`, which updates
//! remote-tracking refs.
//!
//! ## Features
//!
//! - **Type Safety**: [`BranchName`] newtype prevents string confusion
//! - **Backend Trait**: [`RefBackend`] is the seam the reconciliation engine reads through
//! - **git2 Backend**: [`GitRefBackend`] runs every read on a blocking thread
//! - **Test Backend**: [`InMemoryRefBackend`] serves canned refs and counts calls
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use backlog_git::{GitRefBackend, RefBackend};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = GitRefBackend::discover(".")?;
//! for branch in backend.list_local_refs().await? {
//!     let files = backend.list_files_at_ref(branch.as_str(), "backlog/tasks").await?;
//!     println!("{branch}: {} task files", files.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod error;
pub mod memory;
pub mod operations;
pub mod repository;
pub mod types;

// Re-export main types
pub use backend::{GitRefBackend, RefBackend};
pub use error::{GitError, GitResult};
pub use memory::{FetchFailure, InMemoryRefBackend};
pub use operations::GitOperations;
pub use repository::GitRepository;
pub use types::{BranchName, FileTimestamps};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
