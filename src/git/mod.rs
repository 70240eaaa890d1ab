//! git
//!
//! Single interface for all Git operations.
//!
//! # Architecture
//!
//! This module is the **ONLY doorway** to Git. No other module imports
//! `git2`, and nothing shells out to the git CLI.
//!
//! # Responsibilities
//!
//! - Repository discovery and opening
//! - Branch fetch, checkout and creation
//! - Staging and committing a single file with an explicit author
//! - Pushing with token authentication
//!
//! # Example
//!
//! ```ignore
//! use changelog_ci::git::Git;
//! use std::path::Path;
//!
//! let git = Git::open(Path::new("."))?;
//! git.fetch_branch("origin", "release-1.2.0", token)?;
//! git.checkout_branch("release-1.2.0")?;
//! ```

mod interface;

pub use interface::{CommitAuthor, CommitInfo, Git, GitError};
