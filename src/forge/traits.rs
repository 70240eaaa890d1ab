//! forge::traits
//!
//! Forge trait definition for interacting with remote hosting services.
//!
//! # Design
//!
//! The `Forge` trait is async because forge operations involve network I/O.
//! All methods return `Result` so the engine can decide how to degrade:
//! read operations feed the changelog and fall back to "no data", write
//! operations are independent publish channels.
//!
//! # Example
//!
//! ```ignore
//! use changelog_ci::forge::{Forge, ForgeError};
//!
//! async fn since_last_release(forge: &dyn Forge) -> Result<usize, ForgeError> {
//!     let since = forge.latest_release_date().await?;
//!     let prs = forge.merged_pull_requests(since).await?;
//!     Ok(prs.records.len())
//! }
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::core::types::ChangeRecord;

/// Errors from forge operations.
///
/// These error types map to common failure modes when interacting
/// with remote hosting services like GitHub.
#[derive(Debug, Clone, Error)]
pub enum ForgeError {
    /// Authentication is required but not available.
    #[error("authentication required")]
    AuthRequired,

    /// Authentication failed (invalid token, expired, insufficient permissions).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Rate limit exceeded.
    #[error("rate limited")]
    RateLimited,

    /// API returned an error.
    #[error("API error: {status} - {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Network or connection error.
    #[error("network error: {0}")]
    NetworkError(String),
}

/// Change records from a paginated listing.
///
/// A listing whose first page loaded is returned even if a later page
/// failed. `truncated` then holds the error that ended pagination and
/// `records` everything read before it.
#[derive(Debug, Clone, Default)]
pub struct Listing {
    pub records: Vec<ChangeRecord>,
    pub truncated: Option<ForgeError>,
}

impl Listing {
    /// Whether every page was read.
    pub fn is_complete(&self) -> bool {
        self.truncated.is_none()
    }
}

impl From<Vec<ChangeRecord>> for Listing {
    fn from(records: Vec<ChangeRecord>) -> Self {
        Self {
            records,
            truncated: None,
        }
    }
}

/// Request to create a pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePrRequest {
    /// Head branch name (the branch with changes)
    pub head: String,
    /// Base branch name (the branch to merge into)
    pub base: String,
    /// PR title
    pub title: String,
    /// PR body/description
    pub body: String,
}

/// A pull request created by the forge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    /// PR number
    pub number: u64,
    /// PR URL (web URL for viewing)
    pub url: String,
}

/// A comment posted on a pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    /// Comment ID
    pub id: u64,
    /// Comment URL (web URL for viewing)
    pub url: String,
}

/// The Forge trait for interacting with remote hosting services.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` to allow use across async tasks.
///
/// # Error Handling
///
/// All methods return `Result<T, ForgeError>`. Callers should handle:
/// - `AuthRequired` / `AuthFailed`: Missing or insufficient token
/// - `NotFound`: Resource doesn't exist
/// - `RateLimited`: Back off and retry
/// - `ApiError`: Display error message to user
/// - `NetworkError`: Check connectivity
#[async_trait]
pub trait Forge: Send + Sync {
    /// Get the forge name (e.g., "github").
    fn name(&self) -> &'static str;

    /// Publication time of the latest release.
    ///
    /// Returns `Ok(None)` when the repository has no release yet.
    async fn latest_release_date(&self) -> Result<Option<DateTime<Utc>>, ForgeError>;

    /// Pull requests merged at or after `since`, oldest first.
    ///
    /// With `since = None` every merged pull request is returned. Fails
    /// only when the first page cannot be read.
    async fn merged_pull_requests(&self, since: Option<DateTime<Utc>>)
        -> Result<Listing, ForgeError>;

    /// Commits on the default branch made at or after `since`.
    ///
    /// Merge commits are included; filtering is the caller's job. Fails
    /// only when the first page cannot be read.
    async fn commits(&self, since: Option<DateTime<Utc>>) -> Result<Listing, ForgeError>;

    /// Open a new pull request.
    ///
    /// # Errors
    ///
    /// - `AuthRequired` if no token is configured
    /// - `ApiError` with status 422 if validation fails (e.g., head doesn't exist)
    async fn create_pr(&self, request: CreatePrRequest) -> Result<PullRequest, ForgeError>;

    /// Post a comment on pull request `number`.
    ///
    /// # Errors
    ///
    /// - `AuthRequired` if no token is configured
    /// - `NotFound` if the PR doesn't exist
    async fn create_comment(&self, number: u64, body: &str) -> Result<Comment, ForgeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forge_error_display() {
        assert_eq!(
            format!("{}", ForgeError::AuthRequired),
            "authentication required"
        );
        assert_eq!(
            format!("{}", ForgeError::AuthFailed("expired token".into())),
            "authentication failed: expired token"
        );
        assert_eq!(
            format!("{}", ForgeError::NotFound("release".into())),
            "not found: release"
        );
        assert_eq!(format!("{}", ForgeError::RateLimited), "rate limited");
        assert_eq!(
            format!(
                "{}",
                ForgeError::ApiError {
                    status: 422,
                    message: "Validation failed".into()
                }
            ),
            "API error: 422 - Validation failed"
        );
        assert_eq!(
            format!("{}", ForgeError::NetworkError("timeout".into())),
            "network error: timeout"
        );
    }
}
