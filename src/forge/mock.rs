//! forge::mock
//!
//! Mock forge implementation for deterministic testing.
//!
//! # Design
//!
//! The mock forge provides a deterministic implementation of the `Forge` trait
//! for use in tests. It serves canned release dates, pull requests and
//! commits, keeps created pull requests and comments in memory, records every
//! call, and can be configured to fail one operation.
//!
//! # Example
//!
//! ```
//! use changelog_ci::core::types::ChangeRecord;
//! use changelog_ci::forge::mock::{MockForge, MockOperation};
//! use changelog_ci::forge::Forge;
//!
//! # tokio_test::block_on(async {
//! let forge = MockForge::new().with_pull_requests(vec![
//!     ChangeRecord::pull_request(1, "Add feature", "https://github.com/o/r/pull/1", ["feature"]),
//! ]);
//!
//! let prs = forge.merged_pull_requests(None).await.unwrap();
//! assert_eq!(prs.records.len(), 1);
//! assert_eq!(
//!     forge.operations(),
//!     vec![MockOperation::MergedPullRequests { since: None }]
//! );
//! # });
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, MutexGuard};

use super::traits::{Comment, CreatePrRequest, Forge, ForgeError, Listing, PullRequest};
use crate::core::types::ChangeRecord;

/// Mock forge for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping. Clones share state.
#[derive(Debug, Clone)]
pub struct MockForge {
    /// Internal state shared across clones.
    inner: Arc<Mutex<MockForgeInner>>,
}

/// Internal mutable state.
#[derive(Debug)]
struct MockForgeInner {
    /// Publication date of the latest release.
    release_date: Option<DateTime<Utc>>,
    /// Merged pull requests served by `merged_pull_requests`.
    pull_requests: Vec<ChangeRecord>,
    /// Commits served by `commits`.
    commits: Vec<ChangeRecord>,
    /// Error reported as ending pagination early on every listing.
    truncated: Option<ForgeError>,
    /// Pull requests opened through the mock.
    created_prs: Vec<CreatePrRequest>,
    /// Comments posted through the mock, as `(pr number, body)`.
    comments: Vec<(u64, String)>,
    /// Next PR number to assign.
    next_pr_number: u64,
    /// Next comment ID to assign.
    next_comment_id: u64,
    /// Method to fail on (for testing error paths).
    fail_on: Option<FailOn>,
    /// Recorded operations for verification.
    operations: Vec<MockOperation>,
}

/// Configuration for which operation should fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    /// Fail latest_release_date with the given error.
    LatestReleaseDate(ForgeError),
    /// Fail merged_pull_requests with the given error.
    MergedPullRequests(ForgeError),
    /// Fail commits with the given error.
    Commits(ForgeError),
    /// Fail create_pr with the given error.
    CreatePr(ForgeError),
    /// Fail create_comment with the given error.
    CreateComment(ForgeError),
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    LatestReleaseDate,
    MergedPullRequests {
        since: Option<DateTime<Utc>>,
    },
    Commits {
        since: Option<DateTime<Utc>>,
    },
    CreatePr {
        head: String,
        base: String,
        title: String,
    },
    CreateComment {
        number: u64,
    },
}

impl MockOperation {
    /// Whether this operation writes to the forge.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            MockOperation::CreatePr { .. } | MockOperation::CreateComment { .. }
        )
    }
}

impl MockForge {
    /// Create a new empty mock forge with no releases.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockForgeInner {
                release_date: None,
                pull_requests: Vec::new(),
                commits: Vec::new(),
                truncated: None,
                created_prs: Vec::new(),
                comments: Vec::new(),
                next_pr_number: 1,
                next_comment_id: 1,
                fail_on: None,
                operations: Vec::new(),
            })),
        }
    }

    /// Set the latest release date.
    pub fn with_release(self, published_at: DateTime<Utc>) -> Self {
        self.state().release_date = Some(published_at);
        self
    }

    /// Set the merged pull requests the mock serves.
    pub fn with_pull_requests(self, records: Vec<ChangeRecord>) -> Self {
        self.state().pull_requests = records;
        self
    }

    /// Set the commits the mock serves.
    pub fn with_commits(self, records: Vec<ChangeRecord>) -> Self {
        self.state().commits = records;
        self
    }

    /// Serve listings as if a later page failed with `error`.
    pub fn with_truncated_listings(self, error: ForgeError) -> Self {
        self.state().truncated = Some(error);
        self
    }

    /// Configure the mock to fail on a specific operation.
    ///
    /// # Example
    ///
    /// ```
    /// use changelog_ci::forge::mock::{MockForge, FailOn};
    /// use changelog_ci::forge::ForgeError;
    ///
    /// let forge = MockForge::new()
    ///     .fail_on(FailOn::CreatePr(ForgeError::RateLimited));
    /// ```
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        self.state().fail_on = Some(fail_on);
        self
    }

    /// Clear the failure configuration.
    pub fn clear_fail_on(&self) {
        self.state().fail_on = None;
    }

    /// Get all recorded operations.
    pub fn operations(&self) -> Vec<MockOperation> {
        self.state().operations.clone()
    }

    /// Clear recorded operations.
    pub fn clear_operations(&self) {
        self.state().operations.clear();
    }

    /// Pull requests opened through the mock.
    pub fn created_prs(&self) -> Vec<CreatePrRequest> {
        self.state().created_prs.clone()
    }

    /// Comments posted through the mock, as `(pr number, body)`.
    pub fn comments(&self) -> Vec<(u64, String)> {
        self.state().comments.clone()
    }

    fn state(&self) -> MutexGuard<'_, MockForgeInner> {
        // A panicking test thread must not hide the recorded state.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record an operation.
    fn record(&self, op: MockOperation) {
        self.state().operations.push(op);
    }

    /// Check if we should fail and return the error if so.
    fn check_fail(&self, expected: &str) -> Option<ForgeError> {
        let inner = self.state();
        match &inner.fail_on {
            Some(FailOn::LatestReleaseDate(e)) if expected == "latest_release_date" => {
                Some(e.clone())
            }
            Some(FailOn::MergedPullRequests(e)) if expected == "merged_pull_requests" => {
                Some(e.clone())
            }
            Some(FailOn::Commits(e)) if expected == "commits" => Some(e.clone()),
            Some(FailOn::CreatePr(e)) if expected == "create_pr" => Some(e.clone()),
            Some(FailOn::CreateComment(e)) if expected == "create_comment" => Some(e.clone()),
            _ => None,
        }
    }
}

impl Default for MockForge {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Forge for MockForge {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn latest_release_date(&self) -> Result<Option<DateTime<Utc>>, ForgeError> {
        self.record(MockOperation::LatestReleaseDate);

        if let Some(e) = self.check_fail("latest_release_date") {
            return Err(e);
        }

        Ok(self.state().release_date)
    }

    async fn merged_pull_requests(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Listing, ForgeError> {
        self.record(MockOperation::MergedPullRequests { since });

        if let Some(e) = self.check_fail("merged_pull_requests") {
            return Err(e);
        }

        let state = self.state();
        Ok(Listing {
            records: state.pull_requests.clone(),
            truncated: state.truncated.clone(),
        })
    }

    async fn commits(&self, since: Option<DateTime<Utc>>) -> Result<Listing, ForgeError> {
        self.record(MockOperation::Commits { since });

        if let Some(e) = self.check_fail("commits") {
            return Err(e);
        }

        let state = self.state();
        Ok(Listing {
            records: state.commits.clone(),
            truncated: state.truncated.clone(),
        })
    }

    async fn create_pr(&self, request: CreatePrRequest) -> Result<PullRequest, ForgeError> {
        self.record(MockOperation::CreatePr {
            head: request.head.clone(),
            base: request.base.clone(),
            title: request.title.clone(),
        });

        if let Some(e) = self.check_fail("create_pr") {
            return Err(e);
        }

        let mut inner = self.state();
        let number = inner.next_pr_number;
        inner.next_pr_number += 1;
        inner.created_prs.push(request);

        Ok(PullRequest {
            number,
            url: format!("https://github.com/mock/repo/pull/{}", number),
        })
    }

    async fn create_comment(&self, number: u64, body: &str) -> Result<Comment, ForgeError> {
        self.record(MockOperation::CreateComment { number });

        if let Some(e) = self.check_fail("create_comment") {
            return Err(e);
        }

        let mut inner = self.state();
        let id = inner.next_comment_id;
        inner.next_comment_id += 1;
        inner.comments.push((number, body.to_string()));

        Ok(Comment {
            id,
            url: format!(
                "https://github.com/mock/repo/pull/{}#issuecomment-{}",
                number, id
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn pr(number: u64) -> ChangeRecord {
        ChangeRecord::pull_request(number, "t", "u", Vec::<String>::new())
    }

    #[tokio::test]
    async fn no_release_by_default() {
        let forge = MockForge::new();
        assert_eq!(forge.latest_release_date().await.unwrap(), None);
    }

    #[tokio::test]
    async fn serves_configured_data() {
        let date = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let forge = MockForge::new()
            .with_release(date)
            .with_pull_requests(vec![pr(1), pr(2)])
            .with_commits(vec![ChangeRecord::commit("abc", "m", "u")]);

        assert_eq!(forge.latest_release_date().await.unwrap(), Some(date));
        assert_eq!(forge.merged_pull_requests(Some(date)).await.unwrap().records.len(), 2);
        assert_eq!(forge.commits(Some(date)).await.unwrap().records.len(), 1);

        assert_eq!(
            forge.operations(),
            vec![
                MockOperation::LatestReleaseDate,
                MockOperation::MergedPullRequests { since: Some(date) },
                MockOperation::Commits { since: Some(date) },
            ]
        );
    }

    #[tokio::test]
    async fn truncated_listings_keep_records() {
        let forge = MockForge::new()
            .with_pull_requests(vec![pr(1)])
            .with_truncated_listings(ForgeError::RateLimited);

        let listing = forge.merged_pull_requests(None).await.unwrap();

        assert_eq!(listing.records.len(), 1);
        assert!(!listing.is_complete());
        assert!(matches!(listing.truncated, Some(ForgeError::RateLimited)));
    }

    #[tokio::test]
    async fn create_pr_increments_number() {
        let forge = MockForge::new();
        let request = CreatePrRequest {
            head: "changelog".into(),
            base: "main".into(),
            title: "Add changelog".into(),
            body: "body".into(),
        };

        let first = forge.create_pr(request.clone()).await.unwrap();
        let second = forge.create_pr(request.clone()).await.unwrap();

        assert_eq!(first.number, 1);
        assert_eq!(second.number, 2);
        assert_eq!(forge.created_prs(), vec![request.clone(), request]);
    }

    #[tokio::test]
    async fn comments_recorded() {
        let forge = MockForge::new();
        let comment = forge.create_comment(7, "hello").await.unwrap();

        assert_eq!(comment.id, 1);
        assert!(comment.url.contains("/pull/7#issuecomment-1"));
        assert_eq!(forge.comments(), vec![(7, "hello".to_string())]);
    }

    #[tokio::test]
    async fn fail_on_targets_one_operation() {
        let forge = MockForge::new()
            .with_pull_requests(vec![pr(1)])
            .fail_on(FailOn::CreateComment(ForgeError::AuthRequired));

        assert!(forge.merged_pull_requests(None).await.is_ok());
        assert!(matches!(
            forge.create_comment(1, "x").await,
            Err(ForgeError::AuthRequired)
        ));

        forge.clear_fail_on();
        assert!(forge.create_comment(1, "x").await.is_ok());
    }

    #[tokio::test]
    async fn failed_operations_are_still_recorded() {
        let forge = MockForge::new().fail_on(FailOn::LatestReleaseDate(ForgeError::RateLimited));
        assert!(forge.latest_release_date().await.is_err());
        assert_eq!(forge.operations(), vec![MockOperation::LatestReleaseDate]);
    }

    #[test]
    fn write_operations() {
        assert!(MockOperation::CreateComment { number: 1 }.is_write());
        assert!(!MockOperation::LatestReleaseDate.is_write());
    }

    #[test]
    fn clones_share_state() {
        let forge = MockForge::new();
        let clone = forge.clone();
        clone.record(MockOperation::LatestReleaseDate);
        assert_eq!(forge.operations().len(), 1);
        forge.clear_operations();
        assert!(clone.operations().is_empty());
    }
}
