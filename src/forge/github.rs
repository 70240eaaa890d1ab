//! forge::github
//!
//! GitHub forge implementation using the REST API.
//!
//! # Design
//!
//! This module implements the `Forge` trait for GitHub:
//! - `GET /repos/{owner}/{repo}/releases/latest` for the previous release date
//! - `GET /search/issues` for merged pull requests
//! - `GET /repos/{owner}/{repo}/commits` for commits
//! - `POST /repos/{owner}/{repo}/pulls` to open the changelog pull request
//! - `POST /repos/{owner}/{repo}/issues/{number}/comments` to comment
//!
//! # Authentication
//!
//! Read endpoints work anonymously for public repositories, so the token is
//! optional and only sent when present. Write endpoints return
//! `ForgeError::AuthRequired` without a token.
//!
//! # Pagination
//!
//! List endpoints are requested 100 items at a time and followed for at
//! most [`MAX_PAGES`] pages, which is also the search API's own ceiling of
//! 1000 results. Only a failed first page is an error; a later failure
//! ends pagination and is returned as [`Listing::truncated`] alongside
//! the pages already read.
//!
//! # Example
//!
//! ```ignore
//! use changelog_ci::forge::github::GitHubForge;
//! use changelog_ci::forge::Forge;
//!
//! let forge = GitHubForge::new(Some("ghs_xxx".to_string()), "octocat", "hello-world");
//! let since = forge.latest_release_date().await?;
//! let prs = forge.merged_pull_requests(since).await?;
//! ```

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::traits::{Comment, CreatePrRequest, Forge, ForgeError, Listing, PullRequest};
use crate::core::config::schema::DEFAULT_API_BASE;
use crate::core::event::split_repository;
use crate::core::types::ChangeRecord;

/// User-Agent header value for API requests.
const USER_AGENT_VALUE: &str = "changelog-ci";

/// Items requested per page.
pub const PER_PAGE: usize = 100;

/// Upper bound on pages followed for one listing.
pub const MAX_PAGES: usize = 10;

/// GitHub forge implementation.
pub struct GitHubForge {
    /// HTTP client for making requests
    client: Client,
    /// Token for authenticated requests
    token: Option<String>,
    /// Repository owner (user or organization)
    owner: String,
    /// Repository name
    repo: String,
    /// API base URL (configurable for GitHub Enterprise)
    api_base: String,
}

// Custom Debug to avoid exposing the token
impl std::fmt::Debug for GitHubForge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubForge")
            .field("has_token", &self.token.is_some())
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl GitHubForge {
    /// Create a GitHub forge for `owner/repo` on github.com.
    pub fn new(token: Option<String>, owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self::with_api_base(token, owner, repo, DEFAULT_API_BASE)
    }

    /// Create a GitHub forge with a custom API base URL.
    ///
    /// Use this for GitHub Enterprise (e.g., `https://github.example.com/api/v3`).
    pub fn with_api_base(
        token: Option<String>,
        owner: impl Into<String>,
        repo: impl Into<String>,
        api_base: impl Into<String>,
    ) -> Self {
        let api_base: String = api_base.into();
        Self {
            client: Client::new(),
            token: token.filter(|t| !t.is_empty()),
            owner: owner.into(),
            repo: repo.into(),
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    /// Create a GitHub forge from an `owner/repo` string.
    ///
    /// # Example
    ///
    /// ```
    /// use changelog_ci::forge::github::GitHubForge;
    ///
    /// let forge = GitHubForge::from_repository("octocat/hello-world", None, "https://api.github.com");
    /// assert_eq!(forge.unwrap().repository(), "octocat/hello-world");
    /// assert!(GitHubForge::from_repository("nope", None, "https://api.github.com").is_none());
    /// ```
    pub fn from_repository(
        repository: &str,
        token: Option<String>,
        api_base: impl Into<String>,
    ) -> Option<Self> {
        let (owner, repo) = split_repository(repository)?;
        Some(Self::with_api_base(token, owner, repo, api_base))
    }

    /// `owner/repo`
    pub fn repository(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    /// Build common headers for API requests.
    fn headers(&self) -> Result<HeaderMap, ForgeError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &self.token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| ForgeError::AuthFailed("token contains invalid characters".into()))?;
            headers.insert(AUTHORIZATION, value);
        }
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github.v3+json"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        Ok(headers)
    }

    fn require_token(&self) -> Result<(), ForgeError> {
        match self.token {
            Some(_) => Ok(()),
            None => Err(ForgeError::AuthRequired),
        }
    }

    /// Build URL for a repository endpoint.
    fn repo_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.api_base, self.owner, self.repo, path
        )
    }

    /// Query string for the merged pull request search.
    fn search_query(&self, since: Option<DateTime<Utc>>) -> String {
        let mut query = format!(
            "repo:{}/{} is:pr is:merged sort:created-asc",
            self.owner, self.repo
        );
        if let Some(since) = since {
            query.push_str(" merged:>=");
            query.push_str(&format_timestamp(since));
        }
        query
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ForgeError> {
        request
            .headers(self.headers()?)
            .send()
            .await
            .map_err(|e| ForgeError::NetworkError(e.to_string()))
    }

    /// Handle API response, mapping errors appropriately.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: Response,
    ) -> Result<T, ForgeError> {
        let status = response.status();

        if status.is_success() {
            response.json().await.map_err(|e| ForgeError::ApiError {
                status: status.as_u16(),
                message: format!("Failed to parse response: {}", e),
            })
        } else {
            self.handle_error_response(response, status).await
        }
    }

    /// Handle an error response from the API.
    async fn handle_error_response<T>(
        &self,
        response: Response,
        status: StatusCode,
    ) -> Result<T, ForgeError> {
        // GitHub reports exhausted rate limits as 403 with this header at zero.
        let rate_limited = response
            .headers()
            .get("X-RateLimit-Remaining")
            .and_then(|v| v.to_str().ok())
            .map(|v| v == "0")
            .unwrap_or(false);

        // Try to get error message from body
        let message = match response.json::<GitHubErrorResponse>().await {
            Ok(err) => err.message,
            Err(_) => "Unknown error".to_string(),
        };

        Err(match status {
            StatusCode::UNAUTHORIZED => ForgeError::AuthFailed("Invalid or expired token".into()),
            StatusCode::FORBIDDEN if rate_limited => ForgeError::RateLimited,
            StatusCode::FORBIDDEN => ForgeError::AuthFailed(format!("Permission denied: {}", message)),
            StatusCode::NOT_FOUND => ForgeError::NotFound(message),
            StatusCode::TOO_MANY_REQUESTS => ForgeError::RateLimited,
            _ if status.is_server_error() => ForgeError::ApiError {
                status: status.as_u16(),
                message: format!("GitHub server error: {}", message),
            },
            _ => ForgeError::ApiError {
                status: status.as_u16(),
                message,
            },
        })
    }

    /// GET one page of a listing.
    async fn get_page<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, String)],
        page: usize,
    ) -> Result<T, ForgeError> {
        let request = self
            .client
            .get(url)
            .query(params)
            .query(&[("per_page", PER_PAGE), ("page", page)]);
        let response = self.send(request).await?;
        self.handle_response(response).await
    }
}

/// Timestamp format used in GitHub query parameters.
pub fn format_timestamp(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[async_trait]
impl Forge for GitHubForge {
    fn name(&self) -> &'static str {
        "github"
    }

    async fn latest_release_date(&self) -> Result<Option<DateTime<Utc>>, ForgeError> {
        let request = self.client.get(self.repo_url("releases/latest"));
        let response = self.send(request).await?;

        match self.handle_response::<GitHubRelease>(response).await {
            Ok(release) => Ok(release.published_at),
            // No release published yet
            Err(ForgeError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn merged_pull_requests(
        &self,
        since: Option<DateTime<Utc>>,
    ) -> Result<Listing, ForgeError> {
        let url = format!("{}/search/issues", self.api_base);
        let params = [("q", self.search_query(since))];

        let mut listing = Listing::default();
        for page in 1..=MAX_PAGES {
            let result: GitHubSearchResponse = match self.get_page(&url, &params, page).await {
                Ok(result) => result,
                Err(e) if page == 1 => return Err(e),
                Err(e) => {
                    listing.truncated = Some(e);
                    break;
                }
            };
            let page_count = result.items.len();

            listing
                .records
                .extend(result.items.into_iter().map(ChangeRecord::from));

            if page_count < PER_PAGE || listing.records.len() as u64 >= result.total_count {
                break;
            }
        }

        Ok(listing)
    }

    async fn commits(&self, since: Option<DateTime<Utc>>) -> Result<Listing, ForgeError> {
        let url = self.repo_url("commits");
        let params: Vec<(&str, String)> = since
            .map(|s| vec![("since", format_timestamp(s))])
            .unwrap_or_default();

        let mut listing = Listing::default();
        for page in 1..=MAX_PAGES {
            let items: Vec<GitHubCommit> = match self.get_page(&url, &params, page).await {
                Ok(items) => items,
                Err(e) if page == 1 => return Err(e),
                Err(e) => {
                    listing.truncated = Some(e);
                    break;
                }
            };
            let page_count = items.len();

            listing
                .records
                .extend(items.into_iter().map(ChangeRecord::from));

            if page_count < PER_PAGE {
                break;
            }
        }

        Ok(listing)
    }

    async fn create_pr(&self, request: CreatePrRequest) -> Result<PullRequest, ForgeError> {
        self.require_token()?;

        let body = CreatePrBody {
            head: &request.head,
            base: &request.base,
            title: &request.title,
            body: &request.body,
        };

        let response = self
            .send(self.client.post(self.repo_url("pulls")).json(&body))
            .await?;
        let pr: GitHubPullRequest = self.handle_response(response).await?;

        Ok(PullRequest {
            number: pr.number,
            url: pr.html_url,
        })
    }

    async fn create_comment(&self, number: u64, body: &str) -> Result<Comment, ForgeError> {
        self.require_token()?;

        let url = self.repo_url(&format!("issues/{}/comments", number));
        let response = self
            .send(self.client.post(url).json(&CreateCommentBody { body }))
            .await?;
        let comment: GitHubComment = self.handle_response(response).await?;

        Ok(Comment {
            id: comment.id,
            url: comment.html_url,
        })
    }
}

// --------------------------------------------------------------------------
// API Request/Response Types
// --------------------------------------------------------------------------

/// Request body for creating a PR.
#[derive(Serialize)]
struct CreatePrBody<'a> {
    head: &'a str,
    base: &'a str,
    title: &'a str,
    body: &'a str,
}

/// Request body for creating a comment.
#[derive(Serialize)]
struct CreateCommentBody<'a> {
    body: &'a str,
}

/// GitHub error response format.
#[derive(Deserialize)]
struct GitHubErrorResponse {
    message: String,
}

/// GitHub release response (subset).
#[derive(Deserialize)]
struct GitHubRelease {
    /// `null` for draft releases
    published_at: Option<DateTime<Utc>>,
}

/// GitHub issue search response.
#[derive(Deserialize)]
struct GitHubSearchResponse {
    total_count: u64,
    items: Vec<GitHubSearchItem>,
}

/// One issue search hit (subset).
#[derive(Deserialize)]
struct GitHubSearchItem {
    number: u64,
    title: String,
    html_url: String,
    #[serde(default)]
    labels: Vec<GitHubLabel>,
}

#[derive(Deserialize)]
struct GitHubLabel {
    name: String,
}

/// Commit list item (subset).
#[derive(Deserialize)]
struct GitHubCommit {
    sha: String,
    html_url: String,
    commit: GitHubCommitDetail,
}

#[derive(Deserialize)]
struct GitHubCommitDetail {
    message: String,
}

/// Created pull request (subset).
#[derive(Deserialize)]
struct GitHubPullRequest {
    number: u64,
    html_url: String,
}

/// Created comment (subset).
#[derive(Deserialize)]
struct GitHubComment {
    id: u64,
    html_url: String,
}

impl From<GitHubSearchItem> for ChangeRecord {
    fn from(item: GitHubSearchItem) -> Self {
        ChangeRecord::pull_request(
            item.number,
            item.title,
            item.html_url,
            item.labels.into_iter().map(|l| l.name),
        )
    }
}

impl From<GitHubCommit> for ChangeRecord {
    fn from(item: GitHubCommit) -> Self {
        ChangeRecord::commit(item.sha, item.commit.message, item.html_url)
    }
}
