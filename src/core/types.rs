//! core::types
//!
//! Strong types for core domain concepts.
//!
//! # Types
//!
//! - [`ChangeRecord`] - One pull request or commit listed in a changelog
//! - [`ChangeId`] - Pull request number or commit SHA
//! - [`ChangelogType`] - Which change source feeds the changelog
//! - [`FileType`] - Output markup dialect (Markdown or reStructuredText)
//!
//! # Examples
//!
//! ```
//! use changelog_ci::core::types::{ChangeRecord, FileType};
//!
//! let pr = ChangeRecord::pull_request(3, "Fix X", "https://github.com/o/r/pull/3", ["bug"]);
//! assert_eq!(pr.id.display_label(), "#3");
//! assert!(pr.has_any_label(&["bug".to_string()]));
//!
//! assert_eq!(FileType::from_filename("CHANGELOG.rst"), Some(FileType::RestructuredText));
//! assert_eq!(FileType::from_filename("CHANGELOG.txt"), None);
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of SHA characters shown for commit-sourced records.
pub const SHORT_SHA_LEN: usize = 7;

/// Errors from type validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid changelog type '{0}', must be one of: pull_request, commit_message")]
    InvalidChangelogType(String),

    #[error("invalid changelog filename '{0}', must end with .md or .rst")]
    InvalidFileType(String),
}

/// Identifier of a change, used only for display and link construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChangeId {
    /// Pull request number.
    PullRequest(u64),
    /// Full commit SHA.
    Commit(String),
}

impl ChangeId {
    /// The label shown inside the link of a changelog line.
    ///
    /// Pull requests render as `#<number>`; commits render as the first
    /// seven characters of their SHA.
    pub fn display_label(&self) -> String {
        match self {
            ChangeId::PullRequest(number) => format!("#{}", number),
            ChangeId::Commit(sha) => sha.chars().take(SHORT_SHA_LEN).collect(),
        }
    }
}

/// One pull request or commit to be listed in the changelog.
///
/// Records are immutable once built from the forge response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    /// Pull request number or commit SHA
    pub id: ChangeId,
    /// Pull request title or commit message
    pub text: String,
    /// Web URL of the change
    pub url: String,
    /// Label names (always empty for commits)
    pub labels: Vec<String>,
}

impl ChangeRecord {
    /// Build a record for a merged pull request.
    pub fn pull_request<L, S>(
        number: u64,
        title: impl Into<String>,
        url: impl Into<String>,
        labels: L,
    ) -> Self
    where
        L: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: ChangeId::PullRequest(number),
            text: title.into(),
            url: url.into(),
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    /// Build a record for a commit. Commits carry no labels.
    pub fn commit(sha: impl Into<String>, message: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: ChangeId::Commit(sha.into()),
            text: message.into(),
            url: url.into(),
            labels: Vec::new(),
        }
    }

    /// Whether any of this record's labels appears in `labels`.
    pub fn has_any_label(&self, labels: &[String]) -> bool {
        self.labels.iter().any(|label| labels.contains(label))
    }

    /// Whether this is a merge commit that must never reach a changelog.
    pub fn is_merge_commit(&self) -> bool {
        matches!(self.id, ChangeId::Commit(_))
            && (self.text.starts_with("Merge pull request #") || self.text.starts_with("Merge branch"))
    }
}

/// Which change source feeds the changelog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangelogType {
    /// Titles of merged pull requests
    #[default]
    PullRequest,
    /// Commit messages
    CommitMessage,
}

impl ChangelogType {
    /// Parse a changelog type from its configuration spelling.
    pub fn parse(value: &str) -> Result<Self, TypeError> {
        match value {
            "pull_request" => Ok(ChangelogType::PullRequest),
            "commit_message" => Ok(ChangelogType::CommitMessage),
            other => Err(TypeError::InvalidChangelogType(other.to_string())),
        }
    }

    /// Configuration spelling of this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangelogType::PullRequest => "pull_request",
            ChangelogType::CommitMessage => "commit_message",
        }
    }
}

impl std::fmt::Display for ChangelogType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output markup dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FileType {
    /// Markdown (`.md`)
    #[default]
    #[serde(rename = "md")]
    Markdown,
    /// reStructuredText (`.rst`)
    #[serde(rename = "rst")]
    RestructuredText,
}

impl FileType {
    /// Determine the file type from a changelog filename's extension.
    ///
    /// Returns `None` for anything other than `.md` or `.rst`.
    pub fn from_filename(filename: &str) -> Option<Self> {
        if filename.ends_with(".md") {
            Some(FileType::Markdown)
        } else if filename.ends_with(".rst") {
            Some(FileType::RestructuredText)
        } else {
            None
        }
    }

    /// File extension without the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            FileType::Markdown => "md",
            FileType::RestructuredText => "rst",
        }
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}
