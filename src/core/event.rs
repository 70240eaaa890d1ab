//! core::event
//!
//! The CI action environment: which repository, which event, which branches.
//!
//! # Variables
//!
//! | Variable            | Meaning                                          |
//! |---------------------|--------------------------------------------------|
//! | `GITHUB_REPOSITORY` | `owner/repo` the run belongs to                  |
//! | `GITHUB_EVENT_NAME` | Triggering event (`pull_request`, `workflow_dispatch`) |
//! | `GITHUB_EVENT_PATH` | Path to the JSON webhook payload                 |
//! | `GITHUB_HEAD_REF`   | Pull request head branch                         |
//! | `GITHUB_BASE_REF`   | Pull request base branch                         |
//! | `GITHUB_REF`        | Ref the run was triggered on                     |
//!
//! The environment is read through a lookup function so tests never touch
//! the real process environment.

use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

/// Errors from reading the action environment.
#[derive(Debug, Error)]
pub enum EventError {
    #[error("required environment variable {0} is not set")]
    MissingVariable(&'static str),

    #[error("invalid repository '{0}', expected 'owner/repo'")]
    InvalidRepository(String),

    #[error(
        "Changelog CI was triggered on \"{0}\" event, supported events are: pull_request, workflow_dispatch"
    )]
    UnsupportedEvent(String),
}

/// Events a changelog run can be triggered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// A pull request was opened or updated.
    PullRequest,
    /// The workflow was started manually.
    WorkflowDispatch,
}

impl EventKind {
    /// Parse an event name as reported by the CI runner.
    pub fn parse(name: &str) -> Result<Self, EventError> {
        match name {
            "pull_request" => Ok(EventKind::PullRequest),
            "workflow_dispatch" => Ok(EventKind::WorkflowDispatch),
            other => Err(EventError::UnsupportedEvent(other.to_string())),
        }
    }
}

/// Everything the run needs to know about where and why it was triggered.
#[derive(Debug, Clone)]
pub struct ActionEnvironment {
    /// `owner/repo`
    pub repository: String,
    /// Triggering event
    pub event: EventKind,
    /// Pull request head branch (pull request events only)
    pub head_branch: Option<String>,
    /// Branch changelog pull requests target
    pub base_branch: String,
    /// Webhook payload (`Value::Null` when unavailable)
    pub payload: Value,
    /// Problems found while reading the payload
    pub warnings: Vec<String>,
}

impl ActionEnvironment {
    /// Read the environment of the current process.
    pub fn from_env() -> Result<Self, EventError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the environment through `lookup`.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, EventError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let repository = get("GITHUB_REPOSITORY").ok_or(EventError::MissingVariable("GITHUB_REPOSITORY"))?;
        if split_repository(&repository).is_none() {
            return Err(EventError::InvalidRepository(repository));
        }

        let event_name = get("GITHUB_EVENT_NAME").ok_or(EventError::MissingVariable("GITHUB_EVENT_NAME"))?;
        let event = EventKind::parse(&event_name)?;

        let head_branch = get("GITHUB_HEAD_REF");
        let base_branch = get("GITHUB_BASE_REF")
            .or_else(|| get("GITHUB_REF").map(|r| branch_from_ref(&r).to_string()))
            .ok_or(EventError::MissingVariable("GITHUB_REF"))?;

        let mut warnings = Vec::new();
        let payload = match get("GITHUB_EVENT_PATH") {
            Some(path) => read_payload(Path::new(&path)).unwrap_or_else(|message| {
                warnings.push(message);
                Value::Null
            }),
            None => Value::Null,
        };

        Ok(Self {
            repository,
            event,
            head_branch,
            base_branch,
            payload,
            warnings,
        })
    }

    /// `(owner, repo)` parts of the repository.
    pub fn owner_and_repo(&self) -> (&str, &str) {
        // Validated at construction.
        split_repository(&self.repository).unwrap_or((&self.repository, ""))
    }

    /// Title of the triggering pull request, if any.
    pub fn pull_request_title(&self) -> Option<&str> {
        self.payload
            .get("pull_request")
            .and_then(|pr| pr.get("title"))
            .and_then(Value::as_str)
    }

    /// Number of the triggering pull request, if any.
    pub fn pull_request_number(&self) -> Option<u64> {
        self.payload.get("number").and_then(Value::as_u64)
    }
}

/// Split `owner/repo` into its parts.
pub fn split_repository(repository: &str) -> Option<(&str, &str)> {
    let (owner, repo) = repository.split_once('/')?;
    if owner.is_empty() || repo.is_empty() || repo.contains('/') {
        return None;
    }
    Some((owner, repo))
}

/// Strip a `refs/heads/` prefix from a ref.
fn branch_from_ref(reference: &str) -> &str {
    reference.strip_prefix("refs/heads/").unwrap_or(reference)
}

fn read_payload(path: &Path) -> Result<Value, String> {
    let path_buf = PathBuf::from(path);
    let contents = std::fs::read_to_string(&path_buf)
        .map_err(|e| format!("could not read event payload '{}': {}", path_buf.display(), e))?;
    serde_json::from_str(&contents)
        .map_err(|e| format!("invalid event payload '{}': {}", path_buf.display(), e))
}
