//! engine::publish
//!
//! Deliver a rendered changelog: the `Rendered -> Done` step.
//!
//! # Channels
//!
//! | Event               | `commit_changelog`                         | `comment_changelog`        |
//! |---------------------|--------------------------------------------|----------------------------|
//! | `pull_request`      | commit + push to the PR head branch        | comment on the PR          |
//! | `workflow_dispatch` | commit + push to a new branch, open a PR   | not possible (no PR)       |
//!
//! Channels fail independently. A failure is reported as an error
//! annotation and recorded in the [`PublishReport`]; later channels still
//! run and completed ones are never rolled back.
//!
//! Comments and pull request bodies always use the Markdown rendering,
//! whatever the changelog file's own format.

use std::fs;
use std::io;
use std::path::Path;

use chrono::Utc;

use crate::core::config::Config;
use crate::core::event::{ActionEnvironment, EventKind};
use crate::core::types::FileType;
use crate::forge::{CreatePrRequest, Forge};
use crate::git::{CommitAuthor, Git};
use crate::ui::output::{self, Verbosity};

use super::builder::ChangelogBuilder;
use super::BuildError;

const REMOTE: &str = "origin";

/// Title used for changelog commits and pull requests.
pub fn commit_message(version: &str) -> String {
    format!("[Changelog CI] Add Changelog for Version {}", version)
}

/// Branch created for manually dispatched runs.
pub fn dispatch_branch_name(version: &str, unix_ts: i64) -> String {
    format!("changelog-ci-{}-{}", version, unix_ts)
}

/// Write `content` at the top of the file at `path`.
///
/// Existing content is kept below a blank line. A missing or empty file
/// ends up holding just `content`.
pub fn prepend_to_file(path: &Path, content: &str) -> io::Result<()> {
    let previous = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e),
    };

    let updated = if previous.is_empty() {
        content.to_string()
    } else {
        format!("{}\n\n{}", content, previous)
    };
    fs::write(path, updated)
}

/// A publishing channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Commit,
    PullRequest,
    Comment,
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Channel::Commit => "commit",
            Channel::PullRequest => "pull request",
            Channel::Comment => "comment",
        };
        f.write_str(name)
    }
}

/// A channel that failed to deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelFailure {
    pub channel: Channel,
    pub message: String,
}

/// What publishing achieved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// SHA of the changelog commit
    pub commit: Option<String>,
    /// Branch the commit was pushed to
    pub branch: Option<String>,
    /// URL of the opened pull request
    pub pull_request_url: Option<String>,
    /// URL of the posted comment
    pub comment_url: Option<String>,
    pub failures: Vec<ChannelFailure>,
}

impl PublishReport {
    /// Whether every requested channel delivered.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn fail(&mut self, channel: Channel, message: impl Into<String>) {
        let message = message.into();
        output::error_annotation(&message);
        self.failures.push(ChannelFailure { channel, message });
    }
}

/// Publishes one build according to the configuration and event.
pub struct Publisher<'a> {
    pub config: &'a Config,
    pub env: &'a ActionEnvironment,
    pub forge: &'a dyn Forge,
    /// Repository to commit to; `None` when no repository could be opened
    pub git: Option<&'a Git>,
    pub verbosity: Verbosity,
}

impl<'a> Publisher<'a> {
    /// Publish `builder`'s changelog on every enabled channel.
    pub async fn publish(
        &self,
        builder: &mut ChangelogBuilder<'_>,
    ) -> Result<PublishReport, BuildError> {
        let file_contents = builder.render(self.config.file_type())?.to_string();
        let markdown = builder.render(FileType::Markdown)?.to_string();
        let version = builder.version().to_string();
        let mut report = PublishReport::default();

        match self.env.event {
            EventKind::PullRequest => {
                if self.config.commit_changelog {
                    self.commit_to_head_branch(&file_contents, &version, &mut report);
                }
                if self.config.comment_changelog {
                    self.comment_on_pull_request(&markdown, &mut report).await;
                }
            }
            EventKind::WorkflowDispatch => {
                if self.config.commit_changelog {
                    self.open_changelog_pull_request(&file_contents, &markdown, &version, &mut report)
                        .await;
                }
                if self.config.comment_changelog {
                    report.fail(
                        Channel::Comment,
                        "Comments can only be posted on pull_request events",
                    );
                }
            }
        }

        builder.finish()?;
        Ok(report)
    }

    fn token(&self) -> Option<&str> {
        self.config.github_token.as_deref()
    }

    fn author(&self) -> CommitAuthor {
        CommitAuthor::new(
            &self.config.git_committer_username,
            &self.config.git_committer_email,
        )
    }

    fn commit_to_head_branch(&self, contents: &str, version: &str, report: &mut PublishReport) {
        let Some(head) = self.env.head_branch.as_deref() else {
            report.fail(Channel::Commit, "Pull request head branch is unknown (GITHUB_HEAD_REF)");
            return;
        };

        output::group(format!("Committing changelog to {}", head), self.verbosity);
        let result = self.git().and_then(|git| {
            git.fetch_branch(REMOTE, head, self.token())
                .and_then(|_| git.checkout_branch(head))
                .map_err(|e| e.to_string())?;
            self.commit_and_push(git, head, contents, version)
        });
        output::end_group(self.verbosity);

        match result {
            Ok(sha) => {
                output::print(format!("Pushed {} to {}", sha, head), self.verbosity);
                report.commit = Some(sha);
                report.branch = Some(head.to_string());
            }
            Err(message) => report.fail(
                Channel::Commit,
                format!("Could not commit the changelog to {}: {}", head, message),
            ),
        }
    }

    async fn open_changelog_pull_request(
        &self,
        contents: &str,
        markdown: &str,
        version: &str,
        report: &mut PublishReport,
    ) {
        let branch = dispatch_branch_name(version, Utc::now().timestamp());
        let base = self.env.base_branch.as_str();

        output::group(format!("Committing changelog to {}", branch), self.verbosity);
        let result = self.git().and_then(|git| {
            git.create_branch(&branch, base).map_err(|e| e.to_string())?;
            self.commit_and_push(git, &branch, contents, version)
        });
        output::end_group(self.verbosity);

        match result {
            Ok(sha) => {
                report.commit = Some(sha);
                report.branch = Some(branch.clone());
            }
            Err(message) => {
                report.fail(
                    Channel::Commit,
                    format!("Could not commit the changelog to {}: {}", branch, message),
                );
                return;
            }
        }

        let request = CreatePrRequest {
            head: branch,
            base: base.to_string(),
            title: commit_message(version),
            body: markdown.to_string(),
        };
        match self.forge.create_pr(request).await {
            Ok(pr) => {
                output::notice(format!("Opened changelog pull request: {}", pr.url), self.verbosity);
                report.pull_request_url = Some(pr.url);
            }
            Err(e) => report.fail(
                Channel::PullRequest,
                format!("Could not open the changelog pull request: {}", e),
            ),
        }
    }

    async fn comment_on_pull_request(&self, markdown: &str, report: &mut PublishReport) {
        if self.token().is_none() {
            report.fail(
                Channel::Comment,
                "A GitHub token is required to comment the changelog on the pull request",
            );
            return;
        }
        let Some(number) = self.env.pull_request_number() else {
            report.fail(
                Channel::Comment,
                "Pull request number is missing from the event payload",
            );
            return;
        };

        match self.forge.create_comment(number, markdown).await {
            Ok(comment) => {
                output::notice(format!("Commented the changelog: {}", comment.url), self.verbosity);
                report.comment_url = Some(comment.url);
            }
            Err(e) => report.fail(
                Channel::Comment,
                format!("Could not comment on pull request #{}: {}", number, e),
            ),
        }
    }

    fn git(&self) -> Result<&'a Git, String> {
        self.git
            .ok_or_else(|| "no git repository is available in the working directory".to_string())
    }

    /// Prepend, commit and push the changelog file; returns the commit SHA.
    fn commit_and_push(
        &self,
        git: &Git,
        branch: &str,
        contents: &str,
        version: &str,
    ) -> Result<String, String> {
        let path = git
            .workdir()
            .map_err(|e| e.to_string())?
            .join(&self.config.changelog_filename);

        prepend_to_file(&path, contents)
            .map_err(|e| format!("failed to write {}: {}", path.display(), e))?;
        let commit = git
            .commit_file(&path, &commit_message(version), &self.author())
            .map_err(|e| e.to_string())?;
        git.push(REMOTE, branch, self.token())
            .map_err(|e| e.to_string())?;

        output::debug(
            format!(
                "Committed {} on {} as {} ({})",
                self.config.changelog_filename,
                branch,
                commit.oid,
                self.config.git_commit_author()
            ),
            self.verbosity,
        );
        Ok(commit.oid)
    }
}
