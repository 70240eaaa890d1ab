//! git::interface
//!
//! The Git interface implementation.
//!
//! # Design
//!
//! The `Git` struct wraps a `git2::Repository` and exposes exactly the
//! operations a changelog run needs: switch to the branch being released,
//! branch off for a changelog pull request, commit the changelog file with an
//! explicit author, and push. Every git2 error is mapped to a [`GitError`].
//!
//! # Remote Authentication
//!
//! Fetch and push authenticate over HTTPS with the forge token as the
//! password of the `x-access-token` user. Credentials are offered once; a
//! second request from libgit2 means they were rejected.

use std::path::{Path, PathBuf};

use git2::{
    build::CheckoutBuilder, BranchType, Cred, FetchOptions, PushOptions, RemoteCallbacks,
    Signature,
};
use thiserror::Error;

/// Errors from Git operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// Not inside a Git repository.
    #[error("not a git repository: {path}")]
    NotARepo {
        /// The path that was searched
        path: PathBuf,
    },

    /// Repository is bare (no working directory).
    #[error("bare repository not supported")]
    BareRepo,

    /// Requested ref does not exist.
    #[error("ref not found: {refname}")]
    RefNotFound {
        /// The ref that was not found
        refname: String,
    },

    /// A file to commit lies outside the working directory.
    #[error("path is outside the working directory: {path}")]
    OutsideWorkdir {
        /// The offending path
        path: PathBuf,
    },

    /// The remote refused a pushed ref.
    #[error("push of {refname} rejected: {message}")]
    PushRejected {
        /// The ref that was rejected
        refname: String,
        /// Reason given by the remote
        message: String,
    },

    /// Internal git2 error.
    #[error("git error: {message}")]
    Internal {
        /// The error message
        message: String,
    },
}

impl GitError {
    /// Create a GitError from a git2::Error with richer context.
    fn from_git2(err: git2::Error, context: &str) -> Self {
        match err.code() {
            git2::ErrorCode::NotFound => GitError::RefNotFound {
                refname: context.to_string(),
            },
            _ => GitError::Internal {
                message: format!("{}: {}", context, err.message()),
            },
        }
    }
}

impl From<git2::Error> for GitError {
    fn from(err: git2::Error) -> Self {
        GitError::Internal {
            message: err.message().to_string(),
        }
    }
}

/// Name and email used for changelog commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitAuthor {
    pub name: String,
    pub email: String,
}

impl CommitAuthor {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

impl std::fmt::Display for CommitAuthor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

/// Information about a commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    /// Full hex object id
    pub oid: String,
    /// First line of the message
    pub summary: String,
    pub author_name: String,
    pub author_email: String,
}

/// The Git interface.
///
/// This is the single point of access for all Git operations.
///
/// # Example
///
/// ```ignore
/// use changelog_ci::git::{CommitAuthor, Git};
/// use std::path::Path;
///
/// let git = Git::open(Path::new("."))?;
/// git.create_branch("changelog-ci-1.0.0-1700000000", "main")?;
/// git.commit_file(
///     Path::new("CHANGELOG.md"),
///     "[Changelog CI] Add Changelog for Version 1.0.0",
///     &CommitAuthor::new("github-actions[bot]", "github-actions[bot]@users.noreply.github.com"),
/// )?;
/// git.push("origin", "changelog-ci-1.0.0-1700000000", Some("ghs_xxx"))?;
/// ```
pub struct Git {
    /// The underlying git2 repository
    repo: git2::Repository,
}

impl std::fmt::Debug for Git {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Git")
            .field("path", &self.repo.path())
            .finish()
    }
}

impl Git {
    /// Open a repository at the given path.
    ///
    /// Uses `git2::Repository::discover` to find the repository root,
    /// so `path` can be any directory within the repository.
    ///
    /// # Errors
    ///
    /// - [`GitError::NotARepo`] if no repository is found
    /// - [`GitError::BareRepo`] if the repository has no working directory
    pub fn open(path: &Path) -> Result<Self, GitError> {
        let repo = git2::Repository::discover(path).map_err(|_| GitError::NotARepo {
            path: path.to_path_buf(),
        })?;

        if repo.is_bare() {
            return Err(GitError::BareRepo);
        }

        Ok(Self { repo })
    }

    /// Root of the working directory.
    pub fn workdir(&self) -> Result<&Path, GitError> {
        self.repo.workdir().ok_or(GitError::BareRepo)
    }

    /// Get the current branch name, if on a branch.
    ///
    /// Returns `None` if HEAD is detached or unborn.
    pub fn current_branch(&self) -> Result<Option<String>, GitError> {
        let head = match self.repo.head() {
            Ok(h) => h,
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if head.is_branch() {
            return Ok(head.shorthand().map(str::to_string));
        }

        Ok(None)
    }

    /// Information about the commit at HEAD.
    pub fn head_commit(&self) -> Result<CommitInfo, GitError> {
        let commit = self
            .repo
            .head()
            .and_then(|h| h.peel_to_commit())
            .map_err(|e| GitError::from_git2(e, "HEAD"))?;
        Ok(commit_info(&commit))
    }

    /// Fetch `branch` from `remote` into `refs/remotes/{remote}/{branch}`.
    pub fn fetch_branch(
        &self,
        remote: &str,
        branch: &str,
        token: Option<&str>,
    ) -> Result<(), GitError> {
        let mut remote_handle = self
            .repo
            .find_remote(remote)
            .map_err(|e| GitError::from_git2(e, remote))?;

        let refspec = format!("+refs/heads/{0}:refs/remotes/{1}/{0}", branch, remote);
        let mut options = FetchOptions::new();
        options.remote_callbacks(callbacks(token));

        remote_handle
            .fetch(&[refspec.as_str()], Some(&mut options), None)
            .map_err(|e| GitError::from_git2(e, &format!("fetch {}/{}", remote, branch)))
    }

    /// Check out local branch `name`.
    ///
    /// If no local branch exists, one is created from `origin/{name}` and
    /// set to track it.
    pub fn checkout_branch(&self, name: &str) -> Result<(), GitError> {
        if self.repo.find_branch(name, BranchType::Local).is_err() {
            let upstream_name = format!("origin/{}", name);
            let upstream = self
                .repo
                .find_branch(&upstream_name, BranchType::Remote)
                .map_err(|e| GitError::from_git2(e, &format!("refs/remotes/{}", upstream_name)))?;
            let commit = upstream.get().peel_to_commit()?;
            let mut local = self.repo.branch(name, &commit, false)?;
            local.set_upstream(Some(&upstream_name))?;
        }

        self.switch_to(name)
    }

    /// Create branch `name` at `start` (a branch or other revision) and check
    /// it out.
    pub fn create_branch(&self, name: &str, start: &str) -> Result<(), GitError> {
        let target = self
            .repo
            .revparse_single(start)
            .or_else(|_| self.repo.revparse_single(&format!("origin/{}", start)))
            .map_err(|e| GitError::from_git2(e, start))?;
        let commit = target.peel_to_commit()?;

        self.repo.branch(name, &commit, false)?;
        self.switch_to(name)
    }

    fn switch_to(&self, name: &str) -> Result<(), GitError> {
        let refname = format!("refs/heads/{}", name);
        let target = self
            .repo
            .revparse_single(&refname)
            .map_err(|e| GitError::from_git2(e, &refname))?;

        self.repo
            .checkout_tree(&target, Some(CheckoutBuilder::new().safe()))?;
        self.repo.set_head(&refname)?;
        Ok(())
    }

    /// Stage `path` and commit it on the current branch.
    ///
    /// `path` may be absolute or relative to the working directory. The
    /// author is also used as committer.
    pub fn commit_file(
        &self,
        path: &Path,
        message: &str,
        author: &CommitAuthor,
    ) -> Result<CommitInfo, GitError> {
        let relative = self.relative_path(path)?;

        let mut index = self.repo.index()?;
        index.add_path(&relative)?;
        index.write()?;
        let tree = self.repo.find_tree(index.write_tree()?)?;

        let signature = Signature::now(&author.name, &author.email)?;
        let parent = match self.repo.head() {
            Ok(head) => Some(head.peel_to_commit()?),
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => None,
            Err(e) => return Err(e.into()),
        };
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();

        let oid = self
            .repo
            .commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)?;
        let commit = self.repo.find_commit(oid)?;
        Ok(commit_info(&commit))
    }

    fn relative_path(&self, path: &Path) -> Result<PathBuf, GitError> {
        if path.is_relative() {
            return Ok(path.to_path_buf());
        }

        let workdir = self.workdir()?;
        // Compare canonical forms so symlinked temp dirs still match.
        let canonical_workdir = workdir.canonicalize().unwrap_or_else(|_| workdir.to_path_buf());
        let canonical_path = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

        canonical_path
            .strip_prefix(&canonical_workdir)
            .map(Path::to_path_buf)
            .map_err(|_| GitError::OutsideWorkdir {
                path: path.to_path_buf(),
            })
    }

    /// Push local `branch` to the branch of the same name on `remote`.
    pub fn push(&self, remote: &str, branch: &str, token: Option<&str>) -> Result<(), GitError> {
        let mut remote_handle = self
            .repo
            .find_remote(remote)
            .map_err(|e| GitError::from_git2(e, remote))?;

        let refspec = format!("refs/heads/{0}:refs/heads/{0}", branch);
        let mut rejection: Option<(String, String)> = None;

        {
            let mut cbs = callbacks(token);
            cbs.push_update_reference(|refname, status| {
                if let Some(message) = status {
                    rejection = Some((refname.to_string(), message.to_string()));
                }
                Ok(())
            });

            let mut options = PushOptions::new();
            options.remote_callbacks(cbs);

            remote_handle
                .push(&[refspec.as_str()], Some(&mut options))
                .map_err(|e| GitError::from_git2(e, &format!("push {}/{}", remote, branch)))?;
        }

        match rejection {
            Some((refname, message)) => Err(GitError::PushRejected { refname, message }),
            None => Ok(()),
        }
    }
}

fn commit_info(commit: &git2::Commit<'_>) -> CommitInfo {
    let author = commit.author();
    CommitInfo {
        oid: commit.id().to_string(),
        summary: commit.summary().unwrap_or_default().to_string(),
        author_name: author.name().unwrap_or_default().to_string(),
        author_email: author.email().unwrap_or_default().to_string(),
    }
}

/// Remote callbacks offering the token once as HTTPS credentials.
fn callbacks(token: Option<&str>) -> RemoteCallbacks<'_> {
    let mut cbs = RemoteCallbacks::new();
    if let Some(token) = token {
        let mut offered = false;
        cbs.credentials(move |_url, _username, _allowed| {
            if offered {
                return Err(git2::Error::from_str("credentials rejected by remote"));
            }
            offered = true;
            Cred::userpass_plaintext("x-access-token", token)
        });
    }
    cbs
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::{Repository, RepositoryInitOptions};
    use tempfile::TempDir;

    /// A working repository with one commit on `main`, pushed to a local
    /// bare `origin`.
    struct TestRepo {
        work: TempDir,
        remote: TempDir,
    }

    impl TestRepo {
        fn new() -> Self {
            let remote = TempDir::new().unwrap();
            let mut bare_opts = RepositoryInitOptions::new();
            bare_opts.bare(true).initial_head("main");
            Repository::init_opts(remote.path(), &bare_opts).unwrap();

            let work = TempDir::new().unwrap();
            let mut opts = RepositoryInitOptions::new();
            opts.initial_head("main");
            let repo = Repository::init_opts(work.path(), &opts).unwrap();
            repo.remote("origin", remote.path().to_str().unwrap())
                .unwrap();

            let fixture = Self { work, remote };
            std::fs::write(fixture.work.path().join("README.md"), "# Test\n").unwrap();
            fixture
                .git()
                .commit_file(Path::new("README.md"), "Initial commit", &author())
                .unwrap();
            fixture.git().push("origin", "main", None).unwrap();
            fixture
        }

        fn git(&self) -> Git {
            Git::open(self.work.path()).unwrap()
        }

        fn remote_repo(&self) -> Repository {
            Repository::open_bare(self.remote.path()).unwrap()
        }
    }

    fn author() -> CommitAuthor {
        CommitAuthor::new("Test Bot", "bot@example.com")
    }

    mod git_error {
        use super::*;

        #[test]
        fn display() {
            let err = GitError::PushRejected {
                refname: "refs/heads/main".into(),
                message: "non-fast-forward".into(),
            };
            assert_eq!(
                err.to_string(),
                "push of refs/heads/main rejected: non-fast-forward"
            );
        }
    }

    #[test]
    fn author_display() {
        assert_eq!(author().to_string(), "Test Bot <bot@example.com>");
    }

    #[test]
    fn open_non_repo_fails() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(Git::open(dir.path()), Err(GitError::NotARepo { .. })));
    }

    #[test]
    fn open_from_subdirectory() {
        let repo = TestRepo::new();
        let sub = repo.work.path().join("docs");
        std::fs::create_dir(&sub).unwrap();
        assert!(Git::open(&sub).is_ok());
    }

    #[test]
    fn current_branch_is_main() {
        let repo = TestRepo::new();
        assert_eq!(repo.git().current_branch().unwrap().as_deref(), Some("main"));
    }

    #[test]
    fn commit_file_uses_author() {
        let repo = TestRepo::new();
        let git = repo.git();
        std::fs::write(repo.work.path().join("CHANGELOG.md"), "# Version: 1.0.0\n").unwrap();

        let info = git
            .commit_file(
                &repo.work.path().join("CHANGELOG.md"),
                "[Changelog CI] Add Changelog for Version 1.0.0",
                &author(),
            )
            .unwrap();

        assert_eq!(info.summary, "[Changelog CI] Add Changelog for Version 1.0.0");
        assert_eq!(info.author_name, "Test Bot");
        assert_eq!(info.author_email, "bot@example.com");
        assert_eq!(git.head_commit().unwrap(), info);
    }

    #[test]
    fn commit_outside_workdir_rejected() {
        let repo = TestRepo::new();
        let other = TempDir::new().unwrap();
        let outside = other.path().join("x.md");
        std::fs::write(&outside, "x").unwrap();

        let err = repo.git().commit_file(&outside, "m", &author()).unwrap_err();
        assert!(matches!(err, GitError::OutsideWorkdir { .. }));
    }

    #[test]
    fn create_branch_commit_and_push() {
        let repo = TestRepo::new();
        let git = repo.git();

        git.create_branch("changelog-ci-1.0.0-1", "main").unwrap();
        assert_eq!(
            git.current_branch().unwrap().as_deref(),
            Some("changelog-ci-1.0.0-1")
        );

        std::fs::write(repo.work.path().join("CHANGELOG.md"), "new\n").unwrap();
        let info = git
            .commit_file(Path::new("CHANGELOG.md"), "Add changelog", &author())
            .unwrap();
        git.push("origin", "changelog-ci-1.0.0-1", None).unwrap();

        let remote = repo.remote_repo();
        let pushed = remote
            .find_reference("refs/heads/changelog-ci-1.0.0-1")
            .unwrap()
            .target()
            .unwrap();
        assert_eq!(pushed.to_string(), info.oid);
    }

    #[test]
    fn create_branch_from_unknown_start_fails() {
        let repo = TestRepo::new();
        let err = repo.git().create_branch("x", "does-not-exist").unwrap_err();
        assert!(matches!(err, GitError::RefNotFound { .. }));
    }

    #[test]
    fn fetch_and_checkout_remote_only_branch() {
        let repo = TestRepo::new();

        // A second clone pushes a branch the first has never seen.
        let other_dir = TempDir::new().unwrap();
        let other = Repository::clone(repo.remote.path().to_str().unwrap(), other_dir.path())
            .unwrap();
        drop(other);
        let other_git = Git::open(other_dir.path()).unwrap();
        other_git.create_branch("release-1.0.0", "main").unwrap();
        std::fs::write(other_dir.path().join("notes.txt"), "n\n").unwrap();
        other_git
            .commit_file(Path::new("notes.txt"), "Add notes", &author())
            .unwrap();
        other_git.push("origin", "release-1.0.0", None).unwrap();

        let git = repo.git();
        git.fetch_branch("origin", "release-1.0.0", None).unwrap();
        git.checkout_branch("release-1.0.0").unwrap();

        assert_eq!(git.current_branch().unwrap().as_deref(), Some("release-1.0.0"));
        assert_eq!(git.head_commit().unwrap().summary, "Add notes");
        assert!(repo.work.path().join("notes.txt").exists());
    }

    #[test]
    fn checkout_missing_branch_fails() {
        let repo = TestRepo::new();
        assert!(repo.git().checkout_branch("nope").is_err());
    }
}
