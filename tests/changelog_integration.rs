//! End-to-end runs of the changelog pipeline against a mock forge and real
//! git repositories.
//!
//! Each test works in a temporary repository whose `origin` is a local bare
//! repository, so pushes can be inspected without any network access.

use std::path::Path;

use git2::{Repository, RepositoryInitOptions};
use serde_json::json;
use tempfile::TempDir;

use changelog_ci::core::config::Config;
use changelog_ci::core::event::{ActionEnvironment, EventKind};
use changelog_ci::core::grouping::GroupRule;
use changelog_ci::core::types::ChangeRecord;
use changelog_ci::engine::{self, Channel, Context, Outcome};
use changelog_ci::forge::mock::{FailOn, MockForge};
use changelog_ci::forge::ForgeError;
use changelog_ci::git::{CommitAuthor, Git};

struct Fixture {
    work: TempDir,
    remote: TempDir,
}

impl Fixture {
    /// `main` with one commit, pushed, plus a pushed `release-1.2.0` branch.
    fn new() -> Self {
        let remote = TempDir::new().unwrap();
        let mut bare_opts = RepositoryInitOptions::new();
        bare_opts.bare(true).initial_head("main");
        Repository::init_opts(remote.path(), &bare_opts).unwrap();

        let work = TempDir::new().unwrap();
        let mut opts = RepositoryInitOptions::new();
        opts.initial_head("main");
        let repo = Repository::init_opts(work.path(), &opts).unwrap();
        repo.remote("origin", remote.path().to_str().unwrap()).unwrap();

        let fixture = Self { work, remote };
        let git = fixture.git();
        std::fs::write(fixture.work.path().join("CHANGELOG.md"), "# Version: 1.1.0\n\n* old\n").unwrap();
        git.commit_file(
            Path::new("CHANGELOG.md"),
            "Initial commit",
            &CommitAuthor::new("Dev", "dev@example.com"),
        )
        .unwrap();
        git.push("origin", "main", None).unwrap();
        git.create_branch("release-1.2.0", "main").unwrap();
        git.push("origin", "release-1.2.0", None).unwrap();
        git.checkout_branch("main").unwrap();
        fixture
    }

    fn git(&self) -> Git {
        Git::open(self.work.path()).unwrap()
    }

    /// Message and file contents of the tip of `branch` on the remote.
    fn remote_file(&self, branch: &str, file: &str) -> (String, String) {
        let repo = Repository::open_bare(self.remote.path()).unwrap();
        let commit = repo
            .find_reference(&format!("refs/heads/{}", branch))
            .unwrap()
            .peel_to_commit()
            .unwrap();
        let entry = commit.tree().unwrap().get_path(Path::new(file)).unwrap();
        let blob = repo.find_blob(entry.id()).unwrap();
        (
            commit.message().unwrap().to_string(),
            String::from_utf8(blob.content().to_vec()).unwrap(),
        )
    }

    fn remote_branches(&self) -> Vec<String> {
        let repo = Repository::open_bare(self.remote.path()).unwrap();
        let branches = repo.branches(Some(git2::BranchType::Local)).unwrap();
        branches
            .map(|b| b.unwrap().0.name().unwrap().unwrap().to_string())
            .collect()
    }
}

fn pull_request_env(payload: serde_json::Value) -> ActionEnvironment {
    ActionEnvironment {
        repository: "o/r".to_string(),
        event: EventKind::PullRequest,
        head_branch: Some("release-1.2.0".to_string()),
        base_branch: "main".to_string(),
        payload,
        warnings: Vec::new(),
    }
}

fn dispatch_env() -> ActionEnvironment {
    ActionEnvironment {
        repository: "o/r".to_string(),
        event: EventKind::WorkflowDispatch,
        head_branch: None,
        base_branch: "main".to_string(),
        payload: serde_json::Value::Null,
        warnings: Vec::new(),
    }
}

fn quiet() -> Context {
    Context {
        quiet: true,
        ..Context::default()
    }
}

fn changes() -> Vec<ChangeRecord> {
    vec![
        ChangeRecord::pull_request(3, "Fix X", "u3", ["bug"]),
        ChangeRecord::pull_request(5, "Add Y", "u5", Vec::<String>::new()),
    ]
}

#[tokio::test]
async fn pull_request_event_commits_to_head_branch() {
    let fixture = Fixture::new();
    let git = fixture.git();
    let mut config = Config::default();
    config.grouping.rules = vec![GroupRule::new("Fixes", ["bug"])];
    let env = pull_request_env(json!({ "number": 7, "pull_request": { "title": "Release v1.2.0" } }));
    let forge = MockForge::new().with_pull_requests(changes());

    let outcome = engine::run(&quiet(), &config, &env, &forge, Some(&git))
        .await
        .unwrap();

    let Outcome::Published { changelog, report } = outcome else {
        panic!("expected a published changelog");
    };
    assert!(report.is_clean(), "{:?}", report.failures);
    assert_eq!(report.branch.as_deref(), Some("release-1.2.0"));

    let (message, contents) = fixture.remote_file("release-1.2.0", "CHANGELOG.md");
    assert_eq!(message, "[Changelog CI] Add Changelog for Version v1.2.0");
    assert_eq!(contents, format!("{}\n\n# Version: 1.1.0\n\n* old\n", changelog));
    assert!(changelog.starts_with("# Version: v1.2.0\n\n\n#### Fixes\n\n* [#3](u3): Fix X\n"));

    // Nothing else was touched.
    let (main_message, _) = fixture.remote_file("main", "CHANGELOG.md");
    assert_eq!(main_message, "Initial commit");
    assert!(forge.created_prs().is_empty());
}

#[tokio::test]
async fn dispatch_opens_pull_request_from_new_branch() {
    let fixture = Fixture::new();
    let git = fixture.git();
    let config = Config {
        release_version: Some("1.2.0".to_string()),
        changelog_filename: "CHANGELOG.rst".to_string(),
        github_token: None,
        ..Config::default()
    };
    let forge = MockForge::new().with_pull_requests(changes());

    let outcome = engine::run(&quiet(), &config, &dispatch_env(), &forge, Some(&git))
        .await
        .unwrap();

    let Outcome::Published { changelog, report } = outcome else {
        panic!("expected a published changelog");
    };
    assert!(report.is_clean(), "{:?}", report.failures);
    assert!(changelog.starts_with("Version: 1.2.0\n==============\n\n"));

    let branch = report.branch.clone().unwrap();
    assert!(branch.starts_with("changelog-ci-1.2.0-"));
    assert!(fixture.remote_branches().contains(&branch));

    let (_, contents) = fixture.remote_file(&branch, "CHANGELOG.rst");
    assert_eq!(contents, changelog);

    let prs = forge.created_prs();
    assert_eq!(prs.len(), 1);
    assert_eq!(prs[0].head, branch);
    assert_eq!(prs[0].base, "main");
    assert_eq!(prs[0].title, "[Changelog CI] Add Changelog for Version 1.2.0");
    assert_eq!(
        prs[0].body,
        "# Version: 1.2.0\n\n* [#3](u3): Fix X\n* [#5](u5): Add Y\n"
    );
    assert_eq!(report.pull_request_url.as_deref(), Some("https://github.com/mock/repo/pull/1"));
}

#[tokio::test]
async fn failed_pull_request_keeps_pushed_commit() {
    let fixture = Fixture::new();
    let git = fixture.git();
    let config = Config {
        release_version: Some("1.2.0".to_string()),
        ..Config::default()
    };
    let forge = MockForge::new()
        .with_pull_requests(changes())
        .fail_on(FailOn::CreatePr(ForgeError::AuthRequired));

    let outcome = engine::run(&quiet(), &config, &dispatch_env(), &forge, Some(&git))
        .await
        .unwrap();

    let Outcome::Published { report, .. } = outcome else {
        panic!("expected a published changelog");
    };
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].channel, Channel::PullRequest);
    assert!(report.commit.is_some());
    assert!(fixture
        .remote_branches()
        .iter()
        .any(|b| b.starts_with("changelog-ci-1.2.0-")));
}

#[tokio::test]
async fn commit_failure_does_not_stop_comment() {
    let config = Config {
        comment_changelog: true,
        github_token: Some("t".to_string()),
        ..Config::default()
    };
    let env = pull_request_env(json!({ "number": 7, "pull_request": { "title": "Release 1.2.0" } }));
    let forge = MockForge::new().with_pull_requests(changes());

    // No repository: the commit channel fails, the comment still goes out.
    let outcome = engine::run(&quiet(), &config, &env, &forge, None).await.unwrap();

    let Outcome::Published { report, .. } = outcome else {
        panic!("expected a published changelog");
    };
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].channel, Channel::Commit);
    assert_eq!(forge.comments().len(), 1);
    assert!(report.comment_url.is_some());
}

#[test]
fn no_changes_leaves_repository_untouched() {
    let fixture = Fixture::new();
    let git = fixture.git();
    let config = Config::default();
    let env = pull_request_env(json!({ "number": 7, "pull_request": { "title": "Release 1.2.0" } }));
    let forge = MockForge::new();

    let outcome = tokio_test::block_on(engine::run(&quiet(), &config, &env, &forge, Some(&git))).unwrap();

    assert!(matches!(outcome, Outcome::NoChanges));
    assert!(forge.operations().iter().all(|op| !op.is_write()));
    let (message, _) = fixture.remote_file("release-1.2.0", "CHANGELOG.md");
    assert_eq!(message, "Initial commit");
}
