//! engine::source
//!
//! Change sources: what happened since the latest release.
//!
//! Failures here never abort a run. They are reported as workflow
//! annotations and the affected call counts as "no data". When a listing
//! fails part way through, the pages read before the failure are kept.

use chrono::{DateTime, Utc};

use crate::core::types::{ChangeRecord, ChangelogType};
use crate::forge::{Forge, Listing};
use crate::ui::output::{self, Verbosity};

/// Fetch every change made since the latest release on `repository`.
pub async fn fetch_changes(
    forge: &dyn Forge,
    repository: &str,
    changelog_type: ChangelogType,
    verbosity: Verbosity,
) -> Vec<ChangeRecord> {
    output::group(
        format!("Fetching {} changes since the latest release", changelog_type),
        verbosity,
    );
    let since = latest_release(forge, repository, verbosity).await;
    let records = match changelog_type {
        ChangelogType::PullRequest => pull_requests(forge, repository, since).await,
        ChangelogType::CommitMessage => commits(forge, repository, since, verbosity).await,
    };
    output::print(format!("Found {} change(s)", records.len()), verbosity);
    output::end_group(verbosity);
    records
}

/// Publication time of the latest release, if it can be found.
pub async fn latest_release(
    forge: &dyn Forge,
    repository: &str,
    verbosity: Verbosity,
) -> Option<DateTime<Utc>> {
    match forge.latest_release_date().await {
        Ok(Some(date)) => {
            output::debug(format!("Latest release published at {}", date), verbosity);
            Some(date)
        }
        Ok(None) => {
            output::warning(
                format!(
                    "Could not find any release for {}, collecting all changes",
                    repository
                ),
                verbosity,
            );
            None
        }
        Err(e) => {
            output::warning(
                format!("Could not find any release for {}: {}", repository, e),
                verbosity,
            );
            None
        }
    }
}

async fn pull_requests(
    forge: &dyn Forge,
    repository: &str,
    since: Option<DateTime<Utc>>,
) -> Vec<ChangeRecord> {
    match forge.merged_pull_requests(since).await {
        Ok(listing) => {
            let records = complete_or_report(listing, "pull requests", repository, forge);
            if records.is_empty() {
                output::error_annotation(format!(
                    "There was no pull request made on {} after last release.",
                    repository
                ));
            }
            records
        }
        Err(e) => {
            output::error_annotation(format!(
                "Could not get pull requests for {} from {}: {}",
                repository,
                forge.name(),
                e
            ));
            Vec::new()
        }
    }
}

async fn commits(
    forge: &dyn Forge,
    repository: &str,
    since: Option<DateTime<Utc>>,
    verbosity: Verbosity,
) -> Vec<ChangeRecord> {
    let records = match forge.commits(since).await {
        Ok(listing) => complete_or_report(listing, "commits", repository, forge),
        Err(e) => {
            output::error_annotation(format!(
                "Could not get commits for {} from {}: {}",
                repository,
                forge.name(),
                e
            ));
            return Vec::new();
        }
    };

    let records = without_merge_commits(records, verbosity);
    if records.is_empty() {
        output::error_annotation(format!(
            "There was no commit made on {} after last release.",
            repository
        ));
    }
    records
}

/// Records of `listing`, reporting a listing cut short by a failed page.
fn complete_or_report(
    listing: Listing,
    what: &str,
    repository: &str,
    forge: &dyn Forge,
) -> Vec<ChangeRecord> {
    if let Some(e) = &listing.truncated {
        output::error_annotation(format!(
            "Could not get all {} for {} from {}, keeping the {} read before the failure: {}",
            what,
            repository,
            forge.name(),
            listing.records.len(),
            e
        ));
    }
    listing.records
}

/// Drop merge commits, announcing each one.
pub fn without_merge_commits(records: Vec<ChangeRecord>, verbosity: Verbosity) -> Vec<ChangeRecord> {
    records
        .into_iter()
        .filter(|record| {
            if record.is_merge_commit() {
                output::notice(format!("Skipping merge commit \"{}\"", record.text), verbosity);
                false
            } else {
                true
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forge::mock::{FailOn, MockForge, MockOperation};
    use crate::forge::ForgeError;
    use chrono::TimeZone;

    fn release_date() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn passes_release_date_as_since() {
        let forge = MockForge::new()
            .with_release(release_date())
            .with_pull_requests(vec![ChangeRecord::pull_request(1, "a", "u1", ["x"])]);

        let records = fetch_changes(&forge, "o/r", ChangelogType::PullRequest, Verbosity::Quiet).await;

        assert_eq!(records.len(), 1);
        assert_eq!(
            forge.operations(),
            vec![
                MockOperation::LatestReleaseDate,
                MockOperation::MergedPullRequests {
                    since: Some(release_date())
                },
            ]
        );
    }

    #[tokio::test]
    async fn release_failure_means_no_filter() {
        let forge = MockForge::new()
            .with_release(release_date())
            .fail_on(FailOn::LatestReleaseDate(ForgeError::NotFound("release".into())));

        fetch_changes(&forge, "o/r", ChangelogType::CommitMessage, Verbosity::Quiet).await;

        assert!(forge
            .operations()
            .contains(&MockOperation::Commits { since: None }));
    }

    #[tokio::test]
    async fn commit_failure_is_empty() {
        let forge = MockForge::new()
            .with_commits(vec![ChangeRecord::commit("abc", "x", "u")])
            .fail_on(FailOn::Commits(ForgeError::NetworkError("down".into())));

        let records = fetch_changes(&forge, "o/r", ChangelogType::CommitMessage, Verbosity::Quiet).await;

        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn truncated_listing_keeps_records() {
        let forge = MockForge::new()
            .with_pull_requests(vec![
                ChangeRecord::pull_request(1, "a", "u1", ["x"]),
                ChangeRecord::pull_request(2, "b", "u2", ["x"]),
            ])
            .with_truncated_listings(ForgeError::ApiError {
                status: 502,
                message: "bad gateway".into(),
            });

        let records = fetch_changes(&forge, "o/r", ChangelogType::PullRequest, Verbosity::Quiet).await;

        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn truncated_commits_still_drop_merges() {
        let forge = MockForge::new()
            .with_commits(vec![
                ChangeRecord::commit("a1", "Merge branch 'main'", "u1"),
                ChangeRecord::commit("b2", "Fix parser", "u2"),
            ])
            .with_truncated_listings(ForgeError::RateLimited);

        let records = fetch_changes(&forge, "o/r", ChangelogType::CommitMessage, Verbosity::Quiet).await;

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].text, "Fix parser");
    }

    #[tokio::test]
    async fn merge_commits_are_skipped() {
        let forge = MockForge::new().with_commits(vec![
            ChangeRecord::commit("a1", "Merge pull request #4 from o/feature", "u1"),
            ChangeRecord::commit("b2", "Fix parser", "u2"),
            ChangeRecord::commit("c3", "Merge branch 'main' into feature", "u3"),
        ]);

        let records = fetch_changes(&forge, "o/r", ChangelogType::CommitMessage, Verbosity::Quiet).await;

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].text, "Fix parser");
    }

    #[test]
    fn pull_requests_are_never_merge_commits() {
        let records = vec![ChangeRecord::pull_request(
            1,
            "Merge branch cleanup",
            "u",
            Vec::<String>::new(),
        )];
        assert_eq!(without_merge_commits(records, Verbosity::Quiet).len(), 1);
    }
}
