//! engine::builder
//!
//! The per-release changelog build.
//!
//! # State machine
//!
//! ```text
//! NotStarted -> ChangesFetched -> Rendered -> Done
//!      \
//!       `-> Aborted (no changes)
//! ```
//!
//! A build owns its change records and renders them on demand. Each
//! format is rendered at most once per build; later requests for the same
//! format are served from the cache. Every render partitions the records
//! afresh, so the formats never share a working copy.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;

use crate::core::config::Config;
use crate::core::grouping::{partition, GroupingConfig};
use crate::core::render::render;
use crate::core::types::{ChangeRecord, ChangelogType, FileType};
use crate::forge::Forge;
use crate::ui::output::Verbosity;

use super::source;
use super::BuildError;

/// Lifecycle state of a [`ChangelogBuilder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    NotStarted,
    ChangesFetched,
    Rendered,
    Done,
    /// No changes were found; nothing will be rendered.
    Aborted,
}

impl fmt::Display for BuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BuildState::NotStarted => "not started",
            BuildState::ChangesFetched => "changes fetched",
            BuildState::Rendered => "rendered",
            BuildState::Done => "done",
            BuildState::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Builds the changelog for one release.
#[derive(Debug)]
pub struct ChangelogBuilder<'c> {
    config: &'c Config,
    version: String,
    grouping: GroupingConfig,
    records: Vec<ChangeRecord>,
    cache: HashMap<FileType, String>,
    state: BuildState,
}

impl<'c> ChangelogBuilder<'c> {
    /// Start a build for `version`.
    ///
    /// Commit messages carry no labels, so commit-sourced builds always
    /// render without sections.
    pub fn new(config: &'c Config, version: impl Into<String>) -> Self {
        let grouping = match config.changelog_type {
            ChangelogType::PullRequest => config.grouping.clone(),
            ChangelogType::CommitMessage => GroupingConfig::ungrouped(),
        };

        Self {
            config,
            version: version.into(),
            grouping,
            records: Vec::new(),
            cache: HashMap::new(),
            state: BuildState::NotStarted,
        }
    }

    pub fn state(&self) -> BuildState {
        self.state
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn records(&self) -> &[ChangeRecord] {
        &self.records
    }

    /// Document header, e.g. `Version: 1.2.0`.
    pub fn header(&self) -> String {
        format!("{} {}", self.config.header_prefix, self.version)
    }

    /// Fetch the changes made since the latest release.
    ///
    /// Forge failures are reported by the source and count as no changes.
    pub async fn fetch(
        &mut self,
        forge: &dyn Forge,
        repository: &str,
        verbosity: Verbosity,
    ) -> Result<BuildState, BuildError> {
        self.expect_state(BuildState::NotStarted, "fetch")?;
        let records =
            source::fetch_changes(forge, repository, self.config.changelog_type, verbosity).await;
        self.load(records)
    }

    /// Load already-fetched change records.
    ///
    /// An empty list aborts the build.
    pub fn load(&mut self, records: Vec<ChangeRecord>) -> Result<BuildState, BuildError> {
        self.expect_state(BuildState::NotStarted, "load")?;
        self.state = if records.is_empty() {
            BuildState::Aborted
        } else {
            BuildState::ChangesFetched
        };
        self.records = records;
        Ok(self.state)
    }

    /// Render the changelog in `file_type`, caching the result.
    pub fn render(&mut self, file_type: FileType) -> Result<&str, BuildError> {
        match self.state {
            BuildState::ChangesFetched | BuildState::Rendered => {}
            state => {
                return Err(BuildError::InvalidState {
                    operation: "render",
                    state,
                })
            }
        }
        self.state = BuildState::Rendered;

        let header = self.header();
        let text = match self.cache.entry(file_type) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let groups = partition(&self.records, &self.grouping);
                entry.insert(render(&header, &groups, file_type))
            }
        };
        Ok(text.as_str())
    }

    /// Whether `file_type` has been rendered already.
    pub fn is_cached(&self, file_type: FileType) -> bool {
        self.cache.contains_key(&file_type)
    }

    /// Mark the build as published.
    pub fn finish(&mut self) -> Result<(), BuildError> {
        self.expect_state(BuildState::Rendered, "finish")?;
        self.state = BuildState::Done;
        Ok(())
    }

    fn expect_state(&self, expected: BuildState, operation: &'static str) -> Result<(), BuildError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(BuildError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::grouping::GroupRule;
    use crate::forge::mock::{FailOn, MockForge, MockOperation};
    use crate::forge::ForgeError;

    fn grouped_config() -> Config {
        let mut config = Config::default();
        config.grouping.rules = vec![GroupRule::new("Fixes", ["bug"])];
        config
    }

    fn records() -> Vec<ChangeRecord> {
        vec![
            ChangeRecord::pull_request(3, "Fix X", "u3", ["bug"]),
            ChangeRecord::pull_request(5, "Add Y", "u5", Vec::<String>::new()),
        ]
    }

    mod state_machine {
        use super::*;

        #[test]
        fn starts_not_started() {
            let config = Config::default();
            let builder = ChangelogBuilder::new(&config, "1.0.0");
            assert_eq!(builder.state(), BuildState::NotStarted);
            assert_eq!(builder.header(), "Version: 1.0.0");
        }

        #[test]
        fn empty_load_aborts() {
            let config = Config::default();
            let mut builder = ChangelogBuilder::new(&config, "1.0.0");
            assert_eq!(builder.load(Vec::new()).unwrap(), BuildState::Aborted);
            assert!(matches!(
                builder.render(FileType::Markdown),
                Err(BuildError::InvalidState {
                    operation: "render",
                    state: BuildState::Aborted
                })
            ));
        }

        #[test]
        fn full_lifecycle() {
            let config = Config::default();
            let mut builder = ChangelogBuilder::new(&config, "1.0.0");
            assert_eq!(builder.load(records()).unwrap(), BuildState::ChangesFetched);
            builder.render(FileType::Markdown).unwrap();
            assert_eq!(builder.state(), BuildState::Rendered);
            builder.finish().unwrap();
            assert_eq!(builder.state(), BuildState::Done);
        }

        #[test]
        fn cannot_load_twice() {
            let config = Config::default();
            let mut builder = ChangelogBuilder::new(&config, "1.0.0");
            builder.load(records()).unwrap();
            assert!(builder.load(records()).is_err());
        }

        #[test]
        fn cannot_finish_before_render() {
            let config = Config::default();
            let mut builder = ChangelogBuilder::new(&config, "1.0.0");
            builder.load(records()).unwrap();
            assert!(builder.finish().is_err());
        }
    }

    mod rendering {
        use super::*;

        #[test]
        fn grouped_markdown() {
            let config = grouped_config();
            let mut builder = ChangelogBuilder::new(&config, "1.2.0");
            builder.load(records()).unwrap();

            assert_eq!(
                builder.render(FileType::Markdown).unwrap(),
                "# Version: 1.2.0\n\n\
                 \n#### Fixes\n\n* [#3](u3): Fix X\n\
                 \n#### Other Changes\n\n* [#5](u5): Add Y\n"
            );
        }

        #[test]
        fn formats_are_cached_independently() {
            let config = grouped_config();
            let mut builder = ChangelogBuilder::new(&config, "1.2.0");
            builder.load(records()).unwrap();

            let rst = builder.render(FileType::RestructuredText).unwrap().to_string();
            assert!(builder.is_cached(FileType::RestructuredText));
            assert!(!builder.is_cached(FileType::Markdown));

            let md = builder.render(FileType::Markdown).unwrap().to_string();
            assert_ne!(rst, md);
            assert_eq!(builder.render(FileType::RestructuredText).unwrap(), rst);
            assert_eq!(builder.render(FileType::Markdown).unwrap(), md);
        }

        #[test]
        fn commit_mode_ignores_groups() {
            let mut config = grouped_config();
            config.changelog_type = ChangelogType::CommitMessage;
            let mut builder = ChangelogBuilder::new(&config, "1.2.0");
            builder
                .load(vec![ChangeRecord::commit("abcdef1234567", "Fix X", "c1")])
                .unwrap();

            assert_eq!(
                builder.render(FileType::Markdown).unwrap(),
                "# Version: 1.2.0\n\n* [abcdef1](c1): Fix X\n"
            );
        }
    }

    mod fetching {
        use super::*;

        #[tokio::test]
        async fn fetches_pull_requests() {
            let config = Config::default();
            let forge = MockForge::new().with_pull_requests(records());
            let mut builder = ChangelogBuilder::new(&config, "1.0.0");

            let state = builder.fetch(&forge, "o/r", Verbosity::Quiet).await.unwrap();

            assert_eq!(state, BuildState::ChangesFetched);
            assert_eq!(builder.records().len(), 2);
            assert!(forge
                .operations()
                .iter()
                .any(|op| matches!(op, MockOperation::MergedPullRequests { .. })));
        }

        #[tokio::test]
        async fn forge_failure_aborts() {
            let config = Config::default();
            let forge = MockForge::new()
                .with_pull_requests(records())
                .fail_on(FailOn::MergedPullRequests(ForgeError::RateLimited));
            let mut builder = ChangelogBuilder::new(&config, "1.0.0");

            let state = builder.fetch(&forge, "o/r", Verbosity::Quiet).await.unwrap();

            assert_eq!(state, BuildState::Aborted);
        }
    }
}
