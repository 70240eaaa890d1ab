//! engine
//!
//! Orchestrates one changelog run: Resolve -> Fetch -> Render -> Publish.
//!
//! # Architecture
//!
//! 1. **Resolve**: check the publishing configuration and work out the
//!    release version from the triggering event
//! 2. **Fetch**: collect the changes made since the latest release
//! 3. **Render**: group and render them, once per format needed
//! 4. **Publish**: deliver the changelog on every enabled channel
//!
//! # Outcomes
//!
//! A run ends in one of three successful [`Outcome`]s or a fatal
//! [`BuildError`]. "No changes" and "not a release" are clean no-ops;
//! forge failures degrade to "no changes"; configuration contradictions
//! are fatal.
//!
//! # Example
//!
//! ```ignore
//! use changelog_ci::engine::{self, Context, Outcome};
//!
//! match engine::run(&ctx, &config, &env, &forge, Some(&git)).await? {
//!     Outcome::Published { changelog, report } => println!("{}", changelog),
//!     Outcome::NoChanges => {}
//!     Outcome::Skipped { reason } => eprintln!("{}", reason),
//! }
//! ```

pub mod builder;
pub mod publish;
pub mod source;

pub use builder::{BuildState, ChangelogBuilder};
pub use publish::{prepend_to_file, Channel, ChannelFailure, PublishReport, Publisher};

use std::path::PathBuf;

use thiserror::Error;

use crate::core::config::Config;
use crate::core::event::{ActionEnvironment, EventError, EventKind};
use crate::core::version::{self, VersionError};
use crate::forge::Forge;
use crate::git::Git;
use crate::ui::output::{self, Verbosity};

/// Execution context for commands.
///
/// Contains global settings derived from CLI flags.
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// Working directory override.
    pub cwd: Option<PathBuf>,
    /// Debug logging enabled.
    pub debug: bool,
    /// Quiet mode (minimal output).
    pub quiet: bool,
}

impl Context {
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.debug)
    }

    /// The directory the run operates in.
    pub fn working_dir(&self) -> std::io::Result<PathBuf> {
        match &self.cwd {
            Some(dir) => Ok(dir.clone()),
            None => std::env::current_dir(),
        }
    }
}

/// Fatal errors that stop a run before anything is published.
#[derive(Debug, Error)]
pub enum BuildError {
    /// Neither publishing channel is enabled.
    #[error("`commit_changelog` or `comment_changelog` must be set to `true`, otherwise the changelog has nowhere to go")]
    NothingToPublish,

    /// The action environment is incomplete or unsupported.
    #[error(transparent)]
    Event(#[from] EventError),

    /// The release version could not be resolved.
    #[error(transparent)]
    Version(#[from] VersionError),

    /// A builder operation was called out of order.
    #[error("cannot {operation} a changelog build that is {state}")]
    InvalidState {
        operation: &'static str,
        state: BuildState,
    },
}

/// How a successful run ended.
#[derive(Debug)]
pub enum Outcome {
    /// The changelog was rendered and handed to the publishing channels.
    Published {
        /// Rendering in the changelog file's format
        changelog: String,
        report: PublishReport,
    },
    /// Nothing changed since the latest release.
    NoChanges,
    /// The run does not concern a release.
    Skipped { reason: String },
}

/// Check that at least one publishing channel is enabled.
pub fn check_publishing(config: &Config) -> Result<(), BuildError> {
    if config.commit_changelog || config.comment_changelog {
        Ok(())
    } else {
        Err(BuildError::NothingToPublish)
    }
}

/// Resolve the release version for the triggering event.
pub fn resolve_version(config: &Config, env: &ActionEnvironment) -> Result<String, VersionError> {
    let explicit = config.release_version.as_deref();
    match env.event {
        EventKind::PullRequest => version::from_pull_request_title(
            env.pull_request_title().unwrap_or_default(),
            &config.pull_request_title_regex,
            &config.version_regex,
            explicit,
        ),
        EventKind::WorkflowDispatch => version::from_input(explicit),
    }
}

/// Run the full changelog pipeline for one release.
pub async fn run(
    ctx: &Context,
    config: &Config,
    env: &ActionEnvironment,
    forge: &dyn Forge,
    git: Option<&Git>,
) -> Result<Outcome, BuildError> {
    let verbosity = ctx.verbosity();
    check_publishing(config)?;

    let version = match resolve_version(config, env) {
        Ok(version) => version,
        Err(e) if e.is_skip() => {
            output::error_annotation(&e);
            return Ok(Outcome::Skipped {
                reason: e.to_string(),
            });
        }
        Err(e) => return Err(e.into()),
    };
    output::print(format!("Generating changelog for version {}", version), verbosity);

    let mut builder = ChangelogBuilder::new(config, version);
    if builder.fetch(forge, &env.repository, verbosity).await? == BuildState::Aborted {
        return Ok(Outcome::NoChanges);
    }

    let changelog = builder.render(config.file_type())?.to_string();
    output::debug(format!("Rendered changelog:\n{}", changelog), verbosity);

    let publisher = Publisher {
        config,
        env,
        forge,
        git,
        verbosity,
    };
    let report = publisher.publish(&mut builder).await?;

    if let Err(e) = output::set_output("changelog", &changelog, verbosity) {
        output::warning(format!("Could not set the `changelog` output: {}", e), verbosity);
    }

    Ok(Outcome::Published { changelog, report })
}
