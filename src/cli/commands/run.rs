//! cli::commands::run
//!
//! Generate and publish the changelog for the triggering CI event.
//!
//! # Exit status
//!
//! - `0`: published cleanly, nothing changed, or not a release
//! - `1`: a fatal configuration problem, or a publishing channel failed

use std::process::ExitCode;

use anyhow::{anyhow, Context as _, Result};

use crate::cli::args::InputArgs;
use crate::core::event::ActionEnvironment;
use crate::engine::{self, Context, Outcome};
use crate::forge::github::GitHubForge;
use crate::git::Git;
use crate::ui::output;

/// Run the changelog pipeline.
///
/// This is a synchronous wrapper that uses tokio to run the async implementation.
pub fn run(ctx: &Context, inputs: &InputArgs) -> Result<ExitCode> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run_async(ctx, inputs))
}

async fn run_async(ctx: &Context, inputs: &InputArgs) -> Result<ExitCode> {
    let verbosity = ctx.verbosity();
    let cwd = ctx
        .working_dir()
        .context("failed to determine the working directory")?;

    let config = super::load_config(inputs, &cwd, verbosity);
    // Contradictory publishing flags are fatal before anything else is read.
    engine::check_publishing(&config)?;

    let env = ActionEnvironment::from_env()?;
    for warning in &env.warnings {
        output::warning(warning, verbosity);
    }

    let forge = GitHubForge::from_repository(
        &env.repository,
        config.github_token.clone(),
        config.api_base.as_str(),
    )
    .ok_or_else(|| anyhow!("invalid repository '{}'", env.repository))?;

    let git = if config.commit_changelog {
        match Git::open(&cwd) {
            Ok(git) => Some(git),
            Err(e) => {
                output::warning(format!("Changelog cannot be committed: {}", e), verbosity);
                None
            }
        }
    } else {
        None
    };

    match engine::run(ctx, &config, &env, &forge, git.as_ref()).await? {
        Outcome::Published { report, .. } => {
            if report.is_clean() {
                output::success("Changelog published", verbosity);
                Ok(ExitCode::SUCCESS)
            } else {
                output::error(format!(
                    "{} publishing channel(s) failed",
                    report.failures.len()
                ));
                Ok(ExitCode::FAILURE)
            }
        }
        Outcome::NoChanges => {
            output::print("No changes found since the latest release", verbosity);
            Ok(ExitCode::SUCCESS)
        }
        Outcome::Skipped { reason } => {
            output::debug(format!("Skipped: {}", reason), verbosity);
            Ok(ExitCode::SUCCESS)
        }
    }
}
