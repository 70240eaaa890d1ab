//! cli::commands::preview
//!
//! Print the changelog since the latest release without publishing it.

use std::process::ExitCode;

use anyhow::{anyhow, Context as _, Result};

use crate::cli::args::InputArgs;
use crate::core::types::FileType;
use crate::core::version;
use crate::engine::{BuildState, ChangelogBuilder, Context};
use crate::forge::github::GitHubForge;
use crate::ui::output;

/// Preview the changelog for `repository`.
pub fn preview(
    ctx: &Context,
    inputs: &InputArgs,
    repository: &str,
    format: Option<FileType>,
) -> Result<ExitCode> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(preview_async(ctx, inputs, repository, format))
}

async fn preview_async(
    ctx: &Context,
    inputs: &InputArgs,
    repository: &str,
    format: Option<FileType>,
) -> Result<ExitCode> {
    let verbosity = ctx.verbosity();
    let cwd = ctx
        .working_dir()
        .context("failed to determine the working directory")?;

    let config = super::load_config(inputs, &cwd, verbosity);
    let version = version::from_input(config.release_version.as_deref())?;

    let forge = GitHubForge::from_repository(
        repository,
        config.github_token.clone(),
        config.api_base.as_str(),
    )
    .ok_or_else(|| anyhow!("invalid repository '{}', expected 'owner/repo'", repository))?;

    let mut builder = ChangelogBuilder::new(&config, version);
    if builder.fetch(&forge, repository, verbosity).await? == BuildState::Aborted {
        output::print("No changes found since the latest release", verbosity);
        return Ok(ExitCode::SUCCESS);
    }

    let file_type = format.unwrap_or_else(|| config.file_type());
    // The changelog itself is the output, even in quiet mode.
    print!("{}", builder.render(file_type)?);
    Ok(ExitCode::SUCCESS)
}
