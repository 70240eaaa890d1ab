//! cli::args
//!
//! Command-line argument definitions using clap derive.
//!
//! # Global Flags
//!
//! These flags are available on all commands:
//! - `--help` / `-h`: Show help
//! - `--version`: Show version
//! - `--cwd <path>`: Run as if in that directory
//! - `--debug`: Enable debug logging
//! - `--quiet` / `-q`: Minimal output
//!
//! # Action Inputs
//!
//! Every input flag falls back to the `INPUT_*` variable the CI runner sets
//! for the action input of the same name, so `changelog-ci run` needs no
//! flags inside a workflow.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::core::config::ConfigInputs;
use crate::core::types::FileType;

/// Changelog CI - grouped changelogs for releases, generated in CI
#[derive(Parser, Debug)]
#[command(name = "changelog-ci")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run as if changelog-ci was started in this directory
    #[arg(long, global = true)]
    pub cwd: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate and publish the changelog for the triggering event
    #[command(after_help = "\
EXAMPLES:
    # Inside a workflow, inputs come from INPUT_* variables
    changelog-ci run

    # Manual release with an explicit version
    changelog-ci run --release-version 1.4.0 --config-file changelog-ci-config.yaml")]
    Run {
        #[command(flatten)]
        inputs: InputArgs,
    },

    /// Print the changelog since the latest release without publishing it
    Preview {
        #[command(flatten)]
        inputs: InputArgs,

        /// Repository as owner/repo
        #[arg(long, env = "GITHUB_REPOSITORY")]
        repository: String,

        /// Output format (defaults to the changelog file's format)
        #[arg(long, value_enum)]
        format: Option<FormatArg>,
    },

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Action inputs.
#[derive(Args, Debug, Clone, Default)]
pub struct InputArgs {
    /// Configuration file (.json, .yaml, .yml or .toml)
    #[arg(long, env = "INPUT_CONFIG_FILE")]
    pub config_file: Option<PathBuf>,

    /// Changelog file to write (.md or .rst)
    #[arg(long, env = "INPUT_CHANGELOG_FILENAME")]
    pub changelog_filename: Option<String>,

    /// Name used for changelog commits
    #[arg(long, env = "INPUT_COMMITTER_USERNAME")]
    pub committer_username: Option<String>,

    /// Email used for changelog commits
    #[arg(long, env = "INPUT_COMMITTER_EMAIL")]
    pub committer_email: Option<String>,

    /// Release version, overriding the one found in the pull request title
    #[arg(long, env = "INPUT_RELEASE_VERSION")]
    pub release_version: Option<String>,

    /// Token for the GitHub API and for pushing
    #[arg(long, env = "INPUT_GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// GitHub REST API root
    #[arg(long, env = "GITHUB_API_URL")]
    pub api_url: Option<String>,
}

impl InputArgs {
    /// Raw configuration inputs, before cleaning.
    pub fn to_config_inputs(&self) -> ConfigInputs {
        ConfigInputs {
            changelog_filename: self.changelog_filename.clone(),
            committer_username: self.committer_username.clone(),
            committer_email: self.committer_email.clone(),
            release_version: self.release_version.clone(),
            github_token: self.github_token.clone(),
            config_file: self.config_file.clone(),
            api_base: self.api_url.clone(),
        }
    }
}

/// Changelog output format.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatArg {
    /// Markdown
    Md,
    /// reStructuredText
    Rst,
}

impl From<FormatArg> for FileType {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Md => FileType::Markdown,
            FormatArg::Rst => FileType::RestructuredText,
        }
    }
}

/// Supported shells for completion
#[derive(ValueEnum, Debug, Clone, Copy)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}
