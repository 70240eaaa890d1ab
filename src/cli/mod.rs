//! cli
//!
//! Command-line interface layer for Changelog CI.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Delegate to command handlers
//! - Map run outcomes to the process exit status
//!
//! # Architecture
//!
//! The CLI layer is thin. It parses arguments via clap and dispatches to the
//! [`crate::engine`], which owns the changelog pipeline.

pub mod args;
pub mod commands;

pub use args::{Cli, Shell};

use std::process::ExitCode;

use crate::engine;
use anyhow::Result;

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<ExitCode> {
    let cli = Cli::parse_args();

    let ctx = engine::Context {
        cwd: cli.cwd.clone(),
        debug: cli.debug,
        quiet: cli.quiet,
    };

    commands::dispatch(cli.command, &ctx)
}
