//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Loads configuration and reports its warnings
//! 2. Calls the engine to do the work
//! 3. Formats output and picks the exit status
//!
//! # Async Commands
//!
//! `run` and `preview` talk to the forge over the network. Their handlers
//! build a tokio runtime and block on the async implementation.

mod completion;
mod preview;
mod run;

pub use completion::completion;
pub use preview::preview;
pub use run::run;

use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;

use crate::cli::args::{Command, InputArgs};
use crate::core::config::{Config, ConfigLoadResult, Severity};
use crate::engine::Context;
use crate::ui::output::{self, Verbosity};

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<ExitCode> {
    match command {
        Command::Run { inputs } => run::run(ctx, &inputs),
        Command::Preview {
            inputs,
            repository,
            format,
        } => preview::preview(ctx, &inputs, &repository, format.map(Into::into)),
        Command::Completion { shell } => {
            completion::completion(shell)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Load configuration, resolving a relative config file against `cwd`,
/// and surface every warning.
fn load_config(inputs: &InputArgs, cwd: &Path, verbosity: Verbosity) -> Config {
    let mut config_inputs = inputs.to_config_inputs();
    if let Some(file) = config_inputs.config_file.as_mut() {
        if file.is_relative() && !file.as_os_str().is_empty() {
            *file = cwd.join(&*file);
        }
    }

    let ConfigLoadResult { config, warnings } = Config::load(&config_inputs);
    for warning in &warnings {
        match warning.severity {
            Severity::Error => output::error_annotation(&warning.message),
            Severity::Warning => output::warning(&warning.message, verbosity),
        }
    }
    output::debug(format!("{:?}", config), verbosity);
    config
}
