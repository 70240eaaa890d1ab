//! ui::output
//!
//! Output formatting and display.
//!
//! # Design
//!
//! Output is formatted consistently and respects the quiet flag. On top of
//! plain messages, this module speaks the CI runner's workflow command
//! protocol: `::notice::`, `::warning::` and `::error::` annotations,
//! collapsible `::group::` sections, and step outputs written to the file
//! named by `$GITHUB_OUTPUT`.
//!
//! Error annotations are always shown; everything else is suppressed in
//! quiet mode.

use std::fmt::Display;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    /// Quiet mode - minimal output
    Quiet,
    /// Normal mode - standard output
    Normal,
    /// Debug mode - verbose output
    Debug,
}

impl Verbosity {
    /// Create verbosity from flags.
    pub fn from_flags(quiet: bool, debug: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if debug {
            Verbosity::Debug
        } else {
            Verbosity::Normal
        }
    }
}

/// Severity of a workflow annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Annotation {
    Notice,
    Warning,
    Error,
}

impl Annotation {
    fn command(&self) -> &'static str {
        match self {
            Annotation::Notice => "notice",
            Annotation::Warning => "warning",
            Annotation::Error => "error",
        }
    }

    /// The workflow command line for `message`.
    pub fn format(&self, message: impl Display) -> String {
        format!("::{}::{}", self.command(), escape_data(&message.to_string()))
    }
}

/// Escape a workflow command payload.
pub fn escape_data(data: &str) -> String {
    data.replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Print a message (respects quiet mode).
pub fn print(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// Print a debug message (only in debug mode).
pub fn debug(message: impl Display, verbosity: Verbosity) {
    if verbosity == Verbosity::Debug {
        eprintln!("[debug] {}", message);
    }
}

/// Print an error message (always shown).
pub fn error(message: impl Display) {
    eprintln!("error: {}", message);
}

/// Print a success message (respects quiet mode).
pub fn success(message: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("{}", message);
    }
}

/// Emit a workflow annotation.
pub fn annotate(level: Annotation, message: impl Display, verbosity: Verbosity) {
    if level == Annotation::Error || verbosity != Verbosity::Quiet {
        println!("{}", level.format(message));
    }
}

/// `::notice::` annotation.
pub fn notice(message: impl Display, verbosity: Verbosity) {
    annotate(Annotation::Notice, message, verbosity);
}

/// `::warning::` annotation.
pub fn warning(message: impl Display, verbosity: Verbosity) {
    annotate(Annotation::Warning, message, verbosity);
}

/// `::error::` annotation (always shown).
pub fn error_annotation(message: impl Display) {
    annotate(Annotation::Error, message, Verbosity::Normal);
}

/// Open a collapsible log group.
pub fn group(title: impl Display, verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("::group::{}", title);
    }
}

/// Close the current log group.
pub fn end_group(verbosity: Verbosity) {
    if verbosity != Verbosity::Quiet {
        println!("::endgroup::");
    }
}

/// Set step output `name` to `value`.
///
/// Appends to the file named by `$GITHUB_OUTPUT`. Outside a workflow run
/// the variable is unset and nothing is written.
pub fn set_output(name: &str, value: &str, verbosity: Verbosity) -> io::Result<()> {
    match std::env::var_os("GITHUB_OUTPUT") {
        Some(path) if !path.is_empty() => append_output(Path::new(&path), name, value),
        _ => {
            debug(
                format!("GITHUB_OUTPUT is not set, skipping output '{}'", name),
                verbosity,
            );
            Ok(())
        }
    }
}

/// Append a heredoc-delimited output entry to `path`.
pub fn append_output(path: &Path, name: &str, value: &str) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(output_entry(name, value).as_bytes())
}

fn output_entry(name: &str, value: &str) -> String {
    let mut delimiter = format!("ghadelimiter_{}", name);
    while value.contains(&delimiter) {
        delimiter.push('_');
    }
    format!("{}<<{}\n{}\n{}\n", name, delimiter, value, delimiter)
}
