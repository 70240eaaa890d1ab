//! Changelog CI - grouped changelogs for releases, generated in CI
//!
//! Changelog CI collects the pull requests (or commits) merged since the
//! latest release, groups them by label into titled sections, renders the
//! result as Markdown or reStructuredText, and publishes it by committing
//! the changelog file, opening a pull request and/or commenting on one.
//!
//! # Architecture
//!
//! The codebase follows a strict layered architecture:
//!
//! - [`cli`] - Command-line interface layer (parses args, delegates to engine)
//! - [`engine`] - Orchestrates Fetch → Render → Publish for one release
//! - [`core`] - Domain types, grouping, rendering, configuration
//! - [`git`] - Single interface for all Git operations
//! - [`forge`] - Abstraction for the remote forge (GitHub)
//! - [`ui`] - Output and CI workflow annotations
//!
//! # Correctness Invariants
//!
//! 1. Every change record lands in at most one section of a changelog
//! 2. Rendering is a pure function of its inputs
//! 3. Forge failures degrade to "no data", never to a crash
//! 4. Publishing channels fail independently of each other

pub mod cli;
pub mod core;
pub mod engine;
pub mod forge;
pub mod git;
pub mod ui;
