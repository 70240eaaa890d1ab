//! ui
//!
//! User-facing output.
//!
//! # Modules
//!
//! - [`output`] - Messages, workflow annotations and step outputs
//!
//! # Design
//!
//! All output goes through this module so that quiet mode and the CI
//! runner's workflow command syntax are handled in one place.

pub mod output;
