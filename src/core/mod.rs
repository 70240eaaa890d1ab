//! core
//!
//! Core domain types, configuration, and pure operations for Changelog CI.
//!
//! # Modules
//!
//! - [`types`] - Strong types: ChangeRecord, ChangeId, ChangelogType, FileType
//! - [`grouping`] - Partition records into labelled sections
//! - [`render`] - Markdown and reStructuredText rendering
//! - [`version`] - Release version resolution
//! - [`config`] - Configuration schema, loading and cleaning
//! - [`event`] - The CI action environment
//!
//! # Design Principles
//!
//! - Nothing in this layer performs network or git I/O
//! - Grouping and rendering are deterministic and never mutate their input

pub mod config;
pub mod event;
pub mod grouping;
pub mod render;
pub mod types;
pub mod version;
