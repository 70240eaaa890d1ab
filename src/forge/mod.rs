//! forge
//!
//! Abstraction for the remote forge hosting the repository.
//!
//! # Architecture
//!
//! The `Forge` trait defines the interface for interacting with remote
//! hosting services. The engine only ever talks to `dyn Forge`, so tests
//! swap in [`mock::MockForge`].
//!
//! - Forge reads (releases, pull requests, commits) feed the changelog
//! - Forge writes (pull requests, comments) are publish channels
//! - Forge failures never abort a run on their own
//!
//! # Modules
//!
//! - `traits`: Core `Forge` trait and request/response types
//! - [`github`]: GitHub implementation using the REST API
//! - [`mock`]: Mock implementation for deterministic testing

pub mod github;
pub mod mock;
mod traits;

pub use traits::*;
