//! packwright - resolve parameterized deployment packs.
//!
//! A pack is a directory with `metadata.yaml`, an optional `variables.yaml`
//! and `templates/`. Packs depend on other packs, vendored under `deps/`,
//! on disk elsewhere, or fetched from a git registry into a local cache.
//! packwright loads the whole tree and merges every variable's default
//! with overrides from files, the environment and the command line.
//!
//! # Modules
//!
//! - [`cache`] - Content-addressed cache of fetched registry packs
//! - [`cli`] - Command-line interface and argument parsing
//! - [`config`] - User configuration loading and layering
//! - [`diagnostics`] - Accumulated errors and warnings
//! - [`error`] - Error types and result aliases
//! - [`pack`] - Pack model and tree loading
//! - [`registry`] - Pack references and registry access
//! - [`types`] - Variable types and values
//! - [`ui`] - Terminal output
//! - [`variables`] - Override sources and variable resolution
//!
//! # Example
//!
//! ```
//! use packwright::registry::PackReference;
//!
//! let reference = PackReference::from_parts("redis", None, Some("v1.2.0"), None).unwrap();
//! assert_eq!(reference.registry_name(), Some("default"));
//! assert_eq!(reference.git_ref(), Some("v1.2.0"));
//! assert!(!reference.is_latest());
//! ```
//!
//! For loading packs from disk, see the integration tests.

pub mod cache;
pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod pack;
pub mod registry;
pub mod types;
pub mod ui;
pub mod variables;

pub use error::{PackError, Result};
