//! Error types for packwright operations.
//!
//! This module defines [`PackError`], the error type returned by the pack
//! resolution and loading layers, and a [`Result`] type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - Use `PackError` for failures that stop a pack from being loaded
//! - Variable resolution problems are reported as [`crate::diagnostics::Diagnostic`]s
//!   instead, so that one bad override never hides another
//! - Use `anyhow::Error` (via `PackError::Other`) for unexpected errors

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for pack resolution and loading.
#[derive(Debug, Error)]
pub enum PackError {
    /// A reference resolved to no source.
    #[error("Pack not found: {what}")]
    NotFound { what: String },

    /// A pack depends (directly or transitively) on itself.
    #[error("Cyclic pack dependency detected: {cycle}")]
    CyclicDependency { cycle: String },

    /// Fetching from a remote registry failed. Safe to retry.
    #[error("Failed to fetch pack '{pack}' from registry '{registry}': {message}")]
    FetchFailed {
        registry: String,
        pack: String,
        message: String,
        retryable: bool,
    },

    /// A pack metadata or variable declaration file is malformed.
    #[error("Failed to parse {}: {message}", path.display())]
    LoadParseError { path: PathBuf, message: String },

    /// A pack reference is contradictory (e.g. both a path and a ref).
    #[error("Invalid pack reference: {message}")]
    InvalidReference { message: String },

    /// A `--var` assignment or override target is malformed.
    #[error("Invalid variable override: {message}")]
    InvalidOverride { message: String },

    /// Invalid packwright configuration.
    #[error("Invalid configuration: {message}")]
    ConfigError { message: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PackError {
    /// Whether the failed operation can be retried unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, PackError::FetchFailed { retryable: true, .. })
    }
}

/// Result type alias for packwright operations.
pub type Result<T> = std::result::Result<T, PackError>;
