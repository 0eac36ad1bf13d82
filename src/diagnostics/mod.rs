//! Accumulating diagnostics.
//!
//! Loading and resolution report problems as [`Diagnostic`]s collected in a
//! [`Diagnostics`] accumulator instead of stopping at the first failure, so a
//! user sees every problem with their overrides at once. Callers inspect
//! [`Diagnostics::has_errors`] after a batch operation completes; warnings are
//! kept and rendered but never fail a command.
//!
//! # Example
//!
//! ```
//! use packwright::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
//!
//! let mut diags = Diagnostics::new();
//! diags.add(
//!     Diagnostic::warning(DiagnosticKind::UnknownVariable, "no pack declares 'replicas'")
//!         .with_variable("replicas"),
//! );
//! assert!(!diags.has_errors());
//!
//! diags.add(Diagnostic::error(DiagnosticKind::MissingRequired, "no value set").with_variable("image"));
//! assert!(diags.has_errors());
//! assert!(diags.error().contains("missing-required"));
//! ```

pub mod format;

pub use format::{HumanFormatter, OutputContext};

use serde::Serialize;
use std::fmt;

use crate::error::PackError;

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Reported, but does not affect success.
    Warning,
    /// Fails the command.
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// What went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    NotFound,
    CyclicDependency,
    FetchFailed,
    TypeMismatch,
    UnknownVariable,
    MissingRequired,
    LoadParseError,
}

impl DiagnosticKind {
    /// Stable identifier, e.g. `type-mismatch`.
    pub fn id(&self) -> &'static str {
        match self {
            DiagnosticKind::NotFound => "not-found",
            DiagnosticKind::CyclicDependency => "cyclic-dependency",
            DiagnosticKind::FetchFailed => "fetch-failed",
            DiagnosticKind::TypeMismatch => "type-mismatch",
            DiagnosticKind::UnknownVariable => "unknown-variable",
            DiagnosticKind::MissingRequired => "missing-required",
            DiagnosticKind::LoadParseError => "load-parse-error",
        }
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// The pack and/or variable a diagnostic is about.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Subject {
    /// Pack alias path, e.g. `web.redis`.
    pub pack: Option<String>,
    /// Variable name.
    pub variable: Option<String>,
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.pack, &self.variable) {
            (Some(pack), Some(var)) => write!(f, "{}.{}", pack, var),
            (Some(pack), None) => write!(f, "{}", pack),
            (None, Some(var)) => write!(f, "{}", var),
            (None, None) => Ok(()),
        }
    }
}

/// A single reported problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub subject: Subject,
    pub message: String,
}

impl Diagnostic {
    /// Create a diagnostic with an explicit severity.
    pub fn new(severity: Severity, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            severity,
            kind,
            subject: Subject::default(),
            message: message.into(),
        }
    }

    /// Create an error diagnostic.
    pub fn error(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, kind, message)
    }

    /// Create a warning diagnostic.
    pub fn warning(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, kind, message)
    }

    /// Attach the pack alias path.
    pub fn with_pack(mut self, pack: impl Into<String>) -> Self {
        self.subject.pack = Some(pack.into());
        self
    }

    /// Attach the variable name.
    pub fn with_variable(mut self, variable: impl Into<String>) -> Self {
        self.subject.variable = Some(variable.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]: ", self.severity, self.kind)?;
        if self.subject.pack.is_some() || self.subject.variable.is_some() {
            write!(f, "{}: ", self.subject)?;
        }
        write!(f, "{}", self.message)
    }
}

impl From<&PackError> for Diagnostic {
    fn from(err: &PackError) -> Self {
        let kind = match err {
            PackError::NotFound { .. } => DiagnosticKind::NotFound,
            PackError::CyclicDependency { .. } => DiagnosticKind::CyclicDependency,
            PackError::FetchFailed { .. } => DiagnosticKind::FetchFailed,
            PackError::LoadParseError { .. }
            | PackError::InvalidReference { .. }
            | PackError::InvalidOverride { .. }
            | PackError::ConfigError { .. }
            | PackError::Io(_)
            | PackError::Other(_) => DiagnosticKind::LoadParseError,
        };
        let diagnostic = Diagnostic::error(kind, err.to_string());
        match err {
            PackError::FetchFailed { pack, .. } => diagnostic.with_pack(pack.clone()),
            _ => diagnostic,
        }
    }
}

/// Ordered accumulator of diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic.
    pub fn add(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    /// Record every diagnostic from another accumulator, keeping order.
    pub fn extend(&mut self, other: Diagnostics) {
        self.items.extend(other.items);
    }

    /// Whether any error-severity diagnostic was recorded.
    pub fn has_errors(&self) -> bool {
        self.items.iter().any(Diagnostic::is_error)
    }

    /// Render every diagnostic, one per line, errors and warnings alike.
    pub fn error(&self) -> String {
        self.items
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(|d| !d.is_error())
    }

    /// Diagnostics of one kind.
    pub fn of_kind(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(move |d| d.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl From<PackError> for Diagnostics {
    fn from(err: PackError) -> Self {
        let mut diags = Diagnostics::new();
        diags.add(Diagnostic::from(&err));
        diags
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
