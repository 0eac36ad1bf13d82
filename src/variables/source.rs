//! Override sources.
//!
//! Every way of supplying a value (override file, environment, command line)
//! becomes a [`VariableSource`], so resolution never needs to know where a
//! value came from beyond its [`SourceKind`].

use serde::Serialize;
use std::fmt;

use tracing::warn;

use crate::pack::is_valid_variable_name;
use crate::types::VarValue;

/// Environment variable prefix for overrides, e.g. `PACKWRIGHT_VAR_web.port=8080`.
pub const ENV_PREFIX: &str = "PACKWRIGHT_VAR_";

/// Where a value came from. Ordered by precedence, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    PackDefault,
    SharedFile,
    PackFile,
    Environment,
    CommandLine,
}

impl SourceKind {
    /// Precedence rank; higher wins.
    pub fn rank(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SourceKind::PackDefault => "pack default",
            SourceKind::SharedFile => "shared override file",
            SourceKind::PackFile => "pack override file",
            SourceKind::Environment => "environment",
            SourceKind::CommandLine => "command line",
        };
        write!(f, "{}", s)
    }
}

/// The variable a source assigns.
///
/// `pack` is `None` for a bare name, which applies to every pack declaring
/// that variable. Otherwise it is an alias path qualifier such as `cache`
/// or `web.cache`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetPath {
    pub pack: Option<String>,
    pub variable: String,
}

impl TargetPath {
    pub fn bare(variable: impl Into<String>) -> Self {
        Self {
            pack: None,
            variable: variable.into(),
        }
    }

    pub fn qualified(pack: impl Into<String>, variable: impl Into<String>) -> Self {
        Self {
            pack: Some(pack.into()),
            variable: variable.into(),
        }
    }

    /// Parse `variable` or `pack.path.variable`.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let (pack, variable) = match raw.rsplit_once('.') {
            Some((pack, variable)) => {
                if pack.is_empty() || pack.split('.').any(str::is_empty) {
                    return Err(format!("invalid pack qualifier in '{}'", raw));
                }
                (Some(pack.to_string()), variable)
            }
            None => (None, raw),
        };
        if !is_valid_variable_name(variable) {
            return Err(format!("invalid variable name in '{}'", raw));
        }
        Ok(Self {
            pack,
            variable: variable.to_string(),
        })
    }

    pub fn is_qualified(&self) -> bool {
        self.pack.is_some()
    }

    /// The single pack a qualified target names, if any.
    ///
    /// A qualifier is first taken as a full alias path; only when no pack
    /// has that path is it read relative to the root (`cache` names
    /// `web.cache` when `web` is the root). `exists` reports whether a pack
    /// path is in the tree. Bare targets name no pack.
    pub fn pack_in(&self, root_path: &str, exists: impl Fn(&str) -> bool) -> Option<String> {
        let qualifier = self.pack.as_deref()?;
        if exists(qualifier) {
            return Some(qualifier.to_string());
        }
        let relative = format!("{}.{}", root_path, qualifier);
        exists(&relative).then_some(relative)
    }
}

impl fmt::Display for TargetPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.pack {
            Some(pack) => write!(f, "{}.{}", pack, self.variable),
            None => write!(f, "{}", self.variable),
        }
    }
}

/// A supplied value, before type reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceValue {
    /// Already typed (override files).
    Typed(VarValue),
    /// Raw text (command line, environment), interpreted per target type.
    Literal(String),
}

/// One override assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableSource {
    pub kind: SourceKind,
    pub target: TargetPath,
    pub value: SourceValue,
    /// Human-readable origin for diagnostics, e.g. a file path or `--var`.
    pub origin: String,
}

impl VariableSource {
    pub fn new(
        kind: SourceKind,
        target: TargetPath,
        value: SourceValue,
        origin: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            target,
            value,
            origin: origin.into(),
        }
    }

    /// Parse a `name=value` command-line assignment.
    pub fn command_line(assignment: &str) -> Result<Self, String> {
        let (target, value) = split_assignment(assignment)?;
        Ok(Self::new(
            SourceKind::CommandLine,
            target,
            SourceValue::Literal(value),
            format!("--var {}", assignment),
        ))
    }

    /// Sources from environment variables carrying `prefix`.
    ///
    /// Names that do not form a valid target are skipped with a warning.
    /// The result is sorted by variable name, so the order of the input
    /// does not matter.
    pub fn from_env<I, K, V>(vars: I, prefix: &str) -> Vec<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut sources: Vec<(String, Self)> = Vec::new();
        for (key, value) in vars {
            let key = key.as_ref();
            let Some(name) = key.strip_prefix(prefix) else {
                continue;
            };
            match TargetPath::parse(name) {
                Ok(target) => sources.push((
                    key.to_string(),
                    Self::new(
                        SourceKind::Environment,
                        target,
                        SourceValue::Literal(value.into()),
                        key.to_string(),
                    ),
                )),
                Err(e) => warn!(variable = %key, "Ignoring environment override: {}", e),
            }
        }
        sources.sort_by(|a, b| a.0.cmp(&b.0));
        sources.into_iter().map(|(_, s)| s).collect()
    }
}

/// Split `target=value` at the first `=`.
pub fn split_assignment(assignment: &str) -> Result<(TargetPath, String), String> {
    let (name, value) = assignment
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{}'", assignment))?;
    let target = TargetPath::parse(name.trim())?;
    Ok((target, value.to_string()))
}
