//! Variable declarations (`variables.yaml`).
//!
//! ```yaml
//! variables:
//!   port:
//!     type: number
//!     default: 8080
//!     description: Port the server listens on
//!   datacenters:
//!     type: list(string)
//!     default: [dc1]
//!   image:
//!     description: Required, since there is no default
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use crate::error::{PackError, Result};
use crate::types::{VarType, VarValue};

/// One declared variable of a pack.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableSpec {
    pub name: String,
    pub declared_type: Option<VarType>,
    /// `None` means the variable is required.
    pub default: Option<VarValue>,
    pub description: String,
    /// Alias path of the pack that declares it.
    pub owning_pack: String,
}

impl VariableSpec {
    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }

    /// The declared type, or the type inferred from the default.
    pub fn effective_type(&self) -> Option<VarType> {
        self.declared_type
            .clone()
            .or_else(|| self.default.as_ref().map(VarValue::inferred_type))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDeclaration {
    #[serde(default, rename = "type")]
    var_type: Option<VarType>,
    #[serde(default)]
    default: Option<serde_yaml::Value>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawFile {
    #[serde(default)]
    variables: Option<serde_yaml::Mapping>,
}

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_-]*$").unwrap());

/// Whether `name` can be used as a variable name.
pub fn is_valid_variable_name(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

/// Parse declarations from a file, keeping declaration order.
pub fn load_declarations(path: &Path, owning_pack: &str) -> Result<Vec<VariableSpec>> {
    let content = fs::read_to_string(path)?;
    parse_declarations(&content, owning_pack).map_err(|message| PackError::LoadParseError {
        path: path.to_path_buf(),
        message,
    })
}

pub fn parse_declarations(
    content: &str,
    owning_pack: &str,
) -> std::result::Result<Vec<VariableSpec>, String> {
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    let raw: RawFile = serde_yaml::from_str(content).map_err(|e| e.to_string())?;
    let Some(mapping) = raw.variables else {
        return Ok(Vec::new());
    };

    let mut specs: Vec<VariableSpec> = Vec::with_capacity(mapping.len());
    for (key, body) in mapping {
        let name = key
            .as_str()
            .ok_or_else(|| "variable names must be strings".to_string())?
            .to_string();
        if !is_valid_variable_name(&name) {
            return Err(format!("invalid variable name '{}'", name));
        }
        if specs.iter().any(|s| s.name == name) {
            return Err(format!("variable '{}' is declared twice", name));
        }

        let decl: RawDeclaration = if body.is_null() {
            RawDeclaration::default()
        } else {
            serde_yaml::from_value(body).map_err(|e| format!("variable '{}': {}", name, e))?
        };

        let default = decl
            .default
            .as_ref()
            .map(VarValue::from_yaml)
            .transpose()
            .map_err(|e| format!("variable '{}': {}", name, e))?;

        specs.push(VariableSpec {
            name,
            declared_type: decl.var_type,
            default,
            description: decl.description.unwrap_or_default(),
            owning_pack: owning_pack.to_string(),
        });
    }
    Ok(specs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_declarations_in_order() {
        let yaml = r#"
variables:
  port:
    type: number
    default: 8080
    description: Listen port
  image:
    description: Container image
  tags:
    default: [a, b]
"#;
        let specs = parse_declarations(yaml, "web").unwrap();
        let names: Vec<_> = specs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["port", "image", "tags"]);

        assert_eq!(specs[0].declared_type, Some(VarType::Number));
        assert_eq!(specs[0].default, Some(VarValue::from(8080)));
        assert!(!specs[0].is_required());
        assert!(specs[1].is_required());
        assert_eq!(specs[1].effective_type(), None);
        assert_eq!(
            specs[2].effective_type(),
            Some(VarType::List(Box::new(VarType::Any)))
        );
        assert!(specs.iter().all(|s| s.owning_pack == "web"));
    }

    #[test]
    fn null_default_means_required() {
        let specs = parse_declarations("variables:\n  x:\n    default: null\n", "p").unwrap();
        assert!(specs[0].is_required());
    }

    #[test]
    fn bare_key_is_required_untyped() {
        let specs = parse_declarations("variables:\n  x:\n", "p").unwrap();
        assert!(specs[0].is_required());
        assert!(specs[0].declared_type.is_none());
    }

    #[test]
    fn empty_file_declares_nothing() {
        assert!(parse_declarations("", "p").unwrap().is_empty());
        assert!(parse_declarations("variables:\n", "p").unwrap().is_empty());
    }

    #[test]
    fn rejects_bad_type_expression() {
        let err = parse_declarations("variables:\n  x:\n    type: lst(string)\n", "p").unwrap_err();
        assert!(err.contains("x"));
    }

    #[test]
    fn rejects_unknown_declaration_fields() {
        assert!(parse_declarations("variables:\n  x:\n    defualt: 1\n", "p").is_err());
    }

    #[test]
    fn rejects_invalid_names() {
        assert!(parse_declarations("variables:\n  web.port: {}\n", "p").is_err());
        assert!(is_valid_variable_name("http_port"));
        assert!(is_valid_variable_name("http-port"));
        assert!(!is_valid_variable_name("9lives"));
    }
}
