//! Typed variable values.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::VarType;

/// A variable value.
///
/// Maps use a `BTreeMap` so that serialized output is deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VarValue {
    Null,
    Bool(bool),
    Number(serde_yaml::Number),
    String(String),
    List(Vec<VarValue>),
    Map(BTreeMap<String, VarValue>),
}

impl VarValue {
    /// Convert a parsed YAML value.
    ///
    /// Map keys must be scalars; tagged values are rejected.
    pub fn from_yaml(value: &serde_yaml::Value) -> Result<Self, String> {
        match value {
            serde_yaml::Value::Null => Ok(VarValue::Null),
            serde_yaml::Value::Bool(b) => Ok(VarValue::Bool(*b)),
            serde_yaml::Value::Number(n) => Ok(VarValue::Number(n.clone())),
            serde_yaml::Value::String(s) => Ok(VarValue::String(s.clone())),
            serde_yaml::Value::Sequence(items) => items
                .iter()
                .map(VarValue::from_yaml)
                .collect::<Result<Vec<_>, _>>()
                .map(VarValue::List),
            serde_yaml::Value::Mapping(mapping) => {
                let mut entries = BTreeMap::new();
                for (k, v) in mapping {
                    let key = match k {
                        serde_yaml::Value::String(s) => s.clone(),
                        serde_yaml::Value::Number(n) => n.to_string(),
                        serde_yaml::Value::Bool(b) => b.to_string(),
                        _ => return Err("map keys must be scalars".to_string()),
                    };
                    entries.insert(key, VarValue::from_yaml(v)?);
                }
                Ok(VarValue::Map(entries))
            }
            serde_yaml::Value::Tagged(tagged) => {
                Err(format!("unsupported YAML tag {}", tagged.tag))
            }
        }
    }

    /// Interpret a literal string (command line or environment) for a target type.
    ///
    /// String and `any` targets take the text verbatim. Every other target
    /// parses the text as YAML first, so `5`, `true`, `[a, b]` and `{k: v}`
    /// become typed values before conversion.
    pub fn parse_literal(raw: &str, target: &VarType) -> Result<Self, String> {
        match target {
            VarType::String | VarType::Any => Ok(VarValue::String(raw.to_string())),
            _ => {
                let parsed: serde_yaml::Value = serde_yaml::from_str(raw)
                    .map_err(|e| format!("cannot parse '{}' as {}: {}", raw, target, e))?;
                VarValue::from_yaml(&parsed)
            }
        }
    }

    /// Whether this is the null value.
    pub fn is_null(&self) -> bool {
        matches!(self, VarValue::Null)
    }

    /// Name of the value's kind for messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            VarValue::Null => "null",
            VarValue::Bool(_) => "bool",
            VarValue::Number(_) => "number",
            VarValue::String(_) => "string",
            VarValue::List(_) => "list",
            VarValue::Map(_) => "map",
        }
    }

    /// Shallow structural type, used when a variable has no declared type.
    ///
    /// Collections report `any` elements so that later values are only
    /// required to keep the same outer shape.
    pub fn inferred_type(&self) -> VarType {
        match self {
            VarValue::Null => VarType::Null,
            VarValue::Bool(_) => VarType::Bool,
            VarValue::Number(_) => VarType::Number,
            VarValue::String(_) => VarType::String,
            VarValue::List(_) => VarType::List(Box::new(VarType::Any)),
            VarValue::Map(_) => VarType::Map(Box::new(VarType::Any)),
        }
    }

    /// Full structural type including element and attribute types.
    pub fn structural_type(&self) -> VarType {
        match self {
            VarValue::List(items) => {
                let mut element = items.iter().map(VarValue::structural_type);
                let first = element.next().unwrap_or(VarType::Any);
                if element.all(|t| t == first) {
                    VarType::List(Box::new(first))
                } else {
                    VarType::List(Box::new(VarType::Any))
                }
            }
            VarValue::Map(entries) => VarType::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.structural_type()))
                    .collect(),
            ),
            other => other.inferred_type(),
        }
    }
}

impl From<&str> for VarValue {
    fn from(s: &str) -> Self {
        VarValue::String(s.to_string())
    }
}

impl From<String> for VarValue {
    fn from(s: String) -> Self {
        VarValue::String(s)
    }
}

impl From<bool> for VarValue {
    fn from(b: bool) -> Self {
        VarValue::Bool(b)
    }
}

impl From<i32> for VarValue {
    fn from(n: i32) -> Self {
        VarValue::Number(i64::from(n).into())
    }
}

impl From<i64> for VarValue {
    fn from(n: i64) -> Self {
        VarValue::Number(n.into())
    }
}

impl From<f64> for VarValue {
    fn from(n: f64) -> Self {
        VarValue::Number(n.into())
    }
}

impl std::fmt::Display for VarValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VarValue::String(s) => write!(f, "{:?}", s),
            other => match serde_json::to_string(other) {
                Ok(json) => write!(f, "{}", json),
                Err(_) => write!(f, "<{}>", other.kind_name()),
            },
        }
    }
}
