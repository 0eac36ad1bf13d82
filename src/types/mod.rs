//! Variable type system.
//!
//! Pack variables are typed with a small closed set of structural types.
//! Types are written in variable declaration files using a compact
//! expression syntax:
//!
//! | Expression                          | Type                         |
//! |-------------------------------------|------------------------------|
//! | `string`, `bool`, `number`, `any`   | primitives                   |
//! | `list(string)`                      | list with string elements    |
//! | `map(number)`                       | string-keyed map of numbers  |
//! | `object({name = string, port = number})` | object with fixed attributes |
//!
//! # Example
//!
//! ```
//! use packwright::types::{VarType, VarValue};
//!
//! let ty: VarType = "list(number)".parse().unwrap();
//! assert_eq!(ty.friendly_name(), "list of number");
//!
//! let value = VarValue::parse_literal("[1, 2]", &ty).unwrap();
//! assert!(ty.convert(&value).is_ok());
//! ```

pub mod value;

pub use value::VarValue;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::iter::Peekable;
use std::str::{Chars, FromStr};

/// The structural type of a variable value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VarType {
    String,
    Bool,
    Number,
    /// Homogeneous list.
    List(Box<VarType>),
    /// String-keyed map with homogeneous values.
    Map(Box<VarType>),
    /// Fixed set of named attributes.
    Object(BTreeMap<String, VarType>),
    /// Type of a bare null value. Never declared, only observed.
    Null,
    /// Accepts anything.
    Any,
}

impl VarType {
    /// Human-readable name, e.g. `list of string`.
    pub fn friendly_name(&self) -> String {
        match self {
            VarType::String => "string".to_string(),
            VarType::Bool => "bool".to_string(),
            VarType::Number => "number".to_string(),
            VarType::List(inner) => format!("list of {}", inner.friendly_name()),
            VarType::Map(inner) => format!("map of {}", inner.friendly_name()),
            VarType::Object(_) => "object".to_string(),
            VarType::Null => "null".to_string(),
            VarType::Any => "any".to_string(),
        }
    }

    /// Whether a value of type `other` can be assigned where `self` is expected
    /// without looking inside collections.
    ///
    /// This is the shallow check used for inferred types: a list stays a list,
    /// a map stays a map, scalars keep their kind. Strings are accepted for
    /// scalar targets because literal input arrives as text.
    pub fn accepts_shallow(&self, other: &VarType) -> bool {
        match (self, other) {
            (VarType::Any, _) | (_, VarType::Any) | (_, VarType::Null) => true,
            (VarType::String, VarType::String | VarType::Bool | VarType::Number) => true,
            (VarType::Bool, VarType::Bool) | (VarType::Number, VarType::Number) => true,
            (VarType::List(_), VarType::List(_)) => true,
            (VarType::Map(_) | VarType::Object(_), VarType::Map(_) | VarType::Object(_)) => true,
            _ => false,
        }
    }

    /// Convert a value to this type, checking structure all the way down.
    ///
    /// Returns the converted value, or a message describing the first
    /// structural mismatch.
    pub fn convert(&self, value: &VarValue) -> Result<VarValue, String> {
        self.convert_at(value, "")
    }

    fn convert_at(&self, value: &VarValue, at: &str) -> Result<VarValue, String> {
        let mismatch = || {
            let location = if at.is_empty() {
                String::new()
            } else {
                format!(" at {}", at)
            };
            Err(format!(
                "expected {}, got {}{}",
                self.friendly_name(),
                value.kind_name(),
                location
            ))
        };

        match (self, value) {
            (VarType::Any, v) => Ok(v.clone()),
            (_, VarValue::Null) => Ok(VarValue::Null),

            (VarType::String, VarValue::String(_)) => Ok(value.clone()),
            (VarType::String, VarValue::Bool(b)) => Ok(VarValue::String(b.to_string())),
            (VarType::String, VarValue::Number(n)) => Ok(VarValue::String(n.to_string())),

            (VarType::Bool, VarValue::Bool(_)) => Ok(value.clone()),
            (VarType::Bool, VarValue::String(s)) => match s.as_str() {
                "true" => Ok(VarValue::Bool(true)),
                "false" => Ok(VarValue::Bool(false)),
                _ => mismatch(),
            },

            (VarType::Number, VarValue::Number(_)) => Ok(value.clone()),
            (VarType::Number, VarValue::String(s)) => match serde_yaml::from_str(s.trim()) {
                Ok(serde_yaml::Value::Number(n)) => Ok(VarValue::Number(n)),
                _ => mismatch(),
            },

            (VarType::List(inner), VarValue::List(items)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| inner.convert_at(item, &format!("{}[{}]", at, i)))
                .collect::<Result<Vec<_>, _>>()
                .map(VarValue::List),

            (VarType::Map(inner), VarValue::Map(entries)) => entries
                .iter()
                .map(|(k, v)| {
                    inner
                        .convert_at(v, &join_path(at, k))
                        .map(|converted| (k.clone(), converted))
                })
                .collect::<Result<BTreeMap<_, _>, _>>()
                .map(VarValue::Map),

            (VarType::Object(attrs), VarValue::Map(entries)) => {
                if let Some(extra) = entries.keys().find(|k| !attrs.contains_key(*k)) {
                    return Err(format!(
                        "unexpected attribute '{}'{}",
                        extra,
                        if at.is_empty() {
                            String::new()
                        } else {
                            format!(" in {}", at)
                        }
                    ));
                }
                let mut converted = BTreeMap::new();
                for (name, attr_type) in attrs {
                    let path = join_path(at, name);
                    match entries.get(name) {
                        Some(v) => {
                            converted.insert(name.clone(), attr_type.convert_at(v, &path)?);
                        }
                        None => return Err(format!("missing attribute '{}'", path)),
                    }
                }
                Ok(VarValue::Map(converted))
            }

            _ => mismatch(),
        }
    }
}

fn join_path(at: &str, key: &str) -> String {
    if at.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", at, key)
    }
}

impl fmt::Display for VarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VarType::String => write!(f, "string"),
            VarType::Bool => write!(f, "bool"),
            VarType::Number => write!(f, "number"),
            VarType::List(inner) => write!(f, "list({})", inner),
            VarType::Map(inner) => write!(f, "map({})", inner),
            VarType::Object(attrs) => {
                write!(f, "object({{")?;
                for (i, (name, ty)) in attrs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} = {}", name, ty)?;
                }
                write!(f, "}})")
            }
            VarType::Null => write!(f, "null"),
            VarType::Any => write!(f, "any"),
        }
    }
}

impl FromStr for VarType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parser = TypeParser {
            chars: s.chars().peekable(),
        };
        let ty = parser.parse_type()?;
        parser.skip_ws();
        match parser.chars.next() {
            None => Ok(ty),
            Some(c) => Err(format!("unexpected '{}' after type expression", c)),
        }
    }
}

impl Serialize for VarType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for VarType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Recursive-descent parser for type expressions.
struct TypeParser<'a> {
    chars: Peekable<Chars<'a>>,
}

impl TypeParser<'_> {
    fn skip_ws(&mut self) {
        while self.chars.peek().is_some_and(|c| c.is_whitespace()) {
            self.chars.next();
        }
    }

    fn ident(&mut self) -> Result<String, String> {
        self.skip_ws();
        let mut ident = String::new();
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                ident.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        if ident.is_empty() {
            Err("expected a type name".to_string())
        } else {
            Ok(ident)
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), String> {
        self.skip_ws();
        match self.chars.next() {
            Some(c) if c == expected => Ok(()),
            Some(c) => Err(format!("expected '{}', found '{}'", expected, c)),
            None => Err(format!("expected '{}', found end of input", expected)),
        }
    }

    fn parse_type(&mut self) -> Result<VarType, String> {
        let name = self.ident()?;
        match name.as_str() {
            "string" => Ok(VarType::String),
            "bool" => Ok(VarType::Bool),
            "number" => Ok(VarType::Number),
            "any" => Ok(VarType::Any),
            "list" | "map" => {
                self.expect('(')?;
                let inner = Box::new(self.parse_type()?);
                self.expect(')')?;
                Ok(if name == "list" {
                    VarType::List(inner)
                } else {
                    VarType::Map(inner)
                })
            }
            "object" => {
                self.expect('(')?;
                self.expect('{')?;
                let mut attrs = BTreeMap::new();
                loop {
                    self.skip_ws();
                    if self.chars.peek() == Some(&'}') {
                        self.chars.next();
                        break;
                    }
                    let attr = self.ident()?;
                    self.skip_ws();
                    match self.chars.next() {
                        Some('=') | Some(':') => {}
                        _ => return Err(format!("expected '=' after attribute '{}'", attr)),
                    }
                    let ty = self.parse_type()?;
                    if attrs.insert(attr.clone(), ty).is_some() {
                        return Err(format!("duplicate attribute '{}'", attr));
                    }
                    self.skip_ws();
                    match self.chars.next() {
                        Some(',') => continue,
                        Some('}') => break,
                        _ => return Err("expected ',' or '}' in object type".to_string()),
                    }
                }
                self.expect(')')?;
                Ok(VarType::Object(attrs))
            }
            other => Err(format!("unknown type '{}'", other)),
        }
    }
}
