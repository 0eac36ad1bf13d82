//! Override files.
//!
//! An override file is a flat YAML mapping from variable targets to values:
//!
//! ```yaml
//! image: nginx:1.27          # every pack declaring `image`
//! cache.port: 6380           # only the `cache` child
//! datacenters: [dc1, dc2]
//! ```
//!
//! A file given for one pack (`--var-file cache=cache.yaml`) is scoped: its
//! keys are taken relative to that pack and it ranks above shared files.

use std::fs;
use std::path::Path;

use crate::error::{PackError, Result};
use crate::types::VarValue;

use super::source::{SourceKind, SourceValue, TargetPath, VariableSource};

/// Read an override file into sources, in file order.
pub fn load_override_file(path: &Path, scope: Option<&str>) -> Result<Vec<VariableSource>> {
    let content = fs::read_to_string(path)?;
    parse_override_file(&content, &path.display().to_string(), scope).map_err(|message| {
        PackError::LoadParseError {
            path: path.to_path_buf(),
            message,
        }
    })
}

pub fn parse_override_file(
    content: &str,
    origin: &str,
    scope: Option<&str>,
) -> std::result::Result<Vec<VariableSource>, String> {
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    let mapping = match serde_yaml::from_str::<serde_yaml::Value>(content).map_err(|e| e.to_string())? {
        serde_yaml::Value::Mapping(mapping) => mapping,
        serde_yaml::Value::Null => return Ok(Vec::new()),
        other => {
            return Err(format!(
                "expected a mapping of variables, got {}",
                VarValue::from_yaml(&other).map(|v| v.kind_name()).unwrap_or("tagged value")
            ))
        }
    };

    let kind = if scope.is_some() {
        SourceKind::PackFile
    } else {
        SourceKind::SharedFile
    };

    let mut sources = Vec::with_capacity(mapping.len());
    for (key, value) in &mapping {
        let key = key
            .as_str()
            .ok_or_else(|| "variable names must be strings".to_string())?;
        let mut target = TargetPath::parse(key)?;
        if let Some(scope) = scope {
            target.pack = Some(match target.pack {
                Some(inner) => format!("{}.{}", scope, inner),
                None => scope.to_string(),
            });
        }
        let value = VarValue::from_yaml(value).map_err(|e| format!("{}: {}", key, e))?;
        sources.push(VariableSource::new(
            kind,
            target,
            SourceValue::Typed(value),
            origin,
        ));
    }
    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn shared_file_keeps_targets() {
        let sources =
            parse_override_file("image: nginx\ncache.port: 6380\n", "vars.yaml", None).unwrap();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].kind, SourceKind::SharedFile);
        assert_eq!(sources[0].target, TargetPath::bare("image"));
        assert_eq!(sources[1].target, TargetPath::qualified("cache", "port"));
        assert_eq!(sources[1].value, SourceValue::Typed(VarValue::from(6380)));
        assert_eq!(sources[1].origin, "vars.yaml");
    }

    #[test]
    fn scoped_file_qualifies_keys() {
        let sources = parse_override_file("port: 1\ninner.size: 2\n", "f", Some("cache")).unwrap();
        assert_eq!(sources[0].kind, SourceKind::PackFile);
        assert_eq!(sources[0].target, TargetPath::qualified("cache", "port"));
        assert_eq!(sources[1].target, TargetPath::qualified("cache.inner", "size"));
    }

    #[test]
    fn empty_file_has_no_sources() {
        assert!(parse_override_file("", "f", None).unwrap().is_empty());
        assert!(parse_override_file("~\n", "f", None).unwrap().is_empty());
    }

    #[test]
    fn rejects_non_mapping() {
        let err = parse_override_file("- a\n- b\n", "f", None).unwrap_err();
        assert!(err.contains("list"));
    }

    #[test]
    fn load_reports_parse_errors_with_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.yaml");
        fs::write(&path, "port: [1\n").unwrap();
        match load_override_file(&path, None) {
            Err(PackError::LoadParseError { path: p, .. }) => assert_eq!(p, path),
            other => panic!("expected parse error, got {:?}", other),
        }
    }
}
