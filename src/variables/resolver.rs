//! Variable resolution.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use tracing::debug;

use super::source::{SourceKind, SourceValue, VariableSource};
use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics};
use crate::pack::declarations::load_declarations;
use crate::pack::{Pack, VariableSpec};
use crate::types::{VarType, VarValue};

/// Inputs to a resolution pass.
#[derive(Debug, Clone)]
pub struct ResolverConfig<'a> {
    /// Root of the loaded pack tree.
    pub parent_pack: &'a Pack,
    /// Declaration file per pack path. Packs listed here are resolved
    /// against the file's declarations; the rest use what was parsed at load.
    pub root_variable_files: BTreeMap<String, PathBuf>,
    /// Report missing required variables as warnings and leave them out.
    pub ignore_missing_vars: bool,
    /// Overrides in the order they were supplied.
    pub sources: Vec<VariableSource>,
}

impl<'a> ResolverConfig<'a> {
    pub fn new(parent_pack: &'a Pack) -> Self {
        Self {
            parent_pack,
            root_variable_files: parent_pack.root_variable_files(),
            ignore_missing_vars: false,
            sources: Vec::new(),
        }
    }

    pub fn with_sources(mut self, sources: impl IntoIterator<Item = VariableSource>) -> Self {
        self.sources.extend(sources);
        self
    }

    pub fn ignore_missing_vars(mut self, ignore: bool) -> Self {
        self.ignore_missing_vars = ignore;
        self
    }
}

/// A final variable value with its type and winning source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedVariable {
    pub value: VarValue,
    #[serde(rename = "type")]
    pub var_type: VarType,
    pub source: SourceKind,
}

/// Resolved values keyed by pack path, then variable name.
///
/// Every pack in the tree has an entry, even when it declares nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResolvedVariableSet {
    packs: BTreeMap<String, BTreeMap<String, ResolvedVariable>>,
}

impl ResolvedVariableSet {
    pub fn get(&self, pack: &str, variable: &str) -> Option<&ResolvedVariable> {
        self.packs.get(pack)?.get(variable)
    }

    pub fn value(&self, pack: &str, variable: &str) -> Option<&VarValue> {
        self.get(pack, variable).map(|v| &v.value)
    }

    /// Variables of one pack.
    pub fn pack(&self, pack: &str) -> Option<&BTreeMap<String, ResolvedVariable>> {
        self.packs.get(pack)
    }

    pub fn packs(&self) -> impl Iterator<Item = (&str, &BTreeMap<String, ResolvedVariable>)> {
        self.packs.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Total number of resolved variables.
    pub fn len(&self) -> usize {
        self.packs.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Merges defaults and overrides across a pack tree.
pub struct Resolver<'a> {
    config: ResolverConfig<'a>,
}

impl<'a> Resolver<'a> {
    pub fn new(config: ResolverConfig<'a>) -> Self {
        Self { config }
    }

    /// Resolve every declared variable in the tree.
    ///
    /// Never fails outright: every problem becomes a diagnostic, and the
    /// caller decides what to do with `has_errors()`.
    pub fn resolve(&self) -> (ResolvedVariableSet, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let root = self.config.parent_pack;
        let declared = self.declarations(&mut diagnostics);

        // Stable sort keeps supplied order within a rank, so the last one wins.
        let mut ordered: Vec<&VariableSource> = self.config.sources.iter().collect();
        ordered.sort_by_key(|s| s.kind.rank());

        // Each qualified source names at most one pack.
        let paths: BTreeSet<&str> = declared.iter().map(|(path, _)| path.as_str()).collect();
        let targeted: Vec<(&VariableSource, Option<String>)> = ordered
            .iter()
            .map(|s| (*s, s.target.pack_in(&root.path, |p| paths.contains(p))))
            .collect();

        for (source, target) in &targeted {
            let declares = |specs: &[VariableSpec]| {
                specs.iter().any(|s| s.name == source.target.variable)
            };
            let known = match (&source.target.pack, target) {
                (None, _) => declared.iter().any(|(_, specs)| declares(specs)),
                (Some(_), Some(path)) => declared
                    .iter()
                    .any(|(p, specs)| p == path && declares(specs)),
                (Some(_), None) => false,
            };
            if !known {
                let mut diagnostic = Diagnostic::warning(
                    DiagnosticKind::UnknownVariable,
                    format!(
                        "{} sets '{}', which no pack declares",
                        source.origin, source.target
                    ),
                )
                .with_variable(&source.target.variable);
                if let Some(pack) = &source.target.pack {
                    diagnostic = diagnostic.with_pack(pack);
                }
                diagnostics.add(diagnostic);
            }
        }

        let mut resolved = ResolvedVariableSet::default();
        for (path, specs) in &declared {
            let vars = resolved.packs.entry(path.clone()).or_default();
            for spec in specs {
                let named = |s: &VariableSource| s.target.variable == spec.name;
                let qualified: Vec<&VariableSource> = targeted
                    .iter()
                    .filter(|(s, target)| named(s) && target.as_deref() == Some(path.as_str()))
                    .map(|(s, _)| *s)
                    .collect();
                let applicable = if qualified.is_empty() {
                    ordered
                        .iter()
                        .copied()
                        .filter(|s| !s.target.is_qualified() && named(s))
                        .collect()
                } else {
                    qualified
                };

                if let Some(variable) = self.resolve_one(path, spec, &applicable, &mut diagnostics)
                {
                    vars.insert(spec.name.clone(), variable);
                }
            }
        }

        debug!(
            variables = resolved.len(),
            diagnostics = diagnostics.len(),
            "Resolved variables"
        );
        (resolved, diagnostics)
    }

    /// Specs per pack path, in tree order.
    fn declarations(&self, diagnostics: &mut Diagnostics) -> Vec<(String, Vec<VariableSpec>)> {
        self.config
            .parent_pack
            .walk()
            .into_iter()
            .map(|pack| {
                let specs = match self.config.root_variable_files.get(&pack.path) {
                    Some(file) => match load_declarations(file, &pack.path) {
                        Ok(specs) => specs,
                        Err(e) => {
                            diagnostics.add(
                                Diagnostic::error(DiagnosticKind::LoadParseError, e.to_string())
                                    .with_pack(&pack.path),
                            );
                            pack.variable_specs.clone()
                        }
                    },
                    None => pack.variable_specs.clone(),
                };
                (pack.path.clone(), specs)
            })
            .collect()
    }

    fn resolve_one(
        &self,
        pack: &str,
        spec: &VariableSpec,
        sources: &[&VariableSource],
        diagnostics: &mut Diagnostics,
    ) -> Option<ResolvedVariable> {
        let mismatch = |message: String| {
            Diagnostic::error(DiagnosticKind::TypeMismatch, message)
                .with_pack(pack)
                .with_variable(&spec.name)
        };

        let mut current: Option<(VarValue, SourceKind)> = None;
        let mut var_type = spec.declared_type.clone();

        if let Some(default) = &spec.default {
            match &spec.declared_type {
                Some(declared) => match declared.convert(default) {
                    Ok(value) => current = Some((value, SourceKind::PackDefault)),
                    Err(e) => diagnostics.add(mismatch(format!("default value: {}", e))),
                },
                None => {
                    var_type = Some(default.inferred_type());
                    current = Some((default.clone(), SourceKind::PackDefault));
                }
            }
        }

        for source in sources {
            let candidate = match &source.value {
                SourceValue::Typed(value) => Ok(value.clone()),
                SourceValue::Literal(raw) => {
                    VarValue::parse_literal(raw, var_type.as_ref().unwrap_or(&VarType::String))
                }
            };
            let converted = candidate.and_then(|value| match &var_type {
                Some(ty) if spec.declared_type.is_some() => ty.convert(&value),
                Some(ty) if ty.accepts_shallow(&value.inferred_type()) => ty.convert(&value),
                Some(ty) => Err(format!(
                    "expected {}, got {}",
                    ty.friendly_name(),
                    value.kind_name()
                )),
                None => Ok(value),
            });

            match converted {
                Ok(value) => {
                    if var_type.is_none() && !value.is_null() {
                        var_type = Some(value.inferred_type());
                    }
                    current = Some((value, source.kind));
                }
                Err(e) => diagnostics.add(mismatch(format!(
                    "{}: {}; keeping the previous value",
                    source.origin, e
                ))),
            }
        }

        match current {
            Some((value, source)) if !value.is_null() => Some(ResolvedVariable {
                var_type: spec
                    .declared_type
                    .clone()
                    .unwrap_or_else(|| value.structural_type()),
                value,
                source,
            }),
            _ if spec.is_required() => {
                let message = format!("required variable '{}' has no value", spec.name);
                let diagnostic = if self.config.ignore_missing_vars {
                    Diagnostic::warning(DiagnosticKind::MissingRequired, message)
                } else {
                    Diagnostic::error(DiagnosticKind::MissingRequired, message)
                };
                diagnostics.add(diagnostic.with_pack(pack).with_variable(&spec.name));
                None
            }
            Some((value, source)) => Some(ResolvedVariable {
                var_type: var_type.unwrap_or(VarType::Null),
                value,
                source,
            }),
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::PackSource;
    use crate::pack::declarations::parse_declarations;
    use crate::pack::PackMetadata;
    use crate::variables::source::TargetPath;

    fn pack(path: &str, declarations: &str, children: Vec<Pack>) -> Pack {
        Pack {
            path: path.to_string(),
            alias: path.rsplit('.').next().unwrap().to_string(),
            source: PackSource::Local(PathBuf::from("/nonexistent")),
            metadata: PackMetadata::default(),
            variable_specs: parse_declarations(declarations, path).unwrap(),
            template_files: BTreeSet::new(),
            children: children.into_iter().map(|c| (c.alias.clone(), c)).collect(),
        }
    }

    fn cli(assignment: &str) -> VariableSource {
        VariableSource::command_line(assignment).unwrap()
    }

    fn typed(kind: SourceKind, target: &str, value: VarValue) -> VariableSource {
        VariableSource::new(
            kind,
            TargetPath::parse(target).unwrap(),
            SourceValue::Typed(value),
            "test",
        )
    }

    fn resolve(root: &Pack, sources: Vec<VariableSource>) -> (ResolvedVariableSet, Diagnostics) {
        Resolver::new(ResolverConfig::new(root).with_sources(sources)).resolve()
    }

    #[test]
    fn defaults_only() {
        let root = pack("web", "variables:\n  port:\n    default: 80\n", vec![]);
        let (set, diags) = resolve(&root, vec![]);
        assert!(diags.is_empty());
        let port = set.get("web", "port").unwrap();
        assert_eq!(port.value, VarValue::from(80));
        assert_eq!(port.var_type, VarType::Number);
        assert_eq!(port.source, SourceKind::PackDefault);
    }

    #[test]
    fn literal_converts_to_declared_type() {
        let root = pack(
            "web",
            "variables:\n  port:\n    type: number\n    default: 80\n  debug:\n    type: bool\n    default: false\n  dcs:\n    type: list(string)\n    default: []\n",
            vec![],
        );
        let (set, diags) = resolve(
            &root,
            vec![cli("port=8080"), cli("debug=true"), cli("dcs=[dc1, dc2]")],
        );
        assert!(!diags.has_errors(), "{}", diags.error());
        assert_eq!(set.value("web", "port"), Some(&VarValue::from(8080)));
        assert_eq!(set.value("web", "debug"), Some(&VarValue::from(true)));
        assert_eq!(
            set.value("web", "dcs"),
            Some(&VarValue::List(vec!["dc1".into(), "dc2".into()]))
        );
    }

    #[test]
    fn untyped_without_default_takes_first_value_as_string() {
        let root = pack("web", "variables:\n  image:\n", vec![]);
        let (set, diags) = resolve(&root, vec![cli("image=123")]);
        assert!(diags.is_empty());
        let image = set.get("web", "image").unwrap();
        assert_eq!(image.value, VarValue::from("123"));
        assert_eq!(image.var_type, VarType::String);
        assert_eq!(image.source, SourceKind::CommandLine);
    }

    #[test]
    fn inferred_type_rejects_other_shapes() {
        let root = pack("web", "variables:\n  tags:\n    default: [a]\n", vec![]);
        let (set, diags) = resolve(
            &root,
            vec![typed(SourceKind::SharedFile, "tags", VarValue::from(5))],
        );
        assert_eq!(diags.of_kind(DiagnosticKind::TypeMismatch).count(), 1);
        assert_eq!(
            set.value("web", "tags"),
            Some(&VarValue::List(vec!["a".into()]))
        );
    }

    #[test]
    fn bad_default_is_reported_and_dropped() {
        let root = pack(
            "web",
            "variables:\n  port:\n    type: number\n    default: eighty\n",
            vec![],
        );
        let (set, diags) = resolve(&root, vec![]);
        assert!(diags.has_errors());
        assert_eq!(diags.of_kind(DiagnosticKind::TypeMismatch).count(), 1);
        assert!(set.get("web", "port").is_none());
    }

    #[test]
    fn object_type_is_checked_deeply() {
        let root = pack(
            "web",
            "variables:\n  svc:\n    type: object({name = string, port = number})\n    default: {name: a, port: 1}\n",
            vec![],
        );
        let bad = typed(
            SourceKind::CommandLine,
            "svc",
            VarValue::from_yaml(&serde_yaml::from_str("{name: b, port: [1]}").unwrap()).unwrap(),
        );
        let (set, diags) = resolve(&root, vec![bad]);
        let message = &diags.of_kind(DiagnosticKind::TypeMismatch).next().unwrap().message;
        assert!(message.contains("port"), "{}", message);
        assert_eq!(
            set.get("web", "svc").unwrap().source,
            SourceKind::PackDefault
        );
    }

    #[test]
    fn equal_rank_last_supplied_wins() {
        let root = pack("web", "variables:\n  image:\n    default: a\n", vec![]);
        let (set, _) = resolve(
            &root,
            vec![
                typed(SourceKind::SharedFile, "image", "first".into()),
                typed(SourceKind::SharedFile, "image", "second".into()),
            ],
        );
        assert_eq!(set.value("web", "image"), Some(&VarValue::from("second")));
    }

    #[test]
    fn environment_ranks_between_files_and_command_line() {
        let root = pack("web", "variables:\n  image:\n    default: a\n", vec![]);
        let env = VariableSource::from_env(vec![("PACKWRIGHT_VAR_image", "env")], "PACKWRIGHT_VAR_");
        let mut sources = vec![typed(SourceKind::PackFile, "web.image", "file".into())];
        sources.extend(env.clone());
        let (set, _) = resolve(&root, sources);
        // Qualified file value beats the bare environment value.
        assert_eq!(set.value("web", "image"), Some(&VarValue::from("file")));

        let mut sources = vec![typed(SourceKind::PackFile, "image", "file".into())];
        sources.extend(env);
        let (set, _) = resolve(&root, sources);
        assert_eq!(set.value("web", "image"), Some(&VarValue::from("env")));
    }

    #[test]
    fn unknown_variable_is_a_warning() {
        let root = pack("web", "variables:\n  image:\n    default: a\n", vec![]);
        let (set, diags) = resolve(&root, vec![cli("imgae=b"), cli("db.image=c")]);
        assert!(!diags.has_errors());
        assert_eq!(diags.of_kind(DiagnosticKind::UnknownVariable).count(), 2);
        assert_eq!(set.len(), 1);
        assert_eq!(set.value("web", "image"), Some(&VarValue::from("a")));
    }

    #[test]
    fn qualifier_sets_only_the_exact_pack() {
        let declarations = "variables:\n  port:\n    default: 1\n";
        let root = pack(
            "web",
            declarations,
            vec![pack("web.web", declarations, vec![])],
        );

        let (set, diags) = resolve(&root, vec![cli("web.port=80")]);
        assert!(diags.is_empty(), "{}", diags.error());
        assert_eq!(set.value("web", "port"), Some(&VarValue::from(80)));
        assert_eq!(set.value("web.web", "port"), Some(&VarValue::from(1)));

        // The child is still reachable by its full path.
        let (set, _) = resolve(&root, vec![cli("web.web.port=90")]);
        assert_eq!(set.value("web", "port"), Some(&VarValue::from(1)));
        assert_eq!(set.value("web.web", "port"), Some(&VarValue::from(90)));
    }

    #[test]
    fn every_pack_has_an_entry() {
        let root = pack("web", "", vec![pack("web.empty", "", vec![])]);
        let (set, _) = resolve(&root, vec![]);
        assert!(set.pack("web").unwrap().is_empty());
        assert!(set.pack("web.empty").is_some());
        assert!(set.is_empty());
    }

    #[test]
    fn explicit_null_for_optional_variable_is_kept() {
        let root = pack("web", "variables:\n  image:\n    default: a\n", vec![]);
        let (set, diags) = resolve(
            &root,
            vec![typed(SourceKind::SharedFile, "image", VarValue::Null)],
        );
        assert!(diags.is_empty());
        let image = set.get("web", "image").unwrap();
        assert_eq!(image.value, VarValue::Null);
        assert_eq!(image.var_type, VarType::String);
    }

    #[test]
    fn unreadable_declaration_file_is_reported() {
        let root = pack("web", "variables:\n  image:\n    default: a\n", vec![]);
        let mut config = ResolverConfig::new(&root);
        config
            .root_variable_files
            .insert("web".into(), PathBuf::from("/nonexistent/variables.yaml"));
        let (set, diags) = Resolver::new(config).resolve();
        assert_eq!(diags.of_kind(DiagnosticKind::LoadParseError).count(), 1);
        assert_eq!(set.value("web", "image"), Some(&VarValue::from("a")));
    }
}
