//! `packwright vars`: resolve and print a pack's variables.

use std::path::Path;
use std::sync::LazyLock;

use anyhow::Context;
use regex::Regex;

use crate::cli::args::{OutputFormat, VarsArgs};
use crate::error::{PackError, Result};
use crate::pack::PackLoader;
use crate::ui::UserInterface;
use crate::variables::{load_override_file, Resolver, ResolverConfig, VariableSource, ENV_PREFIX};

use super::dispatcher::{
    fail_with, report_diagnostics, warn_unset_required, Command, CommandContext, CommandResult,
};

static SCOPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+(\.[A-Za-z0-9_-]+)*$").unwrap());

/// The vars command implementation.
pub struct VarsCommand<'a> {
    context: &'a CommandContext,
    args: VarsArgs,
}

impl<'a> VarsCommand<'a> {
    pub fn new(context: &'a CommandContext, args: VarsArgs) -> Self {
        Self { context, args }
    }

    /// Collect overrides in the order they were given: files, environment, flags.
    fn sources(&self) -> Result<Vec<VariableSource>> {
        let mut sources = Vec::new();
        for spec in &self.args.var_files {
            let (scope, file) = split_var_file(spec);
            sources.extend(load_override_file(Path::new(file), scope)?);
        }
        sources.extend(VariableSource::from_env(&self.context.env, ENV_PREFIX));
        for assignment in &self.args.vars {
            let source = VariableSource::command_line(assignment).map_err(|message| {
                PackError::InvalidOverride {
                    message: format!("--var {}: {}", assignment, message),
                }
            })?;
            sources.push(source);
        }
        Ok(sources)
    }
}

/// Split `--var-file` into an optional pack scope and a path.
///
/// `cache=cache.yaml` is scoped to `cache`; a value whose prefix is not a
/// pack path (`./a=b.yaml`) is taken as a plain path.
fn split_var_file(spec: &str) -> (Option<&str>, &str) {
    match spec.split_once('=') {
        Some((scope, file)) if SCOPE.is_match(scope) && !file.is_empty() => (Some(scope), file),
        _ => (None, spec),
    }
}

impl Command for VarsCommand<'_> {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let reference = match self.args.pack.reference() {
            Ok(reference) => reference,
            Err(e) => return Ok(fail_with(ui, &e)),
        };
        let sources = match self.sources() {
            Ok(sources) => sources,
            Err(e) => return Ok(fail_with(ui, &e)),
        };

        let cache = self.context.cache();
        if let Err(e) = cache.check(&reference) {
            return Ok(fail_with(ui, &e));
        }
        let pack = match PackLoader::new(&cache)
            .with_workers(self.context.config.workers)
            .load(&reference)
        {
            Ok(pack) => pack,
            Err(e) => return Ok(fail_with(ui, &e)),
        };

        let config = ResolverConfig::new(&pack)
            .with_sources(sources)
            .ignore_missing_vars(self.args.ignore_missing_vars);
        let (resolved, diagnostics) = Resolver::new(config).resolve();

        report_diagnostics(ui, &diagnostics);
        if diagnostics.has_errors() {
            return Ok(CommandResult::failure(1));
        }
        warn_unset_required(ui, &diagnostics);

        let rendered = match self.args.format {
            OutputFormat::Yaml => {
                serde_yaml::to_string(&resolved).context("failed to render variables")?
            }
            OutputFormat::Json => {
                serde_json::to_string_pretty(&resolved).context("failed to render variables")?
            }
        };
        ui.output(&rendered);
        Ok(CommandResult::success())
    }
}
