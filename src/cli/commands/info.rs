//! `packwright info`: describe a pack and the variables it declares.

use std::fmt::Write as _;

use tracing::debug;

use crate::cli::args::InfoArgs;
use crate::error::Result;
use crate::pack::{Pack, PackLoader, VariableSpec};
use crate::ui::UserInterface;
use crate::variables::{Resolver, ResolverConfig};

use super::dispatcher::{
    fail_with, report_diagnostics, warn_unset_required, Command, CommandContext, CommandResult,
};

/// The info command implementation.
pub struct InfoCommand<'a> {
    context: &'a CommandContext,
    args: InfoArgs,
}

impl<'a> InfoCommand<'a> {
    pub fn new(context: &'a CommandContext, args: InfoArgs) -> Self {
        Self { context, args }
    }
}

impl Command for InfoCommand<'_> {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let reference = match self.args.pack.reference() {
            Ok(reference) => reference,
            Err(e) => return Ok(fail_with(ui, &e)),
        };
        let cache = self.context.cache();

        if let Err(e) = cache.check(&reference) {
            return Ok(fail_with(ui, &e));
        }
        debug!(%reference, "Pack verified");

        let loaded = PackLoader::new(&cache)
            .with_workers(self.context.config.workers)
            .load(&reference);
        let pack = match loaded {
            Ok(pack) => pack,
            Err(e) => return Ok(fail_with(ui, &e)),
        };

        // Defaults and declaration files must hold up before the pack is described.
        let config = ResolverConfig::new(&pack).ignore_missing_vars(self.args.ignore_missing_vars);
        let (_, diagnostics) = Resolver::new(config).resolve();
        report_diagnostics(ui, &diagnostics);
        if diagnostics.has_errors() {
            return Ok(CommandResult::failure(1));
        }
        warn_unset_required(ui, &diagnostics);

        ui.output(&render_info(&pack));
        Ok(CommandResult::success())
    }
}

/// Render the pack description followed by each pack's variables.
pub fn render_info(root: &Pack) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Pack Name          {}", root.name());
    if let Some(description) = root.metadata.pack.description.as_deref() {
        let _ = writeln!(out, "Description        {}", description);
    }
    if let Some(url) = root.metadata.app.url.as_deref() {
        let _ = writeln!(out, "Application URL    {}", url);
    }
    if let Some(version) = root.metadata.pack.version.as_deref() {
        let _ = writeln!(out, "Version            {}", version);
    }

    for pack in root.walk() {
        if pack.variable_specs.is_empty() {
            continue;
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "Pack \"{}\" Variables:", pack.path);
        for spec in ordered_specs(&pack.variable_specs) {
            let _ = writeln!(out, "  - {}", describe(spec));
        }
    }

    let files = root.root_variable_files();
    if !files.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Variable Files:");
        for (path, file) in files {
            let _ = writeln!(out, "  {}: {}", path, file.display());
        }
    }
    out
}

/// Required variables first, then declaration order.
fn ordered_specs(specs: &[VariableSpec]) -> Vec<&VariableSpec> {
    let mut ordered: Vec<&VariableSpec> = specs.iter().collect();
    ordered.sort_by_key(|s| !s.is_required());
    ordered
}

fn describe(spec: &VariableSpec) -> String {
    let type_name = spec
        .effective_type()
        .map(|t| t.friendly_name())
        .unwrap_or_else(|| "unknown".to_string());
    let requirement = if spec.is_required() {
        "required"
    } else {
        "optional"
    };
    let mut line = format!("\"{}\" ({}: {})", spec.name, type_name, requirement);
    if !spec.description.is_empty() {
        line.push_str(" - ");
        line.push_str(&spec.description);
    }
    line
}
