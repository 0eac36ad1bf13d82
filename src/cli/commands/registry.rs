//! `packwright registry`: inspect registries and the pack cache.

use std::fmt::Write as _;

use crate::cli::args::{RegistryArgs, RegistrySubcommand};
use crate::error::Result;
use crate::ui::UserInterface;

use super::dispatcher::{fail_with, Command, CommandContext, CommandResult};

/// The registry command implementation.
pub struct RegistryCommand<'a> {
    context: &'a CommandContext,
    args: RegistryArgs,
}

impl<'a> RegistryCommand<'a> {
    pub fn new(context: &'a CommandContext, args: RegistryArgs) -> Self {
        Self { context, args }
    }

    fn list(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        let registries = &self.context.config.registries;
        let cache = self.context.cache();
        let cached = match cache.list() {
            Ok(cached) => cached,
            Err(e) => return Ok(fail_with(ui, &e)),
        };

        if registries.is_empty() && cached.is_empty() {
            ui.message("No registries configured and no packs cached");
            return Ok(CommandResult::success());
        }

        let mut out = String::new();
        if !registries.is_empty() {
            let _ = writeln!(out, "Registries:");
            for (name, registry) in registries {
                let _ = writeln!(out, "  {}  {} ({})", name, registry.url, registry.packs_dir);
            }
        }
        if !cached.is_empty() {
            if !out.is_empty() {
                let _ = writeln!(out);
            }
            let _ = writeln!(out, "Cached packs in {}:", cache.root().display());
            for (registry, pack) in cached {
                let _ = writeln!(out, "  {}/{}", registry, pack);
            }
        }
        ui.output(&out);
        Ok(CommandResult::success())
    }
}

impl Command for RegistryCommand<'_> {
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        match self.args.command {
            RegistrySubcommand::List => self.list(ui),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::registry::RegistryConfig;
    use crate::ui::MockUI;
    use std::fs;
    use tempfile::TempDir;

    fn list_args() -> RegistryArgs {
        RegistryArgs {
            command: RegistrySubcommand::List,
        }
    }

    #[test]
    fn empty_setup() {
        let temp = TempDir::new().unwrap();
        let ctx = CommandContext::new(Config::default(), temp.path().join("cache"));
        let mut ui = MockUI::new();
        let result = RegistryCommand::new(&ctx, list_args()).execute(&mut ui).unwrap();
        assert!(result.success);
        assert_eq!(ui.messages(), ["No registries configured and no packs cached"]);
    }

    #[test]
    fn lists_registries_and_cached_packs() {
        let temp = TempDir::new().unwrap();
        let cache_dir = temp.path().join("cache");
        fs::create_dir_all(cache_dir.join("default").join("redis").join("v1.0.0")).unwrap();
        fs::create_dir_all(cache_dir.join(".staging")).unwrap();

        let mut config = Config::default();
        config.registries.insert(
            "default".into(),
            RegistryConfig {
                url: "https://example.com/packs.git".into(),
                packs_dir: "packs".into(),
            },
        );
        let ctx = CommandContext::new(config, &cache_dir);
        let mut ui = MockUI::new();
        RegistryCommand::new(&ctx, list_args()).execute(&mut ui).unwrap();

        let out = &ui.outputs()[0];
        assert!(out.contains("default  https://example.com/packs.git (packs)"));
        assert!(out.contains("  default/redis"));
        assert!(!out.contains(".staging"));
    }
}
