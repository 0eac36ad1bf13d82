//! Command dispatching.
//!
//! - [`Command`] trait for implementing commands
//! - [`CommandResult`] for uniform result reporting
//! - [`CommandContext`] for everything a command reads from its environment
//! - [`CommandDispatcher`] for routing CLI subcommands

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::cache::RegistryCache;
use crate::cli::args::{Cli, Commands};
use crate::config::Config;
use crate::diagnostics::{Diagnostic, DiagnosticKind, Diagnostics, HumanFormatter, OutputContext};
use crate::error::{PackError, Result};
use crate::registry::{GitRegistry, ReferenceResolver, Registries, RegistrySource};
use crate::ui::{OutputMode, UserInterface};

/// Trait for command implementations.
pub trait Command {
    /// Execute the command.
    fn execute(&self, ui: &mut dyn UserInterface) -> Result<CommandResult>;
}

/// Result of command execution.
#[derive(Debug)]
pub struct CommandResult {
    /// Whether the command succeeded.
    pub success: bool,

    /// Exit code to use (0 for success, non-zero for failure).
    pub exit_code: i32,
}

impl CommandResult {
    pub fn success() -> Self {
        Self {
            success: true,
            exit_code: 0,
        }
    }

    pub fn failure(exit_code: i32) -> Self {
        Self {
            success: false,
            exit_code,
        }
    }
}

/// Configuration and process environment shared by every command.
///
/// Built once in `main`, so commands never read globals themselves.
#[derive(Clone)]
pub struct CommandContext {
    pub config: Config,
    pub cache_dir: PathBuf,
    /// Environment variables, for `PACKWRIGHT_VAR_*` overrides.
    pub env: BTreeMap<String, String>,
    remote: Arc<dyn RegistrySource>,
}

impl CommandContext {
    pub fn new(config: Config, cache_dir: impl Into<PathBuf>) -> Self {
        let remote = Arc::new(GitRegistry::new(config.fetch_timeout()));
        Self {
            config,
            cache_dir: cache_dir.into(),
            env: BTreeMap::new(),
            remote,
        }
    }

    pub fn with_env<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env = vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        self
    }

    /// Replace the remote registry access (used by tests).
    pub fn with_remote(mut self, remote: Arc<dyn RegistrySource>) -> Self {
        self.remote = remote;
        self
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// A registry cache over the configured registries.
    pub fn cache(&self) -> RegistryCache {
        let resolver = ReferenceResolver::new(
            Registries::from_config(&self.config.registries),
            Arc::clone(&self.remote),
        );
        RegistryCache::new(&self.cache_dir, resolver)
    }
}

/// Render diagnostics for the user.
///
/// Quiet mode shows errors only, and nothing at all when there are none.
pub fn report_diagnostics(ui: &mut dyn UserInterface, diagnostics: &Diagnostics) {
    let quiet = ui.output_mode() == OutputMode::Quiet;
    if diagnostics.is_empty() || (quiet && !diagnostics.has_errors()) {
        return;
    }
    let ctx = OutputContext::plain()
        .with_color(ui.use_color())
        .with_errors_only(quiet);
    let mut rendered = Vec::new();
    if HumanFormatter::new(ctx)
        .format(diagnostics, &mut rendered)
        .is_err()
    {
        ui.error(&diagnostics.error());
        return;
    }
    ui.diagnostics(&String::from_utf8_lossy(&rendered));
}

/// Summarize required variables left out under `--ignore-missing-vars`.
pub fn warn_unset_required(ui: &mut dyn UserInterface, diagnostics: &Diagnostics) {
    let unset = diagnostics.of_kind(DiagnosticKind::MissingRequired).count();
    if unset > 0 {
        ui.warning(&format!("{} required variable(s) left unset", unset));
    }
}

/// Report a fatal error as a diagnostic and return a failed result.
pub fn fail_with(ui: &mut dyn UserInterface, err: &PackError) -> CommandResult {
    let mut diagnostics = Diagnostics::new();
    diagnostics.add(Diagnostic::from(err));
    report_diagnostics(ui, &diagnostics);
    CommandResult::failure(1)
}

/// Dispatches CLI commands to their implementations.
pub struct CommandDispatcher {
    context: CommandContext,
}

impl CommandDispatcher {
    pub fn new(context: CommandContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &CommandContext {
        &self.context
    }

    /// Dispatch and execute a command.
    pub fn dispatch(&self, cli: &Cli, ui: &mut dyn UserInterface) -> Result<CommandResult> {
        match &cli.command {
            Commands::Info(args) => {
                super::info::InfoCommand::new(&self.context, args.clone()).execute(ui)
            }
            Commands::Vars(args) => {
                super::vars::VarsCommand::new(&self.context, args.clone()).execute(ui)
            }
            Commands::Registry(args) => {
                super::registry::RegistryCommand::new(&self.context, args.clone()).execute(ui)
            }
        }
    }
}
