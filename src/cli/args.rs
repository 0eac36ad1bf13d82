//! CLI argument definitions.
//!
//! The main entry point is the [`Cli`] struct.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::error::Result;
use crate::registry::PackReference;

/// packwright - resolve packs and their variables.
#[derive(Debug, Parser)]
#[command(name = "packwright")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Extra config file, layered over the user config
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Cache directory for registry packs
    #[arg(long, global = true, env = "PACKWRIGHT_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Minimal output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show a pack's metadata and variables
    Info(InfoArgs),

    /// Resolve a pack's variables
    Vars(VarsArgs),

    /// Inspect registries and cached packs
    Registry(RegistryArgs),
}

/// Which pack to operate on.
#[derive(Debug, Clone, Args)]
pub struct PackArgs {
    /// Pack name
    pub pack: String,

    /// Registry holding the pack
    #[arg(long, conflicts_with = "path")]
    pub registry: Option<String>,

    /// Version ref: tag, branch, commit or "latest"
    #[arg(long = "ref", value_name = "REF", conflicts_with = "path")]
    pub git_ref: Option<String>,

    /// Use a local pack directory instead of a registry
    #[arg(long)]
    pub path: Option<PathBuf>,
}

impl PackArgs {
    pub fn reference(&self) -> Result<PackReference> {
        PackReference::from_parts(
            self.pack.clone(),
            self.registry.as_deref(),
            self.git_ref.as_deref(),
            self.path.as_deref(),
        )
    }
}

/// Arguments for the `info` command.
#[derive(Debug, Clone, Args)]
pub struct InfoArgs {
    #[command(flatten)]
    pub pack: PackArgs,

    /// Report missing required variables as warnings
    #[arg(long)]
    pub ignore_missing_vars: bool,
}

/// Output format for resolved variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
}

/// Arguments for the `vars` command.
#[derive(Debug, Clone, Args)]
pub struct VarsArgs {
    #[command(flatten)]
    pub pack: PackArgs,

    /// Set a variable (repeatable); prefix with a pack path to scope it
    #[arg(long = "var", value_name = "NAME=VALUE")]
    pub vars: Vec<String>,

    /// Load overrides from a file (repeatable); prefix with a pack path to scope it
    #[arg(long = "var-file", value_name = "[PACK=]FILE")]
    pub var_files: Vec<String>,

    /// Report missing required variables as warnings
    #[arg(long)]
    pub ignore_missing_vars: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Yaml)]
    pub format: OutputFormat,
}

/// Arguments for the `registry` command.
#[derive(Debug, Clone, Args)]
pub struct RegistryArgs {
    #[command(subcommand)]
    pub command: RegistrySubcommand,
}

/// Registry subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum RegistrySubcommand {
    /// List configured registries and cached packs
    List,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_vars_command() {
        let cli = Cli::try_parse_from([
            "packwright",
            "vars",
            "web",
            "--ref",
            "v1.0.0",
            "--var",
            "port=80",
            "--var",
            "cache.port=6380",
            "--var-file",
            "cache=cache.yaml",
            "--format",
            "json",
            "--ignore-missing-vars",
        ])
        .unwrap();
        let Commands::Vars(args) = cli.command else {
            panic!("expected vars");
        };
        assert_eq!(args.pack.pack, "web");
        assert_eq!(args.pack.git_ref.as_deref(), Some("v1.0.0"));
        assert_eq!(args.vars, vec!["port=80", "cache.port=6380"]);
        assert_eq!(args.var_files, vec!["cache=cache.yaml"]);
        assert_eq!(args.format, OutputFormat::Json);
        assert!(args.ignore_missing_vars);
    }

    #[test]
    fn path_conflicts_with_ref() {
        let result = Cli::try_parse_from(["packwright", "info", "web", "--path", ".", "--ref", "v1"]);
        assert!(result.is_err());
    }

    #[test]
    fn info_accepts_ignore_missing_vars() {
        let cli = Cli::try_parse_from(["packwright", "info", "web", "--ignore-missing-vars"]).unwrap();
        let Commands::Info(args) = cli.command else {
            panic!("expected info");
        };
        assert!(args.ignore_missing_vars);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["packwright", "registry", "list", "--quiet", "--debug"]).unwrap();
        assert!(cli.quiet);
        assert!(cli.debug);
    }

    #[test]
    fn pack_args_build_reference() {
        let args = PackArgs {
            pack: "web".into(),
            registry: Some("internal".into()),
            git_ref: None,
            path: None,
        };
        let reference = args.reference().unwrap();
        assert_eq!(reference.registry_name(), Some("internal"));
        assert!(reference.is_latest());
    }
}
