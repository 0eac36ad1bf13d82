//! Command-line interface for packwright.
//!
//! - [`args`] - Argument definitions using clap derive macros
//! - [`commands`] - Command implementations

pub mod args;
pub mod commands;

pub use args::{Cli, Commands, InfoArgs, OutputFormat, PackArgs, RegistryArgs, VarsArgs};
pub use commands::{Command, CommandContext, CommandDispatcher, CommandResult};
