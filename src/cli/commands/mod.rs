//! CLI command implementations.
//!
//! Each command implements the [`Command`] trait, which provides a uniform
//! interface for executing commands and reporting results.
//!
//! # Architecture
//!
//! Commands are dispatched via [`CommandDispatcher`], which routes CLI
//! subcommands to their implementations. Commands never fail on a user
//! error: problems are rendered as diagnostics and turned into a non-zero
//! [`CommandResult`]. An `Err` is reserved for failures writing output.

pub mod dispatcher;
pub mod info;
pub mod registry;
pub mod vars;

pub use dispatcher::{Command, CommandContext, CommandDispatcher, CommandResult};
pub use info::InfoCommand;
pub use registry::RegistryCommand;
pub use vars::VarsCommand;
