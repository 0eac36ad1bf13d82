//! packwright CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use packwright::cli::{Cli, CommandContext, CommandDispatcher};
use packwright::config::{load_config, resolve_cache_dir};
use packwright::ui::{create_ui, OutputMode};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the tracing subscriber for logging.
///
/// Log level is controlled by:
/// 1. `--debug` flag sets level to DEBUG
/// 2. `RUST_LOG` environment variable (if set)
/// 3. Default is INFO, or WARN with `--quiet`
fn init_tracing(debug: bool, quiet: bool) {
    let default = if quiet { "packwright=warn" } else { "packwright=info" };
    let filter = if debug {
        EnvFilter::new("packwright=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug, cli.quiet);

    tracing::debug!("packwright starting with args: {:?}", cli);

    let output_mode = if cli.quiet {
        OutputMode::Quiet
    } else {
        OutputMode::Normal
    };
    let mut ui = create_ui(output_mode, cli.no_color);

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            ui.error(&format!("Error: {}", e));
            return ExitCode::from(1);
        }
    };
    let cache_dir = resolve_cache_dir(cli.cache_dir.as_deref(), &config);
    let context = CommandContext::new(config, cache_dir).with_env(std::env::vars());

    let dispatcher = CommandDispatcher::new(context);
    match dispatcher.dispatch(&cli, ui.as_mut()) {
        Ok(result) => ExitCode::from(result.exit_code as u8),
        Err(e) => {
            ui.error(&format!("Error: {}", e));
            ExitCode::from(1)
        }
    }
}
