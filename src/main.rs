//! Provision CLI entry point.

use std::process::ExitCode;

use clap::Parser;
use provision::cli::{Cli, CommandDispatcher};
use provision::config::resolve_config_path;
use provision::error::ErrorKind;
use provision::runner::CancellationToken;
use provision::shell::is_ci;
use provision::ui::{create_ui, OutputMode};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the tracing subscriber for logging.
///
/// Log level is controlled by:
/// 1. `--debug` flag sets level to DEBUG
/// 2. `RUST_LOG` environment variable (if set)
/// 3. Default is INFO
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("provision=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("provision=info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    tracing::debug!("Provision starting with args: {:?}", cli);

    let output_mode = OutputMode::from_flags(cli.verbose, cli.quiet);
    let is_interactive = !cli.non_interactive && !is_ci();
    let mut ui = create_ui(is_interactive, output_mode, cli.no_color);

    let cancel = CancellationToken::new();
    let handler_token = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || handler_token.cancel()) {
        tracing::warn!("Could not install Ctrl-C handler: {}", e);
    }

    let root = std::env::current_dir().unwrap_or_default();
    let config_path = resolve_config_path(cli.config.as_deref(), &root);
    let dispatcher = CommandDispatcher::new(config_path).with_cancellation(cancel);

    match dispatcher.dispatch(&cli, ui.as_mut()) {
        Ok(result) => ExitCode::from(result.exit_code.clamp(0, 255) as u8),
        Err(e) => {
            ui.error(&format!("Error: {}", e));
            let code = match e.kind() {
                ErrorKind::Configuration => 2,
                ErrorKind::Cancelled => 130,
                _ => 1,
            };
            ExitCode::from(code)
        }
    }
}
