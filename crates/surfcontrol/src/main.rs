mod cli;
mod commands;
mod error;
mod output;

use std::path::Path;

use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use surfcontrol_config::{Config, ConfigError, Logging};
use surfcontrol_core::Controller;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Config is loaded up front so the logging section applies; errors
    // surface only for commands that need it.
    let config_path = surfcontrol_config::config_path(cli.global.config.as_deref());
    let loaded = surfcontrol_config::load_config(&config_path);
    let logging = loaded
        .as_ref()
        .map(|c| c.logging.clone())
        .unwrap_or_default();
    let daemon = matches!(cli.command, Command::Run);
    let guard = init_tracing(cli.global.verbose, daemon, &logging);

    // Dispatch and handle errors with proper exit codes
    if let Err(err) = run(cli, &config_path, loaded).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        drop(guard);
        std::process::exit(code);
    }
}

/// `-v` flags win over the configured level; one-shot commands default to
/// warnings only. `RUST_LOG` overrides both.
fn init_tracing(verbosity: u8, daemon: bool, logging: &Logging) -> Option<WorkerGuard> {
    let level = match verbosity {
        0 if daemon => logging.level.as_str(),
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let (writer, guard) = match &logging.file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .map_or_else(|| "surfcontrol.log".into(), |n| n.to_os_string());
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            (BoxMakeWriter::new(writer), Some(guard))
        }
        None => (BoxMakeWriter::new(std::io::stderr), None),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(logging.file.is_none())
        .with_writer(writer);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
    guard
}

async fn run(
    cli: Cli,
    config_path: &Path,
    loaded: Result<Config, ConfigError>,
) -> Result<(), CliError> {
    match cli.command {
        // Config commands report load errors themselves
        Command::Config(args) => commands::config_cmd::handle(&args, config_path, loaded, &cli.global),

        // Shell completions generation
        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "surfcontrol", &mut std::io::stdout());
            Ok(())
        }

        // Validation never touches the host
        Command::Validate(args) => commands::intent::validate(&args, &cli.global),

        Command::Render(args) => {
            let config = loaded?.to_daemon_config()?;
            commands::intent::render(&args, &config.deploy.generator, &cli.global)
        }

        // Everything else drives a controller
        cmd => {
            let config = loaded?.to_daemon_config()?;
            let controller = Controller::new(config);

            tracing::debug!(command = ?cmd, config = %config_path.display(), "dispatching command");
            commands::dispatch(cmd, &controller, &cli.global).await
        }
    }
}
