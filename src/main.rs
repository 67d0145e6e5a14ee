mod cli;
mod commands;
mod output;

use clap::{CommandFactory, Parser};
use cli::{Cli, Commands, PortCommands};
use devctl::{Error as DevError, Parser as ConfigParser};
use output::{CliOutput, QuietOutput, UserOutput};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        if let Some(dev_error) = e.downcast_ref::<DevError>() {
            // Interrupted during startup: children are already cleaned up
            if matches!(dev_error, DevError::Cancelled) {
                std::process::exit(0);
            }

            eprintln!("Error: {}", dev_error.with_suggestion());
        } else {
            eprintln!("Error: {:#}", e);
        }
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing();

    // ── Commands that need no config ──────────────────────────────────
    match &cli.command {
        Some(Commands::Init { output, force }) => {
            return commands::run_init(output, *force, &CliOutput);
        }
        Some(Commands::Validate) => {
            return commands::run_validate(cli.config.clone(), cli.workdir.clone(), &CliOutput);
        }
        Some(Commands::Completions { shell }) => {
            let mut cmd = Cli::command();
            let bin_name = cmd.get_name().to_string();
            clap_complete::generate(*shell, &mut cmd, bin_name, &mut std::io::stdout());
            return Ok(());
        }
        _ => {}
    }

    let config = ConfigParser::new().resolve(cli.config.as_deref(), cli.workdir.as_deref())?;
    tracing::debug!("Project root: {}", config.project_root.display());
    // Reaper patterns reach pgrep unchecked otherwise
    config.validate()?;

    match cli.command.unwrap_or(Commands::Start { no_browser: false }) {
        Commands::Start { no_browser } => {
            let cancel = CancellationToken::new();
            spawn_signal_listener(cancel.clone());
            commands::run_start(&config, no_browser, cancel, &CliOutput).await
        }
        Commands::Stop { scope } => commands::run_stop(scope, &config, &CliOutput).await,
        Commands::Port(port_cmd) => {
            let json = matches!(
                port_cmd,
                PortCommands::Check { json: true } | PortCommands::Resolve { json: true }
            );
            let out: &dyn UserOutput = if json { &QuietOutput } else { &CliOutput };
            commands::run_port(&port_cmd, &config, out).await
        }
        Commands::Init { .. } | Commands::Validate | Commands::Completions { .. } => Ok(()),
    }
}

/// Cancel `cancel` on Ctrl-C, or SIGTERM on Unix.
fn spawn_signal_listener(cancel: CancellationToken) {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => {}
                        _ = sigterm.recv() => {}
                    }
                }
                Err(e) => {
                    tracing::warn!("Cannot listen for SIGTERM: {}", e);
                    let _ = tokio::signal::ctrl_c().await;
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = tokio::signal::ctrl_c().await;
        }

        tracing::info!("Interrupt received");
        cancel.cancel();
    });
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
