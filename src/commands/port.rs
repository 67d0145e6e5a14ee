use super::{print_assignment, print_reap_outcomes};
use crate::cli::PortCommands;
use crate::output::UserOutput;
use devctl::orchestrator::{PortCoordinator, Reaper};
use devctl::port::PortStatus;
use devctl::service::ServiceKind;
use devctl::{platform, Config};
use serde::Serialize;

#[derive(Serialize)]
struct PortCheckReport {
    backend: PortStatus,
    frontend: PortStatus,
}

pub async fn run_port(cmd: &PortCommands, config: &Config, out: &dyn UserOutput) -> anyhow::Result<()> {
    let platform = platform::current();

    match cmd {
        PortCommands::Check { json } => {
            let report = PortCheckReport {
                backend: PortStatus::check(platform.as_ref(), config.backend.port),
                frontend: PortStatus::check(platform.as_ref(), config.frontend.port),
            };

            if *json {
                println!("{}", serde_json::to_string_pretty(&report)?);
                return Ok(());
            }

            for (kind, status) in [
                (ServiceKind::Backend, &report.backend),
                (ServiceKind::Frontend, &report.frontend),
            ] {
                let line = if !status.in_use {
                    "free".to_string()
                } else if status.processes.is_empty() {
                    "in use".to_string()
                } else {
                    let holders: Vec<String> = status
                        .processes
                        .iter()
                        .map(|p| format!("{} (PID {})", p.name, p.pid))
                        .collect();
                    format!("in use by {}", holders.join(", "))
                };
                out.status(&format!("  {:<9} {:>5}  {}", kind, status.port, line));
            }
        }
        PortCommands::Resolve { json } => {
            let assignment = PortCoordinator::new(config, platform).resolve()?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&assignment)?);
            } else {
                print_assignment(&assignment, out);
            }
        }
        PortCommands::Clean => {
            let reaper = Reaper::new(platform, &config.reaper);
            let outcomes = vec![
                reaper.kill_process_on_port(config.backend.port).await,
                reaper.kill_process_on_port(config.frontend.port).await,
            ];
            print_reap_outcomes(&outcomes, out);
        }
        PortCommands::Kill { port: None } => {
            out.status("Usage: devctl port kill <PORT>");
        }
        PortCommands::Kill { port: Some(port) } => {
            let reaper = Reaper::new(platform, &config.reaper);
            let outcome = reaper.kill_process_on_port(*port).await;
            print_reap_outcomes(std::slice::from_ref(&outcome), out);
        }
    }

    Ok(())
}
