use super::print_reap_outcomes;
use crate::cli::StopScope;
use crate::output::UserOutput;
use devctl::orchestrator::Reaper;
use devctl::{platform, Config};

pub async fn run_stop(
    scope: Option<StopScope>,
    config: &Config,
    out: &dyn UserOutput,
) -> anyhow::Result<()> {
    let reaper = Reaper::new(platform::current(), &config.reaper);
    let reaper_config = &config.reaper;
    let sweep_ports = matches!(scope, None | Some(StopScope::Ports) | Some(StopScope::Force));
    let project = matches!(scope, None | Some(StopScope::Force));
    let node = matches!(scope, Some(StopScope::Node) | Some(StopScope::Force));
    let java = matches!(scope, Some(StopScope::Java) | Some(StopScope::Force));

    let mut outcomes = Vec::new();

    if sweep_ports {
        out.status("Freeing dev ports...");
        outcomes.extend(reaper.sweep_known_dev_ports(&config.known_dev_ports()).await);
    }
    if project {
        out.status("Stopping project processes...");
        outcomes.extend(reaper.kill_patterns(&reaper_config.project_patterns).await);
    }
    if node {
        out.status(&format!("Stopping every '{}' process...", reaper_config.node_pattern));
        outcomes.push(reaper.kill_processes_by_pattern(&reaper_config.node_pattern).await);
    }
    if java {
        out.status(&format!("Stopping every '{}' process...", reaper_config.java_pattern));
        outcomes.push(reaper.kill_processes_by_pattern(&reaper_config.java_pattern).await);
    }

    let stopped = print_reap_outcomes(&outcomes, out);
    out.blank();
    if stopped == 0 {
        out.success("Nothing to stop");
    } else {
        out.success(&format!("Stopped {} process(es)", stopped));
    }

    Ok(())
}
