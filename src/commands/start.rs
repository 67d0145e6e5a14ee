use super::print_assignment;
use crate::output::UserOutput;
use devctl::orchestrator::{PortCoordinator, Supervisor, SupervisorSettings};
use devctl::service::{OutputSink, ServiceKind};
use devctl::{platform, Config};
use tokio_util::sync::CancellationToken;

pub async fn run_start(
    config: &Config,
    no_browser: bool,
    cancel: CancellationToken,
    out: &dyn UserOutput,
) -> anyhow::Result<()> {
    let platform = platform::current();

    out.progress("Resolving ports... ");
    let assignment = match PortCoordinator::new(config, platform.clone()).resolve() {
        Ok(assignment) => assignment,
        Err(e) => {
            out.finish_progress("failed");
            return Err(e.into());
        }
    };
    out.finish_progress("done");
    print_assignment(&assignment, out);
    out.blank();

    let mut settings = SupervisorSettings::from_config(&config.supervisor);
    if config.supervisor.open_browser && !no_browser {
        settings.browser_url = Some(format!("http://localhost:{}", assignment.frontend_port()));
    }

    let backend = config.launch_spec(ServiceKind::Backend, assignment.backend_port());
    let frontend = config.launch_spec(ServiceKind::Frontend, assignment.frontend_port());

    let mut supervisor = Supervisor::new(settings, platform, OutputSink::forward());
    supervisor.start(backend, frontend, &cancel).await?;

    out.success(&format!(
        "Backend on http://localhost:{}, frontend on http://localhost:{}. Press Ctrl-C to stop.",
        assignment.backend_port(),
        assignment.frontend_port()
    ));

    supervisor.supervise(&cancel).await?;
    out.status("All services stopped");

    Ok(())
}
