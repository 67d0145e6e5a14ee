use crate::output::UserOutput;
use devctl::config::format_duration;
use devctl::service::ServiceKind;
use devctl::Parser as ConfigParser;
use std::path::{Path, PathBuf};

pub fn run_validate(
    config_path: Option<PathBuf>,
    workdir: Option<PathBuf>,
    out: &dyn UserOutput,
) -> anyhow::Result<()> {
    let start_dir = match &workdir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()?,
    };
    let source = config_path.or_else(|| ConfigParser::find_config_in_dir(&start_dir).ok());

    match &source {
        Some(path) => out.status(&format!("Validating {}...", path.display())),
        None => out.status(&format!(
            "No devctl.yaml found from {}; validating built-in defaults...",
            start_dir.display()
        )),
    }

    let config = match ConfigParser::new().resolve(source.as_deref(), workdir.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            out.error("Configuration failed to load");
            return Err(e.into());
        }
    };

    config.validate()?;

    out.success("Configuration is valid\n");
    out.status(&format!("Project root: {}", config.project_root.display()));

    for kind in [ServiceKind::Backend, ServiceKind::Frontend] {
        let svc = config.service(kind);
        let spec = config.launch_spec(kind, svc.port);
        out.blank();
        out.status(&format!("{}:", kind));
        out.status(&format!(
            "  ports:   {} (fallbacks: {})",
            svc.port,
            svc.fallback_ports
                .iter()
                .map(|p| p.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ));
        out.status(&format!("  command: {}", spec.display_command()));
        out.status(&format!("  cwd:     {}", spec.working_dir.display()));
        if !spec.working_dir.is_dir() {
            out.warning("  Warning: working directory does not exist");
        }
        if let Some(path) = config.config_file_path(kind) {
            out.status(&format!("  config:  {}", path.display()));
            warn_if_missing(&path, out);
        }
        if let Some(marker) = &svc.ready_marker {
            out.status(&format!("  ready:   output contains \"{}\"", marker));
        }
    }

    let sup = &config.supervisor;
    out.blank();
    out.status(&format!(
        "Supervisor: ready_timeout {}, grace_period {}, frontend_grace {}, kill_timeout {}",
        format_duration(sup.ready_timeout),
        format_duration(sup.grace_period),
        format_duration(sup.frontend_grace),
        format_duration(sup.kill_timeout)
    ));

    Ok(())
}

fn warn_if_missing(path: &Path, out: &dyn UserOutput) {
    if !path.is_file() {
        out.warning("  Warning: config file does not exist; port changes cannot be written to it");
    }
}
