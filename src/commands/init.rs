use crate::output::UserOutput;
use std::path::Path;

const TEMPLATE: &str = r#"# devctl configuration
# Every key is optional; the values below are the defaults.

backend:
  port: 8081
  fallback_ports: [8082, 8083, 8084]
  cwd: backend
  command: mvn spring-boot:run
  # Rewritten when the backend has to move to a fallback port
  config_file: backend/src/main/resources/application.yml
  # Printed once the embedded server is listening.
  # Set to "" to wait for the port to accept connections instead.
  ready_marker: "Tomcat started on port"

frontend:
  port: 5173
  fallback_ports: [5174, 5175, 5176]
  cwd: frontend
  command: npm run dev
  # Its dev-server port and proxy target follow the resolved ports
  config_file: frontend/vite.config.js

supervisor:
  grace_period: 5s      # SIGTERM -> SIGKILL escalation
  ready_timeout: 120s   # give up if the backend is not ready by then
  frontend_grace: 3s    # time the frontend gets to bind before we call it up
  kill_timeout: 2s
  open_browser: true

reaper:
  sweep_pause: 500ms
  project_patterns: ["spring-boot:run", "vite"]
  node_pattern: node    # devctl stop node
  java_pattern: java    # devctl stop java
"#;

pub fn run_init(output: &Path, force: bool, out: &dyn UserOutput) -> anyhow::Result<()> {
    // Check if file exists and force flag not set
    if output.exists() && !force {
        out.error(&format!("Error: {} already exists", output.display()));
        out.error("Use --force to overwrite");
        return Err(anyhow::anyhow!("File already exists"));
    }

    std::fs::write(output, TEMPLATE)?;
    out.success(&format!("Created {}", output.display()));
    out.status("\nNext steps:");
    out.status(&format!(
        "  1. Edit {} to match your project layout",
        output.display()
    ));
    out.status("  2. Run: devctl validate");
    out.status("  3. Run: devctl start");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use devctl::Parser;

    #[test]
    fn template_parses_to_defaults() {
        let config = Parser::new().parse_config(TEMPLATE, "/proj").unwrap();
        let defaults = devctl::Config::defaults("/proj");
        assert_eq!(config.backend.port, defaults.backend.port);
        assert_eq!(config.frontend.fallback_ports, defaults.frontend.fallback_ports);
        assert_eq!(config.supervisor, defaults.supervisor);
        assert_eq!(config.reaper, defaults.reaper);
        config.validate().unwrap();
    }
}
