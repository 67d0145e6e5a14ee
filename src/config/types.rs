//! Core configuration types.
//!
//! [`Config`] is the resolved, fully-defaulted configuration. It is built from
//! [`ConfigFile`], the raw shape of `devctl.yaml`, in which every field is
//! optional so a project only writes down what differs from the defaults.

use super::duration::duration_str;
use crate::port::PortSpec;
use crate::service::{LaunchSpec, Readiness, ServiceKind};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BACKEND_PORT: u16 = 8081;
pub const DEFAULT_BACKEND_FALLBACKS: [u16; 3] = [8082, 8083, 8084];
pub const DEFAULT_FRONTEND_PORT: u16 = 5173;
pub const DEFAULT_FRONTEND_FALLBACKS: [u16; 3] = [5174, 5175, 5176];

/// Printed by Spring Boot once the embedded server has bound its port.
pub const DEFAULT_BACKEND_READY_MARKER: &str = "Tomcat started on port";

#[cfg(windows)]
const MAVEN: &str = "mvn.cmd";
#[cfg(not(windows))]
const MAVEN: &str = "mvn";

#[cfg(windows)]
const NPM: &str = "npm.cmd";
#[cfg(not(windows))]
const NPM: &str = "npm";

/// A launch command written either as a list or as one whitespace-separated string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum CommandLine {
    Args(Vec<String>),
    Line(String),
}

impl CommandLine {
    pub fn into_args(self) -> Vec<String> {
        match self {
            CommandLine::Args(args) => args,
            CommandLine::Line(line) => line.split_whitespace().map(str::to_string).collect(),
        }
    }
}

/// Raw per-service section of `devctl.yaml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceSection {
    pub port: Option<u16>,
    pub fallback_ports: Option<Vec<u16>>,
    pub cwd: Option<PathBuf>,
    pub command: Option<CommandLine>,
    pub config_file: Option<PathBuf>,
    /// Empty string disables the marker (backend readiness falls back to the port).
    pub ready_marker: Option<String>,
}

/// Root structure of `devctl.yaml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    #[serde(default)]
    pub backend: ServiceSection,
    #[serde(default)]
    pub frontend: ServiceSection,
    #[serde(default)]
    pub supervisor: SupervisorConfig,
    #[serde(default)]
    pub reaper: ReaperConfig,
}

/// Resolved settings for one service.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ServiceConfig {
    pub port: u16,
    pub fallback_ports: Vec<u16>,
    pub cwd: PathBuf,
    pub command: Vec<String>,
    pub config_file: Option<PathBuf>,
    pub ready_marker: Option<String>,
}

impl ServiceConfig {
    /// Built-in defaults for a React/Vite frontend against a Spring Boot backend.
    pub fn defaults(kind: ServiceKind) -> Self {
        match kind {
            ServiceKind::Backend => Self {
                port: DEFAULT_BACKEND_PORT,
                fallback_ports: DEFAULT_BACKEND_FALLBACKS.to_vec(),
                cwd: PathBuf::from("backend"),
                command: vec![MAVEN.to_string(), "spring-boot:run".to_string()],
                config_file: Some(PathBuf::from(
                    "backend/src/main/resources/application.yml",
                )),
                ready_marker: Some(DEFAULT_BACKEND_READY_MARKER.to_string()),
            },
            ServiceKind::Frontend => Self {
                port: DEFAULT_FRONTEND_PORT,
                fallback_ports: DEFAULT_FRONTEND_FALLBACKS.to_vec(),
                cwd: PathBuf::from("frontend"),
                command: vec![NPM.to_string(), "run".to_string(), "dev".to_string()],
                config_file: Some(PathBuf::from("frontend/vite.config.js")),
                ready_marker: None,
            },
        }
    }

    fn merged(kind: ServiceKind, section: ServiceSection) -> Self {
        let mut cfg = Self::defaults(kind);
        if let Some(port) = section.port {
            cfg.port = port;
        }
        if let Some(fallbacks) = section.fallback_ports {
            cfg.fallback_ports = fallbacks;
        }
        if let Some(cwd) = section.cwd {
            cfg.cwd = cwd;
        }
        if let Some(command) = section.command {
            cfg.command = command.into_args();
        }
        if let Some(config_file) = section.config_file {
            cfg.config_file = Some(config_file);
        }
        if let Some(marker) = section.ready_marker {
            cfg.ready_marker = if marker.is_empty() { None } else { Some(marker) };
        }
        cfg
    }

    /// Preferred port followed by fallbacks, in probe order.
    pub fn candidate_ports(&self) -> Vec<u16> {
        std::iter::once(self.port)
            .chain(self.fallback_ports.iter().copied())
            .collect()
    }
}

fn default_grace_period() -> Duration {
    Duration::from_secs(5)
}

fn default_ready_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_frontend_grace() -> Duration {
    Duration::from_secs(3)
}

fn default_kill_timeout() -> Duration {
    Duration::from_secs(2)
}

fn default_true() -> bool {
    true
}

/// Timing and side effects of a development session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SupervisorConfig {
    /// Time between the graceful and the forced termination signal.
    #[serde(default = "default_grace_period", with = "duration_str")]
    pub grace_period: Duration,
    /// Bound on waiting for the backend readiness signal.
    #[serde(default = "default_ready_timeout", with = "duration_str")]
    pub ready_timeout: Duration,
    /// Delay after spawning the frontend before the session counts as up.
    #[serde(default = "default_frontend_grace", with = "duration_str")]
    pub frontend_grace: Duration,
    /// How long to wait for a force-killed child to be reaped.
    #[serde(default = "default_kill_timeout", with = "duration_str")]
    pub kill_timeout: Duration,
    #[serde(default = "default_true")]
    pub open_browser: bool,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            grace_period: default_grace_period(),
            ready_timeout: default_ready_timeout(),
            frontend_grace: default_frontend_grace(),
            kill_timeout: default_kill_timeout(),
            open_browser: true,
        }
    }
}

fn default_sweep_pause() -> Duration {
    Duration::from_millis(500)
}

fn default_project_patterns() -> Vec<String> {
    vec!["spring-boot:run".to_string(), "vite".to_string()]
}

fn default_node_pattern() -> String {
    "node".to_string()
}

fn default_java_pattern() -> String {
    "java".to_string()
}

/// Cleanup targets for `devctl stop`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ReaperConfig {
    /// Pause between ports during a sweep so the OS can release each socket.
    #[serde(default = "default_sweep_pause", with = "duration_str")]
    pub sweep_pause: Duration,
    /// Command-line patterns identifying this project's dev processes.
    #[serde(default = "default_project_patterns")]
    pub project_patterns: Vec<String>,
    #[serde(default = "default_node_pattern")]
    pub node_pattern: String,
    #[serde(default = "default_java_pattern")]
    pub java_pattern: String,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            sweep_pause: default_sweep_pause(),
            project_patterns: default_project_patterns(),
            node_pattern: default_node_pattern(),
            java_pattern: default_java_pattern(),
        }
    }
}

/// Fully resolved configuration for one project.
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Directory relative paths are resolved against.
    pub project_root: PathBuf,
    pub backend: ServiceConfig,
    pub frontend: ServiceConfig,
    pub supervisor: SupervisorConfig,
    pub reaper: ReaperConfig,
}

impl Config {
    /// Built-in defaults rooted at `project_root`.
    pub fn defaults(project_root: impl Into<PathBuf>) -> Self {
        Self::from_file(ConfigFile::default(), project_root)
    }

    pub fn from_file(file: ConfigFile, project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            backend: ServiceConfig::merged(ServiceKind::Backend, file.backend),
            frontend: ServiceConfig::merged(ServiceKind::Frontend, file.frontend),
            supervisor: file.supervisor,
            reaper: file.reaper,
        }
    }

    pub fn service(&self, kind: ServiceKind) -> &ServiceConfig {
        match kind {
            ServiceKind::Backend => &self.backend,
            ServiceKind::Frontend => &self.frontend,
        }
    }

    pub fn port_spec(&self, kind: ServiceKind) -> PortSpec {
        let svc = self.service(kind);
        PortSpec {
            service: kind,
            preferred_port: svc.port,
            fallback_ports: svc.fallback_ports.clone(),
        }
    }

    /// Absolute path of the service's config file, if it has one.
    pub fn config_file_path(&self, kind: ServiceKind) -> Option<PathBuf> {
        self.service(kind)
            .config_file
            .as_deref()
            .map(|p| self.resolve_path(p))
    }

    /// What the supervisor should run for `kind` once it listens on `port`.
    pub fn launch_spec(&self, kind: ServiceKind, port: u16) -> LaunchSpec {
        let svc = self.service(kind);
        let readiness = match kind {
            ServiceKind::Backend => match &svc.ready_marker {
                Some(marker) => Readiness::LogMarker(marker.clone()),
                None => Readiness::PortReachable(port),
            },
            ServiceKind::Frontend => Readiness::Grace(self.supervisor.frontend_grace),
        };
        LaunchSpec {
            service: kind,
            working_dir: self.resolve_path(&svc.cwd),
            command: svc.command.clone(),
            readiness,
        }
    }

    /// Every port this project may bind: backend candidates, then frontend candidates.
    pub fn known_dev_ports(&self) -> Vec<u16> {
        let mut ports = self.backend.candidate_ports();
        for port in self.frontend.candidate_ports() {
            if !ports.contains(&port) {
                ports.push(port);
            }
        }
        ports
    }

    fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_ports() {
        let config = Config::defaults("/proj");
        assert_eq!(config.backend.candidate_ports(), vec![8081, 8082, 8083, 8084]);
        assert_eq!(config.frontend.candidate_ports(), vec![5173, 5174, 5175, 5176]);
        assert_eq!(
            config.known_dev_ports(),
            vec![8081, 8082, 8083, 8084, 5173, 5174, 5175, 5176]
        );
        assert_eq!(config.supervisor.grace_period, Duration::from_secs(5));
    }

    #[test]
    fn paths_resolve_against_project_root() {
        let config = Config::defaults("/proj");
        assert_eq!(
            config.config_file_path(ServiceKind::Frontend),
            Some(PathBuf::from("/proj/frontend/vite.config.js"))
        );
        let spec = config.launch_spec(ServiceKind::Backend, 8082);
        assert_eq!(spec.working_dir, PathBuf::from("/proj/backend"));
        assert_eq!(
            spec.readiness,
            Readiness::LogMarker(DEFAULT_BACKEND_READY_MARKER.to_string())
        );
    }

    #[test]
    fn empty_marker_switches_backend_to_port_readiness() {
        let file = ConfigFile {
            backend: ServiceSection {
                ready_marker: Some(String::new()),
                command: Some(CommandLine::Line("./gradlew bootRun".to_string())),
                ..Default::default()
            },
            ..Default::default()
        };
        let config = Config::from_file(file, "/proj");
        assert_eq!(config.backend.command, vec!["./gradlew", "bootRun"]);
        assert_eq!(
            config.launch_spec(ServiceKind::Backend, 9000).readiness,
            Readiness::PortReachable(9000)
        );
    }

    #[test]
    fn frontend_uses_grace_readiness() {
        let config = Config::defaults("/proj");
        assert_eq!(
            config.launch_spec(ServiceKind::Frontend, 5173).readiness,
            Readiness::Grace(Duration::from_secs(3))
        );
    }
}
