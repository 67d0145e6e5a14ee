// Struct-variant fields read only by thiserror's Display impl trip this lint.
#![allow(unused_assignments)]

use crate::service::ServiceKind;
use miette::Diagnostic;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    #[diagnostic(
        code(devctl::config::validation),
        help("Run `devctl validate` for detailed validation errors")
    )]
    Validation(String),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("No free port for {service}: tried {}", format_ports(.candidates))]
    #[diagnostic(
        code(devctl::port::unavailable),
        help("Free one of the ports with `devctl port clean` or `devctl stop`")
    )]
    NoPortAvailable {
        service: ServiceKind,
        candidates: Vec<u16>,
    },

    #[error("Could not probe port {port}: {reason}")]
    #[diagnostic(code(devctl::port::probe))]
    Probe { port: u16, reason: String },

    #[error("Failed to update {}: {reason}", .path.display())]
    #[diagnostic(
        code(devctl::config::write),
        help("Check that the file exists and is writable")
    )]
    ConfigWrite { path: PathBuf, reason: String },

    #[error("Failed to start {service} (`{command}` in {}): {reason}", .cwd.display())]
    #[diagnostic(
        code(devctl::process::spawn),
        help("Check that the command exists and the working directory is correct")
    )]
    ChildSpawn {
        service: ServiceKind,
        command: String,
        cwd: PathBuf,
        reason: String,
    },

    #[error("{service} exited unexpectedly{}", .code.map(|c| format!(" with code {}", c)).unwrap_or_default())]
    #[diagnostic(code(devctl::process::exited))]
    ChildExitedUnexpectedly {
        service: ServiceKind,
        code: Option<i32>,
    },

    #[error("{service} did not become ready within {timeout:?}")]
    #[diagnostic(
        code(devctl::process::readiness_timeout),
        help("Increase supervisor.ready_timeout or check the readiness marker in devctl.yaml")
    )]
    ReadinessTimeout {
        service: ServiceKind,
        timeout: Duration,
    },

    #[error("Signal error: {0}")]
    Signal(String),

    #[error("Operation cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, Error>;

fn format_ports(ports: &[u16]) -> String {
    ports
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl Error {
    /// What the user can do about it, printed as `Hint:` by the CLI.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Error::NoPortAvailable { candidates, .. } => {
                let first = candidates.first().copied().unwrap_or_default();
                Some(format!(
                    "Every candidate port is taken. See what holds them with `devctl port check`, \
                     free one with `devctl port kill {}`, or add fallback ports in devctl.yaml.",
                    first
                ))
            }
            Error::ChildSpawn { service, .. } => Some(format!(
                "Check the {} command and cwd in devctl.yaml (run `devctl validate`).",
                service
            )),
            Error::ChildExitedUnexpectedly { service, .. } => Some(format!(
                "Scroll up for the [{}] output. Leftover processes can be cleared with `devctl stop`.",
                service
            )),
            Error::ReadinessTimeout { service, .. } => Some(format!(
                "The {} never printed its readiness marker. Raise supervisor.ready_timeout or fix ready_marker.",
                service
            )),
            Error::ConfigWrite { .. } => {
                Some("The service may start on its default port; update the file by hand.".to_string())
            }
            Error::Config(msg) if msg.contains("Could not find") => None,
            Error::Config(_) | Error::Validation(_) | Error::Parse(_) | Error::Yaml(_) => {
                Some("Validate your config with: devctl validate".to_string())
            }
            _ => None,
        }
    }

    /// The message followed by a blank line and the hint, if there is one.
    pub fn with_suggestion(&self) -> String {
        match self.suggestion() {
            Some(suggestion) => format!("{}\n\nHint: {}", self, suggestion),
            None => self.to_string(),
        }
    }
}

/// PID as a `nix` [`Pid`](nix::unistd::Pid), refusing the ones no cleanup
/// should ever signal: 0 (our own process group), 1 (init), and anything
/// that would wrap negative.
#[cfg(unix)]
pub fn validate_pid(pid: u32) -> Result<nix::unistd::Pid> {
    let reason = match pid {
        0 => "PID 0 addresses the caller's process group",
        1 => "PID 1 is init",
        p if i32::try_from(p).is_err() => "PID is out of range",
        _ => return Ok(nix::unistd::Pid::from_raw(pid as i32)),
    };
    Err(Error::Signal(format!("refusing to signal {}: {}", pid, reason)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_port_available_lists_candidates() {
        let err = Error::NoPortAvailable {
            service: ServiceKind::Backend,
            candidates: vec![8081, 8082, 8083],
        };
        let msg = err.to_string();
        assert!(msg.contains("backend"), "{}", msg);
        assert!(msg.contains("8081, 8082, 8083"), "{}", msg);
        assert!(err.with_suggestion().contains("devctl port kill 8081"));
    }

    #[test]
    fn exit_message_includes_code_when_known() {
        let err = Error::ChildExitedUnexpectedly {
            service: ServiceKind::Frontend,
            code: Some(3),
        };
        assert_eq!(err.to_string(), "frontend exited unexpectedly with code 3");

        let err = Error::ChildExitedUnexpectedly {
            service: ServiceKind::Frontend,
            code: None,
        };
        assert_eq!(err.to_string(), "frontend exited unexpectedly");
    }

    #[cfg(unix)]
    #[test]
    fn validate_pid_rejects_reserved_pids() {
        assert!(validate_pid(0).is_err());
        assert!(validate_pid(1).is_err());
        assert!(validate_pid(u32::MAX).is_err());
        assert!(validate_pid(std::process::id()).is_ok());
    }
}
