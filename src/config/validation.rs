use super::Config;
use crate::error::{Error, Result};
use crate::service::ServiceKind;
use std::collections::HashSet;

impl Config {
    /// Reject configurations that could never start cleanly.
    pub fn validate(&self) -> Result<()> {
        for kind in [ServiceKind::Backend, ServiceKind::Frontend] {
            self.port_spec(kind).validate()?;

            let svc = self.service(kind);
            if svc.command.is_empty() || svc.command[0].trim().is_empty() {
                return Err(Error::Validation(format!(
                    "{}.command must name a program to run",
                    kind
                )));
            }
        }

        if self.frontend.ready_marker.is_some() {
            return Err(Error::Validation(
                "frontend.ready_marker is not supported: the frontend is assumed up after supervisor.frontend_grace"
                    .to_string(),
            ));
        }

        let backend_ports: HashSet<u16> = self.backend.candidate_ports().into_iter().collect();
        let shared: Vec<u16> = self
            .frontend
            .candidate_ports()
            .into_iter()
            .filter(|p| backend_ports.contains(p))
            .collect();
        if !shared.is_empty() {
            return Err(Error::Validation(format!(
                "backend and frontend share candidate port(s) {:?}",
                shared
            )));
        }

        for (name, value) in [
            ("supervisor.grace_period", self.supervisor.grace_period),
            ("supervisor.ready_timeout", self.supervisor.ready_timeout),
            ("supervisor.kill_timeout", self.supervisor.kill_timeout),
        ] {
            if value.is_zero() {
                return Err(Error::Validation(format!("{} must be greater than zero", name)));
            }
        }

        let patterns = self
            .reaper
            .project_patterns
            .iter()
            .chain([&self.reaper.node_pattern, &self.reaper.java_pattern]);
        for pattern in patterns {
            if pattern.trim().is_empty() {
                return Err(Error::Validation(
                    "reaper patterns must not be empty (an empty pattern matches every process)"
                        .to_string(),
                ));
            }
        }

        Ok(())
    }
}
