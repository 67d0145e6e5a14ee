use super::probe::is_port_in_use;
use crate::error::{Error, Result};
use crate::platform::Platform;
use crate::service::ServiceKind;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;

/// Preferred port plus ordered fallbacks for one service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortSpec {
    pub service: ServiceKind,
    pub preferred_port: u16,
    pub fallback_ports: Vec<u16>,
}

impl PortSpec {
    pub fn new(service: ServiceKind, preferred_port: u16, fallback_ports: Vec<u16>) -> Result<Self> {
        let spec = Self {
            service,
            preferred_port,
            fallback_ports,
        };
        spec.validate()?;
        Ok(spec)
    }

    /// Ports are non-zero and appear at most once across preferred and fallbacks.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for port in self.candidates() {
            if port == 0 {
                return Err(Error::Validation(format!(
                    "{}: port 0 is not a valid listening port",
                    self.service
                )));
            }
            if !seen.insert(port) {
                return Err(Error::Validation(format!(
                    "{}: port {} is listed more than once",
                    self.service, port
                )));
            }
        }
        Ok(())
    }

    /// `[preferred] + fallbacks`, in probe order.
    pub fn candidates(&self) -> Vec<u16> {
        std::iter::once(self.preferred_port)
            .chain(self.fallback_ports.iter().copied())
            .collect()
    }
}

/// Final port for one service. Immutable once produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolvedAssignment {
    pub service: ServiceKind,
    pub chosen_port: u16,
    /// `chosen_port != preferred_port`
    pub changed: bool,
}

/// First free port in `[preferred] + fallbacks`, or `None` if all are taken.
///
/// Stops probing at the first free port.
pub fn find_available_port(platform: &dyn Platform, preferred: u16, fallbacks: &[u16]) -> Option<u16> {
    std::iter::once(preferred)
        .chain(fallbacks.iter().copied())
        .find(|&port| !is_port_in_use(platform, port))
}

pub struct PortResolver {
    platform: Arc<dyn Platform>,
}

impl PortResolver {
    pub fn new(platform: Arc<dyn Platform>) -> Self {
        Self { platform }
    }

    pub fn resolve(&self, spec: &PortSpec) -> Result<ResolvedAssignment> {
        let chosen = find_available_port(
            self.platform.as_ref(),
            spec.preferred_port,
            &spec.fallback_ports,
        )
        .ok_or_else(|| Error::NoPortAvailable {
            service: spec.service,
            candidates: spec.candidates(),
        })?;

        let changed = chosen != spec.preferred_port;
        if changed {
            tracing::info!(
                "Port {} is in use; {} will use port {}",
                spec.preferred_port,
                spec.service,
                chosen
            );
        } else {
            tracing::debug!("{} keeps preferred port {}", spec.service, chosen);
        }

        Ok(ResolvedAssignment {
            service: spec.service,
            chosen_port: chosen,
            changed,
        })
    }
}
