use crate::platform::{Platform, ProcessInfo};
use serde::Serialize;

/// Is `port` taken on this host?
///
/// A probe that errors counts as occupied: handing out a port we could not
/// check risks a bind collision later, skipping it only costs a fallback.
pub fn is_port_in_use(platform: &dyn Platform, port: u16) -> bool {
    match platform.probe_port(port) {
        Ok(in_use) => {
            tracing::debug!(port, in_use, "Probed port");
            in_use
        }
        Err(e) => {
            tracing::warn!("{}; treating port {} as occupied", e, port);
            true
        }
    }
}

/// Snapshot of one port for `devctl port check`.
#[derive(Debug, Clone, Serialize)]
pub struct PortStatus {
    pub port: u16,
    pub in_use: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub processes: Vec<ProcessInfo>,
}

impl PortStatus {
    pub fn check(platform: &dyn Platform, port: u16) -> Self {
        let in_use = is_port_in_use(platform, port);
        let processes = if in_use {
            platform.processes_on_port(port)
        } else {
            Vec::new()
        };
        Self {
            port,
            in_use,
            processes,
        }
    }
}
