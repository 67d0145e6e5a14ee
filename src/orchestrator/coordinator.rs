//! Port conflict resolution for one session.
//!
//! Ports are finalized here, and the services' config files brought in line,
//! before anything is spawned.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::platform::Platform;
use crate::port::{PortResolver, ResolvedAssignment};
use crate::rewrite::{self, ConfigUpdate, RewriteOutcome, UpdateStatus};
use crate::service::ServiceKind;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

/// Final ports for both services plus what happened to their config files.
#[derive(Debug, Clone, Serialize)]
pub struct PortAssignment {
    pub backend: ResolvedAssignment,
    pub frontend: ResolvedAssignment,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub config_updates: Vec<ConfigUpdate>,
}

impl PortAssignment {
    pub fn backend_port(&self) -> u16 {
        self.backend.chosen_port
    }

    pub fn frontend_port(&self) -> u16 {
        self.frontend.chosen_port
    }

    pub fn port(&self, kind: ServiceKind) -> u16 {
        match kind {
            ServiceKind::Backend => self.backend_port(),
            ServiceKind::Frontend => self.frontend_port(),
        }
    }

    pub fn any_changed(&self) -> bool {
        self.backend.changed || self.frontend.changed
    }
}

pub struct PortCoordinator<'a> {
    config: &'a Config,
    resolver: PortResolver,
}

impl<'a> PortCoordinator<'a> {
    pub fn new(config: &'a Config, platform: Arc<dyn Platform>) -> Self {
        Self {
            config,
            resolver: PortResolver::new(platform),
        }
    }

    /// Resolve backend then frontend ports and rewrite config files as needed.
    ///
    /// Fails with the first [`Error::NoPortAvailable`]; the backend is checked
    /// first and a backend failure skips the frontend. No file is touched
    /// unless both services got a port. A failed config write is logged and
    /// recorded in [`PortAssignment::config_updates`] but does not fail the call.
    pub fn resolve(&self) -> Result<PortAssignment> {
        let backend = self
            .resolver
            .resolve(&self.config.port_spec(ServiceKind::Backend))?;
        let frontend = self
            .resolver
            .resolve(&self.config.port_spec(ServiceKind::Frontend))?;

        let mut config_updates = Vec::new();

        if backend.changed {
            let port = backend.chosen_port;
            if let Some(update) = self.update(ServiceKind::Backend, |path| {
                rewrite::rewrite_backend_port(path, port)
            }) {
                config_updates.push(update);
            }
        }

        // The proxy target follows the backend even when only the backend moved
        if frontend.changed || backend.changed {
            let (frontend_port, backend_port) = (frontend.chosen_port, backend.chosen_port);
            if let Some(update) = self.update(ServiceKind::Frontend, |path| {
                rewrite::rewrite_frontend_port(path, frontend_port, backend_port)
            }) {
                config_updates.push(update);
            }
        }

        Ok(PortAssignment {
            backend,
            frontend,
            config_updates,
        })
    }

    fn update(
        &self,
        kind: ServiceKind,
        rewrite: impl FnOnce(&Path) -> Result<RewriteOutcome>,
    ) -> Option<ConfigUpdate> {
        let Some(path) = self.config.config_file_path(kind) else {
            tracing::debug!("No config file configured for {}; skipping rewrite", kind);
            return None;
        };

        let status = match rewrite(&path) {
            Ok(outcome) => UpdateStatus::from(outcome),
            Err(e) => {
                let reason = match &e {
                    Error::ConfigWrite { reason, .. } => reason.clone(),
                    other => other.to_string(),
                };
                tracing::warn!(
                    "Could not update {} config {}: {} (continuing; {} may start on its old port)",
                    kind,
                    path.display(),
                    reason,
                    kind
                );
                UpdateStatus::Failed(reason)
            }
        };

        Some(ConfigUpdate {
            service: kind,
            path,
            status,
        })
    }
}
