#![allow(unused_assignments)]

//! # devctl
//!
//! Local development orchestration for a backend + frontend pair (a Spring
//! Boot API behind a Vite dev server, by default).
//!
//! ## Features
//!
//! - **Port conflict resolution**: probe the preferred ports, fall back in
//!   priority order, and rewrite the services' own config files to match
//! - **Ordered startup**: the frontend is only spawned once the backend has
//!   printed its readiness marker (or accepts connections), with a bounded wait
//! - **Supervision**: child output is forwarded tagged with the service name;
//!   an interrupt or a backend crash terminates both children, SIGTERM first,
//!   SIGKILL after a grace period
//! - **Cleanup**: kill whatever holds the project's ports or matches its
//!   process patterns
//!
//! ## Quick Start
//!
//! ```no_run
//! use devctl::orchestrator::{PortCoordinator, Supervisor, SupervisorSettings};
//! use devctl::service::{OutputSink, ServiceKind};
//! use devctl::{platform, Parser};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), devctl::Error> {
//! let config = Parser::new().resolve(None, None)?;
//! config.validate()?;
//!
//! let platform = platform::current();
//! let ports = PortCoordinator::new(&config, platform.clone()).resolve()?;
//!
//! let mut supervisor = Supervisor::new(
//!     SupervisorSettings::from_config(&config.supervisor),
//!     platform,
//!     OutputSink::forward(),
//! );
//! let cancel = CancellationToken::new();
//! supervisor
//!     .run(
//!         config.launch_spec(ServiceKind::Backend, ports.backend_port()),
//!         config.launch_spec(ServiceKind::Frontend, ports.frontend_port()),
//!         &cancel,
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod platform;
pub mod port;
pub mod rewrite;
pub mod service;

// Re-export commonly used types
pub use config::{Config, Parser};
pub use error::{Error, Result};
pub use orchestrator::{PortAssignment, PortCoordinator, Reaper, Supervisor};
pub use platform::Platform;
pub use service::{OutputMode, ProcessState, ServiceKind};
