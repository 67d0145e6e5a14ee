//! Supervised child processes.
//!
//! This module holds the per-process pieces the supervisor is built from:
//!
//! - [`ManagedProcess`] and its [`ProcessState`] machine
//! - [`LaunchSpec`] / [`Readiness`]: what to run and how to tell it is up
//! - [`ProcessEvent`]: output and exit notifications delivered to the supervisor
//! - [`OutputSink`]: where tagged child output ends up

mod log_capture;
mod process;
mod types;

pub use log_capture::{OutputMode, OutputSink, TaggedLine};
pub(crate) use process::spawn_child;
pub use process::ProcessEvent;
pub use types::*;
