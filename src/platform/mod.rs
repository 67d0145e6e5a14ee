//! OS capability layer.
//!
//! Everything devctl asks of the operating system (is a port taken, who holds
//! it, which processes match a pattern, deliver a termination signal, open a
//! browser) goes through the [`Platform`] trait. One implementation exists per
//! target OS and [`current`] picks it at startup, so call sites never branch
//! on `cfg(target_os)` themselves.

mod parse;

#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

#[cfg(unix)]
pub use unix::UnixPlatform;
#[cfg(windows)]
pub use windows::WindowsPlatform;

use crate::error::{Error, Result};
use serde::Serialize;
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, TcpListener};
use std::sync::Arc;

/// A process found holding a port or matching a pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
    pub command: Option<String>,
}

impl ProcessInfo {
    pub fn new(pid: u32, name: impl Into<String>) -> Self {
        Self {
            pid,
            name: name.into(),
            command: None,
        }
    }
}

/// Strength of a termination request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminateMode {
    /// SIGTERM / `taskkill` without `/F`: the process may clean up.
    Graceful,
    /// SIGKILL / `taskkill /F`.
    Forced,
}

/// What happened when a signal was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalOutcome {
    Sent,
    /// The target was already gone; not an error.
    NotRunning,
}

pub trait Platform: Send + Sync {
    /// Would binding `port` on this host fail right now?
    ///
    /// `Ok(true)` means occupied. Errors other than "address in use" are
    /// reported as [`Error::Probe`] so the caller decides how to treat them.
    fn probe_port(&self, port: u16) -> Result<bool> {
        bind_probe(port)
    }

    /// Processes holding `port`. Empty when nothing is bound or the lookup
    /// tool is unavailable.
    fn processes_on_port(&self, port: u16) -> Vec<ProcessInfo>;

    /// Processes whose full command line contains `pattern`.
    fn processes_matching(&self, pattern: &str) -> Vec<ProcessInfo>;

    /// Signal `pid` and, where it leads one, its process group.
    fn terminate(&self, pid: u32, mode: TerminateMode) -> Result<SignalOutcome>;

    fn is_alive(&self, pid: u32) -> bool;

    /// Signal every process in the group led by `pgid`, even after the leader
    /// itself has exited.
    fn terminate_group(&self, pgid: u32, mode: TerminateMode) -> Result<SignalOutcome> {
        self.terminate(pgid, mode)
    }

    /// Does any process remain in the group led by `pgid`?
    fn is_group_alive(&self, pgid: u32) -> bool {
        self.is_alive(pgid)
    }

    /// Open `url` in the default browser.
    fn open_url(&self, url: &str) -> Result<()>;
}

/// The platform implementation for the OS devctl was built for.
pub fn current() -> Arc<dyn Platform> {
    #[cfg(unix)]
    {
        Arc::new(UnixPlatform::new())
    }

    #[cfg(windows)]
    {
        Arc::new(WindowsPlatform::new())
    }
}

/// Bind-based probe shared by every platform.
///
/// Both loopback and the wildcard address are tried: on macOS binding
/// 127.0.0.1 can succeed while 0.0.0.0 is taken. The IPv6 pair is tried too,
/// since dev servers binding `localhost` often end up on `::1` only.
pub fn bind_probe(port: u16) -> Result<bool> {
    for addr in [Ipv4Addr::LOCALHOST, Ipv4Addr::UNSPECIFIED] {
        match TcpListener::bind((addr, port)) {
            Ok(listener) => drop(listener),
            Err(e) if e.kind() == io::ErrorKind::AddrInUse => return Ok(true),
            Err(e) => {
                return Err(Error::Probe {
                    port,
                    reason: format!("bind {}:{}: {}", addr, port, e),
                })
            }
        }
    }

    for addr in [Ipv6Addr::LOCALHOST, Ipv6Addr::UNSPECIFIED] {
        match TcpListener::bind((addr, port)) {
            Ok(listener) => drop(listener),
            Err(e) if e.kind() == io::ErrorKind::AddrInUse => return Ok(true),
            // Host without IPv6
            Err(e) => tracing::debug!("bind [{}]:{} skipped: {}", addr, port, e),
        }
    }
    Ok(false)
}
