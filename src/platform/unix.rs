use super::parse::{parse_lsof_fields, parse_pid_lines};
#[cfg(target_os = "linux")]
use super::parse::parse_ss_pids;
use super::{Platform, ProcessInfo, SignalOutcome, TerminateMode};
use crate::error::{validate_pid, Error, Result};
use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::unistd::{getpgid, Pid};
use std::process::{Command, Stdio};

/// Linux and macOS: `ss`/`lsof` for port lookups, `pgrep` for patterns,
/// `kill(2)`/`killpg(2)` for signals.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnixPlatform;

impl UnixPlatform {
    pub fn new() -> Self {
        Self
    }

    fn lsof(port: u16) -> Vec<ProcessInfo> {
        match Command::new("lsof")
            .args(["-i", &format!("TCP:{}", port), "-sTCP:LISTEN", "-P", "-n", "-F", "pcn"])
            .stderr(Stdio::null())
            .output()
        {
            // lsof exits 1 when nothing matches
            Ok(output) if output.status.success() => {
                parse_lsof_fields(&String::from_utf8_lossy(&output.stdout))
            }
            Ok(_) => Vec::new(),
            Err(e) => {
                tracing::debug!("lsof unavailable: {}", e);
                Vec::new()
            }
        }
    }

    #[cfg(target_os = "linux")]
    fn ss(port: u16) -> Vec<u32> {
        match Command::new("ss")
            .args(["-tlnp", &format!("sport = :{}", port)])
            .stderr(Stdio::null())
            .output()
        {
            Ok(output) if output.status.success() => {
                parse_ss_pids(&String::from_utf8_lossy(&output.stdout))
            }
            Ok(_) => Vec::new(),
            Err(e) => {
                tracing::debug!("ss unavailable: {}", e);
                Vec::new()
            }
        }
    }

    /// Name and command line for `pid`.
    fn describe(pid: u32) -> ProcessInfo {
        #[cfg(target_os = "linux")]
        {
            let name = std::fs::read_to_string(format!("/proc/{}/comm", pid))
                .ok()
                .map(|s| s.trim().to_string())
                .unwrap_or_else(|| "unknown".to_string());
            let command = std::fs::read_to_string(format!("/proc/{}/cmdline", pid))
                .ok()
                .map(|s| s.replace('\0', " ").trim().to_string())
                .filter(|s| !s.is_empty());
            ProcessInfo { pid, name, command }
        }

        #[cfg(not(target_os = "linux"))]
        {
            let query = |field: &str| -> Option<String> {
                let output = Command::new("ps")
                    .args(["-p", &pid.to_string(), "-o", field])
                    .stderr(Stdio::null())
                    .output()
                    .ok()?;
                let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
                (output.status.success() && !text.is_empty()).then_some(text)
            };
            ProcessInfo {
                pid,
                name: query("comm=").unwrap_or_else(|| "unknown".to_string()),
                command: query("command="),
            }
        }
    }

    fn signal_for(mode: TerminateMode) -> Signal {
        match mode {
            TerminateMode::Graceful => Signal::SIGTERM,
            TerminateMode::Forced => Signal::SIGKILL,
        }
    }

    /// `pgid` as a group we may signal: never our own.
    fn foreign_group(pgid: u32) -> Result<Pid> {
        let nix_pgid = validate_pid(pgid)?;
        if getpgid(None).ok() == Some(nix_pgid) {
            return Err(Error::Signal(format!(
                "refusing to signal process group {}: it is our own",
                pgid
            )));
        }
        Ok(nix_pgid)
    }

    fn send(pid: Pid, sig: Option<Signal>) -> nix::Result<()> {
        // Children are spawned as group leaders; signal the whole tree then.
        let is_group_leader = getpgid(Some(pid)).ok() == Some(pid);
        if is_group_leader {
            signal::killpg(pid, sig).or_else(|_| signal::kill(pid, sig))
        } else {
            signal::kill(pid, sig)
        }
    }
}

impl Platform for UnixPlatform {
    fn processes_on_port(&self, port: u16) -> Vec<ProcessInfo> {
        #[cfg(target_os = "linux")]
        {
            // ss is usually present and fast; lsof fills in what it cannot see
            let mut processes: Vec<ProcessInfo> =
                Self::ss(port).into_iter().map(Self::describe).collect();
            for p in Self::lsof(port) {
                if !processes.iter().any(|known| known.pid == p.pid) {
                    processes.push(p);
                }
            }
            processes
        }

        #[cfg(not(target_os = "linux"))]
        {
            Self::lsof(port)
        }
    }

    fn processes_matching(&self, pattern: &str) -> Vec<ProcessInfo> {
        let output = match Command::new("pgrep")
            .args(["-f", pattern])
            .stderr(Stdio::null())
            .output()
        {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!("pgrep unavailable, cannot match '{}': {}", pattern, e);
                return Vec::new();
            }
        };

        // pgrep exits 1 when nothing matches
        if !output.status.success() {
            return Vec::new();
        }

        parse_pid_lines(&String::from_utf8_lossy(&output.stdout))
            .into_iter()
            .map(Self::describe)
            .collect()
    }

    fn terminate(&self, pid: u32, mode: TerminateMode) -> Result<SignalOutcome> {
        let nix_pid = validate_pid(pid)?;
        let sig = Self::signal_for(mode);

        match Self::send(nix_pid, Some(sig)) {
            Ok(()) => {
                tracing::debug!("Sent {} to PID {}", sig, pid);
                Ok(SignalOutcome::Sent)
            }
            Err(Errno::ESRCH) => Ok(SignalOutcome::NotRunning),
            Err(e) => Err(Error::Signal(format!(
                "failed to send {} to PID {}: {}",
                sig, pid, e
            ))),
        }
    }

    fn is_alive(&self, pid: u32) -> bool {
        match validate_pid(pid) {
            // EPERM still means the process exists
            Ok(nix_pid) => !matches!(signal::kill(nix_pid, None), Err(Errno::ESRCH)),
            Err(_) => false,
        }
    }

    fn terminate_group(&self, pgid: u32, mode: TerminateMode) -> Result<SignalOutcome> {
        let nix_pgid = Self::foreign_group(pgid)?;
        let sig = Self::signal_for(mode);

        match signal::killpg(nix_pgid, sig) {
            Ok(()) => {
                tracing::debug!("Sent {} to process group {}", sig, pgid);
                Ok(SignalOutcome::Sent)
            }
            Err(Errno::ESRCH) => Ok(SignalOutcome::NotRunning),
            Err(e) => Err(Error::Signal(format!(
                "failed to send {} to process group {}: {}",
                sig, pgid, e
            ))),
        }
    }

    fn is_group_alive(&self, pgid: u32) -> bool {
        match Self::foreign_group(pgid) {
            Ok(nix_pgid) => !matches!(signal::killpg(nix_pgid, None), Err(Errno::ESRCH)),
            Err(_) => false,
        }
    }

    fn open_url(&self, url: &str) -> Result<()> {
        let opener = if cfg!(target_os = "macos") {
            "open"
        } else {
            "xdg-open"
        };

        Command::new(opener)
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map(|_| ())
            .map_err(|e| Error::Io(std::io::Error::new(e.kind(), format!("{}: {}", opener, e))))
    }
}
