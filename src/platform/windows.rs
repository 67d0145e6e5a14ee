use super::parse::{parse_cim_rows, parse_netstat_listeners};
use super::{Platform, ProcessInfo, SignalOutcome, TerminateMode};
use crate::error::{Error, Result};
use std::process::{Command, Stdio};

/// Windows: `netstat -ano` for port lookups, PowerShell CIM for patterns,
/// `taskkill /T` for signals.
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowsPlatform;

impl WindowsPlatform {
    pub fn new() -> Self {
        Self
    }

    fn cim_query(filter: &str) -> Vec<ProcessInfo> {
        let script = format!(
            "Get-CimInstance Win32_Process | Where-Object {{ {} }} | \
             ForEach-Object {{ \"$($_.ProcessId)`t$($_.Name)`t$($_.CommandLine)\" }}",
            filter
        );
        match Command::new("powershell")
            .args(["-NoProfile", "-NonInteractive", "-Command", &script])
            .stderr(Stdio::null())
            .output()
        {
            Ok(output) if output.status.success() => {
                parse_cim_rows(&String::from_utf8_lossy(&output.stdout))
            }
            Ok(_) => Vec::new(),
            Err(e) => {
                tracing::warn!("PowerShell unavailable: {}", e);
                Vec::new()
            }
        }
    }
}

impl Platform for WindowsPlatform {
    fn processes_on_port(&self, port: u16) -> Vec<ProcessInfo> {
        let output = match Command::new("netstat")
            .args(["-ano", "-p", "TCP"])
            .stderr(Stdio::null())
            .output()
        {
            Ok(output) if output.status.success() => output,
            Ok(_) => return Vec::new(),
            Err(e) => {
                tracing::debug!("netstat unavailable: {}", e);
                return Vec::new();
            }
        };

        parse_netstat_listeners(&String::from_utf8_lossy(&output.stdout), port)
            .into_iter()
            .map(|pid| {
                Self::cim_query(&format!("$_.ProcessId -eq {}", pid))
                    .into_iter()
                    .next()
                    .unwrap_or_else(|| ProcessInfo::new(pid, "unknown"))
            })
            .collect()
    }

    fn processes_matching(&self, pattern: &str) -> Vec<ProcessInfo> {
        // -like wildcards; escape the ones PowerShell would interpret
        let escaped = pattern
            .replace('\'', "''")
            .replace('[', "`[")
            .replace(']', "`]")
            .replace('*', "`*")
            .replace('?', "`?");
        Self::cim_query(&format!("$_.CommandLine -like '*{}*'", escaped))
    }

    fn terminate(&self, pid: u32, mode: TerminateMode) -> Result<SignalOutcome> {
        if pid == 0 || pid == 4 {
            return Err(Error::Signal(format!("refusing to signal system PID {}", pid)));
        }

        let mut cmd = Command::new("taskkill");
        cmd.args(["/PID", &pid.to_string(), "/T"]);
        if mode == TerminateMode::Forced {
            cmd.arg("/F");
        }

        let output = cmd
            .output()
            .map_err(|e| Error::Signal(format!("failed to run taskkill: {}", e)))?;
        if output.status.success() {
            return Ok(SignalOutcome::Sent);
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("not found") {
            Ok(SignalOutcome::NotRunning)
        } else {
            Err(Error::Signal(format!(
                "taskkill failed for PID {}: {}",
                pid,
                stderr.trim()
            )))
        }
    }

    fn is_alive(&self, pid: u32) -> bool {
        Command::new("tasklist")
            .args(["/FI", &format!("PID eq {}", pid), "/NH", "/FO", "CSV"])
            .output()
            .map(|output| {
                String::from_utf8_lossy(&output.stdout).contains(&format!("\"{}\"", pid))
            })
            .unwrap_or(false)
    }

    fn open_url(&self, url: &str) -> Result<()> {
        Command::new("cmd")
            .args(["/C", "start", "", url])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map(|_| ())
            .map_err(Error::from)
    }
}
