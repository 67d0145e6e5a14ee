//! Best-effort cleanup of leftover dev processes.
//!
//! Nothing here fails: a missing target is success, and a signal the OS
//! rejects is logged and recorded without stopping the rest of the sweep.

use crate::config::ReaperConfig;
use crate::platform::{Platform, ProcessInfo, SignalOutcome, TerminateMode};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// How long a SIGTERM'd process gets before SIGKILL.
const DEFAULT_TERM_WAIT: Duration = Duration::from_millis(500);
const ALIVE_POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KillResult {
    /// Exited after the graceful signal.
    Terminated,
    /// Needed the forced signal.
    ForceKilled,
    /// Gone before we signalled it.
    AlreadyExited,
    /// Own PID, PID 0 or PID 1.
    Skipped,
    Failed(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct ReapedProcess {
    #[serde(flatten)]
    pub process: ProcessInfo,
    pub result: KillResult,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReapTarget {
    Port(u16),
    Pattern(String),
}

impl std::fmt::Display for ReapTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReapTarget::Port(port) => write!(f, "port {}", port),
            ReapTarget::Pattern(pattern) => write!(f, "pattern '{}'", pattern),
        }
    }
}

/// Result of one reaper operation.
#[derive(Debug, Clone, Serialize)]
pub struct ReapOutcome {
    pub target: ReapTarget,
    /// Empty when nothing matched.
    pub processes: Vec<ReapedProcess>,
}

impl ReapOutcome {
    pub fn nothing_found(&self) -> bool {
        self.processes.is_empty()
    }

    /// Processes that are gone because of us.
    pub fn stopped_count(&self) -> usize {
        self.processes
            .iter()
            .filter(|p| matches!(p.result, KillResult::Terminated | KillResult::ForceKilled))
            .count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ReapedProcess> {
        self.processes
            .iter()
            .filter(|p| matches!(p.result, KillResult::Failed(_)))
    }
}

pub struct Reaper {
    platform: Arc<dyn Platform>,
    term_wait: Duration,
    sweep_pause: Duration,
}

impl Reaper {
    pub fn new(platform: Arc<dyn Platform>, config: &ReaperConfig) -> Self {
        Self {
            platform,
            term_wait: DEFAULT_TERM_WAIT,
            sweep_pause: config.sweep_pause,
        }
    }

    pub fn with_term_wait(mut self, term_wait: Duration) -> Self {
        self.term_wait = term_wait;
        self
    }

    /// Terminate whatever holds `port`. Nothing bound is a no-op.
    pub async fn kill_process_on_port(&self, port: u16) -> ReapOutcome {
        let found = self.platform.processes_on_port(port);
        if found.is_empty() {
            tracing::debug!("Nothing listening on port {}", port);
        }
        self.reap(ReapTarget::Port(port), found).await
    }

    /// Terminate every process whose command line contains `pattern`.
    pub async fn kill_processes_by_pattern(&self, pattern: &str) -> ReapOutcome {
        let found = self.platform.processes_matching(pattern);
        if found.is_empty() {
            tracing::debug!("No processes match '{}'", pattern);
        }
        self.reap(ReapTarget::Pattern(pattern.to_string()), found).await
    }

    /// [`kill_process_on_port`](Self::kill_process_on_port) for each port, pausing
    /// between ports so the OS can release each socket.
    pub async fn sweep_known_dev_ports(&self, ports: &[u16]) -> Vec<ReapOutcome> {
        let mut outcomes = Vec::with_capacity(ports.len());
        for (i, &port) in ports.iter().enumerate() {
            if i > 0 && !self.sweep_pause.is_zero() {
                tokio::time::sleep(self.sweep_pause).await;
            }
            outcomes.push(self.kill_process_on_port(port).await);
        }
        outcomes
    }

    pub async fn kill_patterns(&self, patterns: &[String]) -> Vec<ReapOutcome> {
        let mut outcomes = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            outcomes.push(self.kill_processes_by_pattern(pattern).await);
        }
        outcomes
    }

    async fn reap(&self, target: ReapTarget, found: Vec<ProcessInfo>) -> ReapOutcome {
        let mut processes = Vec::with_capacity(found.len());
        for process in found {
            let result = self.stop_process(&target, &process).await;
            processes.push(ReapedProcess { process, result });
        }
        ReapOutcome { target, processes }
    }

    async fn stop_process(&self, target: &ReapTarget, process: &ProcessInfo) -> KillResult {
        let pid = process.pid;
        if pid == std::process::id() || pid <= 1 {
            tracing::debug!("Skipping PID {} ({}) for {}", pid, process.name, target);
            return KillResult::Skipped;
        }

        tracing::info!("Stopping {} (PID {}) on {}", process.name, pid, target);

        match self.platform.terminate(pid, TerminateMode::Graceful) {
            Ok(SignalOutcome::NotRunning) => return KillResult::AlreadyExited,
            Ok(SignalOutcome::Sent) => {}
            Err(e) => {
                tracing::warn!("Could not stop PID {} ({}): {}", pid, process.name, e);
                return KillResult::Failed(e.to_string());
            }
        }

        if self.wait_for_exit(pid).await {
            return KillResult::Terminated;
        }

        tracing::info!(
            "PID {} did not exit within {:?}, sending forced kill",
            pid,
            self.term_wait
        );
        match self.platform.terminate(pid, TerminateMode::Forced) {
            Ok(SignalOutcome::Sent) => {
                tokio::time::sleep(Duration::from_millis(100)).await;
                KillResult::ForceKilled
            }
            // Exited between the check and the kill
            Ok(SignalOutcome::NotRunning) => KillResult::Terminated,
            Err(e) => {
                tracing::warn!("Could not force-kill PID {} ({}): {}", pid, process.name, e);
                KillResult::Failed(e.to_string())
            }
        }
    }

    async fn wait_for_exit(&self, pid: u32) -> bool {
        let deadline = Instant::now() + self.term_wait;
        loop {
            if !self.platform.is_alive(pid) {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(ALIVE_POLL_INTERVAL).await;
        }
    }
}
