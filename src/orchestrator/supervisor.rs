//! Session supervisor for the backend and frontend children.
//!
//! The supervisor owns the [`ManagedProcess`] records for one session and is
//! the only thing that mutates them. Child output and exits arrive as
//! [`ProcessEvent`]s on a channel; every wait in here (readiness, frontend
//! grace, termination) is a `select!` over that channel, so output from all
//! children keeps flowing whichever one is being waited on.
//!
//! # Startup
//!
//! 1. Spawn the backend and wait for its readiness signal (bounded by
//!    `ready_timeout`). If it exits first, or the wait times out, startup fails.
//! 2. Only then spawn the frontend and give it `frontend_grace` to bind.
//! 3. Optionally open the browser; failure is only logged.
//!
//! Any startup error tears down whatever was already spawned.
//!
//! # Termination
//!
//! SIGTERM to every live child (frontend first), wait up to `grace_period`,
//! SIGKILL whatever is left, wait up to `kill_timeout` for it to be reaped.
//! Children lead their own process groups; a group whose leader already
//! exited gets the same two phases, so nothing it forked outlives the session.
//! Terminating an already terminated session does nothing.

use crate::config::SupervisorConfig;
use crate::error::{Error, Result};
use crate::platform::{Platform, SignalOutcome, TerminateMode};
use crate::service::{
    spawn_child, LaunchSpec, ManagedProcess, OutputSink, ProcessEvent, ProcessState, Readiness,
    ServiceKind, TaggedLine,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

const DEFAULT_PORT_POLL_INTERVAL: Duration = Duration::from_millis(250);
const GROUP_POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone)]
pub struct SupervisorSettings {
    pub grace_period: Duration,
    pub ready_timeout: Duration,
    pub kill_timeout: Duration,
    /// How often `Readiness::PortReachable` is checked.
    pub port_poll_interval: Duration,
    /// Opened once both services are up.
    pub browser_url: Option<String>,
}

impl SupervisorSettings {
    pub fn from_config(config: &SupervisorConfig) -> Self {
        Self {
            grace_period: config.grace_period,
            ready_timeout: config.ready_timeout,
            kill_timeout: config.kill_timeout,
            port_poll_interval: DEFAULT_PORT_POLL_INTERVAL,
            browser_url: None,
        }
    }
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self::from_config(&SupervisorConfig::default())
    }
}

pub struct Supervisor {
    settings: SupervisorSettings,
    platform: Arc<dyn Platform>,
    output: OutputSink,
    processes: Vec<ManagedProcess>,
    events_tx: UnboundedSender<ProcessEvent>,
    events_rx: UnboundedReceiver<ProcessEvent>,
    /// Process groups already taken down by `terminate_all`.
    cleared_groups: HashSet<u32>,
}

impl Supervisor {
    pub fn new(settings: SupervisorSettings, platform: Arc<dyn Platform>, output: OutputSink) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            settings,
            platform,
            output,
            processes: Vec::new(),
            events_tx,
            events_rx,
            cleared_groups: HashSet::new(),
        }
    }

    /// Records of every service launched so far, in launch order.
    pub fn processes(&self) -> &[ManagedProcess] {
        &self.processes
    }

    pub fn process(&self, kind: ServiceKind) -> Option<&ManagedProcess> {
        self.processes.iter().find(|p| p.service == kind)
    }

    pub fn output(&self) -> &OutputSink {
        &self.output
    }

    /// Start both services, then supervise them until cancelled or the backend dies.
    pub async fn run(
        &mut self,
        backend: LaunchSpec,
        frontend: LaunchSpec,
        cancel: &CancellationToken,
    ) -> Result<()> {
        self.start(backend, frontend, cancel).await?;
        self.supervise(cancel).await
    }

    /// Run the startup protocol. On error every spawned child has been terminated.
    pub async fn start(
        &mut self,
        backend: LaunchSpec,
        frontend: LaunchSpec,
        cancel: &CancellationToken,
    ) -> Result<()> {
        if !self.processes.is_empty() {
            return Err(Error::Config("session already started".to_string()));
        }

        let result = self.start_sequence(backend, frontend, cancel).await;
        if let Err(e) = &result {
            if !matches!(e, Error::Cancelled) {
                tracing::error!("Startup failed: {}", e);
            }
            self.terminate_all().await;
        }
        result
    }

    async fn start_sequence(
        &mut self,
        backend: LaunchSpec,
        frontend: LaunchSpec,
        cancel: &CancellationToken,
    ) -> Result<()> {
        self.launch(backend)?;
        self.await_ready(ServiceKind::Backend, cancel).await?;
        self.set_state(ServiceKind::Backend, ProcessState::Running);

        self.launch(frontend)?;
        self.await_ready(ServiceKind::Frontend, cancel).await?;
        self.set_state(ServiceKind::Frontend, ProcessState::Running);

        if let Some(url) = &self.settings.browser_url {
            match self.platform.open_url(url) {
                Ok(()) => tracing::info!("Opened {} in the browser", url),
                Err(e) => tracing::warn!("Could not open browser at {}: {}", url, e),
            }
        }

        Ok(())
    }

    /// Keep forwarding output until cancelled (Ok) or the backend exits (Err).
    ///
    /// A frontend exit is reported and supervision continues.
    pub async fn supervise(&mut self, cancel: &CancellationToken) -> Result<()> {
        loop {
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!("Shutdown requested, stopping services");
                    self.terminate_all().await;
                    return Ok(());
                }
                event = self.events_rx.recv() => event,
            };

            let Some(event) = event else {
                return Ok(());
            };

            if let Some((service, code)) = self.handle_event(event) {
                let err = Error::ChildExitedUnexpectedly { service, code };
                match service {
                    ServiceKind::Backend => {
                        tracing::error!("{}; stopping the session", err);
                        self.terminate_all().await;
                        return Err(err);
                    }
                    ServiceKind::Frontend => {
                        tracing::warn!("{}; backend keeps running", err);
                    }
                }
            }
        }
    }

    /// Two-phase termination of every live child and whatever it left behind
    /// in its process group. Idempotent.
    pub async fn terminate_all(&mut self) {
        // A group whose leader already exited but which still has members
        let mut orphaned = false;

        // Reverse launch order: frontend before backend
        for process in self.processes.iter_mut().rev() {
            let Some(pid) = process.pid else {
                continue;
            };
            if self.cleared_groups.contains(&pid) {
                continue;
            }
            match process.state {
                ProcessState::Starting | ProcessState::Ready | ProcessState::Running => {
                    process.transition(ProcessState::Terminating);
                    tracing::info!("Stopping {} (PID {})", process.service, pid);
                    signal(self.platform.as_ref(), process, pid, TerminateMode::Graceful);
                }
                ProcessState::Failed | ProcessState::Terminated => {
                    if self.platform.is_group_alive(pid) {
                        tracing::info!(
                            "Stopping processes left behind by {} (group {})",
                            process.service,
                            pid
                        );
                        signal_group(self.platform.as_ref(), process, pid, TerminateMode::Graceful);
                        orphaned = true;
                    }
                }
                _ => {}
            }
        }

        let groups: Vec<u32> = self
            .processes
            .iter()
            .filter_map(|p| p.pid)
            .filter(|pid| !self.cleared_groups.contains(pid))
            .collect();
        if !self.any_terminating() && !orphaned {
            self.cleared_groups.extend(groups);
            return;
        }

        self.drain_until(Instant::now() + self.settings.grace_period, &groups)
            .await;

        let mut forced = false;
        for process in self.processes.iter_mut() {
            let Some(pid) = process.pid else {
                continue;
            };
            if process.state == ProcessState::Terminating {
                tracing::warn!(
                    "{} (PID {}) still running after {:?}, killing it",
                    process.service,
                    pid,
                    self.settings.grace_period
                );
                signal(self.platform.as_ref(), process, pid, TerminateMode::Forced);
                forced = true;
            } else if groups.contains(&pid) && self.platform.is_group_alive(pid) {
                tracing::warn!(
                    "Processes in {}'s group {} survived {:?}, killing them",
                    process.service,
                    pid,
                    self.settings.grace_period
                );
                signal_group(self.platform.as_ref(), process, pid, TerminateMode::Forced);
                forced = true;
            }
        }

        if forced {
            self.drain_until(Instant::now() + self.settings.kill_timeout, &groups)
                .await;
        }

        for process in &self.processes {
            if process.state == ProcessState::Terminating {
                tracing::error!(
                    "{} (PID {:?}) did not exit after a forced kill",
                    process.service,
                    process.pid
                );
            }
        }
        self.cleared_groups.extend(groups);
    }

    fn launch(&mut self, spec: LaunchSpec) -> Result<()> {
        let kind = spec.service;
        self.processes.push(ManagedProcess::new(spec.clone()));

        let pid = spawn_child(&spec, self.events_tx.clone())?;

        if let Some(process) = self.process_mut(kind) {
            process.pid = pid;
            process.spawned_at = Some(Instant::now());
            process.transition(ProcessState::Starting);
        }
        tracing::info!(
            "Started {} (PID {}): {}",
            kind,
            pid.map(|p| p.to_string()).unwrap_or_else(|| "?".to_string()),
            spec.display_command()
        );
        Ok(())
    }

    async fn await_ready(&mut self, kind: ServiceKind, cancel: &CancellationToken) -> Result<()> {
        let readiness = match self.process(kind) {
            Some(process) => process.readiness.clone(),
            None => return Err(Error::Config(format!("{} was never launched", kind))),
        };

        let (wait, port) = match &readiness {
            Readiness::Grace(grace) => (*grace, None),
            Readiness::PortReachable(port) => (self.settings.ready_timeout, Some(*port)),
            Readiness::LogMarker(_) => (self.settings.ready_timeout, None),
        };
        let deadline = tokio::time::sleep(wait);
        tokio::pin!(deadline);
        let mut poll = tokio::time::interval(self.settings.port_poll_interval);
        // At most one connect attempt in flight, off the event loop
        let mut connects = JoinSet::new();

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                // Ahead of the events so a child flooding its output cannot starve it
                _ = &mut deadline => {
                    return match &readiness {
                        Readiness::Grace(_) => {
                            self.set_state(kind, ProcessState::Ready);
                            Ok(())
                        }
                        _ => Err(Error::ReadinessTimeout { service: kind, timeout: wait }),
                    };
                }
                Some(event) = self.events_rx.recv() => {
                    if let Some((service, code)) = self.handle_event(event) {
                        // Either child dying during startup fails the session
                        return Err(Error::ChildExitedUnexpectedly { service, code });
                    }
                }
                Some(reachable) = connects.join_next() => {
                    if let (Ok(true), Some(port)) = (reachable, port) {
                        tracing::debug!("{} is accepting connections on port {}", kind, port);
                        self.set_state(kind, ProcessState::Ready);
                    }
                }
                _ = poll.tick(), if port.is_some() && connects.is_empty() => {
                    if let Some(port) = port {
                        connects.spawn(port_reachable(port, self.settings.port_poll_interval));
                    }
                }
            }

            if self.process(kind).map(|p| p.state) == Some(ProcessState::Ready) {
                if let Some(process) = self.process(kind) {
                    let took = process
                        .spawned_at
                        .map(|t| t.elapsed())
                        .unwrap_or_default();
                    tracing::info!("{} is ready ({:.1}s)", kind, took.as_secs_f64());
                }
                return Ok(());
            }
        }
    }

    /// Apply one event to the process records.
    ///
    /// Returns `(service, code)` when a child exited without being asked to.
    fn handle_event(&mut self, event: ProcessEvent) -> Option<(ServiceKind, Option<i32>)> {
        match event {
            ProcessEvent::Output {
                service,
                stream,
                line,
            } => {
                let process = self.process_mut(service)?;
                if process.state == ProcessState::Starting {
                    if let Readiness::LogMarker(marker) = &process.readiness {
                        if line.contains(marker.as_str()) {
                            tracing::debug!("{} printed readiness marker", service);
                            process.transition(ProcessState::Ready);
                        }
                    }
                }
                self.output.emit(TaggedLine {
                    service,
                    stream,
                    line,
                });
                None
            }
            ProcessEvent::Exited { service, code } => {
                let process = self.process_mut(service)?;
                process.exit_code = code;
                if process.state == ProcessState::Terminating {
                    tracing::debug!("{} exited with {:?} after termination request", service, code);
                    process.transition(ProcessState::Terminated);
                    None
                } else {
                    process.transition(ProcessState::Failed);
                    Some((service, code))
                }
            }
        }
    }

    /// Handle events until nothing is terminating and every group in `groups`
    /// is empty, or `deadline` passes.
    async fn drain_until(&mut self, deadline: Instant, groups: &[u32]) {
        let deadline = tokio::time::Instant::from_std(deadline);
        let mut poll = tokio::time::interval(GROUP_POLL_INTERVAL);
        loop {
            let groups_alive = groups.iter().any(|&pgid| self.platform.is_group_alive(pgid));
            if !self.any_terminating() && !groups_alive {
                return;
            }
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => return,
                event = self.events_rx.recv() => match event {
                    Some(event) => {
                        self.handle_event(event);
                    }
                    None => return,
                },
                _ = poll.tick(), if groups_alive => {}
            }
        }
    }

    fn any_terminating(&self) -> bool {
        self.processes
            .iter()
            .any(|p| p.state == ProcessState::Terminating)
    }

    fn set_state(&mut self, kind: ServiceKind, state: ProcessState) {
        if let Some(process) = self.process_mut(kind) {
            process.transition(state);
        }
    }

    fn process_mut(&mut self, kind: ServiceKind) -> Option<&mut ManagedProcess> {
        self.processes.iter_mut().find(|p| p.service == kind)
    }
}

/// Send `mode` to the group `pgid` left behind by `process`.
fn signal_group(platform: &dyn Platform, process: &ManagedProcess, pgid: u32, mode: TerminateMode) {
    if let Err(e) = platform.terminate_group(pgid, mode) {
        tracing::warn!(
            "Failed to signal {}'s process group {}: {}",
            process.service,
            pgid,
            e
        );
    }
}

/// Send `mode` to `pid`. A child that is already gone is not an error.
fn signal(platform: &dyn Platform, process: &ManagedProcess, pid: u32, mode: TerminateMode) {
    match platform.terminate(pid, mode) {
        Ok(SignalOutcome::Sent) => {}
        Ok(SignalOutcome::NotRunning) => {
            tracing::debug!("{} (PID {}) already exited", process.service, pid);
        }
        Err(e) => tracing::warn!("Failed to signal {} (PID {}): {}", process.service, pid, e),
    }
}

async fn port_reachable(port: u16, within: Duration) -> bool {
    matches!(
        tokio::time::timeout(within, tokio::net::TcpStream::connect(("127.0.0.1", port))).await,
        Ok(Ok(_))
    )
}
