use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// The two services a development session supervises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    Backend,
    Frontend,
}

impl ServiceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceKind::Backend => "backend",
            ServiceKind::Frontend => "frontend",
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle state of a supervised child process.
///
/// # State Transitions
///
/// ```text
/// NotStarted ──► Starting ──► Ready ──► Running
///                   │           │          │
///                   ├───────────┴──────────┼──► Failed      (exited on its own)
///                   ▼                      ▼
///               Terminating ◄──────────────┘
///                   │
///                   ▼
///               Terminated
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessState {
    NotStarted,
    /// Spawned, output being read, readiness not yet observed
    Starting,
    /// Readiness signal observed
    Ready,
    /// Steady state
    Running,
    /// Termination requested, waiting for exit
    Terminating,
    /// Exited after a termination request
    Terminated,
    /// Exited without a termination request
    Failed,
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProcessState::NotStarted => "not started",
            ProcessState::Starting => "starting",
            ProcessState::Ready => "ready",
            ProcessState::Running => "running",
            ProcessState::Terminating => "terminating",
            ProcessState::Terminated => "terminated",
            ProcessState::Failed => "failed",
        };
        f.write_str(s)
    }
}

impl ProcessState {
    /// Check if a state transition is valid according to the state machine.
    ///
    /// # Examples
    ///
    /// ```
    /// use devctl::service::ProcessState;
    ///
    /// assert!(ProcessState::NotStarted.is_valid_transition(ProcessState::Starting));
    /// assert!(ProcessState::Starting.is_valid_transition(ProcessState::Ready));
    /// assert!(!ProcessState::NotStarted.is_valid_transition(ProcessState::Running));
    /// ```
    pub fn is_valid_transition(&self, to: ProcessState) -> bool {
        use ProcessState::*;
        match (self, to) {
            (NotStarted, Starting) => true,

            (Starting, Ready) => true,
            // Services without a readiness gate go straight to steady state
            (Starting, Running) => true,
            (Ready, Running) => true,

            (Starting | Ready | Running, Terminating) => true,
            (Starting | Ready | Running, Failed) => true,

            (Terminating, Terminated) => true,

            (s1, s2) if *s1 == s2 => true,

            _ => false,
        }
    }

    /// States in which the process is (as far as we know) still alive.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            ProcessState::Starting
                | ProcessState::Ready
                | ProcessState::Running
                | ProcessState::Terminating
        )
    }

    /// States from which no further transition happens.
    pub fn is_final(&self) -> bool {
        matches!(self, ProcessState::Terminated | ProcessState::Failed)
    }
}

/// How the supervisor decides a freshly spawned service is up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    /// A line of output containing this substring.
    LogMarker(String),
    /// A TCP connection to `127.0.0.1:<port>` succeeds.
    PortReachable(u16),
    /// No signal; assumed up after a fixed delay.
    Grace(Duration),
}

/// Everything needed to launch one service.
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    pub service: ServiceKind,
    pub working_dir: PathBuf,
    pub command: Vec<String>,
    pub readiness: Readiness,
}

impl LaunchSpec {
    /// Command rendered for messages.
    pub fn display_command(&self) -> String {
        self.command.join(" ")
    }
}

/// Which child stream a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

/// A child process owned by the supervisor for the length of one session.
#[derive(Debug, Clone)]
pub struct ManagedProcess {
    pub service: ServiceKind,
    pub working_dir: PathBuf,
    pub launch_command: Vec<String>,
    pub readiness: Readiness,
    pub state: ProcessState,
    pub exit_code: Option<i32>,
    pub pid: Option<u32>,
    pub spawned_at: Option<Instant>,
    pub ready_at: Option<Instant>,
}

impl ManagedProcess {
    pub fn new(spec: LaunchSpec) -> Self {
        Self {
            service: spec.service,
            working_dir: spec.working_dir,
            launch_command: spec.command,
            readiness: spec.readiness,
            state: ProcessState::NotStarted,
            exit_code: None,
            pid: None,
            spawned_at: None,
            ready_at: None,
        }
    }

    /// Move to `to`, refusing transitions the state machine does not allow.
    ///
    /// Returns whether the state changed.
    pub fn transition(&mut self, to: ProcessState) -> bool {
        if self.state == to {
            return false;
        }
        if !self.state.is_valid_transition(to) {
            tracing::debug!(
                "Ignoring invalid transition for {}: {} -> {}",
                self.service,
                self.state,
                to
            );
            return false;
        }
        tracing::debug!("{}: {} -> {}", self.service, self.state, to);
        self.state = to;
        if to == ProcessState::Ready {
            self.ready_at = Some(Instant::now());
        }
        true
    }
}
