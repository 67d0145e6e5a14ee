mod coordinator;
mod reaper;
mod supervisor;

pub use coordinator::{PortAssignment, PortCoordinator};
pub use reaper::{KillResult, ReapOutcome, ReapTarget, ReapedProcess, Reaper};
pub use supervisor::{Supervisor, SupervisorSettings};
