mod init;
mod port;
mod start;
mod stop;
mod validate;

pub use init::run_init;
pub use port::run_port;
pub use start::run_start;
pub use stop::run_stop;
pub use validate::run_validate;

use crate::output::UserOutput;
use devctl::orchestrator::{KillResult, PortAssignment, ReapOutcome};
use devctl::rewrite::UpdateStatus;

/// Print the resolved ports and any config file changes.
fn print_assignment(assignment: &PortAssignment, out: &dyn UserOutput) {
    for resolved in [&assignment.backend, &assignment.frontend] {
        let note = if resolved.changed { " (moved)" } else { "" };
        out.status(&format!(
            "  {:<9} {}{}",
            resolved.service, resolved.chosen_port, note
        ));
    }

    for update in &assignment.config_updates {
        match &update.status {
            UpdateStatus::Updated => out.status(&format!("  updated {}", update.path.display())),
            UpdateStatus::Unchanged => {}
            UpdateStatus::Failed(reason) => out.warning(&format!(
                "Warning: could not update {}: {}",
                update.path.display(),
                reason
            )),
        }
    }
}

/// Print what the reaper did. Returns how many processes were stopped.
fn print_reap_outcomes(outcomes: &[ReapOutcome], out: &dyn UserOutput) -> usize {
    let mut stopped = 0;
    for outcome in outcomes {
        if outcome.nothing_found() {
            out.status(&format!("  {}: nothing running", outcome.target));
            continue;
        }
        for reaped in &outcome.processes {
            let who = format!("{} (PID {})", reaped.process.name, reaped.process.pid);
            match &reaped.result {
                KillResult::Terminated => out.status(&format!("  {}: stopped {}", outcome.target, who)),
                KillResult::ForceKilled => {
                    out.status(&format!("  {}: killed {} (forced)", outcome.target, who))
                }
                KillResult::AlreadyExited => {
                    out.status(&format!("  {}: {} already exited", outcome.target, who))
                }
                KillResult::Skipped => {}
                KillResult::Failed(reason) => out.warning(&format!(
                    "  {}: could not stop {}: {}",
                    outcome.target, who, reason
                )),
            }
        }
        stopped += outcome.stopped_count();
    }
    stopped
}
