use super::log_capture::spawn_line_reader;
use super::{LaunchSpec, ServiceKind, Stream};
use crate::error::{Error, Result};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::mpsc::UnboundedSender;

/// How long the waiter gives the stream readers to hit EOF after the child
/// exits. Grandchildren that inherited the pipes can keep them open forever.
const OUTPUT_DRAIN_TIMEOUT: Duration = Duration::from_millis(500);

/// Something that happened to a supervised child.
///
/// Produced by the reader and waiter tasks, consumed only by the supervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEvent {
    Output {
        service: ServiceKind,
        stream: Stream,
        line: String,
    },
    Exited {
        service: ServiceKind,
        code: Option<i32>,
    },
}

/// Spawn the child described by `spec` and wire its streams and exit into `events`.
///
/// Returns the child's PID. The child is placed in its own process group on
/// Unix so that termination signals reach everything it forks.
pub(crate) fn spawn_child(
    spec: &LaunchSpec,
    events: UnboundedSender<ProcessEvent>,
) -> Result<Option<u32>> {
    let service = spec.service;
    let spawn_error = |reason: String| Error::ChildSpawn {
        service,
        command: spec.display_command(),
        cwd: spec.working_dir.clone(),
        reason,
    };

    let (program, args) = spec
        .command
        .split_first()
        .ok_or_else(|| spawn_error("empty launch command".to_string()))?;

    if !spec.working_dir.is_dir() {
        return Err(spawn_error("working directory does not exist".to_string()));
    }

    tracing::debug!(
        "Spawning {} in {:?}: {:?}",
        service,
        spec.working_dir,
        spec.command
    );

    let mut cmd = Command::new(program);
    cmd.args(args)
        .current_dir(&spec.working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    #[cfg(unix)]
    cmd.process_group(0);

    let mut child = cmd.spawn().map_err(|e| {
        tracing::error!("Failed to spawn {}: {}", service, e);
        spawn_error(e.to_string())
    })?;

    let pid = child.id();

    let stdout_task = child
        .stdout
        .take()
        .map(|out| spawn_line_reader(out, service, Stream::Stdout, events.clone()));
    let stderr_task = child
        .stderr
        .take()
        .map(|err| spawn_line_reader(err, service, Stream::Stderr, events.clone()));

    tokio::spawn(async move {
        let code = match child.wait().await {
            Ok(status) => exit_code(status),
            Err(e) => {
                tracing::warn!("Error waiting for {}: {}", service, e);
                None
            }
        };

        // Deliver the tail of the output before the exit notice
        for task in [stdout_task, stderr_task].into_iter().flatten() {
            let _ = tokio::time::timeout(OUTPUT_DRAIN_TIMEOUT, task).await;
        }

        let _ = events.send(ProcessEvent::Exited { service, code });
    });

    Ok(pid)
}

/// Exit code, or `128 + signal` for signal deaths on Unix (shell convention).
fn exit_code(status: ExitStatus) -> Option<i32> {
    if let Some(code) = status.code() {
        return Some(code);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return Some(128 + signal);
        }
    }
    None
}
